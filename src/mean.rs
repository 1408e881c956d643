//! Mean values of finite element fields.
use crate::allocators::DimAllocator;
use crate::communicator::{agree_on_outcome, Communicator};
use crate::dofs::DofHandler;
use crate::element::ElementConnectivity;
use crate::error::{Error, Result};
use crate::estimate::{integrate_difference, Weight};
use crate::field::{ComponentSelect, ConstantField, ZeroField};
use crate::norm::{compute_global_error, NormType};
use crate::quadrature::Quadrature;
use crate::{Real, SmallDim};
use nalgebra::{DVector, DefaultAllocator};

/// Computes the mean value $\frac{1}{\lvert \Omega \rvert} \int_\Omega u_c$ of one component of
/// a finite element field.
///
/// This is a collective operation: every process must call it. If the local computation fails
/// on any process, every process returns an error.
pub fn compute_mean_value<T, D, C, Comm>(
    dofs: &DofHandler<T, D, C>,
    quadrature: &impl Quadrature<T, D>,
    u: &DVector<T>,
    component: usize,
    comm: &Comm,
) -> Result<T>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    Comm: Communicator + ?Sized,
    DefaultAllocator: DimAllocator<T, D>,
{
    let nc = dofs.num_components();
    let partition = dofs.partition();

    let local = if component >= nc {
        Err(Error::NotEnoughComponents {
            required: component + 1,
            num_components: nc,
        })
    } else {
        let select = ComponentSelect::single(nc, component);
        let weight: Weight<T, D> = Some(&select);
        // The Mean norm of the difference 0 - u is minus the integral of u_c
        let zero = ZeroField::new(nc);
        let one = ConstantField::new(DVector::repeat(nc, T::one()));
        let zeros = DVector::zeros(dofs.num_dofs());
        integrate_difference(dofs, u, &zero, quadrature, NormType::Mean, weight, T::one()).and_then(|integral| {
            let volume = integrate_difference(dofs, &zeros, &one, quadrature, NormType::Mean, weight, T::one())?;
            Ok((integral, volume))
        })
    };
    let (cellwise_integral, cellwise_volume) = agree_on_outcome(comm, local)?;

    let integral = -compute_global_error(partition, &cellwise_integral, NormType::Mean, T::one(), comm)?;
    let volume = compute_global_error(partition, &cellwise_volume, NormType::Mean, T::one(), comm)?;

    Ok(integral / volume)
}

/// Subtracts the algebraic mean of the selected entries from each selected entry.
///
/// An empty selection selects all entries.
///
/// # Panics
///
/// Panics if the selection is neither empty nor of the same length as `v`.
pub fn subtract_mean_value<T: Real>(v: &mut DVector<T>, selection: &[bool]) {
    assert!(
        selection.is_empty() || selection.len() == v.len(),
        "Selection must be empty or have one entry per vector entry."
    );
    let is_selected = |i: usize| selection.is_empty() || selection[i];

    let (sum, count) = v
        .iter()
        .enumerate()
        .filter(|&(i, _)| is_selected(i))
        .fold((T::zero(), 0usize), |(sum, count), (_, &v_i)| (sum + v_i, count + 1));
    if count == 0 {
        return;
    }
    let mean = sum / T::from_usize(count).expect("Must be able to fit usize in T");

    for (i, v_i) in v.iter_mut().enumerate() {
        if is_selected(i) {
            *v_i -= mean;
        }
    }
}
