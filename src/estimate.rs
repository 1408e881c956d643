//! Per-cell integration of the difference between a finite element field and a reference field.
use crate::allocators::DimAllocator;
use crate::assembly::ElementBuffer;
use crate::communicator::ReduceOp;
use crate::dofs::DofHandler;
use crate::element::{ElementConnectivity, FiniteElement};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::norm::{check_exponent, NormType};
use crate::quadrature::Quadrature;
use crate::{Real, SmallDim};
use itertools::izip;
use log::{debug, trace};
use nalgebra::{DVector, DefaultAllocator, Dyn, OMatrix, OPoint};
use numeric_literals::replace_float_literals;
use rayon::prelude::*;

/// A weight function for error computations, either one weight for all components or one
/// weight per component.
pub type Weight<'a, T, D> = Option<&'a (dyn Field<T, D> + Sync)>;

/// Checks the arguments shared by the difference integrators.
fn check_difference_arguments<T, D, C, U>(
    dofs: &DofHandler<T, D, C>,
    u_h: &DVector<T>,
    exact: &U,
    norm: NormType,
    weight: Weight<T, D>,
    exponent: T,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    U: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let nc = dofs.num_components();
    if u_h.len() != dofs.num_dofs() {
        return Err(Error::VectorLengthMismatch {
            expected: dofs.num_dofs(),
            actual: u_h.len(),
        });
    }
    if exact.num_components() != nc {
        return Err(Error::ComponentMismatch {
            expected: nc,
            actual: exact.num_components(),
        });
    }
    if let Some(weight) = weight {
        let weight_components = weight.num_components();
        if weight_components != 1 && weight_components != nc {
            return Err(Error::InvalidWeight {
                num_components: nc,
                weight_components,
            });
        }
    }
    check_exponent(norm, exponent)?;
    if norm == NormType::HdivSeminorm && nc < D::dim() {
        return Err(Error::NotEnoughComponents {
            required: D::dim(),
            num_components: nc,
        });
    }
    if norm.requires_gradient() && !exact.has_gradient() {
        return Err(Error::GradientUnavailable { norm });
    }
    Ok(())
}

/// Scratch space for [`integrate_element_difference`].
#[derive(Debug, Clone)]
pub struct DifferenceBuffer<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    element: ElementBuffer<T, D>,
    exact_value: Vec<T>,
    exact_gradient: OMatrix<T, D, Dyn>,
    weight_value: Vec<T>,
}

impl<T, D> Default for DifferenceBuffer<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn default() -> Self {
        Self {
            element: ElementBuffer::default(),
            exact_value: Vec::new(),
            exact_gradient: OMatrix::<T, D, Dyn>::zeros(0),
            weight_value: Vec::new(),
        }
    }
}

/// Integrates the chosen norm of the difference `exact - u_h` over a single cell.
///
/// The buffer must hold the local variables of the cell, see
/// [`ElementBuffer::populate_element_variables`]. Returns `None` if the reference map of the
/// element is singular at one of the quadrature points.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn integrate_element_difference<T, D, Element, U>(
    element: &Element,
    buffer: &mut DifferenceBuffer<T, D>,
    exact: &U,
    quadrature: &impl Quadrature<T, D>,
    norm: NormType,
    weight: Weight<T, D>,
    exponent: T,
) -> Option<T>
where
    T: Real,
    D: SmallDim,
    Element: FiniteElement<T, ReferenceDim = D>,
    U: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    use NormType::*;

    let nc = exact.num_components();
    let p = exponent;
    buffer.exact_value.resize(nc, 0.0);
    buffer.weight_value.resize(nc, 1.0);
    if buffer.exact_gradient.ncols() != nc {
        buffer.exact_gradient = OMatrix::<T, D, Dyn>::zeros(nc);
    }
    let needs_gradient = norm.requires_gradient();

    // Integral part and max part (used by the infinity norms)
    let mut integral = 0.0;
    let mut value_max: T = 0.0;
    let mut gradient_max: T = 0.0;

    for (&w, xi) in izip!(quadrature.weights(), quadrature.points()) {
        let x = element.map_reference_coords(xi);
        let DifferenceBuffer {
            element: element_buffer,
            exact_value,
            exact_gradient,
            weight_value,
        } = &mut *buffer;

        element_buffer.populate_basis(element, xi);
        let j_det_abs = element_buffer.populate_basis_gradients(element, xi)?;
        let dx = w * j_det_abs;

        exact.populate_value(&x, exact_value);
        let mut e = DVector::from_column_slice(exact_value);
        e -= element_buffer.u_h_value();

        let grad_e = if needs_gradient {
            exact.populate_gradient(&x, exact_gradient);
            Some(&*exact_gradient - element_buffer.u_h_gradient())
        } else {
            None
        };

        populate_weights(weight, &x, weight_value);

        let grad_norm = |c: usize| {
            grad_e
                .as_ref()
                .map(|grad_e| grad_e.column(c).norm())
                .unwrap_or(0.0)
        };

        match norm {
            Mean => {
                integral += dx * izip!(e.iter(), weight_value.iter()).fold(0.0, |s, (&e_c, &w_c)| s + e_c * w_c);
            }
            L1Norm => {
                integral += dx * izip!(e.iter(), weight_value.iter()).fold(0.0, |s, (&e_c, &w_c)| s + e_c.abs() * w_c);
            }
            L2Norm => {
                integral += dx * izip!(e.iter(), weight_value.iter()).fold(0.0, |s, (&e_c, &w_c)| s + e_c * e_c * w_c);
            }
            LpNorm => {
                integral += dx
                    * izip!(e.iter(), weight_value.iter())
                        .fold(0.0, |s, (&e_c, &w_c)| s + e_c.abs().powf(p) * w_c);
            }
            LinftyNorm | W1inftyNorm | W1inftySeminorm => {
                for c in 0..nc {
                    let w_c = weight_value[c];
                    if norm != W1inftySeminorm {
                        value_max = ReduceOp::Max.apply(value_max, e[c].abs() * w_c);
                    }
                    if norm != LinftyNorm {
                        gradient_max = ReduceOp::Max.apply(gradient_max, grad_norm(c) * w_c);
                    }
                }
            }
            H1Seminorm => {
                integral += dx
                    * (0..nc).fold(0.0, |s, c| {
                        let g = grad_norm(c);
                        s + g * g * weight_value[c]
                    });
            }
            HdivSeminorm => {
                let grad_e = grad_e.as_ref()?;
                let divergence = (0..D::dim()).fold(0.0, |s, c| s + grad_e[(c, c)] * weight_value[c].sqrt());
                integral += dx * divergence * divergence;
            }
            H1Norm => {
                integral += dx
                    * (0..nc).fold(0.0, |s, c| {
                        let g = grad_norm(c);
                        s + (e[c] * e[c] + g * g) * weight_value[c]
                    });
            }
            W1pSeminorm => {
                integral += dx * (0..nc).fold(0.0, |s, c| s + grad_norm(c).powf(p) * weight_value[c]);
            }
            W1pNorm => {
                integral += dx
                    * (0..nc).fold(0.0, |s, c| {
                        s + (e[c].abs().powf(p) + grad_norm(c).powf(p)) * weight_value[c]
                    });
            }
        }
    }

    let cell_error = match norm {
        Mean | L1Norm => integral,
        L2Norm | H1Seminorm | HdivSeminorm | H1Norm => integral.sqrt(),
        LpNorm | W1pSeminorm | W1pNorm => integral.powf(1.0 / p),
        LinftyNorm => value_max,
        W1inftySeminorm => gradient_max,
        W1inftyNorm => value_max + gradient_max,
    };
    Some(cell_error)
}

fn populate_weights<T, D>(weight: Weight<T, D>, x: &OPoint<T, D>, weight_value: &mut [T])
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    match weight {
        None => weight_value.fill(T::one()),
        Some(weight) if weight.num_components() == 1 => {
            let mut scalar = [T::zero()];
            weight.populate_value(x, &mut scalar);
            weight_value.fill(scalar[0]);
        }
        Some(weight) => weight.populate_value(x, weight_value),
    }
}

/// Computes the error between a finite element field and a reference field on each cell.
///
/// For every locally owned cell $K$, the chosen [`NormType`] of the difference
/// $e = u - u_h$ is approximated with the given quadrature rule on the reference domain of the
/// cell, optionally weighted by `weight`. The exponent is only used for the $L^p$-type norms.
///
/// The result has one entry per cell of the mesh. Entries of cells that are not locally owned
/// are zero. Combine the entries into a global error with
/// [`compute_global_error`](crate::norm::compute_global_error).
///
/// # Errors
///
/// Returns an error if the arguments are incompatible with each other or with the norm, or
/// if the geometry of a cell is degenerate.
pub fn integrate_difference<T, D, C, U>(
    dofs: &DofHandler<T, D, C>,
    u_h: &DVector<T>,
    exact: &U,
    quadrature: &impl Quadrature<T, D>,
    norm: NormType,
    weight: Weight<T, D>,
    exponent: T,
) -> Result<DVector<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    U: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    check_difference_arguments(dofs, u_h, exact, norm, weight, exponent)?;

    let mesh = dofs.mesh();
    let mut cellwise_error = DVector::zeros(dofs.num_cells());
    let mut buffer = DifferenceBuffer::default();
    for cell in dofs.partition().owned_cells() {
        let element = mesh
            .cell_element(cell)
            .ok_or(Error::DegenerateCell { cell })?;
        buffer.element.populate_element_variables(dofs, cell, u_h);
        let cell_error =
            integrate_element_difference(&element, &mut buffer, exact, quadrature, norm, weight, exponent)
                .ok_or(Error::DegenerateCell { cell })?;
        trace!("{norm} on cell {cell}: {cell_error}");
        cellwise_error[cell] = cell_error;
    }

    debug!(
        "Integrated {norm} of the difference on {} of {} cells",
        dofs.partition().num_owned_cells(),
        dofs.num_cells()
    );
    Ok(cellwise_error)
}

/// Parallel version of [`integrate_difference`], producing identical results.
pub fn par_integrate_difference<T, D, C, U>(
    dofs: &DofHandler<T, D, C>,
    u_h: &DVector<T>,
    exact: &U,
    quadrature: &(impl Quadrature<T, D> + Sync),
    norm: NormType,
    weight: Weight<T, D>,
    exponent: T,
) -> Result<DVector<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D> + Sync,
    U: ?Sized + Field<T, D> + Sync,
    DefaultAllocator: DimAllocator<T, D>,
    <DefaultAllocator as nalgebra::allocator::Allocator<T, D>>::Buffer: Sync,
{
    check_difference_arguments(dofs, u_h, exact, norm, weight, exponent)?;

    let mesh = dofs.mesh();
    let partition = dofs.partition();
    let cell_errors = (0..dofs.num_cells())
        .into_par_iter()
        .map_init(DifferenceBuffer::default, |buffer, cell| {
            if !partition.is_locally_owned(cell) {
                return Ok(T::zero());
            }
            let element = mesh
                .cell_element(cell)
                .ok_or(Error::DegenerateCell { cell })?;
            buffer.element.populate_element_variables(dofs, cell, u_h);
            integrate_element_difference(&element, buffer, exact, quadrature, norm, weight, exponent)
                .ok_or(Error::DegenerateCell { cell })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DVector::from_vec(cell_errors))
}
