//! Evaluation of finite element fields at arbitrary points.
use crate::allocators::DimAllocator;
use crate::assembly::ElementBuffer;
use crate::dofs::DofHandler;
use crate::element::{element_contains_point, ElementConnectivity};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::locate::CellLocator;
use crate::{Real, SmallDim};
use log::warn;
use nalgebra::{DVector, DefaultAllocator, Dyn, OMatrix, OPoint};

/// Evaluates a finite element field at arbitrary points of the mesh.
///
/// Points are located with a [`CellLocator`] built once for the mesh. If several cells contain
/// a point (e.g. on a shared face), locally owned cells are preferred.
#[derive(Debug)]
pub struct PointEvaluator<'a, T, D, C>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    dofs: &'a DofHandler<'a, T, D, C>,
    locator: CellLocator,
}

impl<'a, T, D, C> PointEvaluator<'a, T, D, C>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    pub fn new(dofs: &'a DofHandler<'a, T, D, C>) -> Self {
        Self {
            dofs,
            locator: CellLocator::new(dofs.mesh()),
        }
    }

    pub fn dofs(&self) -> &DofHandler<'a, T, D, C> {
        self.dofs
    }

    /// Finds a locally owned cell containing `x` and the reference coordinates of `x` in it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PointNotAvailableHere`] if only cells owned by other processes contain
    /// the point, and [`Error::PointNotFound`] if no cell does.
    pub fn locate(&self, x: &OPoint<T, D>) -> Result<(usize, OPoint<T, D>)> {
        let mesh = self.dofs.mesh();
        let partition = self.dofs.partition();
        let mut unowned_cell = None;
        for cell in self.locator.candidate_cells(x) {
            let xi = mesh
                .cell_element(cell)
                .and_then(|element| element_contains_point(&element, x));
            if let Some(xi) = xi {
                if partition.is_locally_owned(cell) {
                    return Ok((cell, xi));
                } else if unowned_cell.is_none() {
                    unowned_cell = Some(cell);
                }
            }
        }

        match unowned_cell {
            Some(cell) => {
                warn!("Point {x:?} is only contained in cell {cell}, which is not locally owned");
                Err(Error::PointNotAvailableHere { cell })
            }
            None => Err(Error::PointNotFound),
        }
    }

    fn prepare(&self, u_h: &DVector<T>, x: &OPoint<T, D>) -> Result<(usize, OPoint<T, D>, ElementBuffer<T, D>)> {
        if u_h.len() != self.dofs.num_dofs() {
            return Err(Error::VectorLengthMismatch {
                expected: self.dofs.num_dofs(),
                actual: u_h.len(),
            });
        }
        let (cell, xi) = self.locate(x)?;
        let mut buffer = ElementBuffer::default();
        buffer.populate_element_variables(self.dofs, cell, u_h);
        Ok((cell, xi, buffer))
    }

    /// The value of every component of `u_h` at `x`.
    pub fn value(&self, u_h: &DVector<T>, x: &OPoint<T, D>) -> Result<DVector<T>> {
        let (cell, xi, mut buffer) = self.prepare(u_h, x)?;
        let element = self
            .dofs
            .mesh()
            .cell_element(cell)
            .ok_or(Error::DegenerateCell { cell })?;
        buffer.populate_basis(&element, &xi);
        Ok(buffer.u_h_value())
    }

    /// The gradient of every component of `u_h` at `x`, one column per component.
    pub fn gradient(&self, u_h: &DVector<T>, x: &OPoint<T, D>) -> Result<OMatrix<T, D, Dyn>> {
        let (cell, xi, mut buffer) = self.prepare(u_h, x)?;
        let element = self
            .dofs
            .mesh()
            .cell_element(cell)
            .ok_or(Error::DegenerateCell { cell })?;
        buffer
            .populate_basis_gradients(&element, &xi)
            .ok_or(Error::DegenerateCell { cell })?;
        Ok(buffer.u_h_gradient())
    }

    /// The difference `exact(x) - u_h(x)` for every component.
    pub fn difference<U>(&self, u_h: &DVector<T>, exact: &U, x: &OPoint<T, D>) -> Result<DVector<T>>
    where
        U: ?Sized + Field<T, D>,
    {
        if exact.num_components() != self.dofs.num_components() {
            return Err(Error::ComponentMismatch {
                expected: self.dofs.num_components(),
                actual: exact.num_components(),
            });
        }
        let u_h_at_x = self.value(u_h, x)?;
        Ok(exact.value(x) - u_h_at_x)
    }
}

/// Evaluates every component of the finite element field `u_h` at the point `x`.
///
/// Builds a spatial index for every call; use a [`PointEvaluator`] to evaluate at many points.
///
/// # Errors
///
/// Returns [`Error::PointNotAvailableHere`] if `x` lies in a cell that is not locally owned.
pub fn point_value<T, D, C>(dofs: &DofHandler<T, D, C>, u_h: &DVector<T>, x: &OPoint<T, D>) -> Result<DVector<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    PointEvaluator::new(dofs).value(u_h, x)
}

/// Evaluates the gradient of every component of `u_h` at the point `x`.
pub fn point_gradient<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    u_h: &DVector<T>,
    x: &OPoint<T, D>,
) -> Result<OMatrix<T, D, Dyn>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    PointEvaluator::new(dofs).gradient(u_h, x)
}

/// Computes `exact(x) - u_h(x)` at the point `x`.
pub fn point_difference<T, D, C, U>(
    dofs: &DofHandler<T, D, C>,
    u_h: &DVector<T>,
    exact: &U,
    x: &OPoint<T, D>,
) -> Result<DVector<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    U: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    PointEvaluator::new(dofs).difference(u_h, exact, x)
}
