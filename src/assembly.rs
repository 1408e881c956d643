//! Buffers and helpers for evaluating finite element fields cell by cell.
use crate::allocators::DimAllocator;
use crate::dofs::DofHandler;
use crate::element::{ElementConnectivity, FiniteElement};
use crate::{Real, SmallDim};
use nalgebra::{DMatrix, DVector, DVectorView, DefaultAllocator, Dyn, OMatrix, OPoint, Scalar};

/// Gathers the entries of `global` at the given indices into `local`.
pub fn gather_global_to_local<T: Scalar>(global: &DVector<T>, local: &mut [T], indices: &[usize]) {
    assert_eq!(local.len(), indices.len());
    for (local_value, &global_index) in local.iter_mut().zip(indices) {
        *local_value = global[global_index].clone();
    }
}

/// Adds each entry of `local` to the entry of `global` at the corresponding index.
pub fn add_local_to_global<T: Real>(local: &[T], global: &mut DVector<T>, indices: &[usize]) {
    assert_eq!(local.len(), indices.len());
    for (&local_value, &global_index) in local.iter().zip(indices) {
        global[global_index] += local_value;
    }
}

/// Per-cell storage of the local solution, basis values and physical basis gradients.
///
/// The buffer is reused from cell to cell and from quadrature point to quadrature point in
/// order to avoid repeated allocation.
#[derive(Debug, Clone)]
pub struct ElementBuffer<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    element_dofs: Vec<usize>,
    // num_components x num_nodes
    u_local: DMatrix<T>,
    basis_values: Vec<T>,
    reference_gradients: OMatrix<T, D, Dyn>,
    basis_gradients: OMatrix<T, D, Dyn>,
}

impl<T, D> Default for ElementBuffer<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn default() -> Self {
        Self {
            element_dofs: Vec::new(),
            u_local: DMatrix::zeros(0, 0),
            basis_values: Vec::new(),
            reference_gradients: OMatrix::<T, D, Dyn>::zeros(0),
            basis_gradients: OMatrix::<T, D, Dyn>::zeros(0),
        }
    }
}

impl<T, D> ElementBuffer<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn resize(&mut self, num_nodes: usize) {
        self.basis_values.resize(num_nodes, T::zero());
        if self.reference_gradients.ncols() != num_nodes {
            self.reference_gradients = OMatrix::<T, D, Dyn>::zeros(num_nodes);
            self.basis_gradients = OMatrix::<T, D, Dyn>::zeros(num_nodes);
        }
    }

    /// Gathers the degrees of freedom of the cell and the corresponding entries of `u_global`.
    pub fn populate_element_variables<C>(&mut self, dofs: &DofHandler<T, D, C>, cell: usize, u_global: &DVector<T>)
    where
        C: ElementConnectivity<T, ReferenceDim = D>,
    {
        dofs.populate_cell_dofs(cell, &mut self.element_dofs);
        let nc = dofs.num_components();
        let num_nodes = self.element_dofs.len() / nc;
        self.u_local.resize_mut(nc, num_nodes, T::zero());
        // Column-major storage with components of each node consecutive matches the dof order
        gather_global_to_local(u_global, self.u_local.as_mut_slice(), &self.element_dofs);
        self.resize(num_nodes);
    }

    pub fn element_dofs(&self) -> &[usize] {
        &self.element_dofs
    }

    /// Evaluates the basis functions of the element at the reference coordinates.
    pub fn populate_basis<Element>(&mut self, element: &Element, xi: &OPoint<T, D>)
    where
        Element: FiniteElement<T, ReferenceDim = D>,
    {
        self.resize(element.num_nodes());
        element.populate_basis(&mut self.basis_values, xi);
    }

    /// Evaluates the physical gradients of the basis functions at the reference coordinates.
    ///
    /// Returns the absolute value of the Jacobian determinant of the reference map, or `None`
    /// if the map is singular at `xi`.
    pub fn populate_basis_gradients<Element>(&mut self, element: &Element, xi: &OPoint<T, D>) -> Option<T>
    where
        Element: FiniteElement<T, ReferenceDim = D>,
    {
        self.resize(element.num_nodes());
        let n = element.num_nodes();
        element.populate_basis_gradients(self.reference_gradients.columns_mut(0, n), xi);
        let j = element.reference_jacobian(xi);
        let j_det = j.determinant();
        if j_det == T::zero() || !j_det.is_finite() {
            return None;
        }
        let j_inv_t = j.try_inverse()?.transpose();
        self.basis_gradients = j_inv_t * &self.reference_gradients;
        Some(j_det.abs())
    }

    pub fn basis_values(&self) -> &[T] {
        &self.basis_values
    }

    pub fn basis_gradients(&self) -> &OMatrix<T, D, Dyn> {
        &self.basis_gradients
    }

    /// The value of every component of the local field at the point of the last call to
    /// [`populate_basis`](Self::populate_basis).
    pub fn u_h_value(&self) -> DVector<T> {
        let phi = DVectorView::from_slice(&self.basis_values, self.basis_values.len());
        &self.u_local * phi
    }

    /// The gradient of every component of the local field, one column per component, at the
    /// point of the last call to [`populate_basis_gradients`](Self::populate_basis_gradients).
    pub fn u_h_gradient(&self) -> OMatrix<T, D, Dyn> {
        &self.basis_gradients * self.u_local.transpose()
    }
}
