//! Linear Lagrange finite elements.
//!
//! All elements are volumetric: the dimension of the reference domain coincides with the
//! dimension of the physical space the element lives in.
use crate::allocators::DimAllocator;
use crate::connectivity::Connectivity;
use crate::{Real, SmallDim};
use itertools::Itertools;
use log::warn;
use nalgebra::{DefaultAllocator, Dyn, MatrixViewMut, OMatrix, OPoint, Scalar};
use std::fmt::Debug;

mod quadrilateral;
mod segment;
mod tetrahedron;
mod triangle;

pub use quadrilateral::*;
pub use segment::*;
pub use tetrahedron::*;
pub use triangle::*;

pub trait ReferenceFiniteElement<T>
where
    T: Scalar,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    type ReferenceDim: SmallDim;

    /// Returns the number of nodes in the element.
    fn num_nodes(&self) -> usize;

    /// Evaluates each basis function at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the length of `basis_values` is not equal to the number of nodes.
    fn populate_basis(&self, basis_values: &mut [T], reference_coords: &OPoint<T, Self::ReferenceDim>);

    /// Populates a matrix whose columns are the reference gradients of each basis function.
    fn populate_basis_gradients(
        &self,
        basis_gradients: MatrixViewMut<T, Self::ReferenceDim, Dyn>,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    );

    /// Whether the reference domain contains the given reference coordinates, allowing points
    /// to lie outside by at most `tolerance`.
    fn reference_domain_contains(&self, reference_coords: &OPoint<T, Self::ReferenceDim>, tolerance: T) -> bool;
}

pub trait FiniteElement<T>: ReferenceFiniteElement<T>
where
    T: Scalar,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    /// Compute the Jacobian of the transformation from the reference element to the given
    /// element at the given reference coordinates.
    fn reference_jacobian(
        &self,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    ) -> OMatrix<T, Self::ReferenceDim, Self::ReferenceDim>;

    /// Maps reference coordinates to physical coordinates in the element.
    fn map_reference_coords(&self, reference_coords: &OPoint<T, Self::ReferenceDim>) -> OPoint<T, Self::ReferenceDim>;

    /// The diameter of the finite element, the largest distance between any two points in it.
    fn diameter(&self) -> T;

    /// The vertices of the element, in the order given by its connectivity.
    fn vertices(&self) -> &[OPoint<T, Self::ReferenceDim>];
}

pub trait ElementConnectivity<T>: Debug + Connectivity
where
    T: Scalar,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    type Element: FiniteElement<T, ReferenceDim = Self::ReferenceDim>;
    type ReferenceDim: SmallDim;

    /// Returns the finite element associated with this connectivity.
    ///
    /// The vertices passed in should be the collection of *all* vertices in the mesh.
    fn element(&self, vertices: &[OPoint<T, Self::ReferenceDim>]) -> Option<Self::Element>;
}

pub type ElementForConnectivity<T, Connectivity> = <Connectivity as ElementConnectivity<T>>::Element;

/// Largest distance between any pair of the given points.
pub(crate) fn vertex_diameter<T, D>(vertices: &[OPoint<T, D>]) -> T
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    vertices
        .iter()
        .tuple_combinations()
        .map(|(x, y)| (&x.coords - &y.coords).norm())
        .fold(T::zero(), |a, b| a.max(b))
}

const MAX_NEWTON_ITERATIONS: usize = 20;

/// Maps physical coordinates to reference coordinates of the element.
///
/// The inverse of the reference-to-physical map is computed with Newton's method. Returns
/// `None` if the Jacobian becomes singular or the iteration does not converge.
///
/// The returned point is not guaranteed to lie inside the reference domain: a point outside
/// the element maps to reference coordinates outside the reference domain.
#[allow(non_snake_case)]
pub fn map_physical_coordinates<T, Element>(
    element: &Element,
    x: &OPoint<T, Element::ReferenceDim>,
) -> Option<OPoint<T, Element::ReferenceDim>>
where
    T: Real,
    Element: FiniteElement<T>,
    DefaultAllocator: DimAllocator<T, Element::ReferenceDim>,
{
    // We solve T(xi) - x = 0. The diameter of the element gives a representative scale
    // for the residual
    let tolerance = T::from_f64(1e-12).unwrap() * element.diameter();

    let mut xi = OPoint::origin();
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let residual = element.map_reference_coords(&xi).coords - &x.coords;
        if residual.norm() <= tolerance {
            return Some(xi);
        }
        let J = element.reference_jacobian(&xi);
        let dxi = J.lu().solve(&residual)?;
        xi.coords -= dxi;
    }

    let residual = element.map_reference_coords(&xi).coords - &x.coords;
    if residual.norm() <= tolerance {
        Some(xi)
    } else {
        warn!(
            "Inverse reference map did not converge after {} iterations (residual {})",
            MAX_NEWTON_ITERATIONS,
            residual.norm()
        );
        None
    }
}

/// Maps `x` to the reference domain of the element if it lies in the element.
pub fn element_contains_point<T, Element>(
    element: &Element,
    x: &OPoint<T, Element::ReferenceDim>,
) -> Option<OPoint<T, Element::ReferenceDim>>
where
    T: Real,
    Element: FiniteElement<T>,
    DefaultAllocator: DimAllocator<T, Element::ReferenceDim>,
{
    let tolerance = T::from_f64(1e-10).unwrap();
    map_physical_coordinates(element, x).filter(|xi| element.reference_domain_contains(xi, tolerance))
}
