use crate::allocators::DimAllocator;
use crate::connectivity::{Quad4d2Connectivity, Segment2d1Connectivity, Tet4Connectivity, Tri3d2Connectivity};
use crate::element::ElementConnectivity;
use crate::quadrature::{total_order, QuadraturePair};
use crate::Real;
use nalgebra::DefaultAllocator;

/// A quadrature rule of a given strength on the reference domain of the element associated
/// with a connectivity.
pub trait CanonicalQuadrature<T>: ElementConnectivity<T>
where
    T: Real,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    /// Returns a rule that integrates polynomials of total degree up to `strength` exactly.
    fn canonical_quadrature(strength: usize) -> QuadraturePair<T, Self::ReferenceDim>;

    /// A rule that integrates the product of two basis functions exactly.
    fn canonical_mass_quadrature() -> QuadraturePair<T, Self::ReferenceDim> {
        Self::canonical_quadrature(2 * Self::canonical_basis_degree())
    }

    /// The total degree of the basis functions, counting each coordinate separately for
    /// tensor-product elements.
    fn canonical_basis_degree() -> usize;
}

macro_rules! impl_canonical_quadrature {
    ($connectivity:ty, $rule:path, $degree:expr) => {
        impl<T: Real> CanonicalQuadrature<T> for $connectivity {
            fn canonical_quadrature(strength: usize) -> QuadraturePair<T, Self::ReferenceDim> {
                $rule(strength)
            }

            fn canonical_basis_degree() -> usize {
                $degree
            }
        }
    };
}

impl_canonical_quadrature!(Segment2d1Connectivity, total_order::segment, 1);
impl_canonical_quadrature!(Tri3d2Connectivity, total_order::triangle, 1);
impl_canonical_quadrature!(Quad4d2Connectivity, total_order::quadrilateral, 2);
impl_canonical_quadrature!(Tet4Connectivity, total_order::tetrahedron, 1);
