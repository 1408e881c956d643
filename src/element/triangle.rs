use crate::connectivity::Tri3d2Connectivity;
use crate::element::{vertex_diameter, ElementConnectivity, FiniteElement, ReferenceFiniteElement};
use crate::Real;
use nalgebra::{Dyn, Matrix1x3, Matrix2, Matrix2x3, MatrixViewMut, OPoint, Point2, Scalar, Vector2, U2};
use numeric_literals::replace_float_literals;

/// A finite element representing linear basis functions on a triangle, in two dimensions.
///
/// The reference element is the triangle defined by the corners (-1, -1), (1, -1), (-1, 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 3],
}

impl<T> Tri3d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 3]) -> Self {
        Self { vertices }
    }
}

impl<T> Tri3d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference() -> Self {
        Self::from_vertices([Point2::new(-1.0, -1.0), Point2::new(1.0, -1.0), Point2::new(-1.0, 1.0)])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x3<T> {
        Matrix1x3::new(
            -0.5 * xi.x - 0.5 * xi.y,
            0.5 * xi.x + 0.5,
            0.5 * xi.y + 0.5
        )
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients(&self, _xi: &Point2<T>) -> Matrix2x3<T> {
        Matrix2x3::from_columns(&[
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, 0.0),
            Vector2::new(0.0, 0.5)
        ])
    }
}

impl<T> ElementConnectivity<T> for Tri3d2Connectivity
where
    T: Real,
{
    type Element = Tri3d2Element<T>;
    type ReferenceDim = U2;

    fn element(&self, vertices: &[Point2<T>]) -> Option<Self::Element> {
        Some(Tri3d2Element::from_vertices([
            vertices.get(self.0[0])?.clone(),
            vertices.get(self.0[1])?.clone(),
            vertices.get(self.0[2])?.clone(),
        ]))
    }
}

impl<T> ReferenceFiniteElement<T> for Tri3d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;

    fn num_nodes(&self) -> usize {
        3
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        basis_values.copy_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U2, Dyn>, xi: &Point2<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn reference_domain_contains(&self, xi: &Point2<T>, tolerance: T) -> bool {
        xi.x >= -1.0 - tolerance && xi.y >= -1.0 - tolerance && xi.x + xi.y <= tolerance
    }
}

impl<T> FiniteElement<T> for Tri3d2Element<T>
where
    T: Real,
{
    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        let X: Matrix2x3<T> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        let X: Matrix2x3<T> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
        let N = self.evaluate_basis(xi);
        OPoint::from(&X * &N.transpose())
    }

    fn diameter(&self) -> T {
        vertex_diameter(&self.vertices)
    }

    fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }
}
