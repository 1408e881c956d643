use crate::connectivity::Quad4d2Connectivity;
use crate::element::{vertex_diameter, ElementConnectivity, FiniteElement, ReferenceFiniteElement};
use crate::Real;
use nalgebra::{Dyn, Matrix1x4, Matrix2, Matrix2x4, MatrixViewMut, OPoint, Point2, Scalar, Vector2, U2};
use numeric_literals::replace_float_literals;

/// A bilinear quadrilateral element with reference domain [-1, 1]^2.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quad4d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 4],
}

impl<T> Quad4d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 4]) -> Self {
        Self { vertices }
    }
}

impl<T> Quad4d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x4<T> {
        // N_{alpha, beta}([alpha, beta]) = 1 with alpha, beta = 1 or -1
        let phi = |alpha, beta, xi: &Point2<T>| (1.0 + alpha * xi[0]) * (1.0 + beta * xi[1]) / 4.0;
        Matrix1x4::new(
            phi(-1.0, -1.0, xi),
            phi( 1.0, -1.0, xi),
            phi( 1.0,  1.0, xi),
            phi(-1.0,  1.0, xi),
        )
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients(&self, xi: &Point2<T>) -> Matrix2x4<T> {
        let phi_grad = |alpha, beta, xi: &Point2<T>|
            Vector2::new(
                alpha * (1.0 + beta * xi[1]) / 4.0,
                beta * (1.0 + alpha * xi[0]) / 4.0,
            );

        Matrix2x4::from_columns(&[
            phi_grad(-1.0, -1.0, xi),
            phi_grad( 1.0, -1.0, xi),
            phi_grad( 1.0,  1.0, xi),
            phi_grad(-1.0,  1.0, xi),
        ])
    }
}

impl<T> ElementConnectivity<T> for Quad4d2Connectivity
where
    T: Real,
{
    type Element = Quad4d2Element<T>;
    type ReferenceDim = U2;

    fn element(&self, vertices: &[Point2<T>]) -> Option<Self::Element> {
        let Self(indices) = self;
        let lookup_vertex = |local_index: usize| vertices.get(indices[local_index]).cloned();

        Some(Quad4d2Element::from_vertices([
            lookup_vertex(0)?,
            lookup_vertex(1)?,
            lookup_vertex(2)?,
            lookup_vertex(3)?,
        ]))
    }
}

impl<T> ReferenceFiniteElement<T> for Quad4d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;

    fn num_nodes(&self) -> usize {
        4
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        basis_values.copy_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U2, Dyn>, xi: &Point2<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn reference_domain_contains(&self, xi: &Point2<T>, tolerance: T) -> bool {
        xi.x.abs() <= 1.0 + tolerance && xi.y.abs() <= 1.0 + tolerance
    }
}

impl<T> FiniteElement<T> for Quad4d2Element<T>
where
    T: Real,
{
    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        let X: Matrix2x4<T> = Matrix2x4::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        let X: Matrix2x4<T> = Matrix2x4::from_fn(|i, j| self.vertices[j][i]);
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
