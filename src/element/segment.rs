use crate::connectivity::Segment2d1Connectivity;
use crate::element::{ElementConnectivity, FiniteElement, ReferenceFiniteElement};
use crate::Real;
use nalgebra::{Dyn, Matrix1, Matrix1x2, MatrixViewMut, OPoint, Point1, Scalar, U1};
use numeric_literals::replace_float_literals;

/// A linear segment element in one dimension, with reference domain [-1, 1].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Segment2d1Element<T>
where
    T: Scalar,
{
    vertices: [Point1<T>; 2],
}

impl<T: Scalar> Segment2d1Element<T> {
    pub fn from_vertices(vertices: [Point1<T>; 2]) -> Self {
        Self { vertices }
    }

    pub fn from_interval(interval: [T; 2]) -> Self {
        let [a, b] = interval;
        Self::from_vertices([Point1::new(a), Point1::new(b)])
    }
}

impl<T: Real> Segment2d1Element<T> {
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference() -> Self {
        Self::from_interval([-1.0, 1.0])
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis(&self, xi: &Point1<T>) -> Matrix1x2<T> {
        Matrix1x2::new((1.0 - xi[0]) / 2.0, (1.0 + xi[0]) / 2.0)
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients(&self, _xi: &Point1<T>) -> Matrix1x2<T> {
        Matrix1x2::new(-0.5, 0.5)
    }
}

impl<T> ElementConnectivity<T> for Segment2d1Connectivity
where
    T: Real,
{
    type Element = Segment2d1Element<T>;
    type ReferenceDim = U1;

    fn element(&self, vertices: &[Point1<T>]) -> Option<Self::Element> {
        let a = vertices.get(self.0[0])?.clone();
        let b = vertices.get(self.0[1])?.clone();
        Some(Segment2d1Element::from_vertices([a, b]))
    }
}

impl<T> ReferenceFiniteElement<T> for Segment2d1Element<T>
where
    T: Real,
{
    type ReferenceDim = U1;

    fn num_nodes(&self) -> usize {
        2
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point1<T>) {
        basis_values.copy_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U1, Dyn>, xi: &Point1<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn reference_domain_contains(&self, xi: &Point1<T>, tolerance: T) -> bool {
        xi[0].abs() <= 1.0 + tolerance
    }
}

impl<T> FiniteElement<T> for Segment2d1Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn reference_jacobian(&self, _xi: &Point1<T>) -> Matrix1<T> {
        let a = &self.vertices[0].coords;
        let b = &self.vertices[1].coords;
        (b - a) / 2.0
    }

    fn map_reference_coords(&self, xi: &Point1<T>) -> Point1<T> {
        let a = &self.vertices[0].coords;
        let b = &self.vertices[1].coords;
        let phi = self.evaluate_basis(xi);
        OPoint::from(a * phi[0] + b * phi[1])
    }

    fn diameter(&self) -> T {
        (self.vertices[1] - self.vertices[0]).norm()
    }

    fn vertices(&self) -> &[Point1<T>] {
        &self.vertices
    }
}
