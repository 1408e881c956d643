use crate::connectivity::Tet4Connectivity;
use crate::element::{vertex_diameter, ElementConnectivity, FiniteElement, ReferenceFiniteElement};
use crate::Real;
use nalgebra::{Dyn, Matrix1x4, Matrix3, Matrix3x4, MatrixViewMut, OPoint, Point3, Scalar, Vector3, U3};
use numeric_literals::replace_float_literals;

/// A linear tetrahedron.
///
/// The reference element has the corners (-1, -1, -1), (1, -1, -1), (-1, 1, -1) and (-1, -1, 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tet4Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 4],
}

impl<T> Tet4Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 4]) -> Self {
        Self { vertices }
    }
}

#[replace_float_literals(T::from_f64(literal).unwrap())]
impl<T> Tet4Element<T>
where
    T: Real,
{
    pub fn reference() -> Self {
        Self {
            vertices: [
                Point3::new(-1.0, -1.0, -1.0),
                Point3::new(1.0, -1.0, -1.0),
                Point3::new(-1.0, 1.0, -1.0),
                Point3::new(-1.0, -1.0, 1.0),
            ],
        }
    }

    #[rustfmt::skip]
    pub fn evaluate_basis(&self, xi: &Point3<T>) -> Matrix1x4<T> {
        Matrix1x4::new(
            -0.5 * xi.x - 0.5 * xi.y - 0.5 * xi.z - 0.5,
            0.5 * xi.x + 0.5,
            0.5 * xi.y + 0.5,
            0.5 * xi.z + 0.5
        )
    }

    #[rustfmt::skip]
    pub fn gradients(&self, _xi: &Point3<T>) -> Matrix3x4<T> {
        Matrix3x4::from_columns(&[
            Vector3::new(-0.5, -0.5, -0.5),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(0.0, 0.0, 0.5)
        ])
    }
}

impl<T> ElementConnectivity<T> for Tet4Connectivity
where
    T: Real,
{
    type Element = Tet4Element<T>;
    type ReferenceDim = U3;

    fn element(&self, vertices: &[Point3<T>]) -> Option<Self::Element> {
        Some(Tet4Element {
            vertices: [
                vertices.get(self.0[0])?.clone(),
                vertices.get(self.0[1])?.clone(),
                vertices.get(self.0[2])?.clone(),
                vertices.get(self.0[3])?.clone(),
            ],
        })
    }
}

impl<T> ReferenceFiniteElement<T> for Tet4Element<T>
where
    T: Real,
{
    type ReferenceDim = U3;

    fn num_nodes(&self) -> usize {
        4
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        basis_values.copy_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U3, Dyn>, xi: &Point3<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn reference_domain_contains(&self, xi: &Point3<T>, tolerance: T) -> bool {
        xi.x >= -1.0 - tolerance
            && xi.y >= -1.0 - tolerance
            && xi.z >= -1.0 - tolerance
            && xi.x + xi.y + xi.z <= -1.0 + tolerance
    }
}

impl<T> FiniteElement<T> for Tet4Element<T>
where
    T: Real,
{
    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point3<T>) -> Matrix3<T> {
        let X = Matrix3x4::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point3<T>) -> Point3<T> {
        let X = Matrix3x4::from_fn(|i, j| self.vertices[j][i]);
        let N = self.evaluate_basis(xi);
        OPoint::from(&X * &N.transpose())
    }

    fn diameter(&self) -> T {
        vertex_diameter(&self.vertices)
    }

    fn vertices(&self) -> &[Point3<T>] {
        &self.vertices
    }
}
