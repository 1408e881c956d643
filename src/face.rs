//! Geometry of boundary faces and quadrature on them.
//!
//! Every face of the supported cells is a simplex with one vertex per spatial dimension: a
//! point in 1D, a segment in 2D and a triangle in 3D. The traces of the vertex basis functions
//! on a face are the barycentric coordinates of the face.
use crate::allocators::DimAllocator;
use crate::connectivity::Connectivity;
use crate::dofs::DofHandler;
use crate::element::ElementConnectivity;
use crate::error::{Error, Result};
use crate::quadrature::total_order;
use crate::{Real, SmallDim};
use nalgebra::{DMatrix, DefaultAllocator, DimName, OPoint, OVector};

/// A boundary face of a locally owned cell.
#[derive(Debug, Clone)]
pub struct BoundaryFace<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    pub cell: usize,
    pub boundary_id: usize,
    pub vertices: Vec<usize>,
    pub points: Vec<OPoint<T, D>>,
    /// Unit normal pointing out of the cell.
    pub normal: OVector<T, D>,
    /// Length in 2D, area in 3D and one for the point faces of 1D meshes.
    pub measure: T,
}

impl<T, D> BoundaryFace<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// The point with the given barycentric coordinates.
    pub fn map_barycentric(&self, lambda: &[T]) -> OPoint<T, D> {
        let coords = self
            .points
            .iter()
            .zip(lambda)
            .fold(OVector::<T, D>::zeros(), |sum, (p, &l)| sum + &p.coords * l);
        OPoint::from(coords)
    }
}

/// The vector orthogonal to the `D - 1` given vectors, whose norm is the volume of the
/// parallelotope they span. In 3D this is the cross product.
///
/// # Panics
///
/// Panics if the number of vectors is not `D - 1`.
pub fn generalized_cross<T, D>(vectors: &[OVector<T, D>]) -> OVector<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    let d = D::dim();
    assert_eq!(vectors.len() + 1, d, "Need exactly D - 1 vectors.");
    let mut minor = DMatrix::zeros(d - 1, d - 1);
    OVector::<T, D>::from_fn(|k, _| {
        for (row, v) in vectors.iter().enumerate() {
            for (col, i) in (0..d).filter(|&i| i != k).enumerate() {
                minor[(row, col)] = v[i];
            }
        }
        let cofactor = minor.determinant();
        if k % 2 == 0 {
            cofactor
        } else {
            -cofactor
        }
    })
}

fn centroid<'a, T, D>(points: impl ExactSizeIterator<Item = &'a OPoint<T, D>>) -> OVector<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    let n = T::from_usize(points.len()).expect("Must be able to fit usize in T");
    points.fold(OVector::<T, D>::zeros(), |sum, p| sum + &p.coords) / n
}

/// Collects the boundary faces of locally owned cells whose boundary id is accepted by
/// `include`.
///
/// # Errors
///
/// Returns [`Error::DegenerateCell`] for a face of zero measure.
pub fn locally_owned_boundary_faces<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    include: impl Fn(usize) -> bool,
) -> Result<Vec<BoundaryFace<T, D>>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mesh = dofs.mesh();
    let d = D::dim();
    let factorial = T::from_usize((1..d).product()).expect("Must be able to fit usize in T");
    let mut faces = Vec::new();
    let mut edges = Vec::with_capacity(d);

    for (face, cell, _) in mesh.find_boundary_faces() {
        let boundary_id = mesh.boundary_id(&face);
        if !dofs.partition().is_locally_owned(cell) || !include(boundary_id) {
            continue;
        }
        let vertices = face.vertex_indices().to_vec();
        assert_eq!(vertices.len(), D::dim(), "Faces must be simplices with one vertex per dimension.");
        let points: Vec<_> = vertices.iter().map(|&v| mesh.vertices()[v].clone()).collect();

        edges.clear();
        edges.extend(points[1..].iter().map(|p| &p.coords - &points[0].coords));
        let mut normal = generalized_cross(&edges);
        let norm = normal.norm();
        if norm == T::zero() || !norm.is_finite() {
            return Err(Error::DegenerateCell { cell });
        }
        normal /= norm;

        let cell_vertices = mesh.connectivity()[cell].vertex_indices();
        let cell_centroid = centroid(cell_vertices.iter().map(|&v| &mesh.vertices()[v]));
        if normal.dot(&(centroid(points.iter()) - cell_centroid)) < T::zero() {
            normal = -normal;
        }

        faces.push(BoundaryFace {
            cell,
            boundary_id,
            vertices,
            points,
            normal,
            measure: norm / factorial,
        });
    }
    Ok(faces)
}

/// A quadrature rule of the given polynomial strength on a face with `D` vertices.
///
/// The weights sum to one and the points are given in barycentric coordinates.
pub fn barycentric_face_rule<T, D>(strength: usize) -> (Vec<T>, Vec<Vec<T>>)
where
    T: Real,
    D: DimName,
{
    let half = T::from_f64(0.5).unwrap();
    let to_unit = |xi: T| (xi + T::one()) * half;
    match D::dim() {
        1 => (vec![T::one()], vec![vec![T::one()]]),
        2 => {
            let (weights, points) = total_order::segment::<T>(strength);
            let points = points
                .iter()
                .map(|xi| {
                    let l = to_unit(xi[0]);
                    vec![T::one() - l, l]
                })
                .collect();
            (weights.into_iter().map(|w| w * half).collect(), points)
        }
        3 => {
            let (weights, points) = total_order::triangle::<T>(strength);
            let points = points
                .iter()
                .map(|xi| {
                    let (l1, l2) = (to_unit(xi.x), to_unit(xi.y));
                    vec![T::one() - l1 - l2, l1, l2]
                })
                .collect();
            (weights.into_iter().map(|w| w * half).collect(), points)
        }
        dim => panic!("Faces of {dim}-dimensional cells are not supported."),
    }
}
