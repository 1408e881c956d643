use crate::allocators::DimAllocator;
use crate::connectivity::{
    Connectivity, Quad4d2Connectivity, Segment2d1Connectivity, Tet4Connectivity, Tri3d2Connectivity,
};
use crate::element::ElementConnectivity;
use crate::{Real, SmallDim};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, OVector, Scalar, U1, U2, U3};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

pub mod procedural;

/// The boundary id of boundary faces that have not been assigned an id.
pub const DEFAULT_BOUNDARY_ID: usize = 0;

/// Index-based data structure for conforming meshes (i.e. no hanging nodes).
///
/// In addition to vertices and cell connectivity, the mesh stores a material id per cell and
/// an id for each boundary face, which are used to select functions per region of the domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh<T: Scalar, D, Connectivity>
where
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    vertices: Vec<OPoint<T, D>>,
    connectivity: Vec<Connectivity>,
    material_ids: Vec<usize>,
    // Keyed by the sorted vertex indices of the face
    boundary_ids: BTreeMap<Vec<usize>, usize>,
}

pub type IntervalMesh<T> = Mesh<T, U1, Segment2d1Connectivity>;
pub type TriangleMesh2d<T> = Mesh<T, U2, Tri3d2Connectivity>;
pub type QuadMesh2d<T> = Mesh<T, U2, Quad4d2Connectivity>;
pub type Tet4Mesh<T> = Mesh<T, U3, Tet4Connectivity>;

impl<T, D, Connectivity> Mesh<T, D, Connectivity>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn vertices_mut(&mut self) -> &mut [OPoint<T, D>] {
        &mut self.vertices
    }

    pub fn vertices(&self) -> &[OPoint<T, D>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Connectivity] {
        &self.connectivity
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Construct a mesh from vertices and connectivity.
    ///
    /// All cells get material id 0 and all boundary faces get [`DEFAULT_BOUNDARY_ID`].
    ///
    /// The connectivity is expected to only reference valid vertex indices. Users of the mesh
    /// are permitted to panic if they encounter invalid indices.
    pub fn from_vertices_and_connectivity(vertices: Vec<OPoint<T, D>>, connectivity: Vec<Connectivity>) -> Self {
        let material_ids = vec![0; connectivity.len()];
        Self {
            vertices,
            connectivity,
            material_ids,
            boundary_ids: BTreeMap::new(),
        }
    }

    pub fn material_ids(&self) -> &[usize] {
        &self.material_ids
    }

    pub fn set_material_id(&mut self, cell: usize, material_id: usize) {
        self.material_ids[cell] = material_id;
    }

    /// # Panics
    ///
    /// Panics if the number of material ids does not match the number of cells.
    pub fn with_material_ids(mut self, material_ids: Vec<usize>) -> Self {
        assert_eq!(
            material_ids.len(),
            self.connectivity.len(),
            "Need exactly one material id per cell."
        );
        self.material_ids = material_ids;
        self
    }
}

impl<T, D, C> Mesh<T, D, C>
where
    T: Scalar,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    /// Returns the faces that are only connected to a single cell, together with
    /// the index of that cell and the local index of the face in the cell.
    ///
    /// Faces are returned in the order in which they are encountered in the cells.
    pub fn find_boundary_faces(&self) -> Vec<(C::FaceConnectivity, usize, usize)> {
        let mut face_info = Vec::new();
        let mut face_counts = FxHashMap::default();

        for (conn_idx, cell_conn) in self.connectivity.iter().enumerate() {
            for local_idx in 0..cell_conn.num_faces() {
                if let Some(face_conn) = cell_conn.get_face_connectivity(local_idx) {
                    let key = sorted_indices(&face_conn);
                    *face_counts.entry(key.clone()).or_insert(0usize) += 1;
                    face_info.push((key, face_conn, conn_idx, local_idx));
                }
            }
        }

        face_info
            .into_iter()
            .filter(|(key, _, _, _)| face_counts.get(key) == Some(&1))
            .map(|(_, face_conn, conn_idx, local_idx)| (face_conn, conn_idx, local_idx))
            .collect()
    }

    /// Returns a sorted list of vertices that are determined to be on the boundary.
    ///
    /// A vertex is considered to be a part of the boundary if it belongs to a boundary face.
    pub fn find_boundary_vertices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for (connectivity, _, _) in self.find_boundary_faces() {
            indices.extend(connectivity.vertex_indices());
        }
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The boundary id of the face with the given connectivity.
    pub fn boundary_id(&self, face: &impl Connectivity) -> usize {
        self.boundary_ids
            .get(&sorted_indices(face))
            .copied()
            .unwrap_or(DEFAULT_BOUNDARY_ID)
    }

    /// Sets the boundary id of the face consisting of the given vertices.
    pub fn set_boundary_id(&mut self, face_vertices: &[usize], boundary_id: usize) {
        let mut key = face_vertices.to_vec();
        key.sort_unstable();
        self.boundary_ids.insert(key, boundary_id);
    }
}

impl<T, D, C> Mesh<T, D, C>
where
    T: Real,
    D: SmallDim,
    C: Connectivity,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// Assigns a boundary id to each boundary face, computed from the centroid of the face.
    pub fn assign_boundary_ids(&mut self, boundary_id: impl Fn(&OPoint<T, D>) -> usize) {
        for (face, _, _) in self.find_boundary_faces() {
            let indices = face.vertex_indices();
            let sum = indices
                .iter()
                .fold(OVector::<T, D>::zeros(), |sum, &v| sum + &self.vertices[v].coords);
            let centroid = OPoint::from(sum / T::from_usize(indices.len()).expect("Must be able to fit usize in T"));
            self.set_boundary_id(indices, boundary_id(&centroid));
        }
    }

    /// Returns the finite element associated with the given cell.
    pub fn cell_element(&self, cell: usize) -> Option<C::Element>
    where
        C: ElementConnectivity<T, ReferenceDim = D>,
    {
        self.connectivity.get(cell)?.element(&self.vertices)
    }
}

fn sorted_indices(conn: &impl Connectivity) -> Vec<usize> {
    let mut indices = conn.vertex_indices().to_vec();
    indices.sort_unstable();
    indices
}
