//! Basic procedural mesh generation routines.
use crate::connectivity::{Quad4d2Connectivity, Segment2d1Connectivity, Tet4Connectivity, Tri3d2Connectivity};
use crate::mesh::{IntervalMesh, QuadMesh2d, Tet4Mesh, TriangleMesh2d};
use crate::Real;
use nalgebra::{Point1, Point2, Point3, Vector2};

/// Boundary id of the left end of an interval mesh.
pub const INTERVAL_LEFT_BOUNDARY_ID: usize = 0;
/// Boundary id of the right end of an interval mesh.
pub const INTERVAL_RIGHT_BOUNDARY_ID: usize = 1;

/// Uniform subdivision of the interval [a, b] into `num_cells` segments.
///
/// The left end point has boundary id [`INTERVAL_LEFT_BOUNDARY_ID`] and the right end point
/// [`INTERVAL_RIGHT_BOUNDARY_ID`].
pub fn create_interval_mesh<T: Real>(a: T, b: T, num_cells: usize) -> IntervalMesh<T> {
    assert!(num_cells > 0, "Need at least one cell.");
    let h = (b - a) / T::from_usize(num_cells).expect("Must be able to fit usize in T");
    let vertices = (0..=num_cells)
        .map(|i| Point1::new(a + h * T::from_usize(i).expect("Must be able to fit usize in T")))
        .collect();
    let cells = (0..num_cells)
        .map(|i| Segment2d1Connectivity([i, i + 1]))
        .collect();

    let mut mesh = IntervalMesh::from_vertices_and_connectivity(vertices, cells);
    mesh.set_boundary_id(&[0], INTERVAL_LEFT_BOUNDARY_ID);
    mesh.set_boundary_id(&[num_cells], INTERVAL_RIGHT_BOUNDARY_ID);
    mesh
}

pub fn create_unit_square_uniform_quad_mesh_2d<T>(cells_per_dim: usize) -> QuadMesh2d<T>
where
    T: Real,
{
    create_rectangular_uniform_quad_mesh_2d(T::one(), 1, 1, cells_per_dim, &Vector2::new(T::zero(), T::one()))
}

pub fn create_unit_square_uniform_tri_mesh_2d<T>(cells_per_dim: usize) -> TriangleMesh2d<T>
where
    T: Real,
{
    split_quads_into_triangles(&create_unit_square_uniform_quad_mesh_2d(cells_per_dim))
}

/// Generates an axis-aligned rectangular uniform mesh given a unit length,
/// dimensions as multipliers of the unit length and the number of cells per unit length.
pub fn create_rectangular_uniform_quad_mesh_2d<T>(
    unit_length: T,
    units_x: usize,
    units_y: usize,
    cells_per_unit: usize,
    top_left: &Vector2<T>,
) -> QuadMesh2d<T>
where
    T: Real,
{
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 {
        return QuadMesh2d::from_vertices_and_connectivity(Vec::new(), Vec::new());
    }

    let mut vertices = Vec::new();
    let mut cells = Vec::new();

    let cell_size = unit_length / T::from_usize(cells_per_unit).expect("Must be able to fit usize in T");
    let num_cells_x = units_x * cells_per_unit;
    let num_cells_y = units_y * cells_per_unit;

    let to_global_vertex_index = |i, j| (num_cells_x + 1) * j + i;

    for j in 0..=num_cells_y {
        for i in 0..=num_cells_x {
            let i_as_t = T::from_usize(i).expect("Must be able to fit usize in T");
            let j_as_t = T::from_usize(j).expect("Must be able to fit usize in T");
            let v = top_left + Vector2::new(i_as_t, -j_as_t) * cell_size;
            vertices.push(Point2::from(v));
        }
    }

    for j in 0..num_cells_y {
        for i in 0..num_cells_x {
            cells.push(Quad4d2Connectivity([
                to_global_vertex_index(i, j + 1),
                to_global_vertex_index(i + 1, j + 1),
                to_global_vertex_index(i + 1, j),
                to_global_vertex_index(i, j),
            ]));
        }
    }

    QuadMesh2d::from_vertices_and_connectivity(vertices, cells)
}

/// Splits every quadrilateral along its 0-2 diagonal into two counter-clockwise triangles.
///
/// Material ids are inherited by both triangles.
pub fn split_quads_into_triangles<T: Real>(mesh: &QuadMesh2d<T>) -> TriangleMesh2d<T> {
    let mut triangles = Vec::with_capacity(2 * mesh.num_cells());
    let mut material_ids = Vec::with_capacity(2 * mesh.num_cells());
    for (Quad4d2Connectivity([a, b, c, d]), &material_id) in mesh.connectivity().iter().zip(mesh.material_ids()) {
        triangles.push(Tri3d2Connectivity([*a, *b, *c]));
        triangles.push(Tri3d2Connectivity([*a, *c, *d]));
        material_ids.extend([material_id, material_id]);
    }
    TriangleMesh2d::from_vertices_and_connectivity(mesh.vertices().to_vec(), triangles).with_material_ids(material_ids)
}

/// A uniform tetrahedral mesh of the unit cube [0, 1]^3.
///
/// Each of the `cells_per_dim^3` sub-cubes is split into six positively oriented tetrahedra
/// sharing the diagonal from its lowest to its highest corner, which yields a conforming mesh.
pub fn create_unit_box_uniform_tet_mesh_3d<T: Real>(cells_per_dim: usize) -> Tet4Mesh<T> {
    let n = cells_per_dim;
    if n == 0 {
        return Tet4Mesh::from_vertices_and_connectivity(Vec::new(), Vec::new());
    }

    let h = T::one() / T::from_usize(n).expect("Must be able to fit usize in T");
    let coord = |i: usize| T::from_usize(i).expect("Must be able to fit usize in T") * h;
    let vertex_index = |i: usize, j: usize, k: usize| (n + 1) * (n + 1) * k + (n + 1) * j + i;

    let mut vertices = Vec::with_capacity((n + 1) * (n + 1) * (n + 1));
    for k in 0..=n {
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(coord(i), coord(j), coord(k)));
            }
        }
    }

    // Axis orderings of the paths from corner (0, 0, 0) to corner (1, 1, 1), with their parity
    let paths = [
        ([0, 1, 2], true),
        ([1, 2, 0], true),
        ([2, 0, 1], true),
        ([0, 2, 1], false),
        ([2, 1, 0], false),
        ([1, 0, 2], false),
    ];

    let mut cells = Vec::with_capacity(6 * n * n * n);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                for (axes, even) in &paths {
                    let mut offset = [0, 0, 0];
                    let mut path = [0; 4];
                    path[0] = vertex_index(i, j, k);
                    for (step, &axis) in axes.iter().enumerate() {
                        offset[axis] = 1;
                        path[step + 1] = vertex_index(i + offset[0], j + offset[1], k + offset[2]);
                    }
                    if !even {
                        path.swap(1, 2);
                    }
                    cells.push(Tet4Connectivity(path));
                }
            }
        }
    }

    Tet4Mesh::from_vertices_and_connectivity(vertices, cells)
}
