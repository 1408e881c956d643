use fenris_vector_tools::boundary::{
    create_boundary_right_hand_side, interpolate_boundary_values, interpolate_boundary_values_into,
    project_boundary_values, BoundaryFieldMap,
};
use fenris_vector_tools::cg::CgSettings;
use fenris_vector_tools::constraints::AffineConstraints;
use fenris_vector_tools::dofs::{ComponentMask, DofHandler};
use fenris_vector_tools::error::Error;
use fenris_vector_tools::field::{field_fn, scalar_field_fn, ConstantField};
use fenris_vector_tools::mesh::procedural::{
    create_interval_mesh, create_unit_box_uniform_tet_mesh_3d, create_unit_square_uniform_quad_mesh_2d,
    create_unit_square_uniform_tri_mesh_2d,
};
use fenris_vector_tools::partition::CellPartition;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, Point2, Point3, U1, U2, U3};
use std::collections::{BTreeMap, BTreeSet};

#[test]
fn interval_boundary_values_by_id() {
    let mesh = create_interval_mesh(0.0, 1.0, 4);
    let dofs = DofHandler::new(&mesh, 1);
    let left = ConstantField::scalar(1.0);
    let right = ConstantField::scalar(2.0);
    let mut functions: BoundaryFieldMap<f64, U1> = BTreeMap::new();
    functions.insert(0, &left);
    functions.insert(1, &right);

    let values = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(values, BTreeMap::from([(0, 1.0), (4, 2.0)]));

    // Only the right end
    functions.remove(&0);
    let values = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(values, BTreeMap::from([(4, 2.0)]));
}

#[test]
fn boundary_values_of_quad_mesh() {
    let mesh = create_unit_square_uniform_quad_mesh_2d(2);
    let dofs = DofHandler::new(&mesh, 1);
    let f = scalar_field_fn(|x: &Point2<f64>| x.x + 10.0 * x.y);
    let mut functions: BoundaryFieldMap<f64, U2> = BTreeMap::new();
    functions.insert(0, &f);

    let values = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(values.len(), 8);
    let boundary_vertices = mesh.find_boundary_vertices();
    for (&dof, &value) in &values {
        assert!(boundary_vertices.contains(&dof));
        let x = mesh.vertices()[dof];
        assert_eq!(value, x.x + 10.0 * x.y);
    }
}

#[test]
fn larger_boundary_id_wins_at_shared_vertices() {
    let mut mesh = create_unit_square_uniform_quad_mesh_2d(2);
    mesh.assign_boundary_ids(|centroid| if centroid.x > 1.0 - 1e-12 { 1 } else { 0 });
    let dofs = DofHandler::new(&mesh, 1);
    let zero = ConstantField::scalar(0.0);
    let three = ConstantField::scalar(3.0);

    let mut functions: BoundaryFieldMap<f64, U2> = BTreeMap::new();
    functions.insert(1, &three);
    let values = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(values.len(), 3);
    for &dof in values.keys() {
        assert_eq!(mesh.vertices()[dof].x, 1.0);
    }

    functions.insert(0, &zero);
    let values = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(values.len(), 8);
    assert_eq!(values.values().filter(|&&v| v == 3.0).count(), 3);
}

#[test]
fn boundary_values_respect_component_mask() {
    let mesh = create_interval_mesh(0.0, 1.0, 2);
    let dofs = DofHandler::new(&mesh, 2);
    let f = ConstantField::new(DVector::from_vec(vec![4.0, 5.0]));
    let mut functions: BoundaryFieldMap<f64, U1> = BTreeMap::new();
    functions.insert(1, &f);

    let mask = ComponentMask::from_components(2, &[1]);
    let values = interpolate_boundary_values(&dofs, &functions, &mask).unwrap();
    assert_eq!(values, BTreeMap::from([(5, 5.0)]));

    let values = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(values, BTreeMap::from([(4, 4.0), (5, 5.0)]));

    let scalar = ConstantField::scalar(1.0);
    functions.insert(0, &scalar);
    assert!(matches!(
        interpolate_boundary_values(&dofs, &functions, &mask),
        Err(Error::ComponentMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn boundary_values_only_on_owned_cells() {
    let mesh = create_interval_mesh(0.0, 1.0, 2);
    let partition = CellPartition::from_owners(0, 2, vec![0, 1]);
    let dofs = DofHandler::with_partition(&mesh, 1, partition);
    let one = ConstantField::scalar(1.0);
    let mut functions: BoundaryFieldMap<f64, U1> = BTreeMap::new();
    functions.insert(0, &one);
    functions.insert(1, &one);

    let values = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(values, BTreeMap::from([(0, 1.0)]));
}

#[test]
fn boundary_values_into_constraints_keep_existing_lines() {
    let mesh = create_interval_mesh(0.0, 1.0, 3);
    let dofs = DofHandler::new(&mesh, 1);
    let left = ConstantField::scalar(-1.0);
    let right = ConstantField::scalar(1.0);
    let mut functions: BoundaryFieldMap<f64, U1> = BTreeMap::new();
    functions.insert(0, &left);
    functions.insert(1, &right);

    let mut constraints = AffineConstraints::new();
    constraints.add_line(3);
    constraints.set_inhomogeneity(3, 42.0);
    interpolate_boundary_values_into(&dofs, &functions, &ComponentMask::all(), &mut constraints).unwrap();

    assert_eq!(constraints.num_constraints(), 2);
    assert_eq!(constraints.line(0).unwrap().inhomogeneity, -1.0);
    assert_eq!(constraints.line(3).unwrap().inhomogeneity, 42.0);
    assert!(constraints.line(0).unwrap().entries.is_empty());

    constraints.close().unwrap();
    let mut u = DVector::zeros(4);
    constraints.distribute(&mut u);
    assert_eq!(u, DVector::from_vec(vec![-1.0, 0.0, 0.0, 42.0]));
}

#[test]
fn boundary_right_hand_side_of_unit_square() {
    let mut mesh = create_unit_square_uniform_quad_mesh_2d(3);
    let dofs = DofHandler::new(&mesh, 1);
    let one = ConstantField::scalar(1.0);
    let rhs = create_boundary_right_hand_side(&dofs, &one, 1, &BTreeSet::new()).unwrap();
    // The traces of the basis functions sum to one on the boundary
    assert_scalar_eq!(rhs.sum(), 4.0, comp = abs, tol = 1e-12);
    let boundary_vertices = mesh.find_boundary_vertices();
    for v in 0..mesh.num_vertices() {
        if !boundary_vertices.contains(&v) {
            assert_eq!(rhs[v], 0.0);
        }
    }

    let x = scalar_field_fn(|p: &Point2<f64>| p.x);
    let rhs = create_boundary_right_hand_side(&dofs, &x, 1, &BTreeSet::new()).unwrap();
    assert_scalar_eq!(rhs.sum(), 2.0, comp = abs, tol = 1e-12);

    // Only the right side
    mesh.assign_boundary_ids(|centroid| if centroid.x > 1.0 - 1e-12 { 1 } else { 0 });
    let dofs = DofHandler::new(&mesh, 1);
    let rhs = create_boundary_right_hand_side(&dofs, &one, 1, &BTreeSet::from([1])).unwrap();
    assert_scalar_eq!(rhs.sum(), 1.0, comp = abs, tol = 1e-12);
    for (v, vertex) in mesh.vertices().iter().enumerate() {
        if vertex.x < 1.0 {
            assert_eq!(rhs[v], 0.0);
        }
    }
}

#[test]
fn boundary_right_hand_side_of_interval_is_point_value() {
    let mesh = create_interval_mesh(0.0, 2.0, 4);
    let dofs = DofHandler::new(&mesh, 2);
    let f = field_fn(2, |x: &nalgebra::Point1<f64>| DVector::from_vec(vec![x.x + 1.0, -x.x]));
    let rhs = create_boundary_right_hand_side(&dofs, &f, 3, &BTreeSet::new()).unwrap();
    let mut expected = DVector::zeros(10);
    expected[0] = 1.0;
    expected[8] = 3.0;
    expected[9] = -2.0;
    assert_eq!(rhs, expected);

    let scalar = ConstantField::scalar(1.0);
    assert!(matches!(
        create_boundary_right_hand_side(&dofs, &scalar, 3, &BTreeSet::new()),
        Err(Error::ComponentMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn boundary_right_hand_side_of_unit_box() {
    let mesh = create_unit_box_uniform_tet_mesh_3d(2);
    let dofs = DofHandler::new(&mesh, 1);
    let f = scalar_field_fn(|x: &Point3<f64>| x.x * x.y);
    let rhs = create_boundary_right_hand_side(&dofs, &f, 2, &BTreeSet::new()).unwrap();
    // The faces x = 1 and y = 1 contribute 1/2 each, the faces z = 0 and z = 1 contribute 1/4 each
    assert_scalar_eq!(rhs.sum(), 1.5, comp = abs, tol = 1e-12);
}

#[test]
fn projected_boundary_values_reproduce_linear_fields() {
    let mesh = create_unit_square_uniform_tri_mesh_2d(3);
    let dofs = DofHandler::new(&mesh, 1);
    let f = scalar_field_fn(|x: &Point2<f64>| 2.0 * x.x - 3.0 * x.y + 0.5);
    let mut functions: BoundaryFieldMap<f64, U2> = BTreeMap::new();
    functions.insert(0, &f);

    let projected = project_boundary_values(&dofs, &functions, 2, &CgSettings::default()).unwrap();
    let interpolated = interpolate_boundary_values(&dofs, &functions, &ComponentMask::all()).unwrap();
    assert_eq!(projected.len(), interpolated.len());
    for (dof, value) in &interpolated {
        assert_scalar_eq!(projected[dof], *value, comp = abs, tol = 1e-9);
    }
}

#[test]
fn projected_boundary_values_preserve_boundary_integral() {
    let mesh = create_unit_box_uniform_tet_mesh_3d(2);
    let dofs = DofHandler::new(&mesh, 1);
    let f = scalar_field_fn(|x: &Point3<f64>| x.x * x.x);
    let mut functions: BoundaryFieldMap<f64, U3> = BTreeMap::new();
    functions.insert(0, &f);

    let projected = project_boundary_values(&dofs, &functions, 2, &CgSettings::default()).unwrap();
    assert_eq!(projected.len(), mesh.find_boundary_vertices().len());

    // The projection preserves the boundary integral of the field
    let one = ConstantField::scalar(1.0);
    let weights = create_boundary_right_hand_side(&dofs, &one, 2, &BTreeSet::new()).unwrap();
    let projected_integral: f64 = projected.iter().map(|(&dof, &value)| weights[dof] * value).sum();
    // Faces x = 0 and x = 1 contribute 0 and 1, the other four faces 1/3 each
    assert_scalar_eq!(projected_integral, 1.0 + 4.0 / 3.0, comp = abs, tol = 1e-9);
}

#[test]
fn projected_boundary_values_require_local_mesh() {
    let mesh = create_interval_mesh(0.0, 1.0, 2);
    let dofs = DofHandler::with_partition(&mesh, 1, CellPartition::from_owners(0, 2, vec![0, 1]));
    let one = ConstantField::scalar(1.0);
    let mut functions: BoundaryFieldMap<f64, U1> = BTreeMap::new();
    functions.insert(0, &one);
    assert!(matches!(
        project_boundary_values(&dofs, &functions, 2, &CgSettings::default()),
        Err(Error::DistributedNotSupported { .. })
    ));

    // Only the left end point with value one
    let dofs = DofHandler::new(&mesh, 1);
    let values = project_boundary_values(&dofs, &functions, 2, &CgSettings::default()).unwrap();
    assert_eq!(values.len(), 1);
    assert_scalar_eq!(values[&0], 1.0, comp = abs, tol = 1e-12);
}
