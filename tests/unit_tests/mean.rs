use fenris_vector_tools::communicator::{LocalCommunicator, SerialCommunicator};
use fenris_vector_tools::dofs::{ComponentMask, DofHandler};
use fenris_vector_tools::error::Error;
use fenris_vector_tools::field::{field_fn, scalar_field_fn};
use fenris_vector_tools::interpolate::interpolate;
use fenris_vector_tools::mean::{compute_mean_value, subtract_mean_value};
use fenris_vector_tools::mesh::procedural::{create_interval_mesh, create_unit_square_uniform_tri_mesh_2d};
use fenris_vector_tools::partition::CellPartition;
use fenris_vector_tools::quadrature::total_order;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DVector, Point1, Point2};
use util::{assert_panics, run_concurrently};

#[test]
fn mean_value_of_constant_and_linear_fields() {
    let mesh = create_interval_mesh(0.0, 2.0, 4);
    let dofs = DofHandler::new(&mesh, 1);
    let quadrature = total_order::segment(2);

    let constant = DVector::from_element(5, 3.0);
    let mean = compute_mean_value(&dofs, &quadrature, &constant, 0, &SerialCommunicator).unwrap();
    assert_scalar_eq!(mean, 3.0, comp = abs, tol = 1e-14);

    let mut linear = DVector::zeros(5);
    interpolate(&dofs, &scalar_field_fn(|x: &Point1<f64>| x.x), &mut linear, &ComponentMask::all()).unwrap();
    let mean = compute_mean_value(&dofs, &quadrature, &linear, 0, &SerialCommunicator).unwrap();
    assert_scalar_eq!(mean, 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn mean_value_of_single_component() {
    let mesh = create_unit_square_uniform_tri_mesh_2d(3);
    let dofs = DofHandler::new(&mesh, 2);
    let f = field_fn(2, |x: &Point2<f64>| DVector::from_vec(vec![x.x, 5.0 + x.y]));
    let mut u = DVector::zeros(dofs.num_dofs());
    interpolate(&dofs, &f, &mut u, &ComponentMask::all()).unwrap();

    let quadrature = total_order::triangle(2);
    let mean_x = compute_mean_value(&dofs, &quadrature, &u, 0, &SerialCommunicator).unwrap();
    let mean_y = compute_mean_value(&dofs, &quadrature, &u, 1, &SerialCommunicator).unwrap();
    assert_scalar_eq!(mean_x, 0.5, comp = abs, tol = 1e-12);
    assert_scalar_eq!(mean_y, 5.5, comp = abs, tol = 1e-12);

    assert!(matches!(
        compute_mean_value(&dofs, &quadrature, &u, 2, &SerialCommunicator),
        Err(Error::NotEnoughComponents {
            required: 3,
            num_components: 2
        })
    ));
}

#[test]
fn mean_value_distributed_agrees_with_serial() {
    let num_ranks = 2;
    let mesh = create_interval_mesh(0.0, 1.0, 5);
    let quadrature = total_order::segment(4);
    let mut u = DVector::zeros(6);
    let serial_dofs = DofHandler::new(&mesh, 1);
    interpolate(
        &serial_dofs,
        &scalar_field_fn(|x: &Point1<f64>| x.x * x.x),
        &mut u,
        &ComponentMask::all(),
    )
    .unwrap();
    let expected = compute_mean_value(&serial_dofs, &quadrature, &u, 0, &SerialCommunicator).unwrap();

    let comms = LocalCommunicator::create(num_ranks);
    let results = run_concurrently(num_ranks, |rank| {
        let partition = CellPartition::contiguous(mesh.num_cells(), rank, num_ranks);
        let dofs = DofHandler::with_partition(&mesh, 1, partition);
        compute_mean_value(&dofs, &quadrature, &u, 0, &comms[rank])
    });
    for result in results {
        assert_scalar_eq!(result.unwrap(), expected, comp = abs, tol = 1e-14);
    }
}

#[test]
fn distributed_mean_value_fails_on_every_rank() {
    let num_ranks = 2;
    let mesh = create_interval_mesh(0.0, 1.0, 4);
    let quadrature = total_order::segment(2);
    let comms = LocalCommunicator::create(num_ranks);
    let results = run_concurrently(num_ranks, |rank| {
        let partition = CellPartition::contiguous(mesh.num_cells(), rank, num_ranks);
        let dofs = DofHandler::with_partition(&mesh, 1, partition);
        let u = DVector::zeros(if rank == 0 { 3 } else { 5 });
        compute_mean_value(&dofs, &quadrature, &u, 0, &comms[rank])
    });
    assert!(matches!(results[0], Err(Error::VectorLengthMismatch { expected: 5, actual: 3 })));
    assert!(matches!(results[1], Err(Error::FailedOnOtherRank)));
}

#[test]
fn subtract_mean_value_of_all_entries() {
    let mut v = DVector::from_vec(vec![1.0, 2.0, 3.0, 6.0]);
    subtract_mean_value(&mut v, &[]);
    assert_matrix_eq!(v, DVector::from_vec(vec![-2.0, -1.0, 0.0, 3.0]));
    assert_scalar_eq!(v.sum(), 0.0);
}

#[test]
fn subtract_mean_value_of_selected_entries() {
    let mut v = DVector::from_vec(vec![1.0, 2.0, 3.0, 6.0]);
    subtract_mean_value(&mut v, &[true, false, true, false]);
    assert_matrix_eq!(v, DVector::from_vec(vec![-1.0, 2.0, 1.0, 6.0]));

    let mut w = DVector::from_vec(vec![1.0, 2.0]);
    subtract_mean_value(&mut w, &[false, false]);
    assert_matrix_eq!(w, DVector::from_vec(vec![1.0, 2.0]));

    assert_panics!({
        let mut v = DVector::from_vec(vec![1.0, 2.0]);
        subtract_mean_value(&mut v, &[true]);
    });
}
