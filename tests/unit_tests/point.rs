use fenris_vector_tools::dofs::{ComponentMask, DofHandler};
use fenris_vector_tools::error::Error;
use fenris_vector_tools::field::{field_fn, scalar_field_fn, ConstantField};
use fenris_vector_tools::interpolate::interpolate;
use fenris_vector_tools::mesh::procedural::{
    create_interval_mesh, create_unit_square_uniform_quad_mesh_2d, create_unit_square_uniform_tri_mesh_2d,
};
use fenris_vector_tools::partition::CellPartition;
use fenris_vector_tools::point::{point_difference, point_gradient, point_value, PointEvaluator};
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, Point1, Point2, Vector2};

fn linear(x: &Point2<f64>) -> f64 {
    1.0 + 2.0 * x.x - 3.0 * x.y
}

#[test]
fn point_value_of_interpolated_linear_field_on_triangles() {
    let mesh = create_unit_square_uniform_tri_mesh_2d(4);
    let dofs = DofHandler::new(&mesh, 1);
    let mut u = DVector::zeros(dofs.num_dofs());
    interpolate(&dofs, &scalar_field_fn(linear), &mut u, &ComponentMask::all()).unwrap();

    let evaluator = PointEvaluator::new(&dofs);
    let points = [
        Point2::new(0.3, 0.7),
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.5, 0.125),
        Point2::new(0.9, 0.05),
    ];
    for x in &points {
        let value = evaluator.value(&u, x).unwrap();
        assert_eq!(value.len(), 1);
        assert_scalar_eq!(value[0], linear(x), comp = abs, tol = 1e-12);

        let gradient = evaluator.gradient(&u, x).unwrap();
        assert_eq!(gradient.ncols(), 1);
        assert_scalar_eq!(gradient[(0, 0)], 2.0, comp = abs, tol = 1e-10);
        assert_scalar_eq!(gradient[(1, 0)], -3.0, comp = abs, tol = 1e-10);
    }
}

#[test]
fn point_value_of_vector_field_on_quads() {
    let mesh = create_unit_square_uniform_quad_mesh_2d(3);
    let dofs = DofHandler::new(&mesh, 2);
    let f = field_fn(2, |x: &Point2<f64>| DVector::from_vec(vec![x.x + x.y, 4.0 - x.x]));
    let mut u = DVector::zeros(dofs.num_dofs());
    interpolate(&dofs, &f, &mut u, &ComponentMask::all()).unwrap();

    let x = Point2::new(0.2, 0.55);
    let value = point_value(&dofs, &u, &x).unwrap();
    assert_scalar_eq!(value[0], 0.75, comp = abs, tol = 1e-12);
    assert_scalar_eq!(value[1], 3.8, comp = abs, tol = 1e-12);

    let gradient = point_gradient(&dofs, &u, &x).unwrap();
    assert_eq!(gradient.shape(), (2, 2));
    assert_scalar_eq!(gradient[(0, 0)], 1.0, comp = abs, tol = 1e-10);
    assert_scalar_eq!(gradient[(1, 0)], 1.0, comp = abs, tol = 1e-10);
    assert_scalar_eq!(gradient[(0, 1)], -1.0, comp = abs, tol = 1e-10);
    assert_scalar_eq!(gradient[(1, 1)], 0.0, comp = abs, tol = 1e-10);

    let difference = point_difference(&dofs, &u, &f, &x).unwrap();
    assert!(difference.amax() < 1e-12);
}

#[test]
fn point_outside_mesh_is_not_found() {
    let mesh = create_unit_square_uniform_quad_mesh_2d(2);
    let dofs = DofHandler::new(&mesh, 1);
    let u = DVector::zeros(dofs.num_dofs());
    assert!(matches!(
        point_value(&dofs, &u, &Point2::new(1.5, 0.5)),
        Err(Error::PointNotFound)
    ));
    assert!(matches!(
        point_value(&dofs, &u, &Point2::new(0.5, -0.25)),
        Err(Error::PointNotFound)
    ));
}

#[test]
fn point_in_cell_of_other_process_is_not_available() {
    let mesh = create_interval_mesh(0.0, 1.0, 2);
    let partition = CellPartition::from_owners(0, 2, vec![0, 1]);
    let dofs = DofHandler::with_partition(&mesh, 1, partition);
    let u = DVector::from_vec(vec![1.0, 2.0, 3.0]);

    let evaluator = PointEvaluator::new(&dofs);
    assert!(matches!(
        evaluator.value(&u, &Point1::new(0.75)),
        Err(Error::PointNotAvailableHere { cell: 1 })
    ));

    // The shared vertex also belongs to the owned cell
    let (cell, _) = evaluator.locate(&Point1::new(0.5)).unwrap();
    assert_eq!(cell, 0);
    let value = evaluator.value(&u, &Point1::new(0.5)).unwrap();
    assert_scalar_eq!(value[0], 2.0, comp = abs, tol = 1e-12);
    let value = evaluator.value(&u, &Point1::new(0.25)).unwrap();
    assert_scalar_eq!(value[0], 1.5, comp = abs, tol = 1e-12);

    let exact = scalar_field_fn(|x: &Point1<f64>| 1.0 + 2.0 * x.x);
    let difference = point_difference(&dofs, &u, &exact, &Point1::new(0.1)).unwrap();
    assert_scalar_eq!(difference[0], 0.0, comp = abs, tol = 1e-12);
}

#[test]
fn point_evaluation_validates_arguments() {
    let mesh = create_unit_square_uniform_tri_mesh_2d(2);
    let dofs = DofHandler::new(&mesh, 1);
    let x = Point2::new(0.5, 0.5);

    let too_short = DVector::zeros(3);
    assert!(matches!(
        point_value(&dofs, &too_short, &x),
        Err(Error::VectorLengthMismatch {
            expected: 9,
            actual: 3
        })
    ));

    let u = DVector::zeros(dofs.num_dofs());
    let exact = ConstantField::new(DVector::from_vec(vec![1.0, 2.0]));
    assert!(matches!(
        point_difference(&dofs, &u, &exact, &x),
        Err(Error::ComponentMismatch { expected: 1, actual: 2 })
    ));
}

#[test]
fn locate_returns_reference_coordinates() {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(1);
    let dofs = DofHandler::new(&mesh, 1);
    let evaluator = PointEvaluator::new(&dofs);
    let (cell, xi) = evaluator.locate(&Point2::new(0.5, 0.5)).unwrap();
    assert_eq!(cell, 0);
    assert!(xi.coords.norm() < 1e-12);

    let (_, xi) = evaluator.locate(&Point2::new(0.75, 0.5)).unwrap();
    assert_scalar_eq!(xi.coords.dot(&Vector2::new(1.0, 0.0)).abs(), 0.5, comp = abs, tol = 1e-12);
}
