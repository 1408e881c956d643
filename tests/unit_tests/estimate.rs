use fenris_vector_tools::communicator::{LocalCommunicator, SerialCommunicator};
use fenris_vector_tools::dofs::{ComponentMask, DofHandler};
use fenris_vector_tools::element::ElementConnectivity;
use fenris_vector_tools::error::Error;
use fenris_vector_tools::estimate::{integrate_difference, par_integrate_difference, Weight};
use fenris_vector_tools::field::{field_fn, scalar_field_fn, ComponentSelect, ConstantField, Field, ZeroField};
use fenris_vector_tools::interpolate::interpolate;
use fenris_vector_tools::mesh::procedural::{
    create_interval_mesh, create_unit_box_uniform_tet_mesh_3d, create_unit_square_uniform_quad_mesh_2d,
    create_unit_square_uniform_tri_mesh_2d,
};
use fenris_vector_tools::mesh::Mesh;
use fenris_vector_tools::norm::{compute_global_error, NormType};
use fenris_vector_tools::partition::CellPartition;
use fenris_vector_tools::quadrature::{total_order, Quadrature};
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, Dyn, OMatrix, Point2, Point3, Vector2, Vector3, U2};
use util::run_concurrently;

fn global_error<C>(
    dofs: &DofHandler<f64, U2, C>,
    u_h: &DVector<f64>,
    exact: &(impl Field<f64, U2> + ?Sized),
    norm: NormType,
    weight: Weight<f64, U2>,
    exponent: f64,
) -> f64
where
    C: ElementConnectivity<f64, ReferenceDim = U2>,
{
    let quadrature = total_order::quadrilateral(6);
    let cellwise = integrate_difference(dofs, u_h, exact, &quadrature, norm, weight, exponent).unwrap();
    compute_global_error(dofs.partition(), &cellwise, norm, exponent, &SerialCommunicator).unwrap()
}

fn tri_global_error(
    dofs: &DofHandler<f64, U2, fenris_vector_tools::connectivity::Tri3d2Connectivity>,
    u_h: &DVector<f64>,
    exact: &(impl Field<f64, U2> + ?Sized),
    norm: NormType,
) -> f64 {
    let quadrature = total_order::triangle(6);
    let cellwise = integrate_difference(dofs, u_h, exact, &quadrature, norm, None, 2.0).unwrap();
    compute_global_error(dofs.partition(), &cellwise, norm, 2.0, &SerialCommunicator).unwrap()
}

fn linear_2d() -> impl Field<f64, U2> + Sync {
    scalar_field_fn(|x: &Point2<f64>| 1.0 + 2.0 * x.x - 3.0 * x.y)
        .with_gradient(|_: &Point2<f64>| Vector2::new(2.0, -3.0))
}

fn interpolated<C>(dofs: &DofHandler<f64, U2, C>, f: &impl Field<f64, U2>) -> DVector<f64>
where
    C: ElementConnectivity<f64, ReferenceDim = U2>,
{
    let mut u = DVector::zeros(dofs.num_dofs());
    interpolate(dofs, f, &mut u, &ComponentMask::all()).unwrap();
    u
}

#[test]
fn interpolant_of_linear_function_has_zero_error() {
    let f = linear_2d();
    let tri_mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3);
    let tri_dofs = DofHandler::new(&tri_mesh, 1);
    let u_tri = interpolated(&tri_dofs, &f);
    for norm in [
        NormType::L1Norm,
        NormType::L2Norm,
        NormType::LinftyNorm,
        NormType::H1Seminorm,
        NormType::H1Norm,
        NormType::W1pNorm,
        NormType::W1inftySeminorm,
    ] {
        let error = tri_global_error(&tri_dofs, &u_tri, &f, norm);
        assert_scalar_eq!(error, 0.0, comp = abs, tol = 1e-12);
    }

    let quad_mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(3);
    let quad_dofs = DofHandler::new(&quad_mesh, 1);
    let u_quad = interpolated(&quad_dofs, &f);
    for norm in [NormType::L2Norm, NormType::H1Norm, NormType::W1inftySeminorm] {
        let error = global_error(&quad_dofs, &u_quad, &f, norm, None, 2.0);
        assert_scalar_eq!(error, 0.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn interpolant_of_linear_function_has_zero_error_on_tets() {
    let f = scalar_field_fn(|x: &Point3<f64>| x.x - 2.0 * x.y + 0.5 * x.z)
        .with_gradient(|_: &Point3<f64>| Vector3::new(1.0, -2.0, 0.5));
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let dofs = DofHandler::new(&mesh, 1);
    let mut u_h = DVector::zeros(dofs.num_dofs());
    interpolate(&dofs, &f, &mut u_h, &ComponentMask::all()).unwrap();

    let quadrature = total_order::tetrahedron(4);
    for norm in [NormType::L2Norm, NormType::H1Seminorm] {
        let cellwise = integrate_difference(&dofs, &u_h, &f, &quadrature, norm, None, 2.0).unwrap();
        assert!(cellwise.iter().all(|e| e.abs() <= 1e-12));
    }
}

#[test]
fn norms_of_constant_difference() {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(2);
    let dofs = DofHandler::new(&mesh, 1);
    let u_h = DVector::zeros(dofs.num_dofs());
    let exact = ConstantField::scalar(3.0);

    let expect = |norm, exponent, expected: f64| {
        let error = global_error(&dofs, &u_h, &exact, norm, None, exponent);
        assert_scalar_eq!(error, expected, comp = abs, tol = 1e-12);
    };
    expect(NormType::Mean, 1.0, 3.0);
    expect(NormType::L1Norm, 1.0, 3.0);
    expect(NormType::L2Norm, 2.0, 3.0);
    expect(NormType::LpNorm, 3.0, 3.0);
    expect(NormType::LinftyNorm, 1.0, 3.0);
    expect(NormType::H1Seminorm, 2.0, 0.0);
    expect(NormType::H1Norm, 2.0, 3.0);
    expect(NormType::W1pSeminorm, 3.0, 0.0);
    expect(NormType::W1pNorm, 3.0, 3.0);
}

#[test]
fn mean_is_reference_minus_computed() {
    let mesh = create_interval_mesh(0.0, 3.0, 4);
    let dofs = DofHandler::new(&mesh, 1);
    let u_h = DVector::repeat(dofs.num_dofs(), 2.0);
    let quadrature = total_order::segment(2);
    let cellwise = integrate_difference(&dofs, &u_h, &ZeroField::new(1), &quadrature, NormType::Mean, None, 1.0).unwrap();
    let mean = compute_global_error(dofs.partition(), &cellwise, NormType::Mean, 1.0, &SerialCommunicator).unwrap();
    assert_scalar_eq!(mean, -6.0, comp = abs, tol = 1e-12);
}

#[test]
#[allow(non_snake_case)]
fn norms_of_linear_difference() {
    // e = x on the unit square
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(2);
    let dofs = DofHandler::new(&mesh, 1);
    let u_h = DVector::zeros(dofs.num_dofs());
    let exact = scalar_field_fn(|x: &Point2<f64>| x.x).with_gradient(|_: &Point2<f64>| Vector2::new(1.0, 0.0));

    let L2 = global_error(&dofs, &u_h, &exact, NormType::L2Norm, None, 2.0);
    assert_scalar_eq!(L2, (1.0f64 / 3.0).sqrt(), comp = abs, tol = 1e-12);
    let H1_semi = global_error(&dofs, &u_h, &exact, NormType::H1Seminorm, None, 2.0);
    assert_scalar_eq!(H1_semi, 1.0, comp = abs, tol = 1e-12);
    let H1 = global_error(&dofs, &u_h, &exact, NormType::H1Norm, None, 2.0);
    assert_scalar_eq!(H1, (4.0f64 / 3.0).sqrt(), comp = abs, tol = 1e-12);
    let W1infty_semi = global_error(&dofs, &u_h, &exact, NormType::W1inftySeminorm, None, 2.0);
    assert_scalar_eq!(W1infty_semi, 1.0, comp = abs, tol = 1e-12);
    let L1 = global_error(&dofs, &u_h, &exact, NormType::L1Norm, None, 1.0);
    assert_scalar_eq!(L1, 0.5, comp = abs, tol = 1e-12);

    // Per-cell W1infty norm is the sum of the per-cell Linfty norm and W1infty seminorm
    let quadrature = total_order::quadrilateral(2);
    let cellwise = |norm| integrate_difference(&dofs, &u_h, &exact, &quadrature, norm, None, 1.0).unwrap();
    let sum = cellwise(NormType::LinftyNorm) + cellwise(NormType::W1inftySeminorm);
    let W1infty = cellwise(NormType::W1inftyNorm);
    for (a, b) in W1infty.iter().zip(sum.iter()) {
        assert_scalar_eq!(*a, *b, comp = abs, tol = 1e-14);
    }
}

#[test]
fn weighted_norms() {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(2);
    let dofs = DofHandler::new(&mesh, 2);
    let u_h = DVector::zeros(dofs.num_dofs());
    let exact = ConstantField::new(DVector::from_vec(vec![1.0, 2.0]));

    let select = ComponentSelect::single(2, 1);
    let l2_selected = global_error(&dofs, &u_h, &exact, NormType::L2Norm, Some(&select), 2.0);
    assert_scalar_eq!(l2_selected, 2.0, comp = abs, tol = 1e-12);

    let scalar_weight = ConstantField::scalar(4.0);
    let l2_weighted = global_error(&dofs, &u_h, &exact, NormType::L2Norm, Some(&scalar_weight), 2.0);
    assert_scalar_eq!(l2_weighted, 20.0f64.sqrt(), comp = abs, tol = 1e-12);

    let linfty_weighted = global_error(&dofs, &u_h, &exact, NormType::LinftyNorm, Some(&scalar_weight), 1.0);
    assert_scalar_eq!(linfty_weighted, 8.0, comp = abs, tol = 1e-12);
}

#[test]
fn hdiv_seminorm_of_identity_field() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let dofs = DofHandler::new(&mesh, 2);
    let u_h = DVector::zeros(dofs.num_dofs());
    let exact = field_fn(2, |x: &Point2<f64>| DVector::from_vec(vec![x.x, x.y])).with_gradient(
        |_: &Point2<f64>, gradient: &mut OMatrix<f64, U2, Dyn>| {
            gradient.fill(0.0);
            gradient[(0, 0)] = 1.0;
            gradient[(1, 1)] = 1.0;
        },
    );
    // div e = 2 everywhere
    let hdiv = tri_global_error(&dofs, &u_h, &exact, NormType::HdivSeminorm);
    assert_scalar_eq!(hdiv, 2.0, comp = abs, tol = 1e-12);
    let h1_semi = tri_global_error(&dofs, &u_h, &exact, NormType::H1Seminorm);
    assert_scalar_eq!(h1_semi, 2.0f64.sqrt(), comp = abs, tol = 1e-12);
}

#[test]
fn integrate_difference_rejects_invalid_arguments() {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(2);
    let dofs = DofHandler::new(&mesh, 1);
    let u_h = DVector::zeros(dofs.num_dofs());
    let quadrature = total_order::quadrilateral(2);
    let no_gradient = scalar_field_fn(|x: &Point2<f64>| x.x);
    let integrate = |u_h: &DVector<f64>, exact: &dyn Field<f64, U2>, norm, weight, exponent| {
        integrate_difference(&dofs, u_h, exact, &quadrature, norm, weight, exponent)
    };

    assert!(matches!(
        integrate(&u_h, &no_gradient, NormType::H1Seminorm, None, 2.0),
        Err(Error::GradientUnavailable {
            norm: NormType::H1Seminorm
        })
    ));
    assert!(integrate(&u_h, &no_gradient, NormType::L2Norm, None, 2.0).is_ok());
    assert!(matches!(
        integrate(&u_h, &ZeroField::new(1), NormType::HdivSeminorm, None, 2.0),
        Err(Error::NotEnoughComponents {
            required: 2,
            num_components: 1
        })
    ));
    assert!(matches!(
        integrate(&u_h, &ZeroField::new(2), NormType::L2Norm, None, 2.0),
        Err(Error::ComponentMismatch { expected: 1, actual: 2 })
    ));
    let bad_weight = ZeroField::new(3);
    assert!(matches!(
        integrate(&u_h, &ZeroField::new(1), NormType::L2Norm, Some(&bad_weight), 2.0),
        Err(Error::InvalidWeight {
            num_components: 1,
            weight_components: 3
        })
    ));
    assert!(matches!(
        integrate(&DVector::zeros(3), &ZeroField::new(1), NormType::L2Norm, None, 2.0),
        Err(Error::VectorLengthMismatch {
            expected,
            actual: 3
        }) if expected == dofs.num_dofs()
    ));
    assert!(matches!(
        integrate(&u_h, &ZeroField::new(1), NormType::W1pNorm, None, 0.5),
        Err(Error::InvalidExponent { .. })
    ));
}

#[test]
fn integrate_difference_reports_degenerate_cells() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    // Collapse the first triangle onto a line
    let v = mesh.connectivity()[0].0;
    let (a, b) = (mesh.vertices()[v[0]], mesh.vertices()[v[1]]);
    mesh.vertices_mut()[v[2]] = Point2::from((a.coords + b.coords) / 2.0);

    let dofs = DofHandler::new(&mesh, 1);
    let u_h = DVector::zeros(dofs.num_dofs());
    let quadrature = total_order::triangle(2);
    let result = integrate_difference(&dofs, &u_h, &ZeroField::new(1), &quadrature, NormType::L2Norm, None, 2.0);
    assert!(matches!(result, Err(Error::DegenerateCell { .. })));
}

#[test]
fn parallel_integration_matches_serial() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(5);
    let dofs = DofHandler::new(&mesh, 1);
    let exact = scalar_field_fn(|x: &Point2<f64>| (x.x * 3.0).sin() * x.y)
        .with_gradient(|x: &Point2<f64>| Vector2::new(3.0 * (x.x * 3.0).cos() * x.y, (x.x * 3.0).sin()));
    let u_h = interpolated(&dofs, &linear_2d());
    let quadrature = total_order::triangle(4);

    for norm in NormType::ALL {
        if norm == NormType::HdivSeminorm {
            continue;
        }
        let serial = integrate_difference(&dofs, &u_h, &exact, &quadrature, norm, None, 3.0).unwrap();
        let parallel = par_integrate_difference(&dofs, &u_h, &exact, &quadrature, norm, None, 3.0).unwrap();
        assert_eq!(serial, parallel);
    }
}

#[test]
fn distributed_integration_matches_serial() {
    let num_ranks = 3;
    let mesh: Mesh<f64, U2, _> = create_unit_square_uniform_quad_mesh_2d(4);
    let exact = scalar_field_fn(|x: &Point2<f64>| x.x * x.y).with_gradient(|x: &Point2<f64>| Vector2::new(x.y, x.x));
    let serial_dofs = DofHandler::new(&mesh, 1);
    let u_h = interpolated(&serial_dofs, &linear_2d());
    let quadrature = total_order::quadrilateral(4);

    let serial = integrate_difference(&serial_dofs, &u_h, &exact, &quadrature, NormType::H1Norm, None, 2.0).unwrap();
    let serial_global =
        compute_global_error(serial_dofs.partition(), &serial, NormType::H1Norm, 2.0, &SerialCommunicator).unwrap();

    let comms = LocalCommunicator::create(num_ranks);
    let results = run_concurrently(num_ranks, |rank| {
        let partition = CellPartition::contiguous(mesh.num_cells(), rank, num_ranks);
        let dofs = DofHandler::with_partition(&mesh, 1, partition);
        let cellwise = integrate_difference(&dofs, &u_h, &exact, &quadrature, NormType::H1Norm, None, 2.0).unwrap();
        let global = compute_global_error(dofs.partition(), &cellwise, NormType::H1Norm, 2.0, &comms[rank]).unwrap();
        (cellwise, global)
    });

    let mut summed = DVector::zeros(mesh.num_cells());
    for (rank, (cellwise, global)) in results.iter().enumerate() {
        let partition = CellPartition::contiguous(mesh.num_cells(), rank, num_ranks);
        for cell in 0..mesh.num_cells() {
            if !partition.is_locally_owned(cell) {
                assert_eq!(cellwise[cell], 0.0);
            }
        }
        summed += cellwise;
        assert_scalar_eq!(*global, serial_global, comp = abs, tol = 1e-12);
    }
    assert_eq!(summed, serial);
}

#[test]
fn quadrature_rules_are_usable_by_reference() {
    let mesh = create_interval_mesh(0.0, 1.0, 3);
    let dofs = DofHandler::new(&mesh, 1);
    let u_h = DVector::zeros(dofs.num_dofs());
    let quadrature = total_order::segment(3);
    assert_eq!(quadrature.num_points(), 2);
    let cellwise =
        integrate_difference(&dofs, &u_h, &ConstantField::scalar(1.0), &&quadrature, NormType::L1Norm, None, 1.0)
            .unwrap();
    assert_scalar_eq!(cellwise.sum(), 1.0, comp = abs, tol = 1e-14);
}
