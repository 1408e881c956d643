use fenris_vector_tools::cg::{
    CgSettings, ConjugateGradient, IdentityOperator, JacobiPreconditioner, RelativeResidualCriterion, SolveErrorKind,
};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use util::assert_approx_matrix_eq;

#[test]
fn solve_identity() {
    let mut x = DVector::zeros(4);
    let b = DVector::from_element(4, 5.0);
    ConjugateGradient::with_operator(IdentityOperator)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-12))
        .solve_with_guess(&b, &mut x)
        .unwrap();
    assert_eq!(x, b);
}

#[test]
fn solve_with_zero_right_hand_side_gives_zero() {
    let a = DMatrix::from_fn(3, 3, |r, c| if r == c { 4.0 } else { 1.0 });
    let mut x = DVector::from_element(3, 2.0);
    let output = ConjugateGradient::with_operator(&a)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-12))
        .solve_with_guess(&DVector::zeros(3), &mut x)
        .unwrap();
    assert_eq!(output.num_iterations, 0);
    assert_eq!(x, DVector::zeros(3));
}

#[test]
fn solve_dense_diagonally_dominant() {
    let a = DMatrix::from_fn(3, 3, |r, c| if r == c { 7.0 } else { 2.0 });
    let x0 = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
    let b = &a * &x0;
    let mut x = DVector::zeros(3);
    let output = ConjugateGradient::with_operator(&a)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-14))
        .solve_with_guess(&b, &mut x)
        .unwrap();

    assert!(output.num_iterations > 0 && output.num_iterations <= 3);
    assert_approx_matrix_eq!(&x, &x0, abstol = 1e-12);
}

#[test]
fn solve_sparse_with_jacobi_preconditioner() {
    // 1D Laplacian with Dirichlet conditions, scaled to have a varying diagonal
    let n = 20;
    let mut coo = CooMatrix::new(n, n);
    for i in 0..n {
        let scale = 1.0 + i as f64;
        coo.push(i, i, 2.0 * scale);
        if i + 1 < n {
            coo.push(i, i + 1, -1.0);
            coo.push(i + 1, i, -1.0);
        }
    }
    let a = CsrMatrix::from(&coo);
    let x0 = DVector::from_fn(n, |i, _| (i as f64 * 0.3).sin());
    let b = DMatrix::from(&a) * &x0;

    let preconditioner = JacobiPreconditioner::from_csr(&a);
    assert_eq!(preconditioner.inverse_diagonal()[1], 0.25);

    let mut x = DVector::zeros(n);
    let output = ConjugateGradient::with_operator(&a)
        .with_preconditioner(preconditioner)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-13))
        .solve_with_guess(&b, &mut x)
        .unwrap();
    assert!(output.num_iterations <= n);
    assert_approx_matrix_eq!(&x, &x0, abstol = 1e-10);
}

#[test]
fn max_iterations_reached() {
    let a = DMatrix::from_fn(5, 5, |r, c| if r == c { 10.0 + r as f64 } else { 1.0 });
    let b = DVector::from_element(5, 1.0);
    let mut x = DVector::zeros(5);
    let err = ConjugateGradient::with_operator(&a)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-14))
        .with_max_iter(Some(1))
        .solve_with_guess(&b, &mut x)
        .unwrap_err();
    assert_eq!(err.output.num_iterations, 1);
    assert!(matches!(err.kind, SolveErrorKind::MaxIterationsReached { max_iter: 1 }));
}

#[test]
fn indefinite_operator_is_detected() {
    let a = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, -1.0]));
    let b = DVector::from_vec(vec![0.0, 1.0]);
    let mut x = DVector::zeros(2);
    let err = ConjugateGradient::with_operator(&a)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-12))
        .solve_with_guess(&b, &mut x)
        .unwrap_err();
    assert!(matches!(err.kind, SolveErrorKind::IndefiniteOperator));
}

#[test]
fn cg_settings_defaults() {
    let settings: CgSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, CgSettings::default());
    assert_eq!(settings.tolerance, 1e-12);
    assert_eq!(settings.max_iterations, Some(10_000));
}
