//! Preconditioned conjugate gradient solver for symmetric positive definite operators.
use crate::Real;
use core::fmt;
use log::debug;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::error::Error;

pub trait LinearOperator<T: Real> {
    /// y = Ax
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Real,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }
}

impl<T: Real> LinearOperator<T> for DMatrix<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        y.gemv(T::one(), self, &x, T::zero());
        Ok(())
    }
}

impl<T: Real> LinearOperator<T> for CsrMatrix<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        spmm_csr_dense(T::zero(), &mut y, T::one(), Op::NoOp(self), Op::NoOp(&x));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityOperator;

impl<T: Real> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        y.copy_from(&x);
        Ok(())
    }
}

/// Diagonal preconditioner with the inverse diagonal of a matrix.
///
/// Zero diagonal entries are replaced by one.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner<T: Real> {
    inverse_diagonal: DVector<T>,
}

impl<T: Real> JacobiPreconditioner<T> {
    pub fn from_csr(matrix: &CsrMatrix<T>) -> Self {
        let mut inverse_diagonal = DVector::repeat(matrix.nrows(), T::one());
        for (i, row) in matrix.row_iter().enumerate() {
            let diagonal = row
                .col_indices()
                .iter()
                .zip(row.values())
                .find(|&(&j, _)| j == i)
                .map(|(_, &a_ii)| a_ii);
            if let Some(a_ii) = diagonal.filter(|a_ii| *a_ii != T::zero()) {
                inverse_diagonal[i] = T::one() / a_ii;
            }
        }
        Self { inverse_diagonal }
    }

    pub fn inverse_diagonal(&self) -> &DVector<T> {
        &self.inverse_diagonal
    }
}

impl<T: Real> LinearOperator<T> for JacobiPreconditioner<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        y.copy_from(&x);
        y.component_mul_assign(&self.inverse_diagonal);
        Ok(())
    }
}

pub trait CgStoppingCriterion<T: Real> {
    fn has_converged(
        &self,
        b_norm: T,
        iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind>;
}

/// Relative residual tolerance ||r|| <= tol * ||b||.
///
/// Note that we use the *approximate* residual given by Conjugate-Gradient. For ill-conditioned
/// problems, it is possible that CG's residual converges, but the real residual does not.
#[derive(Debug, Clone)]
pub struct RelativeResidualCriterion<T: Real> {
    tol: T,
}

impl<T: Real> RelativeResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self { tol }
    }
}

impl<T: Real> CgStoppingCriterion<T> for RelativeResidualCriterion<T> {
    fn has_converged(
        &self,
        b_norm: T,
        _iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind> {
        Ok(approx_residual.norm() <= self.tol * b_norm)
    }
}

/// Settings for solves with [`ConjugateGradient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgSettings {
    /// Tolerance on the residual relative to the norm of the right-hand side.
    pub tolerance: f64,
    pub max_iterations: Option<usize>,
}

impl Default for CgSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: Some(10_000),
        }
    }
}

#[derive(Debug, Clone)]
#[allow(non_snake_case)]
struct CgWorkspace<T: Real> {
    r: DVector<T>,
    z: DVector<T>,
    p: DVector<T>,
    Ap: DVector<T>,
}

impl<T: Real> CgWorkspace<T> {
    fn new(dim: usize) -> Self {
        Self {
            r: DVector::zeros(dim),
            z: DVector::zeros(dim),
            p: DVector::zeros(dim),
            Ap: DVector::zeros(dim),
        }
    }
}

#[derive(Debug)]
pub struct ConjugateGradient<A, P, Criterion> {
    operator: A,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl<A> ConjugateGradient<A, IdentityOperator, ()> {
    pub fn with_operator(operator: A) -> Self {
        Self {
            operator,
            preconditioner: IdentityOperator,
            stopping_criterion: (),
            max_iter: None,
        }
    }
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion> {
    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<A, P2, Criterion> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: Option<usize>) -> Self {
        Self { max_iter, ..self }
    }

    pub fn with_stopping_criterion<Criterion2>(
        self,
        stopping_criterion: Criterion2,
    ) -> ConjugateGradient<A, P, Criterion2> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(Box<dyn Error + Send + Sync>),
    PreconditionerError(Box<dyn Error + Send + Sync>),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => {
                write!(f, "Error applying operator: ")?;
                err.fmt(f)
            }
            Self::PreconditionerError(err) => {
                write!(f, "Error applying preconditioner: ")?;
                err.fmt(f)
            }
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite."),
            Self::IndefinitePreconditioner => write!(f, "Indefinite preconditioner."),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached.", max_iter)
            }
        }
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct SolveError {
    pub output: CgOutput,
    pub kind: SolveErrorKind,
}

impl SolveError {
    fn new(output: CgOutput, kind: SolveErrorKind) -> Self {
        Self { output, kind }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CG solve failed after {} iterations. Error: {}",
            self.output.num_iterations, self.kind
        )
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            SolveErrorKind::OperatorError(err) | SolveErrorKind::PreconditionerError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<SolveError> for crate::error::Error {
    fn from(error: SolveError) -> Self {
        crate::error::Error::Solve(error)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct CgOutput {
    /// Number of iterations of the solver.
    ///
    /// Corresponds to the number of updates made to the (initial) solution vector.
    pub num_iterations: usize,
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion> {
    /// Solves `Ax = b`, starting from the given value of `x`.
    #[allow(non_snake_case)]
    pub fn solve_with_guess<T>(&self, b: &DVector<T>, x: &mut DVector<T>) -> Result<CgOutput, SolveError>
    where
        T: Real,
        A: LinearOperator<T>,
        P: LinearOperator<T>,
        Criterion: CgStoppingCriterion<T>,
    {
        use SolveErrorKind::*;
        assert_eq!(b.len(), x.len());
        let n = x.len();

        let mut output = CgOutput { num_iterations: 0 };
        let CgWorkspace { mut r, mut z, mut p, mut Ap } = CgWorkspace::new(n);

        // r = b - Ax
        if let Err(err) = self.operator.apply(r.rows_mut(0, n), x.rows(0, n)) {
            return Err(SolveError::new(output, OperatorError(err)));
        }
        r.zip_apply(b, |Ax_i, b_i| *Ax_i = b_i - *Ax_i);

        let b_norm = b.norm();
        if b_norm == T::zero() {
            x.fill(T::zero());
            return Ok(output);
        }

        // z = Pr
        if let Err(err) = self.preconditioner.apply(z.rows_mut(0, n), r.rows(0, n)) {
            return Err(SolveError::new(output, PreconditionerError(err)));
        }
        p.copy_from(&z);
        let mut zTr = z.dot(&r);

        loop {
            let has_converged = self
                .stopping_criterion
                .has_converged(b_norm, output.num_iterations, r.rows(0, n))
                .map_err(|kind| SolveError::new(output.clone(), kind))?;

            if has_converged {
                break;
            } else if let Some(max_iter) = self.max_iter {
                if output.num_iterations >= max_iter {
                    return Err(SolveError::new(output, MaxIterationsReached { max_iter }));
                }
            }

            // Ap = A * p
            if let Err(err) = self.operator.apply(Ap.rows_mut(0, n), p.rows(0, n)) {
                return Err(SolveError::new(output, OperatorError(err)));
            }
            let pAp = p.dot(&Ap);

            if pAp <= T::zero() {
                return Err(SolveError::new(output, IndefiniteOperator));
            }
            if zTr <= T::zero() {
                return Err(SolveError::new(output, IndefinitePreconditioner));
            }

            let alpha = zTr / pAp;
            // x <- x + alpha * p
            x.axpy(alpha, &p, T::one());
            // r <- r - alpha * Ap
            r.axpy(-alpha, &Ap, T::one());

            // Number of iterations corresponds to number of updates to the x vector
            output.num_iterations += 1;

            // z <- P r
            if let Err(err) = self.preconditioner.apply(z.rows_mut(0, n), r.rows(0, n)) {
                return Err(SolveError::new(output, PreconditionerError(err)));
            }
            let zTr_next = z.dot(&r);
            let beta = zTr_next / zTr;

            // p <- z + beta * p
            p.axpy(T::one(), &z, beta);

            zTr = zTr_next;
        }

        debug!(
            "CG converged after {} iterations (n = {n})",
            output.num_iterations
        );
        Ok(output)
    }
}
