//! Errors reported by the field operations of this crate.
use crate::cg::SolveError;
use crate::norm::NormType;
use std::fmt;
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The point lies in a cell that is not owned by the current process.
    PointNotAvailableHere { cell: usize },
    /// No cell of the mesh contains the point.
    PointNotFound,
    /// The norm needs at least `required` solution components.
    NotEnoughComponents { required: usize, num_components: usize },
    /// The norm needs gradients of the reference field, but it provides none.
    GradientUnavailable { norm: NormType },
    /// A field has a different number of components than the finite element field.
    ComponentMismatch { expected: usize, actual: usize },
    /// The weight function has neither one component nor as many as the solution.
    InvalidWeight { num_components: usize, weight_components: usize },
    /// The exponent of an Lp-type norm is smaller than one.
    InvalidExponent { exponent: f64 },
    VectorLengthMismatch { expected: usize, actual: usize },
    /// The norm has no global reduction from per-cell values.
    UnsupportedGlobalNorm { norm: NormType },
    /// The geometry of the cell is degenerate or inverted.
    DegenerateCell { cell: usize },
    /// A chain of affine constraints refers back to the constrained degree of freedom.
    CyclicConstraints { dof: usize },
    /// The operation is only available for partitions where every cell is locally owned.
    DistributedNotSupported { operation: &'static str },
    /// The linear solver failed.
    Solve(SolveError),
    /// A collective operation failed on another process.
    FailedOnOtherRank,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::PointNotAvailableHere { cell } => write!(
                f,
                "The evaluation of a function was requested at a point that is not \
                 owned by the current process (cell {cell}). Points must be evaluated by the \
                 process that owns the surrounding cell."
            ),
            Error::PointNotFound => write!(f, "No cell of the mesh contains the point."),
            Error::NotEnoughComponents {
                required,
                num_components,
            } => write!(
                f,
                "The norm requires at least {required} components, but the field has {num_components}."
            ),
            Error::GradientUnavailable { norm } => write!(
                f,
                "The norm {norm} requires the gradient of the reference field, which is not available."
            ),
            Error::ComponentMismatch { expected, actual } => write!(
                f,
                "Expected a field with {expected} components, got a field with {actual}."
            ),
            Error::InvalidWeight {
                num_components,
                weight_components,
            } => write!(
                f,
                "The weight has {weight_components} components, but must have 1 or {num_components}."
            ),
            Error::InvalidExponent { exponent } => {
                write!(f, "The exponent must be at least 1, got {exponent}.")
            }
            Error::VectorLengthMismatch { expected, actual } => {
                write!(f, "Expected a vector of length {expected}, got length {actual}.")
            }
            Error::UnsupportedGlobalNorm { norm } => write!(
                f,
                "The norm {norm} cannot be reduced to a global error. Compute the \
                 Linfty_norm and W1infty_seminorm separately and add them instead."
            ),
            Error::DegenerateCell { cell } => write!(f, "Cell {cell} is degenerate or inverted."),
            Error::CyclicConstraints { dof } => {
                write!(f, "The constraints of degree of freedom {dof} are cyclic.")
            }
            Error::DistributedNotSupported { operation } => write!(
                f,
                "The operation '{operation}' requires all cells to be locally owned."
            ),
            Error::Solve(err) => write!(f, "Linear solve failed: {err}"),
            Error::FailedOnOtherRank => write!(f, "The collective operation failed on another process."),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Solve(err) => Some(err),
            _ => None,
        }
    }
}
