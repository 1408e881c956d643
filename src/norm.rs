//! Norm kinds and the reduction of per-cell errors to a global error.
use crate::communicator::{agree_on_outcome, Communicator, ReduceOp};
use crate::error::{Error, Result};
use crate::partition::CellPartition;
use crate::Real;
use log::debug;
use nalgebra::DVector;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The error measures supported by [`integrate_difference`](crate::estimate::integrate_difference)
/// and [`compute_global_error`].
///
/// With `e = u - u_h` the difference between a reference field `u` and a finite element field
/// `u_h`, and `w` an optional weight, the per-cell quantities are:
///
/// | Norm | Per-cell value |
/// |---|---|
/// | `Mean` | $\int_K \sum_c e_c w_c$ |
/// | `L1Norm` | $\int_K \sum_c \lvert e_c \rvert w_c$ |
/// | `L2Norm` | $(\int_K \sum_c e_c^2 w_c)^{1/2}$ |
/// | `LpNorm` | $(\int_K \sum_c \lvert e_c \rvert^p w_c)^{1/p}$ |
/// | `LinftyNorm` | $\max_{x_q} \max_c \lvert e_c \rvert w_c$ |
/// | `H1Seminorm` | $(\int_K \sum_c \lvert \nabla e_c \rvert^2 w_c)^{1/2}$ |
/// | `HdivSeminorm` | $(\int_K (\sum_{c < d} \partial_c e_c \sqrt{w_c})^2)^{1/2}$ |
/// | `H1Norm` | $(\int_K \sum_c (e_c^2 + \lvert \nabla e_c \rvert^2) w_c)^{1/2}$ |
/// | `W1pSeminorm` | $(\int_K \sum_c \lvert \nabla e_c \rvert^p w_c)^{1/p}$ |
/// | `W1pNorm` | $(\int_K \sum_c (\lvert e_c \rvert^p + \lvert \nabla e_c \rvert^p) w_c)^{1/p}$ |
/// | `W1inftySeminorm` | $\max_{x_q} \max_c \lvert \nabla e_c \rvert w_c$ |
/// | `W1inftyNorm` | `LinftyNorm` + `W1inftySeminorm` on the cell |
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NormType {
    Mean,
    L1Norm,
    L2Norm,
    LpNorm,
    LinftyNorm,
    H1Seminorm,
    HdivSeminorm,
    H1Norm,
    W1pSeminorm,
    W1pNorm,
    W1inftySeminorm,
    W1inftyNorm,
}

impl NormType {
    pub const ALL: [NormType; 12] = [
        NormType::Mean,
        NormType::L1Norm,
        NormType::L2Norm,
        NormType::LpNorm,
        NormType::LinftyNorm,
        NormType::H1Seminorm,
        NormType::HdivSeminorm,
        NormType::H1Norm,
        NormType::W1pSeminorm,
        NormType::W1pNorm,
        NormType::W1inftySeminorm,
        NormType::W1inftyNorm,
    ];

    /// The name used when formatting, parsing and (de)serializing the norm.
    pub fn as_str(&self) -> &'static str {
        match self {
            NormType::Mean => "mean",
            NormType::L1Norm => "L1_norm",
            NormType::L2Norm => "L2_norm",
            NormType::LpNorm => "Lp_norm",
            NormType::LinftyNorm => "Linfty_norm",
            NormType::H1Seminorm => "H1_seminorm",
            NormType::HdivSeminorm => "Hdiv_seminorm",
            NormType::H1Norm => "H1_norm",
            NormType::W1pSeminorm => "W1p_seminorm",
            NormType::W1pNorm => "W1p_norm",
            NormType::W1inftySeminorm => "W1infty_seminorm",
            NormType::W1inftyNorm => "W1infty_norm",
        }
    }

    /// Whether the norm involves gradients of the difference.
    pub fn requires_gradient(&self) -> bool {
        use NormType::*;
        match self {
            Mean | L1Norm | L2Norm | LpNorm | LinftyNorm => false,
            H1Seminorm | HdivSeminorm | H1Norm | W1pSeminorm | W1pNorm | W1inftySeminorm | W1inftyNorm => true,
        }
    }

    /// Whether the norm is parametrized by an exponent `p`.
    pub fn uses_exponent(&self) -> bool {
        use NormType::*;
        match self {
            LpNorm | W1pSeminorm | W1pNorm => true,
            Mean | L1Norm | L2Norm | LinftyNorm | H1Seminorm | HdivSeminorm | H1Norm | W1inftySeminorm
            | W1inftyNorm => false,
        }
    }

    /// Whether [`compute_global_error`] can combine per-cell values of this norm.
    pub fn is_global_reducible(&self) -> bool {
        !matches!(self, NormType::W1inftyNorm)
    }
}

impl Display for NormType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNormTypeError {
    input: String,
}

impl ParseNormTypeError {
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl Display for ParseNormTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "String {} cannot be converted to NormType", self.input)
    }
}

impl std::error::Error for ParseNormTypeError {}

impl FromStr for NormType {
    type Err = ParseNormTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mean" => Ok(NormType::Mean),
            "L1_norm" => Ok(NormType::L1Norm),
            "L2_norm" => Ok(NormType::L2Norm),
            "Lp_norm" => Ok(NormType::LpNorm),
            "Linfty_norm" => Ok(NormType::LinftyNorm),
            "H1_seminorm" => Ok(NormType::H1Seminorm),
            "Hdiv_seminorm" => Ok(NormType::HdivSeminorm),
            "H1_norm" => Ok(NormType::H1Norm),
            "W1p_seminorm" => Ok(NormType::W1pSeminorm),
            "W1p_norm" => Ok(NormType::W1pNorm),
            "W1infty_seminorm" => Ok(NormType::W1inftySeminorm),
            "W1infty_norm" => Ok(NormType::W1inftyNorm),
            _ => Err(ParseNormTypeError { input: s.to_string() }),
        }
    }
}

impl Serialize for NormType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NormType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

pub(crate) fn check_exponent<T: Real>(norm: NormType, exponent: T) -> Result<()> {
    if norm.uses_exponent() && !(exponent >= T::one()) {
        Err(Error::InvalidExponent {
            exponent: nalgebra::try_convert(exponent).unwrap_or(f64::NAN),
        })
    } else {
        Ok(())
    }
}

/// Combines per-cell errors, as computed by
/// [`integrate_difference`](crate::estimate::integrate_difference), into a global error.
///
/// Only entries of locally owned cells contribute, and partial results are combined across all
/// processes of the communicator. This is a collective operation: every process must call it.
/// Arguments are validated collectively, so if any process rejects its arguments, the others
/// return [`Error::FailedOnOtherRank`] instead of waiting for it.
///
/// The exponent is only used by `LpNorm`, `W1pSeminorm` and `W1pNorm`.
///
/// # Errors
///
/// `W1inftyNorm` cannot be reduced from per-cell values and is rejected with
/// [`Error::UnsupportedGlobalNorm`].
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn compute_global_error<T, C>(
    partition: &CellPartition,
    cellwise_error: &DVector<T>,
    norm: NormType,
    exponent: T,
    comm: &C,
) -> Result<T>
where
    T: Real,
    C: Communicator + ?Sized,
{
    let arguments = if cellwise_error.len() != partition.num_cells() {
        Err(Error::VectorLengthMismatch {
            expected: partition.num_cells(),
            actual: cellwise_error.len(),
        })
    } else {
        check_exponent(norm, exponent)
    };
    agree_on_outcome(comm, arguments)?;

    let owned_values = || {
        partition
            .owned_cells()
            .map(|cell| cellwise_error[cell])
    };

    use NormType::*;
    let global = match norm {
        Mean | L1Norm => {
            let local_sum = owned_values().fold(0.0, |sum, x| sum + x);
            comm.all_reduce(local_sum, ReduceOp::Sum)
        }
        L2Norm | H1Seminorm | HdivSeminorm | H1Norm => {
            let local_sum = owned_values().fold(0.0, |sum, x| sum + x * x);
            comm.all_reduce(local_sum, ReduceOp::Sum).sqrt()
        }
        LpNorm | W1pSeminorm | W1pNorm => {
            let local_sum = owned_values().fold(0.0, |sum, x| sum + x.abs().powf(exponent));
            comm.all_reduce(local_sum, ReduceOp::Sum)
                .powf(1.0 / exponent)
        }
        LinftyNorm | W1inftySeminorm => {
            let local_max = owned_values().fold(0.0, |max: T, x| ReduceOp::Max.apply(max, x.abs()));
            comm.all_reduce(local_max, ReduceOp::Max)
        }
        W1inftyNorm => return Err(Error::UnsupportedGlobalNorm { norm }),
    };

    debug!(
        "Reduced {} per-cell values ({} locally owned) with {norm} on rank {} of {}",
        partition.num_cells(),
        partition.num_owned_cells(),
        comm.rank(),
        comm.size()
    );
    Ok(global)
}
