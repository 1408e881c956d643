//! Quadrature rules for the one-dimensional domain `[-1, 1]`.
use crate::quadrature::{convert_quadrature_rule_from_1d_f64, QuadraturePair1d};
use crate::Real;
use fenris_quadrature::{univariate, Rule};

/// Gauss–Legendre quadrature for the reference interval [-1, 1].
///
/// Given `n` points, the rule integrates polynomials of degree up to `2 n - 1` exactly.
/// The points are sorted in ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss<T: Real>(num_points: usize) -> QuadraturePair1d<T> {
    convert_quadrature_rule_from_1d_f64(sorted_gauss(num_points))
}

/// The Gauss rule in double precision, with points in ascending order.
pub(crate) fn sorted_gauss(num_points: usize) -> Rule<1> {
    let (weights, points) = univariate::gauss(num_points);
    let mut rule: Vec<_> = weights.into_iter().zip(points).collect();
    rule.sort_by(|(_, [x]), (_, [y])| x.total_cmp(y));
    rule.into_iter().unzip()
}

/// The midpoint rule.
pub fn midpoint<T: Real>() -> QuadraturePair1d<T> {
    convert_quadrature_rule_from_1d_f64((vec![2.0], vec![[0.0]]))
}

/// The trapezoidal rule, with points at the end points of the interval.
pub fn trapezoidal<T: Real>() -> QuadraturePair1d<T> {
    convert_quadrature_rule_from_1d_f64((vec![1.0, 1.0], vec![[-1.0], [1.0]]))
}

/// Simpson's rule, exact for cubic polynomials.
pub fn simpson<T: Real>() -> QuadraturePair1d<T> {
    convert_quadrature_rule_from_1d_f64((vec![1.0 / 3.0, 4.0 / 3.0, 1.0 / 3.0], vec![[-1.0], [0.0], [1.0]]))
}
