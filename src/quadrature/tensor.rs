//! Tensor-product quadrature rules for quadrilaterals.
use crate::quadrature::{convert_quadrature_rule_from_2d_f64, QuadraturePair1d, QuadraturePair2d};
use crate::Real;
use fenris_quadrature::tensor;
use itertools::iproduct;
use nalgebra::Point2;

/// The tensor product of a one-dimensional rule with itself, on [-1, 1]^2.
pub fn tensor_product_2d<T: Real>(rule: &QuadraturePair1d<T>) -> QuadraturePair2d<T> {
    let (weights, points) = rule;
    let n = weights.len();
    iproduct!(0..n, 0..n)
        .map(|(j, i)| (weights[i] * weights[j], Point2::new(points[i][0], points[j][0])))
        .unzip()
}

/// Gauss quadrature on [-1, 1]^2 with the given number of points per dimension.
pub fn quadrilateral_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair2d<T> {
    convert_quadrature_rule_from_2d_f64(tensor::quadrilateral_gauss(num_points_per_dim))
}
