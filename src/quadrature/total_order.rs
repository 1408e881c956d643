//! Quadrature rules parametrized by polynomial total-order accuracy.
//!
//! A rule of strength `s` integrates polynomials of total degree up to `s` exactly on the
//! reference domain of the corresponding element. Simplex rules are taken from the polyquad
//! tables when available. Higher strengths collapse a tensor-product Gauss rule onto the
//! simplex (Duffy transformation).
use crate::quadrature::tensor::quadrilateral_gauss;
use crate::quadrature::univariate::{gauss, sorted_gauss};
use crate::quadrature::{
    convert_quadrature_rule_from_2d_f64, convert_quadrature_rule_from_3d_f64, QuadraturePair1d, QuadraturePair2d,
    QuadraturePair3d,
};
use crate::Real;
use fenris_quadrature::{polyquad, Rule};
use itertools::iproduct;
use log::debug;

pub fn segment<T: Real>(strength: usize) -> QuadraturePair1d<T> {
    gauss((strength + 2) / 2)
}

pub fn quadrilateral<T: Real>(strength: usize) -> QuadraturePair2d<T> {
    quadrilateral_gauss((strength + 2) / 2)
}

/// A rule for the reference triangle (-1, -1), (1, -1), (-1, 1).
pub fn triangle<T: Real>(strength: usize) -> QuadraturePair2d<T> {
    let rule = polyquad::triangle(strength).unwrap_or_else(|_| {
        debug!("No polyquad triangle rule of strength {strength}, collapsing a Gauss rule");
        collapsed_triangle(strength)
    });
    convert_quadrature_rule_from_2d_f64(rule)
}

/// A rule for the reference tetrahedron (-1, -1, -1), (1, -1, -1), (-1, 1, -1), (-1, -1, 1).
pub fn tetrahedron<T: Real>(strength: usize) -> QuadraturePair3d<T> {
    let rule = polyquad::tetrahedron(strength).unwrap_or_else(|_| {
        debug!("No polyquad tetrahedron rule of strength {strength}, collapsing a Gauss rule");
        collapsed_tetrahedron(strength)
    });
    convert_quadrature_rule_from_3d_f64(rule)
}

fn collapsed_triangle(strength: usize) -> Rule<2> {
    // The collapse adds one degree in the collapsed direction
    let (weights, points) = sorted_gauss((strength + 3) / 2);
    let n = weights.len();
    iproduct!(0..n, 0..n)
        .map(|(j, i)| {
            let ([u], [v]) = (points[i], points[j]);
            let x = (1.0 + u) * (1.0 - v) / 2.0 - 1.0;
            (weights[i] * weights[j] * (1.0 - v) / 2.0, [x, v])
        })
        .unzip()
}

fn collapsed_tetrahedron(strength: usize) -> Rule<3> {
    let (weights, points) = sorted_gauss((strength + 4) / 2);
    let n = weights.len();
    iproduct!(0..n, 0..n, 0..n)
        .map(|(k, j, i)| {
            let ([u], [v], [w]) = (points[i], points[j], points[k]);
            let y = (1.0 + v) * (1.0 - w) / 2.0 - 1.0;
            let x = (1.0 + u) * (1.0 - v) * (1.0 - w) / 4.0 - 1.0;
            let det = (1.0 - v) * (1.0 - w) * (1.0 - w) / 8.0;
            (weights[i] * weights[j] * weights[k] * det, [x, y, w])
        })
        .unzip()
}
