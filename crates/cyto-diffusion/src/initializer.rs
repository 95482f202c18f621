//! Stock concentration initializers.

use crate::grid::Initializer;

/// Axis selector for band-shaped initializers.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A Gaussian band across the chosen axis: the normal pdf
/// `exp(−(v−mean)²/2σ²)/(σ√2π)` evaluated at each box center.
pub fn gaussian_band(mean: f64, sigma: f64, axis: Axis) -> Initializer {
    Box::new(move |x, y, z| {
        let v = match axis {
            Axis::X => x,
            Axis::Y => y,
            Axis::Z => z,
        };
        normal_pdf(v, mean, sigma)
    })
}

fn normal_pdf(x: f64, mean: f64, sigma: f64) -> f64 {
    let u = (x - mean) / sigma;
    (-0.5 * u * u).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
}
