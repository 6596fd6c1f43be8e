//! Small math helpers shared across the simulation.

use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::{PI, TAU};

/// Draw a sample from the standard normal distribution.
#[inline]
pub fn randn<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.sample(StandardNormal)
}

/// Wrap an angle into the (-PI, PI] range.
pub fn normalize_angle(mut a: f64) -> f64 {
    while a < -PI {
        a += TAU;
    }
    while a > PI {
        a -= TAU;
    }
    a
}

/// Convert an HSL color (hue 0-360, saturation/lightness 0-100) to RGB
/// channels in 0-255.
pub fn color_from_hue(h: f64, s: f64, l: f64) -> [f64; 3] {
    let c = (1.0 - (2.0 * l / 100.0 - 1.0).abs()) * s / 100.0;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l / 100.0 - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    [
        ((r + m) * 255.0).round(),
        ((g + m) * 255.0).round(),
        ((b + m) * 255.0).round(),
    ]
}
