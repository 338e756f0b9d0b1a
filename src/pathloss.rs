//! Closed-form path-loss models used for the telemetry plots.
//!
//! The channel emulator applies one of three models to the emulated link;
//! the GUI mirrors the first two locally so it can plot the modelled loss at
//! the UAV's current position and render reference curves over distance.
//! Formulas follow the standard free-space and flat-earth two-ray equations;
//! losses are returned in dB as negative values (0 dB = no loss).

use serde::{Deserialize, Serialize};

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Relative permittivity of the reflecting ground plane.
pub const EPSILON_R: f64 = 1.02;

/// Carrier wavelength in meters.
pub fn wavelength(carrier_freq: f64) -> f64 {
    SPEED_OF_LIGHT / carrier_freq
}

/// Euclidean distance from the origin.
pub fn distance(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

/// Free-space path loss in dB at distance `d`: `-20 log10(4π d / λ)`.
/// Zero at `d == 0` (the formula has no meaning at the antenna itself).
pub fn free_space(d: f64, lambda: f64) -> f64 {
    if d == 0.0 {
        return 0.0;
    }
    -20.0 * (4.0 * std::f64::consts::PI * d / lambda).log10()
}

/// Flat-earth two-ray path loss in dB for a UAV at `(x, y, z)` relative to a
/// ground station at the origin with antenna height `station_z`.
///
/// The reflected path is modelled via the image antenna at `-station_z`; the
/// reflection coefficient uses the grazing angle and [`EPSILON_R`]. At deep
/// destructive-interference nulls the interference factor diverges; a
/// non-finite result is reported as 0 like the `d == 0` case.
pub fn flat_earth_two_ray(x: f64, y: f64, z: f64, station_z: f64, lambda: f64) -> f64 {
    let d_ground = distance(x, y, 0.0);
    let d_los = distance(x, y, z);
    if d_los == 0.0 {
        return 0.0;
    }
    let d_ref = distance(x, y, z + station_z);
    let cos_theta = d_ground / d_ref;
    let sin_theta = (z + station_z) / d_ref;
    let gamma = (EPSILON_R - cos_theta * cos_theta).sqrt();
    let gamma = (sin_theta - gamma) / (sin_theta + gamma);
    let phi = 2.0 * std::f64::consts::PI * ((d_ref - d_los) / lambda);
    // |1 + gamma * e^{i phi}| without pulling in a complex-number type.
    let norm = (1.0 + gamma * phi.cos()).hypot(gamma * phi.sin());
    let pl = -20.0 * (4.0 * std::f64::consts::PI * (d_los / lambda) / norm).log10();
    if pl.is_finite() {
        pl
    } else {
        0.0
    }
}

/// Path-loss model selection sent to the channel emulator; the discriminant
/// is the wire index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathLossModel {
    FreeSpace = 0,
    TwoRay = 1,
    /// Two-ray with antenna directivity; applied emulator-side only, the GUI
    /// has no local mirror for it.
    TwoRayDirected = 2,
}

impl PathLossModel {
    pub const ALL: [PathLossModel; 3] = [
        PathLossModel::FreeSpace,
        PathLossModel::TwoRay,
        PathLossModel::TwoRayDirected,
    ];

    /// Wire index understood by the channel emulator.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            PathLossModel::FreeSpace => "Free space",
            PathLossModel::TwoRay => "Flat-earth two-ray",
            PathLossModel::TwoRayDirected => "Two-ray directed",
        }
    }
}
