//! # Constants and type definitions for tracklib
//!
//! This module centralizes the **geodetic constants**, **default parameters**, and **common
//! type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - WGS84 ellipsoid constants used by the coordinate kernel
//! - Unit conversions (degrees ↔ radians, time units ↔ seconds)
//! - Reserved analytical-feature names (virtual columns)
//! - Sentinels shared by tracks, rasters and routing
//!
//! These definitions are used by all main modules, including the coordinate kernel,
//! the network router and the raster summarizer.

// -------------------------------------------------------------------------------------------------
// Geodetic constants (WGS84)
// -------------------------------------------------------------------------------------------------

/// WGS84 semi-major axis in meters
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS84 semi-minor axis in meters
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// WGS84 second eccentricity squared
pub const WGS84_EP2: f64 = WGS84_E2 / (1.0 - WGS84_E2);

/// Mean Earth radius used by spherical approximations (meters)
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// 2π
pub const DPI: f64 = 2. * std::f64::consts::PI;

// -------------------------------------------------------------------------------------------------
// Sentinels
// -------------------------------------------------------------------------------------------------

/// Default value designating missing data in rasters and track imports
pub const NO_DATA_VALUE: f64 = -9999.0;

/// Distance returned by the prepared routing cache for unreachable pairs
pub const UNREACHABLE_DISTANCE: f64 = 1e300;

/// Numerical epsilon used for floating-point comparisons
pub const EPS: f64 = 1e-9;

/// Value assigned through algebraic indexing to delete an analytical feature
pub const DELETE_SENTINEL: &str = "#DELETE";

/// Name of the analytical feature holding the Gaussian-process posterior deviation
pub const SIGMA_GP_FEATURE: &str = "@sigma_gp";

// -------------------------------------------------------------------------------------------------
// Reserved analytical feature names
// -------------------------------------------------------------------------------------------------

/// Virtual columns computed on read, never stored in the feature table
pub const RESERVED_FEATURES: [&str; 6] = ["x", "y", "z", "t", "timestamp", "idx"];

/// Curvilinear abscissa
pub const ABS_CURV: &str = "abs_curv";

/// Smoothed speed estimate
pub const SPEED: &str = "speed";

/// Azimuth of the outgoing segment
pub const HEADING: &str = "heading";

/// Derivative of the speed
pub const ACCELERATION: &str = "acceleration";

/// Returns `true` when `name` is one of the virtual feature names.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_FEATURES.contains(&name)
}

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;
/// Duration in seconds
pub type Seconds = f64;
/// Identifier of a network node
pub type NodeId = String;
/// Identifier of a network edge
pub type EdgeId = String;
