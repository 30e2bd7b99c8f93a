//! # Process-wide configuration
//!
//! A handful of parameters are read-mostly and shared by many operations: the timestamp
//! parse/print formats, the ENU projection mode, the spline and Gaussian-process
//! parameters, the no-data sentinel and the recursion budget of the minimum enclosing
//! circle.
//!
//! They are stored in a **thread-local** [`Settings`] context with an explicit
//! lifecycle:
//!
//! ```text
//! init (Settings::default) ──▶ update_settings(..) ──▶ use ──▶ reset_settings()
//! ```
//!
//! Every thread starts from [`Settings::default`], so independent threads (for example
//! parallel test runners) never observe each other's mutations. Functions that only
//! need one value also offer explicit-parameter variants (`GPSTime::parse_with`,
//! `Coord::to_enu_with`, …) for callers that prefer to pass the context around.
//!
//! ## Usage
//!
//! ```rust
//! use tracklib::settings::{update_settings, with_settings, reset_settings};
//!
//! update_settings(|s| s.print_format = "2D/2M/4Y 2h:2m:2s".to_string());
//! let fmt = with_settings(|s| s.print_format.clone());
//! assert_eq!(fmt, "2D/2M/4Y 2h:2m:2s");
//! reset_settings();
//! ```
use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::constants::NO_DATA_VALUE;
use crate::kernel::Kernel;

/// Local tangent-plane projection used by Geo ↔ ENU conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProjectionMode {
    /// Exact conversion through Earth-centered coordinates
    #[default]
    Ecef,
    /// Equirectangular approximation around the base point
    Flat,
    /// Spherical stereographic projection centered on the base point
    Stereographic,
}

/// Read-mostly parameters shared by the engine.
///
/// # Fields
///
/// * `read_format` - token layout used when parsing timestamps
/// * `print_format` - token layout used when printing timestamps
/// * `projection` - Geo ↔ ENU projection mode
/// * `spline_penalization` - diagonal penalization of the thin-plate spline system
/// * `bspline_degree` - degree of the B-spline basis (≤ 3)
/// * `bspline_knots` - number of regularly spaced knots of the B-spline basis
/// * `gp_kernel` - covariance kernel of the Gaussian-process interpolator
/// * `gp_factor` - amplitude multiplying the Gaussian-process kernel
/// * `gp_noise` - observation noise σ of the Gaussian process
/// * `gp_sigma_output` - write the posterior deviation into `@sigma_gp`
/// * `no_data` - missing data sentinel for rasters and imports
/// * `recursion_budget` - stack budget of the minimum enclosing circle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub read_format: String,
    pub print_format: String,
    pub projection: ProjectionMode,
    pub spline_penalization: f64,
    pub bspline_degree: usize,
    pub bspline_knots: usize,
    pub gp_kernel: Kernel,
    pub gp_factor: f64,
    pub gp_noise: f64,
    pub gp_sigma_output: bool,
    pub no_data: f64,
    pub recursion_budget: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            read_format: "4Y-2M-2D 2h:2m:2s".to_string(),
            print_format: "4Y-2M-2D 2h:2m:2s".to_string(),
            projection: ProjectionMode::Ecef,
            spline_penalization: 0.0,
            bspline_degree: 3,
            bspline_knots: 10,
            gp_kernel: Kernel::gaussian(1.0),
            gp_factor: 1.0,
            gp_noise: 0.0,
            gp_sigma_output: false,
            no_data: NO_DATA_VALUE,
            recursion_budget: 2000,
        }
    }
}

thread_local! {
    static SETTINGS: RefCell<Settings> = RefCell::new(Settings::default());
}

/// Snapshot of the current thread's settings.
pub fn settings() -> Settings {
    SETTINGS.with(|s| s.borrow().clone())
}

/// Run `f` with a shared borrow of the current settings.
pub fn with_settings<R>(f: impl FnOnce(&Settings) -> R) -> R {
    SETTINGS.with(|s| f(&s.borrow()))
}

/// Mutate the current thread's settings in place.
pub fn update_settings(f: impl FnOnce(&mut Settings)) {
    SETTINGS.with(|s| f(&mut s.borrow_mut()))
}

/// Replace the current thread's settings.
pub fn install_settings(new: Settings) {
    SETTINGS.with(|s| *s.borrow_mut() = new)
}

/// Restore the defaults.
pub fn reset_settings() {
    install_settings(Settings::default())
}
