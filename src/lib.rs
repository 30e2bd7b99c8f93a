//! In-memory analysis of GPS trajectories.
//!
//! A [`Track`](track::Track) is a time-stamped sequence of positions carrying named
//! analytical features (AFs). On top of it the crate provides signal operators and a
//! small expression language, resampling and simplification, a regular-grid spatial
//! index, rasterized summaries of track collections, and shortest paths on road
//! networks. Files are read and written by [`io`].
pub mod algebra;
pub mod collection;
pub mod constants;
pub mod coords;
pub mod geometry;
pub mod interpolation;
pub mod io;
pub mod kernel;
pub mod network;
pub mod operator;
pub mod progress_bar;
pub mod query;
pub mod raster;
pub mod settings;
pub mod spatial_index;
pub mod summarize;
pub mod time;
pub mod track;
pub mod track_errors;

pub use collection::TrackCollection;
pub use coords::Coord;
pub use time::GPSTime;
pub use track::{Observation, Track};
pub use track_errors::TrackError;
