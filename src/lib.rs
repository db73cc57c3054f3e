//! Crime Atlas - forecast scores for Chilean regions and communes
//!
//! Loads the CUT code table, per-code score datasets, region boundaries and
//! forecasts, and answers the lookups a choropleth dashboard needs.

pub mod atlas;
pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod score;
pub mod stats;

pub use atlas::Atlas;
pub use config::AtlasConfig;
pub use error::{AtlasError, Result};
