//! Geo module - boundary loading and GeoJSON features

mod collection;
mod loader;

pub use collection::{float_value, Feature, FeatureCollection};
pub use geo::Rect;
pub use loader::{
    load_region, load_regions, ordered_regions, RegionBoundaries, DISPLAY_ORDER, REGION_CODES,
};
