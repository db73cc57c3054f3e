//! Region Boundary Loader Module
//! Loads one boundary file per region from a directory of `{code}.geojson` files.

use crate::error::{AtlasError, Result};
use crate::geo::collection::FeatureCollection;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Region codes with a boundary file.
pub const REGION_CODES: std::ops::RangeInclusive<u8> = 1..=16;

/// Regions north to south, the order selectors and map panels show them in.
pub const DISPLAY_ORDER: [u8; 16] = [15, 1, 2, 3, 4, 5, 13, 6, 7, 8, 9, 14, 10, 11, 12, 16];

pub type RegionBoundaries = BTreeMap<u8, FeatureCollection>;

/// Load every region's boundaries. All 16 files are required.
pub fn load_regions(dir: &Path) -> Result<RegionBoundaries> {
    let regions = REGION_CODES
        .into_par_iter()
        .map(|code| load_region(dir, code).map(|fc| (code, fc)))
        .collect::<Result<RegionBoundaries>>()?;

    info!(
        dir = %dir.display(),
        regions = regions.len(),
        features = regions.values().map(FeatureCollection::len).sum::<usize>(),
        "loaded region boundaries"
    );
    Ok(regions)
}

/// Load the boundaries of a single region.
pub fn load_region(dir: &Path, code: u8) -> Result<FeatureCollection> {
    let path = dir.join(format!("{code}.geojson"));
    let region_error = |reason: String| AtlasError::DataLoad {
        origin: format!("region {code} ({})", path.display()),
        reason,
    };

    let raw = fs::read_to_string(&path).map_err(|e| region_error(e.to_string()))?;
    let collection: FeatureCollection =
        serde_json::from_str(&raw).map_err(|e| region_error(e.to_string()))?;

    // boundaries are areas; null geometry is allowed
    if let Some(idx) = collection
        .features
        .iter()
        .position(|f| f.geometry.is_some() && !f.is_polygonal())
    {
        return Err(region_error(format!(
            "feature {idx} is not a Polygon or MultiPolygon"
        )));
    }
    Ok(collection)
}

/// Regions in display order, skipping any not present in `regions`.
pub fn ordered_regions(
    regions: &RegionBoundaries,
) -> impl Iterator<Item = (u8, &FeatureCollection)> {
    DISPLAY_ORDER
        .into_iter()
        .filter_map(move |code| regions.get(&code).map(|fc| (code, fc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_region(dir: &Path, code: u8) {
        let body = format!(
            concat!(
                r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":"#,
                r#"{{"codregion":{code}}},"geometry":{{"type":"Polygon","coordinates":"#,
                r#"[[[-71.0,-34.0],[-70.0,-34.0],[-70.0,-33.0],[-71.0,-34.0]]]}}}}]}}"#,
            ),
            code = code
        );
        fs::write(dir.join(format!("{code}.geojson")), body).unwrap();
    }

    #[test]
    fn loads_all_sixteen_regions() {
        let dir = tempdir().unwrap();
        for code in REGION_CODES {
            write_region(dir.path(), code);
        }

        let regions = load_regions(dir.path()).unwrap();
        assert_eq!(regions.len(), 16);
        assert_eq!(regions[&13].features[0].code_property("codregion"), Some(13));

        let order: Vec<u8> = ordered_regions(&regions).map(|(code, _)| code).collect();
        assert_eq!(order, DISPLAY_ORDER.to_vec());
    }

    #[test]
    fn missing_region_names_the_code() {
        let dir = tempdir().unwrap();
        for code in REGION_CODES.filter(|c| *c != 7) {
            write_region(dir.path(), code);
        }

        let err = load_regions(dir.path()).unwrap_err();
        assert!(err.to_string().contains("region 7"), "{err}");
    }

    #[test]
    fn malformed_geometry_names_the_region() {
        let dir = tempdir().unwrap();
        for code in REGION_CODES {
            write_region(dir.path(), code);
        }
        fs::write(
            dir.path().join("4.geojson"),
            concat!(
                r#"{"type":"FeatureCollection","features":"#,
                r#"[{"type":"Feature","properties":{},"geometry":"banana"}]}"#,
            ),
        )
        .unwrap();

        let err = load_regions(dir.path()).unwrap_err();
        assert!(matches!(err, AtlasError::DataLoad { .. }));
        assert!(err.to_string().contains("region 4"), "{err}");
    }

    #[test]
    fn point_boundaries_are_rejected() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("9.geojson"),
            concat!(
                r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"#,
                r#""geometry":{"type":"Point","coordinates":[-72.6,-38.7]}}]}"#,
            ),
        )
        .unwrap();

        let err = load_region(dir.path(), 9).unwrap_err();
        assert!(err.to_string().contains("region 9"), "{err}");
        assert!(err.to_string().contains("Polygon"), "{err}");
    }

    #[test]
    fn unparsable_region_is_a_load_error() {
        let dir = tempdir().unwrap();
        for code in REGION_CODES {
            write_region(dir.path(), code);
        }
        fs::write(dir.path().join("16.geojson"), "{not json").unwrap();

        let err = load_regions(dir.path()).unwrap_err();
        assert!(matches!(err, AtlasError::DataLoad { .. }));
        assert!(err.to_string().contains("region 16"), "{err}");
    }
}
