//! Everything the dashboard reads, loaded once up front.

use crate::config::AtlasConfig;
use crate::data::{CodeTable, ForecastTable};
use crate::error::{AtlasError, Result};
use crate::geo::{load_regions, FeatureCollection, RegionBoundaries};
use crate::score::ScoreTable;
use tracing::info;

pub struct Atlas {
    codes: CodeTable,
    scores: Vec<ScoreTable>,
    regions: RegionBoundaries,
    forecast: ForecastTable,
}

impl Atlas {
    /// Load the code table, every configured score, the region boundaries and
    /// the forecast. Any failure aborts the whole load.
    pub fn load(config: &AtlasConfig) -> Result<Self> {
        let codes = CodeTable::load(&config.code_table)?;
        let scores = config
            .scores
            .iter()
            .map(|source| ScoreTable::load(source, &codes))
            .collect::<Result<Vec<_>>>()?;
        let regions = load_regions(&config.geo_dir)?;
        let forecast = ForecastTable::load(&config.forecast, config.forecast_columns.clone())?;

        info!(
            scores = scores.len(),
            regions = regions.len(),
            forecast_rows = forecast.len(),
            "atlas ready"
        );
        Ok(Self {
            codes,
            scores,
            regions,
            forecast,
        })
    }

    pub fn codes(&self) -> &CodeTable {
        &self.codes
    }

    pub fn scores(&self) -> &[ScoreTable] {
        &self.scores
    }

    pub fn regions(&self) -> &RegionBoundaries {
        &self.regions
    }

    pub fn forecast(&self) -> &ForecastTable {
        &self.forecast
    }

    pub fn score(&self, identifier: &str) -> Result<&ScoreTable> {
        self.scores
            .iter()
            .find(|s| s.identifier() == identifier)
            .ok_or_else(|| AtlasError::not_found("score", identifier))
    }

    pub fn region(&self, code: u8) -> Result<&FeatureCollection> {
        self.regions
            .get(&code)
            .ok_or_else(|| AtlasError::not_found("region", code))
    }

    /// Boundaries of `region` with the `identifier` score written to `target`.
    pub fn paint_region(
        &self,
        identifier: &str,
        region: u8,
        code_property: &str,
        target: &str,
    ) -> Result<FeatureCollection> {
        let score = self.score(identifier)?;
        let boundaries = self.region(region)?;
        Ok(score.apply_scores_to_geometry(boundaries, code_property, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::REGION_CODES;
    use crate::score::ScoreSource;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_fixture(root: &Path) -> AtlasConfig {
        fs::write(
            root.join("cut.csv"),
            "rc,rn,cc,cn\n13,Metropolitana,13101,Santiago\n13,Metropolitana,13110,La Cisterna\n",
        )
        .unwrap();
        fs::write(
            root.join("score.csv"),
            "Cod_comuna,Ranking1\n13110,0.8\n13101,0.2\n",
        )
        .unwrap();
        fs::write(
            root.join("fcast.csv"),
            "ds,comuna,yhat,tasa_dmcs\n2023-01-01,Santiago,1.0,2.0\n",
        )
        .unwrap();

        let geo = root.join("geo");
        fs::create_dir(&geo).unwrap();
        for code in REGION_CODES {
            let feature = json!({
                "type": "Feature",
                "properties": { "cod_comuna": code as i64 * 1000 + 101 },
                "geometry": null
            });
            let fc = json!({ "type": "FeatureCollection", "features": [feature] });
            fs::write(geo.join(format!("{code}.geojson")), fc.to_string()).unwrap();
        }

        AtlasConfig {
            code_table: root.join("cut.csv"),
            geo_dir: geo,
            forecast: root.join("fcast.csv"),
            scores: vec![ScoreSource {
                identifier: "Siniestros".to_string(),
                path: root.join("score.csv"),
                code_column: "Cod_comuna".to_string(),
                score_column: "Ranking1".to_string(),
                regional: false,
                additional_columns: Vec::new(),
            }],
            ..AtlasConfig::default()
        }
    }

    #[test]
    fn loads_everything_and_paints_regions() {
        let dir = tempdir().unwrap();
        let atlas = Atlas::load(&write_fixture(dir.path())).unwrap();

        assert_eq!(atlas.codes().communes().len(), 2);
        assert_eq!(atlas.regions().len(), 16);
        assert_eq!(atlas.forecast().len(), 1);

        let painted = atlas.paint_region("Siniestros", 13, "cod_comuna", "score").unwrap();
        assert_eq!(painted.features[0].property("score"), Some(&json!(0.2)));

        let other = atlas.paint_region("Siniestros", 5, "cod_comuna", "score").unwrap();
        assert_eq!(other.features[0].property("score"), Some(&json!(-1.0)));

        assert!(matches!(
            atlas.score("Desconocido").err(),
            Some(AtlasError::NotFound { kind: "score", .. })
        ));
        assert!(atlas.region(17).is_err());
    }

    #[test]
    fn a_broken_score_source_fails_the_load() {
        let dir = tempdir().unwrap();
        let mut config = write_fixture(dir.path());
        config.scores[0].score_column = "Ranking2".to_string();

        assert!(matches!(
            Atlas::load(&config).err(),
            Some(AtlasError::DataLoad { .. })
        ));
    }
}
