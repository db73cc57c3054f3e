//! Forecast Table Module
//! Precomputed crime-rate forecasts per commune and date.

use crate::data::loader::{float_values, load_table, require_column, string_values};
use crate::error::{AtlasError, Result};
use crate::geo::{float_value, FeatureCollection};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Column names of the forecast file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastColumns {
    pub date: String,
    pub commune: String,
    pub forecast: String,
    pub observed: String,
}

impl Default for ForecastColumns {
    fn default() -> Self {
        Self {
            date: "ds".to_string(),
            commune: "comuna".to_string(),
            forecast: "yhat".to_string(),
            observed: "tasa_dmcs".to_string(),
        }
    }
}

/// One commune on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub commune: String,
    pub forecast: f64,
    pub observed: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ForecastTable {
    columns: ForecastColumns,
    points: Vec<ForecastPoint>,
}

/// Parse `YYYY-MM-DD`, optionally followed by a time of day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// [`parse_date`] with an error message, for argument parsers.
pub fn parse_date_arg(text: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(text).ok_or_else(|| format!("`{text}` is not a YYYY-MM-DD date"))
}

impl ForecastTable {
    pub fn new(columns: ForecastColumns, points: Vec<ForecastPoint>) -> Self {
        Self { columns, points }
    }

    /// Load a forecast file. Rows without a parsable date or a commune are skipped.
    pub fn load(path: &Path, columns: ForecastColumns) -> Result<Self> {
        let df = load_table(path)?;
        for column in [
            &columns.date,
            &columns.commune,
            &columns.forecast,
            &columns.observed,
        ] {
            require_column(&df, column, path)?;
        }

        let dates = string_values(df.column(&columns.date)?)?;
        let communes = string_values(df.column(&columns.commune)?)?;
        let forecasts = float_values(df.column(&columns.forecast)?)?;
        let observed = float_values(df.column(&columns.observed)?)?;

        let mut skipped = 0usize;
        let mut points = Vec::with_capacity(df.height());
        for (((date, commune), forecast), observed) in dates
            .into_iter()
            .zip(communes)
            .zip(forecasts)
            .zip(observed)
        {
            match (date.as_deref().and_then(parse_date), commune) {
                (Some(date), Some(commune)) => points.push(ForecastPoint {
                    date,
                    commune,
                    forecast,
                    observed,
                }),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(path = %path.display(), skipped, "forecast rows without date or commune");
        }
        info!(path = %path.display(), rows = points.len(), "loaded forecast table");
        Ok(Self { columns, points })
    }

    pub fn columns(&self) -> &ForecastColumns {
        &self.columns
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct dates in first-seen order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut seen = HashSet::new();
        self.points
            .iter()
            .filter(|p| seen.insert(p.date))
            .map(|p| p.date)
            .collect()
    }

    /// Distinct commune names in first-seen order.
    pub fn communes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.points
            .iter()
            .map(|p| p.commune.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Every point of one commune, oldest first.
    pub fn series(&self, commune: &str) -> Result<Vec<&ForecastPoint>> {
        let mut series: Vec<&ForecastPoint> =
            self.points.iter().filter(|p| p.commune == commune).collect();
        if series.is_empty() {
            return Err(AtlasError::not_found("commune", commune));
        }
        series.sort_by_key(|p| p.date);
        Ok(series)
    }

    /// Every point on `date`, in file order.
    pub fn snapshot(&self, date: NaiveDate) -> Vec<&ForecastPoint> {
        self.points.iter().filter(|p| p.date == date).collect()
    }

    /// Inner join of `collection` with the points on `date`, matching the
    /// feature's `name_property` against the commune name.
    ///
    /// Matched features gain the date, forecast and observed values under the
    /// file's column names; features without a match are dropped.
    pub fn join_geometry(
        &self,
        collection: &FeatureCollection,
        name_property: &str,
        date: NaiveDate,
    ) -> FeatureCollection {
        let snapshot = self.snapshot(date);
        let mut out = FeatureCollection {
            features: Vec::new(),
            ..collection.clone()
        };

        for feature in &collection.features {
            let Some(name) = feature.text_property(name_property) else {
                continue;
            };
            for point in snapshot.iter().filter(|p| p.commune == name) {
                let mut joined = feature.clone();
                joined.set_property(&self.columns.commune, Value::String(point.commune.clone()));
                joined.set_property(&self.columns.date, Value::String(point.date.to_string()));
                joined.set_property(&self.columns.forecast, float_value(point.forecast));
                joined.set_property(&self.columns.observed, float_value(point.observed));
                out.features.push(joined);
            }
        }
        out
    }
}
