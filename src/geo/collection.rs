//! GeoJSON feature collections with typed `geo` geometry.
//!
//! Geometry is parsed through `geojson` into `geo::Geometry` so malformed shapes fail at
//! load time; properties and unknown members stay loosely typed JSON so they survive a
//! load/save cycle.

use geo::{BoundingRect, Centroid, Geometry, Rect};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_tag")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single GeoJSON `Feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_tag")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    /// `None` for a GeoJSON `null` geometry.
    #[serde(default, with = "geojson_geometry")]
    pub geometry: Option<Geometry<f64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn collection_tag() -> String {
    "FeatureCollection".to_string()
}

fn feature_tag() -> String {
    "Feature".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// GeoJSON geometry objects on the wire, `geo` types in memory.
mod geojson_geometry {
    use geo::Geometry;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(
        geometry: &Option<Geometry<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g)))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Geometry<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<geojson::Geometry>::deserialize(deserializer)?
            .map(|g| Geometry::try_from(g.value).map_err(D::Error::custom))
            .transpose()
    }
}

/// JSON number for a float; NaN and infinities become `null`.
pub fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_tag(),
            features,
            extra: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounds of every feature geometry, in (lon, lat).
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }

    /// Midpoint of the bounding box as (lon, lat).
    pub fn center(&self) -> Option<(f64, f64)> {
        self.bounding_box().map(|b| b.center().x_y())
    }

    /// Mean of the feature centroids as (lon, lat), the usual map focus for a region.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let centroids: Vec<(f64, f64)> = self
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.centroid())
            .map(|p| p.x_y())
            .collect();
        if centroids.is_empty() {
            return None;
        }
        let n = centroids.len() as f64;
        let (sx, sy) = centroids
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        Some((sx / n, sy / n))
    }
}

impl Feature {
    pub fn new(properties: Map<String, Value>, geometry: Option<Geometry<f64>>) -> Self {
        Self {
            kind: feature_tag(),
            properties,
            geometry,
            extra: Map::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: &str, value: Value) {
        self.properties.insert(name.to_string(), value);
    }

    /// Integer code stored under `name`, either as a number or as numeric text.
    pub fn code_property(&self, name: &str) -> Option<i64> {
        match self.property(name)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text stored under `name`.
    pub fn text_property(&self, name: &str) -> Option<&str> {
        self.property(name)?.as_str()
    }

    /// True for `Polygon` and `MultiPolygon` geometry.
    pub fn is_polygonal(&self) -> bool {
        matches!(
            self.geometry,
            Some(Geometry::Polygon(_)) | Some(Geometry::MultiPolygon(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use serde_json::json;

    fn square(code: Value, x: f64, y: f64) -> Value {
        json!({
            "type": "Feature",
            "properties": { "codigo_comuna": code },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[x, y], [x + 2.0, y], [x + 2.0, y + 2.0], [x, y + 2.0], [x, y]]]
            }
        })
    }

    #[test]
    fn parses_collections_and_keeps_unknown_members() {
        let raw = json!({
            "type": "FeatureCollection",
            "name": "13",
            "features": [square(json!(13101), -70.0, -34.0)]
        });
        let fc: FeatureCollection = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(fc.len(), 1);
        assert!(fc.features[0].is_polygonal());
        assert_eq!(fc.extra.get("name"), Some(&json!("13")));
        assert_eq!(serde_json::to_value(&fc).unwrap(), raw);
    }

    #[test]
    fn null_properties_and_geometry_are_accepted() {
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "properties": null, "geometry": null }]
        }))
        .unwrap();
        assert!(fc.features[0].properties.is_empty());
        assert!(fc.features[0].geometry.is_none());
        assert_eq!(fc.bounding_box(), None);
        assert_eq!(fc.centroid(), None);
    }

    #[test]
    fn malformed_geometry_is_rejected() {
        for geometry in [
            json!("banana"),
            json!({ "type": "Polygon", "coordinates": "nope" }),
            json!({ "type": "Hexagon", "coordinates": [] }),
        ] {
            let parsed = serde_json::from_value::<FeatureCollection>(json!({
                "type": "FeatureCollection",
                "features": [{ "type": "Feature", "properties": {}, "geometry": geometry }]
            }));
            assert!(parsed.is_err(), "{geometry}");
        }
    }

    #[test]
    fn code_property_accepts_numbers_and_text() {
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                square(json!(13101), 0.0, 0.0),
                square(json!("13110"), 0.0, 0.0),
                square(json!(13119.0), 0.0, 0.0),
                square(json!("Santiago"), 0.0, 0.0)
            ]
        }))
        .unwrap();
        let codes: Vec<Option<i64>> = fc
            .features
            .iter()
            .map(|f| f.code_property("codigo_comuna"))
            .collect();
        assert_eq!(codes, vec![Some(13101), Some(13110), Some(13119), None]);
    }

    #[test]
    fn bounds_and_centers_span_all_features() {
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [square(json!(1), -72.0, -36.0), square(json!(2), -70.0, -34.0)]
        }))
        .unwrap();
        assert_eq!(
            fc.bounding_box(),
            Some(Rect::new(
                coord! { x: -72.0, y: -36.0 },
                coord! { x: -68.0, y: -32.0 }
            ))
        );
        assert_eq!(fc.center(), Some((-70.0, -34.0)));

        // centroids (-71, -35) and (-69, -33)
        let (lon, lat) = fc.centroid().unwrap();
        assert!((lon + 70.0).abs() < 1e-9, "{lon}");
        assert!((lat + 34.0).abs() < 1e-9, "{lat}");
    }

    #[test]
    fn nan_is_written_as_null() {
        assert_eq!(float_value(f64::NAN), Value::Null);
        assert_eq!(float_value(-1.0), json!(-1.0));
    }
}
