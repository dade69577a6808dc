//! GeoJSON text boundary
//!
//! A single-trajectory container becomes one `Feature`; a multi-trajectory
//! container becomes a `FeatureCollection` with one feature per column. An
//! optional callback token wraps the document as `token(<document>)`.

use crate::errors::{GliderError, Result};
use crate::projector::{FeatureId, Geometry, TrajectoryLine, TrajectoryProjector};
use crate::reader::ContainerReader;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;

/// Output shaping for [`geojson`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoJsonOptions {
    /// JavaScript identifier path used to wrap the document.
    pub callback: Option<String>,
    /// Indent the JSON text.
    pub pretty: bool,
}

impl GeoJsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// A GeoJSON LineString.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LineString {
    /// Type identifier (always "LineString").
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub coordinates: Vec<[f64; 2]>,
}

/// A GeoJSON Feature carrying one trajectory line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,

    pub geometry: LineString,

    pub properties: Map<String, JsonValue>,
}

impl From<&TrajectoryLine> for Feature {
    fn from(line: &TrajectoryLine) -> Self {
        Self {
            type_: "Feature",
            id: line.id.as_ref().map(|id| match id {
                FeatureId::Text(s) => JsonValue::String(s.clone()),
                FeatureId::Number(n) => JsonValue::from(*n),
            }),
            geometry: LineString {
                type_: "LineString",
                coordinates: line.coordinates.clone(),
            },
            properties: line.properties.to_json_map(),
        }
    }
}

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub features: Vec<Feature>,
}

/// Either document shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Document {
    Feature(Feature),
    FeatureCollection(FeatureCollection),
}

impl From<&Geometry> for Document {
    fn from(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::SingleLine(line) => Document::Feature(Feature::from(line)),
            Geometry::MultiLine(lines) => Document::FeatureCollection(FeatureCollection {
                type_: "FeatureCollection",
                features: lines.iter().map(Feature::from).collect(),
            }),
        }
    }
}

/// Render a projected geometry as GeoJSON text.
pub fn render(geometry: &Geometry, options: &GeoJsonOptions) -> Result<String> {
    let document = Document::from(geometry);
    let text = if options.pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };

    match options.callback.as_deref() {
        Some(token) => {
            validate_callback(token)?;
            Ok(format!("{}({})", token, text))
        }
        None => Ok(text),
    }
}

/// Open `source`, project it and render the GeoJSON document.
pub fn geojson(source: impl AsRef<Path>, options: &GeoJsonOptions) -> Result<String> {
    if let Some(token) = options.callback.as_deref() {
        validate_callback(token)?;
    }
    let reader = ContainerReader::open(source)?;
    let geometry = TrajectoryProjector::new().project(&reader)?;
    render(&geometry, options)
}

/// Same document as [`geojson`], kept as a separate entry point for line
/// consumers.
pub fn geojson_line(source: impl AsRef<Path>, options: &GeoJsonOptions) -> Result<String> {
    geojson(source, options)
}

/// Accept only dotted JavaScript identifier paths such as `cb` or
/// `window.app.render`.
pub fn validate_callback(token: &str) -> Result<()> {
    let is_segment = |segment: &str| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            }
            _ => false,
        }
    };

    if token.split('.').all(is_segment) {
        Ok(())
    } else {
        Err(GliderError::InvalidCallback(token.to_string()))
    }
}
