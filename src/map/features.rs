//! Department Features Module
//! Reads the departments GeoJSON feature collection.

use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Property holding the department code.
pub const CODE_PROPERTY: &str = "code";
/// Property holding the department name.
pub const NAME_PROPERTY: &str = "nom";

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Failed to read {path}: {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Feature {index}: {message}")]
    Schema { index: usize, message: String },
}

/// One department polygon with its identifying properties.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub code: String,
    pub name: String,
    pub geometry: Value,
}

#[derive(Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Value,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Read-only set of department features.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<GeoFeature>,
}

impl FeatureSet {
    /// Load a GeoJSON feature collection from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| MapError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::from_bytes(&bytes)?;
        info!("Loaded {} features from {}", set.len(), path.display());
        Ok(set)
    }

    /// Parse GeoJSON bytes; every feature must carry a code and a name.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MapError> {
        let raw: RawCollection = serde_json::from_slice(bytes)?;

        let features = raw
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| Self::parse_feature(index, feature))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { features })
    }

    fn parse_feature(index: usize, feature: RawFeature) -> Result<GeoFeature, MapError> {
        let schema_error = |message: String| MapError::Schema { index, message };
        let properties = feature
            .properties
            .ok_or_else(|| schema_error("missing properties".to_string()))?;

        let code = match properties.get(CODE_PROPERTY) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(schema_error(format!("missing '{}' property", CODE_PROPERTY))),
        };
        let name = match properties.get(NAME_PROPERTY) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(schema_error(format!("missing '{}' property", NAME_PROPERTY))),
        };

        Ok(GeoFeature {
            code,
            name,
            geometry: feature.geometry,
        })
    }

    pub fn features(&self) -> &[GeoFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
