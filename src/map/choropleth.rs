//! Choropleth Builder Module
//! Joins department student counts to map features and colours them.

use crate::data::AggregateRow;
use crate::map::features::{FeatureSet, GeoFeature};
use crate::map::palette::{Color, ColorScale, BORDER, HIGHLIGHT_BORDER, UNAVAILABLE_FILL};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Width of a normalized department code.
pub const CODE_WIDTH: usize = 3;

pub const LEGEND: &str = "Number of students per department";

/// Resolved student count of a department in the selected year.
///
/// `Known(0)` means the department reported no students; `Unavailable`
/// means there is no row for it at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentCount {
    Known(i64),
    Unavailable,
}

impl fmt::Display for StudentCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentCount::Known(n) => write!(f, "{}", n),
            StudentCount::Unavailable => f.write_str("Not available"),
        }
    }
}

/// Appearance of a feature as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    pub border: Color,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

impl FeatureStyle {
    fn base(fill: Color) -> Self {
        Self {
            fill: Some(fill),
            border: BORDER,
            weight: 0.5,
            fill_opacity: Some(0.7),
        }
    }

    /// Override applied while the pointer is over a department.
    fn highlight() -> Self {
        Self {
            fill: None,
            border: HIGHLIGHT_BORDER,
            weight: 3.0,
            fill_opacity: None,
        }
    }
}

/// A department feature with its count, colour and label resolved.
#[derive(Debug, Clone, Serialize)]
pub struct JoinedFeature {
    pub code: String,
    pub name: String,
    pub students: StudentCount,
    pub label: String,
    pub style: FeatureStyle,
    pub highlight: FeatureStyle,
    pub geometry: Value,
}

impl JoinedFeature {
    pub fn fill(&self) -> Color {
        self.style.fill.unwrap_or(UNAVAILABLE_FILL)
    }
}

/// The finished map: fitted scale plus one joined feature per department.
#[derive(Debug, Clone, Serialize)]
pub struct Choropleth {
    pub legend: String,
    pub scale: Option<ColorScale>,
    pub features: Vec<JoinedFeature>,
}

/// Left-pad a purely numeric code to three digits ("1" -> "001").
///
/// Returns `None` for empty, non-numeric or over-long codes.
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() || code.len() > CODE_WIDTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>width$}", code, width = CODE_WIDTH))
}

/// Zero-fill any code for display, numeric or not ("2A" -> "02A").
fn display_code(code: &str) -> String {
    format!("{:0>width$}", code.trim(), width = CODE_WIDTH)
}

/// Sum aggregate rows into a normalized code -> students lookup.
///
/// Rows whose code cannot be normalized are skipped. Codes that only differ
/// by padding ("1" and "01") land on the same entry.
pub fn department_lookup(aggregates: &[AggregateRow]) -> HashMap<String, i64> {
    let mut lookup = HashMap::new();
    for row in aggregates {
        match normalize_code(row.key()) {
            Some(code) => *lookup.entry(code).or_insert(0) += row.value(),
            None => warn!(
                "Skipping department code '{}': not a 1-3 digit code",
                row.key()
            ),
        }
    }
    lookup
}

/// Join every feature to its department total and colour it.
///
/// Produces exactly one joined feature per input feature, in input order.
pub fn build_choropleth(features: &FeatureSet, aggregates: &[AggregateRow]) -> Choropleth {
    let lookup = department_lookup(aggregates);
    let scale = ColorScale::fit(lookup.values().copied());

    let joined: Vec<JoinedFeature> = features
        .features()
        .iter()
        .map(|feature| join_feature(feature, &lookup, scale.as_ref()))
        .collect();

    let unavailable = joined
        .iter()
        .filter(|f| f.students == StudentCount::Unavailable)
        .count();
    debug!(
        "choropleth: {} features, {} without data",
        joined.len(),
        unavailable
    );

    Choropleth {
        legend: LEGEND.to_string(),
        scale,
        features: joined,
    }
}

fn join_feature(
    feature: &GeoFeature,
    lookup: &HashMap<String, i64>,
    scale: Option<&ColorScale>,
) -> JoinedFeature {
    let students = normalize_code(&feature.code)
        .and_then(|code| lookup.get(&code).copied())
        .map_or(StudentCount::Unavailable, StudentCount::Known);

    let fill = match (students, scale) {
        (StudentCount::Known(n), Some(scale)) => scale.color(n as f64),
        _ => UNAVAILABLE_FILL,
    };

    let code = display_code(&feature.code);
    let label = format!(
        "Name: {}\nDepartment Code: {}\nNumber of Students: {}",
        feature.name, code, students
    );

    JoinedFeature {
        code,
        name: feature.name.clone(),
        students,
        label,
        style: FeatureStyle::base(fill),
        highlight: FeatureStyle::highlight(),
        geometry: feature.geometry.clone(),
    }
}
