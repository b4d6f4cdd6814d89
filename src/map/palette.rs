//! Colour Palette Module
//! Sequential colour scale for the department choropleth.

use serde::{Serialize, Serializer};
use std::fmt;

/// An opaque RGB colour, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    fn lerp(self, other: Color, t: f64) -> Color {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::from_rgb(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Fill for departments without data
pub const UNAVAILABLE_FILL: Color = Color::from_rgb(0, 0, 0);
/// Department border
pub const BORDER: Color = Color::from_rgb(0, 0, 0);
/// Border of a highlighted department
pub const HIGHLIGHT_BORDER: Color = Color::from_rgb(0, 0, 255);

/// ColorBrewer YlOrRd, light to dark.
pub const YL_OR_RD: [Color; 9] = [
    Color::from_rgb(255, 255, 204), // #FFFFCC
    Color::from_rgb(255, 237, 160), // #FFEDA0
    Color::from_rgb(254, 217, 118), // #FED976
    Color::from_rgb(254, 178, 76),  // #FEB24C
    Color::from_rgb(253, 141, 60),  // #FD8D3C
    Color::from_rgb(252, 78, 42),   // #FC4E2A
    Color::from_rgb(227, 26, 28),   // #E31A1C
    Color::from_rgb(189, 0, 38),    // #BD0026
    Color::from_rgb(128, 0, 38),    // #800026
];

/// Continuous scale from the smallest to the largest available value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    /// Fit the scale to `values`; `None` when there is nothing to fit.
    pub fn fit(values: impl IntoIterator<Item = i64>) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            let v = v as f64;
            min = min.min(v);
            max = max.max(v);
        }
        if min.is_infinite() {
            return None;
        }
        Some(Self { min, max })
    }

    /// Colour of `value`; values outside the fitted range are clamped.
    pub fn color(&self, value: f64) -> Color {
        let span = self.max - self.min;
        let t = if span > 0.0 {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let pos = t * (YL_OR_RD.len() - 1) as f64;
        let lower = pos.floor() as usize;
        let upper = (pos.ceil() as usize).min(YL_OR_RD.len() - 1);
        YL_OR_RD[lower].lerp(YL_OR_RD[upper], pos - lower as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_formatting() {
        assert_eq!(Color::from_rgb(255, 237, 160).to_hex(), "#FFEDA0");
        assert_eq!(UNAVAILABLE_FILL.to_string(), "#000000");
    }

    #[test]
    fn endpoints_map_to_ramp_ends() {
        let scale = ColorScale::fit([100, 400, 250]).unwrap();
        assert_eq!(scale.min, 100.0);
        assert_eq!(scale.max, 400.0);
        assert_eq!(scale.color(100.0), YL_OR_RD[0]);
        assert_eq!(scale.color(400.0), YL_OR_RD[8]);
        assert_eq!(scale.color(10_000.0), YL_OR_RD[8]);
    }

    #[test]
    fn midpoint_hits_middle_stop() {
        let scale = ColorScale::fit([0, 800]).unwrap();
        assert_eq!(scale.color(400.0), YL_OR_RD[4]);
    }

    #[test]
    fn degenerate_range_uses_middle_stop() {
        let scale = ColorScale::fit([42]).unwrap();
        assert_eq!(scale.color(42.0), YL_OR_RD[4]);
    }

    #[test]
    fn empty_values_fit_nothing() {
        assert!(ColorScale::fit(Vec::new()).is_none());
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&Color::from_rgb(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");
    }
}
