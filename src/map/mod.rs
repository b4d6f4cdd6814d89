//! Map module - Department features and choropleth construction

mod choropleth;
mod features;
mod palette;

pub use choropleth::{
    build_choropleth, department_lookup, normalize_code, Choropleth, FeatureStyle, JoinedFeature,
    StudentCount,
};
pub use features::{FeatureSet, GeoFeature, MapError};
pub use palette::{Color, ColorScale};
