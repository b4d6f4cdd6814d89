//! College Dashboard - Enrollment analysis for French middle schools
//!
//! Loads the enrollment CSV and the departments GeoJSON and computes every
//! panel of the enrollment page, ready for a chart and map renderer.

pub mod dashboard;
pub mod data;
pub mod map;
pub mod stats;
