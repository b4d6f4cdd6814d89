//! Enrollment Dashboard Page
//! Runs every panel of the enrollment page for one year/region selection.
//!
//! Panels fail independently: a broken input only turns the panels that
//! depend on it into an inline message, the rest of the page still renders.

use crate::dashboard::DashboardSettings;
use crate::data::schema::Track;
use crate::data::{AggregateRow, DataLoader, LoadError, Table};
use crate::map::{build_choropleth, Choropleth, FeatureSet, MapError};
use crate::stats::{
    GenderImbalance, GenderTotals, LanguageByGrade, LanguageTotal, RegionLanguages, SectorAverage,
    SectorShare, StatsCalculator,
};
use log::{error, info, warn};
use serde::Serialize;
use std::fmt::Display;

pub const PAGE_TITLE: &str = "Analysis of Middle School Student Enrollment";

/// One chart or table of the page: either its finished data or the message
/// shown in its place.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready { data: T },
    Unavailable { message: String },
}

impl<T> Panel<T> {
    fn from_result<E: Display>(name: &str, result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Panel::Ready { data },
            Err(e) => {
                warn!("Panel '{}' unavailable: {}", name, e);
                Panel::Unavailable {
                    message: e.to_string(),
                }
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Panel::Ready { data } => Some(data),
            Panel::Unavailable { .. } => None,
        }
    }
}

/// Everything the renderer needs for one pass over the page.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub title: String,
    pub years: Vec<String>,
    pub year: Option<String>,
    pub regions: Vec<String>,
    pub region: Option<String>,
    pub students_by_region: Panel<Vec<AggregateRow>>,
    pub top_regions: Panel<Vec<AggregateRow>>,
    pub department_map: Panel<Choropleth>,
    pub gender_totals: Panel<GenderTotals>,
    pub gender_imbalance: Panel<Vec<GenderImbalance>>,
    pub lv1_totals: Panel<Vec<LanguageTotal>>,
    pub lv2_totals: Panel<Vec<LanguageTotal>>,
    pub languages_by_grade: Panel<Vec<LanguageByGrade>>,
    pub region_languages: Panel<RegionLanguages>,
    pub students_by_sector: Panel<Vec<AggregateRow>>,
    pub sector_averages: Panel<Vec<SectorAverage>>,
    pub sector_share: Panel<Vec<SectorShare>>,
}

/// Builds dashboard reports.
pub struct Dashboard;

impl Dashboard {
    /// Load both input files and render the page for the configured selection.
    pub fn build(settings: &DashboardSettings) -> DashboardReport {
        let table = DataLoader::load(&settings.csv_path);
        if let Err(e) = &table {
            error!("Enrollment data unavailable: {}", e);
        }
        let features = FeatureSet::load(&settings.geojson_path);
        if let Err(e) = &features {
            error!("Department map unavailable: {}", e);
        }

        Self::render(table.as_ref(), features.as_ref(), settings)
    }

    /// Render the page from already-loaded inputs.
    ///
    /// A load error is shown as the message of every panel that needs the
    /// failed input.
    pub fn render(
        table: Result<&Table, &LoadError>,
        features: Result<&FeatureSet, &MapError>,
        settings: &DashboardSettings,
    ) -> DashboardReport {
        if let Ok(table) = table {
            let absent = table.schema().absent_columns();
            if !absent.is_empty() {
                info!(
                    "{} known columns absent, counted as zero: {}",
                    absent.len(),
                    absent.join(", ")
                );
            }
        }

        let years = table.map(Table::distinct_years).unwrap_or_default();
        let year = settings.year.clone().or_else(|| years.first().cloned());

        let filtered: Result<Table, String> = match (table, &year) {
            (Ok(table), Some(year)) => table.for_year(year).map_err(|e| e.to_string()),
            (Ok(_), None) => Err("No academic year available".to_string()),
            (Err(e), _) => Err(e.to_string()),
        };
        let features = features.map_err(|e| e.to_string());

        let regions = filtered
            .as_ref()
            .map(Table::distinct_regions)
            .unwrap_or_default();
        let region = settings.region.clone().or_else(|| regions.first().cloned());

        if let (Ok(t), Some(y)) = (&filtered, &year) {
            info!("Rendering {} rows for {}", t.row_count(), y);
        }

        let students_by_region = Self::panel("students_by_region", &filtered, |t| {
            StatsCalculator::students_by_region(t)
        });
        let top_regions = match students_by_region.data() {
            Some(rows) => Panel::Ready {
                data: StatsCalculator::top_n(rows, settings.top_n),
            },
            None => Panel::Unavailable {
                message: "Regional totals unavailable".to_string(),
            },
        };

        let department_map = match (&filtered, &features) {
            (Ok(t), Ok(features)) => Panel::from_result(
                "department_map",
                StatsCalculator::students_by_department(t)
                    .map(|rows| build_choropleth(features, &rows)),
            ),
            (Err(e), _) | (_, Err(e)) => {
                Panel::from_result::<String>("department_map", Err(e.clone()))
            }
        };

        let region_languages = match &region {
            Some(region) => Self::panel("region_languages", &filtered, |t| {
                StatsCalculator::region_languages(t, region)
            }),
            None => Panel::Unavailable {
                message: "No academic region available".to_string(),
            },
        };

        DashboardReport {
            title: PAGE_TITLE.to_string(),
            years,
            year,
            regions,
            region,
            students_by_region,
            top_regions,
            department_map,
            gender_totals: Self::panel("gender_totals", &filtered, StatsCalculator::gender_totals),
            gender_imbalance: Self::panel(
                "gender_imbalance",
                &filtered,
                StatsCalculator::gender_imbalance,
            ),
            lv1_totals: Self::panel("lv1_totals", &filtered, |t| {
                StatsCalculator::language_totals(t, Track::Lv1)
            }),
            lv2_totals: Self::panel("lv2_totals", &filtered, |t| {
                StatsCalculator::language_totals(t, Track::Lv2)
            }),
            languages_by_grade: Self::panel(
                "languages_by_grade",
                &filtered,
                StatsCalculator::languages_by_grade,
            ),
            region_languages,
            students_by_sector: Self::panel(
                "students_by_sector",
                &filtered,
                StatsCalculator::students_by_sector,
            ),
            sector_averages: Self::panel(
                "sector_averages",
                &filtered,
                StatsCalculator::sector_averages,
            ),
            sector_share: Self::panel("sector_share", &filtered, StatsCalculator::sector_share),
        }
    }

    fn panel<T, E: Display>(
        name: &str,
        table: &Result<Table, String>,
        compute: impl FnOnce(&Table) -> Result<T, E>,
    ) -> Panel<T> {
        match table {
            Ok(table) => Panel::from_result(name, compute(table)),
            Err(e) => Panel::from_result::<String>(name, Err(e.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::StudentCount;

    const CSV: &str = "\
Rentrée scolaire;Région académique;Code département;Secteur;Nombre d'élèves total;6èmes filles;6èmes garçons;6èmes LV1 anglais
2022;BRETAGNE;29;PUBLIC;400;210;190;380
2022;BRETAGNE;35;PRIVE;250;120;130;240
2022;NORMANDIE;14;PUBLIC;300;140;160;290
2021;BRETAGNE;29;PUBLIC;390;200;190;370
";

    const GEOJSON: &str = r#"{"features": [
        {"geometry": null, "properties": {"code": "29", "nom": "Finistère"}},
        {"geometry": null, "properties": {"code": "14", "nom": "Calvados"}},
        {"geometry": null, "properties": {"code": "50", "nom": "Manche"}}
    ]}"#;

    fn inputs() -> (Table, FeatureSet) {
        (
            DataLoader::load_str(CSV).unwrap(),
            FeatureSet::from_bytes(GEOJSON.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn defaults_to_first_year_and_region() {
        let (table, features) = inputs();
        let report = Dashboard::render(Ok(&table), Ok(&features), &DashboardSettings::default());

        assert_eq!(report.years, vec!["2022", "2021"]);
        assert_eq!(report.year.as_deref(), Some("2022"));
        assert_eq!(report.regions, vec!["BRETAGNE", "NORMANDIE"]);
        assert_eq!(report.region.as_deref(), Some("BRETAGNE"));

        let top = report.top_regions.data().unwrap();
        assert_eq!(top[0].key(), "BRETAGNE");
        assert_eq!(top[0].value(), 650);

        let map = report.department_map.data().unwrap();
        assert_eq!(map.features.len(), 3);
        assert_eq!(map.features[0].students, StudentCount::Known(400));
        assert_eq!(map.features[2].students, StudentCount::Unavailable);
    }

    #[test]
    fn selected_year_and_region_are_applied() {
        let (table, features) = inputs();
        let settings = DashboardSettings {
            year: Some("2021".to_string()),
            region: Some("BRETAGNE".to_string()),
            ..DashboardSettings::default()
        };
        let report = Dashboard::render(Ok(&table), Ok(&features), &settings);

        assert_eq!(report.regions, vec!["BRETAGNE"]);
        let langs = report.region_languages.data().unwrap();
        assert_eq!(langs.lv1[1].students, 370);
        assert_eq!(report.gender_totals.data().unwrap().girls, 200);
    }

    #[test]
    fn map_failure_only_affects_the_map() {
        let (table, _) = inputs();
        let failure = MapError::Schema {
            index: 0,
            message: "missing 'nom' property".to_string(),
        };
        let report = Dashboard::render(Ok(&table), Err(&failure), &DashboardSettings::default());

        match &report.department_map {
            Panel::Unavailable { message } => assert_eq!(message, &failure.to_string()),
            Panel::Ready { .. } => panic!("expected an unavailable map"),
        }
        assert!(report.students_by_region.data().is_some());
        assert!(report.sector_share.data().is_some());
    }

    #[test]
    fn table_failure_becomes_inline_messages() {
        let (_, features) = inputs();
        let failure = LoadError::EmptyFile;
        let report = Dashboard::render(Err(&failure), Ok(&features), &DashboardSettings::default());

        assert!(report.years.is_empty());
        match &report.gender_imbalance {
            Panel::Unavailable { message } => assert_eq!(message, &failure.to_string()),
            Panel::Ready { .. } => panic!("expected an unavailable panel"),
        }

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["department_map"]["status"], "unavailable");
    }

    #[test]
    fn build_reports_missing_files_inline() {
        let settings = DashboardSettings {
            csv_path: "/nonexistent/enrollment.csv".into(),
            geojson_path: "/nonexistent/departements.geojson".into(),
            ..DashboardSettings::default()
        };
        let report = Dashboard::build(&settings);
        assert!(report.students_by_region.data().is_none());
        assert!(report.department_map.data().is_none());
    }

    #[test]
    fn missing_department_column_only_disables_dependent_panels() {
        let csv = "\
Rentrée scolaire;Région académique;Secteur;Nombre d'élèves total
2022;BRETAGNE;PUBLIC;400
2022;NORMANDIE;PRIVE;300
";
        let table = DataLoader::load_str(csv).unwrap();
        let (_, features) = inputs();
        let report = Dashboard::render(Ok(&table), Ok(&features), &DashboardSettings::default());

        match &report.department_map {
            Panel::Unavailable { message } => assert!(message.contains("Code département")),
            Panel::Ready { .. } => panic!("expected an unavailable map"),
        }
        assert_eq!(report.students_by_region.data().unwrap().len(), 2);
        assert!(report.sector_share.data().is_some());
    }

    #[test]
    fn missing_sector_column_disables_sector_panels() {
        let csv = "\
Rentrée scolaire;Région académique;Code département;Nombre d'élèves total
2022;BRETAGNE;29;400
";
        let table = DataLoader::load_str(csv).unwrap();
        let (_, features) = inputs();
        let report = Dashboard::render(Ok(&table), Ok(&features), &DashboardSettings::default());

        assert!(report.sector_share.data().is_none());
        assert!(report.students_by_sector.data().is_none());
        assert!(report.sector_averages.data().is_none());
        assert!(report.department_map.data().is_some());
        assert!(report.gender_totals.data().is_some());
    }
}
