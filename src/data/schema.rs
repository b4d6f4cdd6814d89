//! Enrollment Schema Module
//! Column names of the enrollment dataset and the enumerated mapping from
//! (grade, gender, language track) combinations to source columns.

use serde::Serialize;
use std::collections::HashMap;

pub const YEAR: &str = "Rentrée scolaire";
pub const REGION: &str = "Région académique";
pub const DEPARTMENT_CODE: &str = "Code département";
pub const DEPARTMENT_NAME: &str = "Département";
pub const SECTOR: &str = "Secteur";
pub const TOTAL_STUDENTS: &str = "Nombre d'élèves total";

/// Sector labels as written in the source.
pub const SECTOR_PUBLIC: &str = "PUBLIC";
pub const SECTOR_PRIVATE: &str = "PRIVE";

/// Columns the year and region selectors cannot work without. Panels grouped
/// by other columns fail on their own when those are absent.
pub const REQUIRED_COLUMNS: [&str; 2] = [YEAR, REGION];

/// Columns read as text so codes keep their exact source formatting.
pub const TEXT_COLUMNS: [&str; 8] = [
    YEAR,
    REGION,
    DEPARTMENT_CODE,
    DEPARTMENT_NAME,
    SECTOR,
    "Académie",
    "Numéro du collège",
    "Dénomination principale",
];

/// Middle-school grade levels, youngest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grade {
    #[serde(rename = "6th")]
    Sixth,
    #[serde(rename = "5th")]
    Fifth,
    #[serde(rename = "4th")]
    Fourth,
    #[serde(rename = "3rd")]
    Third,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Sixth, Grade::Fifth, Grade::Fourth, Grade::Third];

    fn prefix(self) -> &'static str {
        match self {
            Grade::Sixth => "6èmes",
            Grade::Fifth => "5èmes",
            Grade::Fourth => "4èmes",
            Grade::Third => "3èmes",
        }
    }

    /// Column holding the total number of students in this grade.
    pub fn total_column(self) -> String {
        format!("{} total", self.prefix())
    }

    /// Column holding the number of students of `gender` in this grade.
    pub fn gender_column(self, gender: Gender) -> String {
        format!("{} {}", self.prefix(), gender.source_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    Boys,
    Girls,
}

impl Gender {
    fn source_name(self) -> &'static str {
        match self {
            Gender::Boys => "garçons",
            Gender::Girls => "filles",
        }
    }
}

/// First or second foreign-language track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Track {
    #[serde(rename = "LV1")]
    Lv1,
    #[serde(rename = "LV2")]
    Lv2,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::Lv1, Track::Lv2];

    fn source_name(self) -> &'static str {
        match self {
            Track::Lv1 => "LV1",
            Track::Lv2 => "LV2",
        }
    }

    /// Languages reported for this track, in display order.
    pub fn languages(self) -> &'static [Language] {
        match self {
            Track::Lv1 => &[
                Language::German,
                Language::English,
                Language::Spanish,
                Language::Other,
            ],
            Track::Lv2 => &[
                Language::German,
                Language::English,
                Language::Spanish,
                Language::Italian,
                Language::Other,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    German,
    English,
    Spanish,
    Italian,
    Other,
}

impl Language {
    fn source_name(self) -> &'static str {
        match self {
            Language::German => "allemand",
            Language::English => "anglais",
            Language::Spanish => "espagnol",
            Language::Italian => "italien",
            Language::Other => "autres langues",
        }
    }
}

/// Column names that may hold the (track, language, grade) count.
///
/// The published dataset spells the sixth-grade LV2 "other" column in the
/// singular, so that combination has two accepted spellings.
pub fn language_column_candidates(track: Track, language: Language, grade: Grade) -> Vec<String> {
    let mut candidates = vec![format!(
        "{} {} {}",
        grade.prefix(),
        track.source_name(),
        language.source_name()
    )];
    if track == Track::Lv2 && language == Language::Other && grade == Grade::Sixth {
        candidates.push(format!(
            "6ème {} {}",
            track.source_name(),
            language.source_name()
        ));
    }
    candidates
}

/// Which known columns a loaded table actually carries.
///
/// Built once at load time; aggregation code asks it for the concrete column
/// of a combination and treats `None` as a zero contribution.
#[derive(Debug, Clone, Default)]
pub struct SchemaReport {
    language_columns: HashMap<(Track, Language, Grade), String>,
    absent: Vec<String>,
}

impl SchemaReport {
    /// Resolve every enumerated combination against the table's column names.
    pub fn from_columns(columns: &[String]) -> Self {
        let has = |name: &str| columns.iter().any(|c| c == name);
        let mut report = SchemaReport::default();

        for track in Track::ALL {
            for &language in track.languages() {
                for grade in Grade::ALL {
                    let candidates = language_column_candidates(track, language, grade);
                    match candidates.iter().find(|c| has(c)) {
                        Some(found) => {
                            report
                                .language_columns
                                .insert((track, language, grade), found.clone());
                        }
                        None => report.absent.push(candidates[0].clone()),
                    }
                }
            }
        }

        for grade in Grade::ALL {
            let mut expected = vec![grade.total_column()];
            expected.push(grade.gender_column(Gender::Boys));
            expected.push(grade.gender_column(Gender::Girls));
            report
                .absent
                .extend(expected.into_iter().filter(|c| !has(c)));
        }
        if !has(TOTAL_STUDENTS) {
            report.absent.push(TOTAL_STUDENTS.to_string());
        }
        report
    }

    /// Concrete column for a language combination, if the table has one.
    pub fn language_column(&self, track: Track, language: Language, grade: Grade) -> Option<&str> {
        self.language_columns
            .get(&(track, language, grade))
            .map(String::as_str)
    }

    /// Known columns missing from the table.
    pub fn absent_columns(&self) -> &[String] {
        &self.absent
    }
}
