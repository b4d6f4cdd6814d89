//! Statistics Calculator Module
//! Derived enrollment metrics: rankings, gender balance, sector shares and
//! language preferences, all built on top of grouped sums.

use crate::data::schema::{
    language_column_candidates, Gender, Grade, Language, Track, DEPARTMENT_CODE, REGION,
    SECTOR, SECTOR_PRIVATE, SECTOR_PUBLIC, TOTAL_STUDENTS,
};
use crate::data::{AggregateRow, DataProcessor, ProcessorError, Table};
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Number of regions kept by the ranking panels.
pub const TOP_REGIONS: usize = 10;

/// Languages shown in the per-grade breakdown.
const GRADE_BREAKDOWN_LANGUAGES: [Language; 3] =
    [Language::English, Language::German, Language::Spanish];

/// Gender balance of one academic region.
#[derive(Debug, Clone, Serialize)]
pub struct GenderImbalance {
    pub region: String,
    pub total_boys: i64,
    pub total_girls: i64,
    pub total_students: i64,
    pub percentage_boys: f64,
    pub percentage_girls: f64,
    pub percentage_difference: f64,
    pub majority_gender: Gender,
}

/// Share of private institutions in one academic region.
#[derive(Debug, Clone, Serialize)]
pub struct SectorShare {
    pub region: String,
    pub public_schools: i64,
    pub private_schools: i64,
    pub private_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeGender {
    pub grade: Grade,
    pub girls: i64,
    pub boys: i64,
}

/// Girls and boys overall and per grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderTotals {
    pub girls: i64,
    pub boys: i64,
    pub by_grade: Vec<GradeGender>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageTotal {
    pub language: Language,
    pub students: i64,
}

/// Long-format row of the language-by-grade breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageByGrade {
    pub grade: Grade,
    pub track: Track,
    pub language: Language,
    pub students: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionLanguages {
    pub region: String,
    pub lv1: Vec<LanguageTotal>,
    pub lv2: Vec<LanguageTotal>,
}

/// Average students per institution in one grade, by sector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorAverage {
    pub grade: Grade,
    pub public: Option<f64>,
    pub private: Option<f64>,
}

/// Handles the derived enrollment metrics.
pub struct StatsCalculator;

impl StatsCalculator {
    /// The `n` rows with the largest first sum, largest first.
    ///
    /// The sort is stable, so ties keep their grouping order.
    pub fn top_n(rows: &[AggregateRow], n: usize) -> Vec<AggregateRow> {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|a, b| b.value().cmp(&a.value()));
        sorted.truncate(n);
        sorted
    }

    /// Total students per academic region.
    pub fn students_by_region(table: &Table) -> Result<Vec<AggregateRow>, ProcessorError> {
        DataProcessor::group_sum(table, &[REGION], &[TOTAL_STUDENTS])
    }

    /// Total students per department code, codes as written in the source.
    pub fn students_by_department(table: &Table) -> Result<Vec<AggregateRow>, ProcessorError> {
        DataProcessor::group_sum(table, &[DEPARTMENT_CODE], &[TOTAL_STUDENTS])
    }

    /// Total students per sector.
    pub fn students_by_sector(table: &Table) -> Result<Vec<AggregateRow>, ProcessorError> {
        DataProcessor::group_sum(table, &[SECTOR], &[TOTAL_STUDENTS])
    }

    /// `Boys` only when boys are strictly ahead; an exact tie goes to `Girls`.
    pub fn majority_gender(percentage_boys: f64, percentage_girls: f64) -> Gender {
        if percentage_boys > percentage_girls {
            Gender::Boys
        } else {
            Gender::Girls
        }
    }

    /// Girls and boys summed over the table, overall and per grade.
    pub fn gender_totals(table: &Table) -> Result<GenderTotals, ProcessorError> {
        let fields = Self::gender_fields();
        let sums = Self::grand_totals(table, &fields)?;

        let by_grade: Vec<GradeGender> = Grade::ALL
            .iter()
            .zip(sums.chunks(2))
            .map(|(&grade, pair)| GradeGender {
                grade,
                girls: pair[0],
                boys: pair[1],
            })
            .collect();

        Ok(GenderTotals {
            girls: by_grade.iter().map(|g| g.girls).sum(),
            boys: by_grade.iter().map(|g| g.boys).sum(),
            by_grade,
        })
    }

    /// Regions ranked by the gap between boys' and girls' shares, top 10.
    ///
    /// Regions without students are skipped.
    pub fn gender_imbalance(table: &Table) -> Result<Vec<GenderImbalance>, ProcessorError> {
        let fields = Self::gender_fields();
        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let rows = DataProcessor::group_sum(table, &[REGION], &refs)?;

        let mut ranking: Vec<GenderImbalance> = rows
            .iter()
            .filter_map(|row| {
                let total_girls: i64 = row.sums.iter().step_by(2).sum();
                let total_boys: i64 = row.sums.iter().skip(1).step_by(2).sum();
                Self::imbalance(row.key(), total_boys, total_girls)
            })
            .collect();

        ranking.sort_by(|a, b| {
            b.percentage_difference
                .partial_cmp(&a.percentage_difference)
                .unwrap_or(Ordering::Equal)
        });
        ranking.truncate(TOP_REGIONS);
        Ok(ranking)
    }

    fn imbalance(region: &str, total_boys: i64, total_girls: i64) -> Option<GenderImbalance> {
        let total_students = total_boys + total_girls;
        if total_students == 0 {
            debug!("gender_imbalance: skipping {} (no students)", region);
            return None;
        }

        let percentage_boys = total_boys as f64 / total_students as f64 * 100.0;
        let percentage_girls = total_girls as f64 / total_students as f64 * 100.0;

        Some(GenderImbalance {
            region: region.to_string(),
            total_boys,
            total_girls,
            total_students,
            percentage_boys,
            percentage_girls,
            percentage_difference: (percentage_boys - percentage_girls).abs(),
            majority_gender: Self::majority_gender(percentage_boys, percentage_girls),
        })
    }

    /// Percentage of private institutions per region, highest first.
    ///
    /// Counts institution rows, not students. Regions with neither public
    /// nor private rows are skipped.
    pub fn sector_share(table: &Table) -> Result<Vec<SectorShare>, ProcessorError> {
        let rows = DataProcessor::group_count(table, &[REGION, SECTOR])?;

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, (i64, i64)> = HashMap::new();
        for row in &rows {
            let region = row.keys[0].clone();
            let entry = counts.entry(region.clone()).or_insert_with(|| {
                order.push(region);
                (0, 0)
            });
            match row.keys[1].as_str() {
                SECTOR_PUBLIC => entry.0 += row.value(),
                SECTOR_PRIVATE => entry.1 += row.value(),
                other => debug!("sector_share: ignoring sector '{}'", other),
            }
        }

        let mut shares: Vec<SectorShare> = order
            .into_iter()
            .filter_map(|region| {
                let (public_schools, private_schools) = counts[&region];
                Self::share(region, public_schools, private_schools)
            })
            .collect();

        shares.sort_by(|a, b| {
            b.private_percentage
                .partial_cmp(&a.private_percentage)
                .unwrap_or(Ordering::Equal)
        });
        Ok(shares)
    }

    fn share(region: String, public_schools: i64, private_schools: i64) -> Option<SectorShare> {
        let total = public_schools + private_schools;
        if total == 0 {
            debug!("sector_share: skipping {} (no institutions)", region);
            return None;
        }
        Some(SectorShare {
            region,
            public_schools,
            private_schools,
            private_percentage: private_schools as f64 / total as f64 * 100.0,
        })
    }

    /// Students per language of `track`, summed over every grade.
    pub fn language_totals(table: &Table, track: Track) -> Result<Vec<LanguageTotal>, ProcessorError> {
        let languages = track.languages();
        let fields: Vec<String> = languages
            .iter()
            .flat_map(|&language| {
                Grade::ALL
                    .iter()
                    .map(move |&grade| Self::language_field(table, track, language, grade))
            })
            .collect();
        let sums = Self::grand_totals(table, &fields)?;

        Ok(languages
            .iter()
            .zip(sums.chunks(Grade::ALL.len()))
            .map(|(&language, per_grade)| LanguageTotal {
                language,
                students: per_grade.iter().sum(),
            })
            .collect())
    }

    /// English, German and Spanish per grade for both tracks, in long format.
    pub fn languages_by_grade(table: &Table) -> Result<Vec<LanguageByGrade>, ProcessorError> {
        let mut combos = Vec::new();
        for grade in Grade::ALL {
            for track in Track::ALL {
                for language in GRADE_BREAKDOWN_LANGUAGES {
                    combos.push((grade, track, language));
                }
            }
        }

        let fields: Vec<String> = combos
            .iter()
            .map(|&(grade, track, language)| Self::language_field(table, track, language, grade))
            .collect();
        let sums = Self::grand_totals(table, &fields)?;

        Ok(combos
            .into_iter()
            .zip(sums)
            .map(|((grade, track, language), students)| LanguageByGrade {
                grade,
                track,
                language,
                students,
            })
            .collect())
    }

    /// LV1 and LV2 language totals restricted to one academic region.
    pub fn region_languages(table: &Table, region: &str) -> Result<RegionLanguages, ProcessorError> {
        let region_table = table.for_region(region)?;

        Ok(RegionLanguages {
            region: region.to_string(),
            lv1: Self::language_totals(&region_table, Track::Lv1)?,
            lv2: Self::language_totals(&region_table, Track::Lv2)?,
        })
    }

    /// Mean students per institution row for each grade, by sector.
    pub fn sector_averages(table: &Table) -> Result<Vec<SectorAverage>, ProcessorError> {
        let fields: Vec<String> = Grade::ALL.iter().map(|g| g.total_column()).collect();
        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let rows = DataProcessor::group_mean(table, &[SECTOR], &refs)?;

        let means_for = |sector: &str| {
            rows.iter()
                .find(|row| row.keys[0] == sector)
                .map(|row| row.means.clone())
                .unwrap_or_else(|| vec![None; fields.len()])
        };
        let public = means_for(SECTOR_PUBLIC);
        let private = means_for(SECTOR_PRIVATE);

        Ok(Grade::ALL
            .iter()
            .enumerate()
            .map(|(i, &grade)| SectorAverage {
                grade,
                public: public[i],
                private: private[i],
            })
            .collect())
    }

    /// Girls then boys for each grade, youngest first.
    fn gender_fields() -> Vec<String> {
        Grade::ALL
            .iter()
            .flat_map(|g| [g.gender_column(Gender::Girls), g.gender_column(Gender::Boys)])
            .collect()
    }

    /// Concrete column of a language combination; falls back to the regular
    /// spelling, which the processor counts as zero when absent.
    fn language_field(table: &Table, track: Track, language: Language, grade: Grade) -> String {
        table
            .schema()
            .language_column(track, language, grade)
            .map(str::to_string)
            .unwrap_or_else(|| language_column_candidates(track, language, grade).remove(0))
    }

    /// Sums of `fields` over the whole table; zeros for an empty table.
    fn grand_totals(table: &Table, fields: &[String]) -> Result<Vec<i64>, ProcessorError> {
        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let rows = DataProcessor::group_sum(table, &[], &refs)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.sums)
            .unwrap_or_else(|| vec![0; fields.len()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataLoader;

    fn row(key: &str, value: i64) -> AggregateRow {
        AggregateRow {
            keys: vec![key.to_string()],
            sums: vec![value],
        }
    }

    const GENDER_SAMPLE: &str = "\
Rentrée scolaire;Région académique;Code département;Secteur;6èmes filles;6èmes garçons;5èmes filles;5èmes garçons;4èmes filles;4èmes garçons;3èmes filles;3èmes garçons
2021;EVEN;1;PUBLIC;10;10;5;5;0;0;0;0
2021;BOYS;2;PUBLIC;10;30;0;0;0;0;0;0
2021;GIRLS;3;PRIVE;20;5;0;0;0;0;0;0
2021;GIRLS;3;PUBLIC;0;0;0;0;0;0;0;5
2021;EMPTY;4;PUBLIC;0;0;0;0;0;0;0;0
";

    #[test]
    fn top_n_orders_descending() {
        let rows = vec![row("A", 50), row("B", 30), row("C", 90), row("D", 10)];
        let top = StatsCalculator::top_n(&rows, 2);
        assert_eq!(top, vec![row("C", 90), row("A", 50)]);
    }

    #[test]
    fn top_n_keeps_grouping_order_on_ties() {
        let rows = vec![row("A", 5), row("B", 7), row("C", 5)];
        let top = StatsCalculator::top_n(&rows, 3);
        let keys: Vec<_> = top.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
    }

    #[test]
    fn exact_tie_resolves_to_girls() {
        assert_eq!(StatsCalculator::majority_gender(50.0, 50.0), Gender::Girls);
        assert_eq!(StatsCalculator::majority_gender(50.1, 49.9), Gender::Boys);
    }

    #[test]
    fn gender_imbalance_ranks_and_skips_empty_regions() {
        let table = DataLoader::load_str(GENDER_SAMPLE).unwrap();
        let ranking = StatsCalculator::gender_imbalance(&table).unwrap();

        let regions: Vec<_> = ranking.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["BOYS", "GIRLS", "EVEN"]);

        assert_eq!(ranking[0].majority_gender, Gender::Boys);
        assert!((ranking[0].percentage_difference - 50.0).abs() < 1e-9);

        assert_eq!(ranking[1].total_students, 30);
        assert_eq!(ranking[1].majority_gender, Gender::Girls);

        assert_eq!(ranking[2].percentage_difference, 0.0);
        assert_eq!(ranking[2].majority_gender, Gender::Girls);
    }

    #[test]
    fn gender_totals_split_by_grade() {
        let table = DataLoader::load_str(GENDER_SAMPLE).unwrap();
        let totals = StatsCalculator::gender_totals(&table).unwrap();
        assert_eq!(totals.girls, 45);
        assert_eq!(totals.boys, 55);
        assert_eq!(
            totals.by_grade[0],
            GradeGender {
                grade: Grade::Sixth,
                girls: 40,
                boys: 45
            }
        );
        assert_eq!(totals.by_grade[3].boys, 5);
    }

    #[test]
    fn sector_share_counts_institutions() {
        let text = "\
Rentrée scolaire;Région académique;Code département;Secteur;Nombre d'élèves total
2021;NORD;59;PUBLIC;900
2021;NORD;59;PUBLIC;100
2021;NORD;62;PRIVE;10
2021;NORD;62;PUBLIC;5
2021;SUD;13;PUBLIC;40
";
        let table = DataLoader::load_str(text).unwrap();
        let shares = StatsCalculator::sector_share(&table).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].region, "NORD");
        assert_eq!(shares[0].public_schools, 3);
        assert_eq!(shares[0].private_schools, 1);
        assert_eq!(shares[0].private_percentage, 25.0);
        assert_eq!(shares[1].private_percentage, 0.0);
    }

    #[test]
    fn sector_share_skips_regions_without_public_or_private_rows() {
        let text = "\
Rentrée scolaire;Région académique;Code département;Secteur;Nombre d'élèves total
2021;OUTRE-MER;971;AUTRE;120
2021;OUTRE-MER;972;AUTRE;80
2021;NORD;59;PRIVE;10
";
        let table = DataLoader::load_str(text).unwrap();
        let shares = StatsCalculator::sector_share(&table).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].region, "NORD");
        assert_eq!(shares[0].private_percentage, 100.0);
        assert!(shares.iter().all(|s| s.private_percentage.is_finite()));
    }

    #[test]
    fn language_totals_tolerate_missing_columns() {
        let text = "\
Rentrée scolaire;Région académique;Code département;Secteur;6èmes LV1 anglais;3èmes LV1 anglais;6ème LV2 autres langues;5èmes LV2 espagnol
2021;NORD;59;PUBLIC;100;80;3;40
2021;SUD;13;PUBLIC;50;20;1;60
";
        let table = DataLoader::load_str(text).unwrap();

        let lv1 = StatsCalculator::language_totals(&table, Track::Lv1).unwrap();
        assert_eq!(lv1.len(), 4);
        let english = lv1.iter().find(|t| t.language == Language::English).unwrap();
        assert_eq!(english.students, 250);
        let german = lv1.iter().find(|t| t.language == Language::German).unwrap();
        assert_eq!(german.students, 0);

        let lv2 = StatsCalculator::language_totals(&table, Track::Lv2).unwrap();
        assert_eq!(lv2.len(), 5);
        let other = lv2.iter().find(|t| t.language == Language::Other).unwrap();
        assert_eq!(other.students, 4);
        let italian = lv2.iter().find(|t| t.language == Language::Italian).unwrap();
        assert_eq!(italian.students, 0);

        let south = StatsCalculator::region_languages(&table, "SUD").unwrap();
        let spanish = south.lv2.iter().find(|t| t.language == Language::Spanish).unwrap();
        assert_eq!(spanish.students, 60);

        let by_grade = StatsCalculator::languages_by_grade(&table).unwrap();
        assert_eq!(by_grade.len(), 4 * 2 * 3);
        let sixth_english = by_grade
            .iter()
            .find(|r| r.grade == Grade::Sixth && r.track == Track::Lv1 && r.language == Language::English)
            .unwrap();
        assert_eq!(sixth_english.students, 150);
    }

    #[test]
    fn sector_averages_per_grade() {
        let text = "\
Rentrée scolaire;Région académique;Code département;Secteur;6èmes total;5èmes total
2021;NORD;59;PUBLIC;100;90
2021;NORD;59;PUBLIC;200;110
2021;NORD;62;PRIVE;50;40
";
        let table = DataLoader::load_str(text).unwrap();
        let averages = StatsCalculator::sector_averages(&table).unwrap();
        assert_eq!(averages.len(), 4);
        assert_eq!(averages[0].public, Some(150.0));
        assert_eq!(averages[0].private, Some(50.0));
        assert_eq!(averages[1].public, Some(100.0));
        assert_eq!(averages[2].public, None);
    }

    #[test]
    fn empty_table_gives_zero_totals() {
        let table = DataLoader::load_str(GENDER_SAMPLE).unwrap().for_year("2000").unwrap();
        let totals = StatsCalculator::gender_totals(&table).unwrap();
        assert_eq!(totals.girls, 0);
        assert!(StatsCalculator::gender_imbalance(&table).unwrap().is_empty());
        assert!(StatsCalculator::sector_share(&table).unwrap().is_empty());
    }

    #[test]
    fn department_totals_keep_source_codes() {
        let table = DataLoader::load_str(GENDER_SAMPLE).unwrap();
        let rows = StatsCalculator::students_by_department(&table).unwrap();
        let codes: Vec<_> = rows.iter().map(|r| r.key()).collect();
        assert_eq!(codes, vec!["1", "2", "3", "4"]);
        // No total column in this sample
        assert!(rows.iter().all(|r| r.value() == 0));
    }
}
