//! Stats module - Derived enrollment metrics

mod calculator;

pub use calculator::{
    GenderImbalance, GenderTotals, GradeGender, LanguageByGrade, LanguageTotal, RegionLanguages,
    SectorAverage, SectorShare, StatsCalculator, TOP_REGIONS,
};
