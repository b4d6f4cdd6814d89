//! Data Processor Module
//! Grouped aggregation over enrollment tables.

use crate::data::{LoadError, Table};
use log::debug;
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Group column '{0}' is missing")]
    MissingGroupColumn(String),
    #[error("Failed to filter table: {0}")]
    Filter(#[from] LoadError),
}

/// One distinct combination of group values and the sums over its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub keys: Vec<String>,
    pub sums: Vec<i64>,
}

impl AggregateRow {
    /// First group value, the usual single-field case.
    pub fn key(&self) -> &str {
        self.keys.first().map(String::as_str).unwrap_or_default()
    }

    /// First summed value.
    pub fn value(&self) -> i64 {
        self.sums.first().copied().unwrap_or(0)
    }
}

/// Per-group means; `None` where a group has no values for the column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanRow {
    pub keys: Vec<String>,
    pub means: Vec<Option<f64>>,
}

/// Handles grouping and summing of enrollment counts.
pub struct DataProcessor;

impl DataProcessor {
    /// Group `table` on `group_fields` and sum each of `sum_fields`.
    ///
    /// Rows come out in first-appearance order of their key. Null or
    /// unparseable cells count as zero, and a sum field the table does not
    /// have contributes zero to every group.
    pub fn group_sum(
        table: &Table,
        group_fields: &[&str],
        sum_fields: &[&str],
    ) -> Result<Vec<AggregateRow>, ProcessorError> {
        Self::check_group_fields(table, group_fields)?;
        if table.row_count() == 0 {
            return Ok(Vec::new());
        }

        let present = Self::present_fields(table, sum_fields);
        let aggs: Vec<Expr> = present
            .iter()
            .map(|(i, field)| {
                col(*field)
                    .cast(DataType::Int64)
                    .fill_null(lit(0i64))
                    .sum()
                    .cast(DataType::Int64)
                    .alias(Self::slot_name(*i))
            })
            .collect();

        let out = Self::aggregate(table, group_fields, aggs)?;
        let keys = Self::extract_keys(&out, group_fields)?;

        let mut rows: Vec<AggregateRow> = keys
            .into_iter()
            .map(|keys| AggregateRow {
                keys,
                sums: vec![0; sum_fields.len()],
            })
            .collect();

        for (i, _) in &present {
            let sums = out.column(&Self::slot_name(*i))?.i64()?;
            for (row, value) in rows.iter_mut().zip(sums.into_iter()) {
                row.sums[*i] = value.unwrap_or(0);
            }
        }

        Ok(rows)
    }

    /// Count rows per distinct combination of `group_fields`.
    pub fn group_count(
        table: &Table,
        group_fields: &[&str],
    ) -> Result<Vec<AggregateRow>, ProcessorError> {
        Self::check_group_fields(table, group_fields)?;
        if table.row_count() == 0 {
            return Ok(Vec::new());
        }

        let out = Self::aggregate(
            table,
            group_fields,
            vec![len().cast(DataType::Int64).alias("__rows")],
        )?;
        let keys = Self::extract_keys(&out, group_fields)?;
        let counts = out.column("__rows")?.i64()?;

        Ok(keys
            .into_iter()
            .zip(counts.into_iter())
            .map(|(keys, n)| AggregateRow {
                keys,
                sums: vec![n.unwrap_or(0)],
            })
            .collect())
    }

    /// Group `table` on `group_fields` and average each of `mean_fields`,
    /// ignoring null cells.
    pub fn group_mean(
        table: &Table,
        group_fields: &[&str],
        mean_fields: &[&str],
    ) -> Result<Vec<MeanRow>, ProcessorError> {
        Self::check_group_fields(table, group_fields)?;
        if table.row_count() == 0 {
            return Ok(Vec::new());
        }

        let present = Self::present_fields(table, mean_fields);
        let aggs: Vec<Expr> = present
            .iter()
            .map(|(i, field)| {
                col(*field)
                    .cast(DataType::Float64)
                    .mean()
                    .cast(DataType::Float64)
                    .alias(Self::slot_name(*i))
            })
            .collect();

        let out = Self::aggregate(table, group_fields, aggs)?;
        let keys = Self::extract_keys(&out, group_fields)?;

        let mut rows: Vec<MeanRow> = keys
            .into_iter()
            .map(|keys| MeanRow {
                keys,
                means: vec![None; mean_fields.len()],
            })
            .collect();

        for (i, _) in &present {
            let means = out.column(&Self::slot_name(*i))?.f64()?;
            for (row, value) in rows.iter_mut().zip(means.into_iter()) {
                row.means[*i] = value.filter(|v| !v.is_nan());
            }
        }

        Ok(rows)
    }

    fn check_group_fields(table: &Table, group_fields: &[&str]) -> Result<(), ProcessorError> {
        match group_fields.iter().find(|f| !table.has_column(f)) {
            Some(missing) => Err(ProcessorError::MissingGroupColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Requested fields the table actually has, with their request position.
    fn present_fields<'a>(table: &Table, fields: &[&'a str]) -> Vec<(usize, &'a str)> {
        fields
            .iter()
            .enumerate()
            .filter(|(_, field)| {
                let present = table.has_column(field);
                if !present {
                    debug!("Column '{}' absent, counted as zero", field);
                }
                present
            })
            .map(|(i, field)| (i, *field))
            .collect()
    }

    fn slot_name(index: usize) -> String {
        format!("__agg_{}", index)
    }

    fn aggregate(
        table: &Table,
        group_fields: &[&str],
        aggs: Vec<Expr>,
    ) -> Result<DataFrame, ProcessorError> {
        let lf = table.dataframe().clone().lazy();

        let out = if group_fields.is_empty() {
            // Grand total: one row with no keys
            if aggs.is_empty() {
                df!("__rows" => [table.row_count() as i64])?
            } else {
                lf.select(aggs).collect()?
            }
        } else {
            let by: Vec<Expr> = group_fields
                .iter()
                .map(|f| col(*f).cast(DataType::String))
                .collect();
            if aggs.is_empty() {
                lf.group_by_stable(by)
                    .agg([len().alias("__rows")])
                    .collect()?
            } else {
                lf.group_by_stable(by).agg(aggs).collect()?
            }
        };

        Ok(out)
    }

    fn extract_keys(out: &DataFrame, group_fields: &[&str]) -> Result<Vec<Vec<String>>, ProcessorError> {
        let mut keys = vec![Vec::with_capacity(group_fields.len()); out.height()];
        for field in group_fields {
            let values = out.column(field)?.str()?;
            for (row, value) in keys.iter_mut().zip(values.into_iter()) {
                row.push(value.unwrap_or_default().to_string());
            }
        }
        Ok(keys)
    }
}
