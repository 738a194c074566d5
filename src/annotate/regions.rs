//! Interval-keyed region annotation (DGV and DDD columns).
//!
//! The columns come from an external annotation tool that reads an interval
//! file and writes a fixed-layout TSV.  The lookup sits behind the
//! `RegionAnnotator` trait so the subprocess is one pluggable implementation
//! and the report schema stays stable when no tool is configured.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use anyhow::Context;
use thousands::Separable;

use crate::common::io::{read_lines, tsv_writer};
use crate::group::GroupedCalls;
use crate::model::SvInterval;
use crate::table::Cell;

/// Region columns, in output order.
pub const REGION_COLS: &[&str] = &[
    "DGV_GAIN_IDs",
    "DGV_GAIN_n_samples_with_SV",
    "DGV_GAIN_n_samples_tested",
    "DGV_GAIN_Frequency",
    "DGV_LOSS_IDs",
    "DGV_LOSS_n_samples_with_SV",
    "DGV_LOSS_n_samples_tested",
    "DGV_LOSS_Frequency",
    "DDD_SV",
    "DDD_DUP_n_samples_with_SV",
    "DDD_DUP_Frequency",
    "DDD_DEL_n_samples_with_SV",
    "DDD_DEL_Frequency",
];

/// Position of the first region column in a `full` output row.
const FULL_ROW_OFFSET: usize = 13;

/// Interval-keyed annotation lookup.
pub trait RegionAnnotator {
    /// Names of the columns this annotator provides.
    fn columns(&self) -> &[String];

    /// Look up the column values for each interval.  Intervals without an
    /// entry in the result stay unannotated.
    fn annotate(
        &self,
        intervals: &[SvInterval],
    ) -> Result<HashMap<SvInterval, Vec<String>>, anyhow::Error>;
}

/// `RegionAnnotator` backed by an AnnotSV-compatible command line tool.
#[derive(Debug, Clone)]
pub struct AnnotSvCli {
    /// The executable to invoke.
    command: String,
    /// Provided columns, `REGION_COLS`.
    columns: Vec<String>,
}

impl AnnotSvCli {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            columns: REGION_COLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RegionAnnotator for AnnotSvCli {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    #[tracing::instrument(skip(self, intervals))]
    fn annotate(
        &self,
        intervals: &[SvInterval],
    ) -> Result<HashMap<SvInterval, Vec<String>>, anyhow::Error> {
        let tmp_dir = tempfile::TempDir::new()?;
        let path_input = tmp_dir.path().join("variants.tsv");
        let path_output = tmp_dir.path().join("variants.annotated.tsv");

        {
            let mut writer = tsv_writer(&path_input)?;
            for interval in intervals {
                writer.write_record([
                    interval.chrom.clone(),
                    interval.begin.to_string(),
                    interval.end.to_string(),
                    interval.sv_type.to_string(),
                ])?;
            }
            writer.flush()?;
        }

        tracing::debug!(
            "invoking {} on {} intervals",
            &self.command,
            intervals.len().separate_with_commas()
        );
        let output = Command::new(&self.command)
            .arg("-SVinputFile")
            .arg(&path_input)
            .arg("-SVinputInfo")
            .arg("1")
            .arg("-outputFile")
            .arg(&path_output)
            .output()
            .with_context(|| format!("could not invoke {:?}", &self.command))?;
        if !output.status.success() {
            anyhow::bail!(
                "{:?} failed with {}: {}",
                &self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        parse_region_output(&path_output)
    }
}

/// Parse the fixed-layout tool output.
///
/// Rows are keyed by their first four fields (chromosome, begin, end, kind).
/// Only `full` rows carry the region columns, at positions 13 to 25.  Rows
/// flagged `split` repeat gene-level data that dedicated sources already
/// provide and are skipped.  Commas inside values collide with downstream
/// list joining and are rewritten to `;`.
fn parse_region_output(
    path: &Path,
) -> Result<HashMap<SvInterval, Vec<String>>, anyhow::Error> {
    let mut result = HashMap::new();
    let mut count_split = 0;
    let mut count_short = 0;
    for (i, line) in read_lines(path)?.enumerate() {
        let line = line?.replace(',', ";");
        if i == 0 {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let Some(&row_type) = fields.get(4) else {
            count_short += 1;
            continue;
        };
        match row_type {
            "full" => {
                if fields.len() < FULL_ROW_OFFSET + REGION_COLS.len() {
                    anyhow::bail!(
                        "{:?} line {}: full row has {} fields, need {}",
                        path,
                        i + 1,
                        fields.len(),
                        FULL_ROW_OFFSET + REGION_COLS.len()
                    );
                }
                let begin: i32 = fields[1]
                    .parse()
                    .with_context(|| format!("{:?} line {}: invalid begin", path, i + 1))?;
                let end: i32 = fields[2]
                    .parse()
                    .with_context(|| format!("{:?} line {}: invalid end", path, i + 1))?;
                let sv_type = fields[3]
                    .parse()
                    .with_context(|| format!("{:?} line {}: invalid kind", path, i + 1))?;
                let interval = SvInterval::new(fields[0], begin, end, sv_type);
                let values = fields[FULL_ROW_OFFSET..FULL_ROW_OFFSET + REGION_COLS.len()]
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                result.insert(interval, values);
            }
            "split" => count_split += 1,
            _ => count_short += 1,
        }
    }
    tracing::debug!(
        "parsed {} full rows from {:?} ({} split rows skipped, {} unusable)",
        result.len().separate_with_commas(),
        path,
        count_split.separate_with_commas(),
        count_short.separate_with_commas()
    );
    Ok(result)
}

/// Append the region columns to the grouped table and fill them for every
/// canonical interval the annotator knows.  Without an annotator, the
/// columns are appended empty.
pub fn annotate(
    grouped: &mut GroupedCalls,
    annotator: Option<&dyn RegionAnnotator>,
) -> Result<(), anyhow::Error> {
    let columns: Vec<String> = match annotator {
        Some(annotator) => annotator.columns().to_vec(),
        None => REGION_COLS.iter().map(|s| s.to_string()).collect(),
    };
    for name in &columns {
        grouped.table.add_column(name, Cell::scalar(""))?;
    }
    let Some(annotator) = annotator else {
        return Ok(());
    };

    let lookup = annotator.annotate(&grouped.intervals)?;
    let base = grouped.table.columns.len() - columns.len();
    let mut count_unmatched = 0;
    for (row_idx, interval) in grouped.intervals.iter().enumerate() {
        let Some(values) = lookup.get(interval) else {
            count_unmatched += 1;
            continue;
        };
        if values.len() != columns.len() {
            anyhow::bail!(
                "region annotator returned {} values for {} columns",
                values.len(),
                columns.len()
            );
        }
        for (offset, value) in values.iter().enumerate() {
            grouped.table.rows[row_idx][base + offset] = Cell::scalar(value.clone());
        }
    }
    if count_unmatched > 0 {
        tracing::debug!(
            "{} groups without region annotation",
            count_unmatched.separate_with_commas()
        );
    }

    Ok(())
}
