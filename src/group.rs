//! Clustering of per-sample structural variant calls into variant groups.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;
use indexmap::IndexMap;
use itertools::Itertools;
use thousands::Separable;

use crate::common::{io, trace_rss_now, ChromMap};
use crate::ingest::{self, SampleCalls};
use crate::model::{Genotype, SampleCall, SvInterval, VariantGroup};
use crate::overlap::OverlapIndex;
use crate::table::{Cell, Table};

/// Grouped calls: the cohort sample list plus the canonical interval and
/// table row of every variant group, index-aligned.
#[derive(Debug, Clone)]
pub struct GroupedCalls {
    /// Sample identifiers, in input order.
    pub samples: Vec<String>,
    /// Names of the passthrough fields.
    pub ann_fields: Vec<String>,
    /// Canonical group intervals, aligned with the table rows.
    pub intervals: Vec<SvInterval>,
    /// The grouped table.
    pub table: Table,
}

/// Cluster all sample calls into variant groups.
///
/// The strategy is greedy and order-dependent: the reciprocal self-overlap
/// pair stream is consumed ingestion-order-major and a call joins the group
/// of the first reference call it is seen with.  Once grouped, a call is
/// never reconsidered as a member, but it still acts as reference for calls
/// that are without a group when its own turn comes.
pub fn group_sample_calls(
    inputs: &[SampleCalls],
    ann_fields: &[String],
    min_overlap: f32,
    chrom_map: &mut ChromMap,
) -> Result<GroupedCalls, anyhow::Error> {
    let samples: Vec<String> = inputs.iter().map(|input| input.sample.clone()).collect();
    let mut flat: Vec<(usize, &SampleCall)> = Vec::new();
    for (sample_idx, input) in inputs.iter().enumerate() {
        for call in &input.calls {
            flat.push((sample_idx, call));
        }
    }

    let index = OverlapIndex::build(
        flat.iter().map(|(_, call)| call.interval.clone()).collect(),
        chrom_map,
    );

    let num_samples = samples.len();
    let num_fields = ann_fields.len();
    let mut groups: IndexMap<SvInterval, VariantGroup> = IndexMap::new();
    let mut already_grouped: HashSet<(SvInterval, Genotype, String)> = HashSet::new();
    for (ref_id, member_id) in index.self_intersect(min_overlap, true) {
        let (_, ref_call) = flat[ref_id as usize];
        let (member_sample_idx, member_call) = flat[member_id as usize];
        let key = (
            member_call.interval.clone(),
            member_call.genotype,
            member_call.sample.clone(),
        );
        if already_grouped.contains(&key) {
            continue;
        }
        let group = groups
            .entry(ref_call.interval.clone())
            .or_insert_with(|| {
                VariantGroup::new(
                    ref_call.interval.clone(),
                    ref_call.genes.iter().unique().cloned().collect(),
                    num_samples,
                    num_fields,
                )
            });
        group.push_call(member_sample_idx, member_call);
        already_grouped.insert(key);
    }

    let mut groups: Vec<VariantGroup> = groups.into_values().collect();
    groups.sort_by_key(|group| {
        (
            chrom_map.get(&group.interval.chrom).unwrap_or(usize::MAX),
            group.interval.begin,
            group.interval.end,
            group.interval.sv_type,
        )
    });

    let count_singletons = groups
        .iter()
        .filter(|group| {
            group.n_samples == 1
                && group
                    .per_sample
                    .iter()
                    .map(|agg| agg.details.len())
                    .sum::<usize>()
                    == 1
        })
        .count();
    tracing::info!(
        "clustered {} calls into {} groups ({} singletons)",
        flat.len().separate_with_commas(),
        groups.len().separate_with_commas(),
        count_singletons.separate_with_commas()
    );

    Ok(GroupedCalls {
        table: build_grouped_table(&groups, &samples, ann_fields),
        intervals: groups.into_iter().map(|group| group.interval).collect(),
        samples,
        ann_fields: ann_fields.to_vec(),
    })
}

/// Flatten the groups into the grouped table.
fn build_grouped_table(
    groups: &[VariantGroup],
    samples: &[String],
    ann_fields: &[String],
) -> Table {
    let mut columns: Vec<String> = ["CHROM", "POS", "END", "SVTYPE", "Ensembl Gene ID", "N_SAMPLES"]
        .iter()
        .map(|name| name.to_string())
        .collect();
    columns.extend(samples.iter().cloned());
    columns.extend(samples.iter().map(|sample| format!("{}_SV_DETAILS", sample)));
    columns.extend(samples.iter().map(|sample| format!("{}_GENOTYPE", sample)));
    for field in ann_fields {
        columns.extend(samples.iter().map(|sample| format!("{}_{}", sample, field)));
    }

    let mut table = Table::new(columns);
    for group in groups {
        let mut row: Vec<Cell> = vec![
            Cell::scalar(group.interval.chrom.as_str()),
            Cell::scalar(group.interval.begin.to_string()),
            Cell::scalar(group.interval.end.to_string()),
            Cell::scalar(group.interval.sv_type.to_string()),
            Cell::List(group.genes.clone()),
            Cell::scalar(group.n_samples.to_string()),
        ];
        for agg in &group.per_sample {
            row.push(Cell::scalar(if agg.present { "1" } else { "0" }));
        }
        for agg in &group.per_sample {
            row.push(Cell::List(agg.details.clone()));
        }
        for agg in &group.per_sample {
            row.push(Cell::List(agg.genotypes.clone()));
        }
        for field_idx in 0..ann_fields.len() {
            for agg in &group.per_sample {
                row.push(Cell::List(agg.extras[field_idx].clone()));
            }
        }
        table.push_row(row);
    }
    table
}

/// Command line arguments for `svreport group` sub command.
#[derive(Parser, Debug)]
#[command(about = "Group structural variant calls across samples", long_about = None)]
pub struct Args {
    /// Minimal reciprocal overlap for two calls to land in the same group.
    #[arg(long, default_value_t = 0.5)]
    pub min_overlap: f32,
    /// Per-call field to carry through into per-sample list columns, can be
    /// given multiple times.
    #[arg(long = "ann-field")]
    pub ann_fields: Vec<String>,
    /// Path to output TSV file.
    #[arg(long, required = true)]
    pub path_output: PathBuf,
    /// Input call tables, prefix with `@` to read paths line-wise from a
    /// file.
    #[arg(required = true)]
    pub path_inputs: Vec<String>,
}

/// Main entry point for the `group` sub command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `group`");
    tracing::info!("  common_args = {:?}", common_args);
    tracing::info!("  args = {:?}", args);

    let input_paths = io::expand_input_paths(&args.path_inputs)?;
    let inputs = ingest::read_all_sample_calls(&input_paths, &args.ann_fields)?;
    let mut chrom_map = ChromMap::new();
    let grouped = group_sample_calls(&inputs, &args.ann_fields, args.min_overlap, &mut chrom_map)?;
    trace_rss_now();

    grouped.table.write_tsv(&args.path_output)?;
    tracing::info!(
        "wrote {} variant groups to {:?}",
        grouped.table.rows.len().separate_with_commas(),
        &args.path_output
    );

    Ok(())
}
