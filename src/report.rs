//! Implementation of the `report` sub command, the full annotation pipeline.

use std::path::PathBuf;

use clap::Parser;
use thousands::Separable;

use crate::annotate::regions::{AnnotSvCli, RegionAnnotator};
use crate::annotate::{self, exons, gnomad, regions};
use crate::common::{io, trace_rss_now, ChromMap};
use crate::group::{self, GroupedCalls};
use crate::ingest;
use crate::table::{Cell, Table};

/// Spreadsheet cell size limit that every written value stays under.
const MAX_CELL_LEN: usize = 31_999;

/// Region column suffixes whose empty values read as zero counts.
const NUMERIC_REGION_SUFFIXES: &[&str] =
    &["_n_samples_with_SV", "_n_samples_tested", "_Frequency"];

/// Append the `DECIPHER_LINK` column with a genome browser hyperlink per
/// group canonical interval.
fn add_decipher_links(grouped: &mut GroupedCalls) -> Result<(), anyhow::Error> {
    grouped.table.add_column("DECIPHER_LINK", Cell::scalar(""))?;
    let col_idx = grouped.table.col_idx("DECIPHER_LINK")?;
    for (row, interval) in grouped
        .table
        .rows
        .iter_mut()
        .zip(grouped.intervals.iter())
    {
        row[col_idx] = Cell::scalar(format!(
            "=hyperlink(\"https://decipher.sanger.ac.uk/browser#q/{}:{}-{}\")",
            interval.chrom, interval.begin, interval.end
        ));
    }
    Ok(())
}

/// Apply the final placeholder conventions and the cell size cap.
///
/// Empty numeric region columns and `EXONS_SPANNED` become `0`, empty region
/// identifier columns become `.`.  All other placeholders (`na` from the
/// gene rollup, `NA` from the frequency source) were set upstream.
fn normalize_report(table: &mut Table) {
    let fills: Vec<Option<&str>> = table
        .columns
        .iter()
        .map(|name| {
            if name == "EXONS_SPANNED" {
                Some("0")
            } else if regions::REGION_COLS.contains(&name.as_str()) {
                if NUMERIC_REGION_SUFFIXES
                    .iter()
                    .any(|suffix| name.ends_with(suffix))
                {
                    Some("0")
                } else {
                    Some(".")
                }
            } else {
                None
            }
        })
        .collect();
    for row in &mut table.rows {
        for (cell, fill) in row.iter_mut().zip(fills.iter()) {
            if let Some(fill) = fill {
                if cell.is_blank() {
                    *cell = Cell::scalar(*fill);
                }
            }
            cap_cell(cell);
        }
    }
}

/// Truncate the written rendition of a cell to the spreadsheet limit.
fn cap_cell(cell: &mut Cell) {
    let joined = cell.to_joined();
    if joined.chars().count() > MAX_CELL_LEN {
        *cell = Cell::Scalar(joined.chars().take(MAX_CELL_LEN).collect());
    }
}

/// Command line arguments for `svreport report` sub command.
#[derive(Parser, Debug)]
#[command(about = "Generate the annotated structural variant report", long_about = None)]
pub struct Args {
    /// Minimal reciprocal overlap for two calls to land in the same group.
    #[arg(long, default_value_t = 0.5)]
    pub min_overlap: f32,
    /// Minimal reciprocal overlap against population frequency records.
    #[arg(long, default_value_t = 0.9)]
    pub freq_min_overlap: f32,
    /// Per-call field to carry through into per-sample list columns, can be
    /// given multiple times.
    #[arg(long = "ann-field")]
    pub ann_fields: Vec<String>,
    /// Path to the gene model TSV with Ensembl gene ids and gene names.
    #[arg(long, required = true)]
    pub path_biomart: PathBuf,
    /// Path to the gene-to-phenotype-terms TSV; without it the phenotype
    /// column keeps its placeholder.
    #[arg(long)]
    pub path_hpo: Option<PathBuf>,
    /// Path to the OMIM genemap2 TSV.
    #[arg(long, required = true)]
    pub path_omim: PathBuf,
    /// Path to the ExAC gene score TSV.
    #[arg(long, required = true)]
    pub path_exac: PathBuf,
    /// Path to the HGMD gross lesion export TSV.
    #[arg(long, required = true)]
    pub path_hgmd: PathBuf,
    /// Path to the gnomAD SV frequency TSV.
    #[arg(long, required = true)]
    pub path_gnomad: PathBuf,
    /// Path to the BED file with fixed exon positions.
    #[arg(long, required = true)]
    pub path_exon_bed: PathBuf,
    /// AnnotSV compatible executable for the DGV and DDD region columns;
    /// without it the columns keep their placeholders.
    #[arg(long)]
    pub annotsv: Option<String>,
    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_output: PathBuf,
    /// Input call tables, prefix with `@` to read paths line-wise from a
    /// file.
    #[arg(required = true)]
    pub path_inputs: Vec<String>,
}

/// Main entry point for the `report` sub command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `report`");
    tracing::info!("  common_args = {:?}", common_args);
    tracing::info!("  args = {:?}", args);

    let input_paths = io::expand_input_paths(&args.path_inputs)?;
    let inputs = ingest::read_all_sample_calls(&input_paths, &args.ann_fields)?;
    let mut chrom_map = ChromMap::new();

    tracing::info!("grouping calls across samples...");
    let mut grouped =
        group::group_sample_calls(&inputs, &args.ann_fields, args.min_overlap, &mut chrom_map)?;

    tracing::info!("building the gene reference...");
    let gene_ref = annotate::build_gene_reference(
        &args.path_biomart,
        args.path_hpo.as_deref(),
        &args.path_omim,
        &args.path_exac,
        &args.path_hgmd,
    )?;

    tracing::info!("rolling up gene annotation...");
    annotate::annotate_genes(&mut grouped, &gene_ref)?;

    tracing::info!("annotating regions...");
    let annotator = args.annotsv.as_ref().map(|command| AnnotSvCli::new(command));
    regions::annotate(
        &mut grouped,
        annotator
            .as_ref()
            .map(|annotator| annotator as &dyn RegionAnnotator),
    )?;

    tracing::info!("counting exons spanned...");
    exons::annotate(&mut grouped, &args.path_exon_bed, &mut chrom_map)?;

    tracing::info!("annotating population frequencies...");
    gnomad::annotate(
        &mut grouped,
        &args.path_gnomad,
        args.freq_min_overlap,
        &mut chrom_map,
    )?;

    add_decipher_links(&mut grouped)?;
    normalize_report(&mut grouped.table);
    trace_rss_now();

    grouped.table.write_tsv(&args.path_output)?;
    tracing::info!(
        "wrote {} annotated variant groups to {:?}",
        grouped.table.rows.len().separate_with_commas(),
        &args.path_output
    );

    Ok(())
}
