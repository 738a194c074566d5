//! Ingestion of normalized per-sample structural variant call tables.

use anyhow::{anyhow, bail};
use thousands::Separable;

use crate::common::io;
use crate::model::{Genotype, SampleCall, SvInterval, SvType};

/// Required columns of a call table.
const REQUIRED_COLS: &[&str] = &["CHROM", "POS", "END", "SVTYPE", "GT", "GENES", "SAMPLE"];

/// Ingestion result for one input file.
#[derive(Debug, Clone)]
pub struct SampleCalls {
    /// The single sample the file belongs to.
    pub sample: String,
    /// The calls, in file order.
    pub calls: Vec<SampleCall>,
}

/// Split a gene cell on `,` and the fusion separators `-` and `&`.
pub fn split_gene_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .flat_map(|token| token.split(['-', '&']))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Read one per-sample call table.
///
/// Records with an unsupported `SVTYPE` are skipped with a warning.  A file
/// that carries calls for more than one sample, or none at all, is refused.
#[tracing::instrument(skip(ann_fields))]
pub fn read_sample_calls(path: &str, ann_fields: &[String]) -> Result<SampleCalls, anyhow::Error> {
    let mut reader = io::tsv_reader(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(io::clean_header)
        .collect::<Vec<_>>();
    let required = REQUIRED_COLS
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| anyhow!("{}: missing required column {:?}", path, name))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let [idx_chrom, idx_pos, idx_end, idx_sv_type, idx_gt, idx_genes, idx_sample] = required[..]
    else {
        bail!("{}: broken header", path)
    };
    let idx_svlen = headers.iter().position(|header| header == "SVLEN");
    let idx_extra = ann_fields
        .iter()
        .map(|name| headers.iter().position(|header| header == name))
        .collect::<Vec<_>>();

    let mut sample: Option<String> = None;
    let mut calls = Vec::new();
    let mut count_skipped = 0;
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let sv_type = match field(idx_sv_type).parse::<SvType>() {
            Ok(sv_type) => sv_type,
            Err(_) => {
                tracing::warn!(
                    "{}: skipping record with unsupported SVTYPE {:?}",
                    path,
                    field(idx_sv_type)
                );
                count_skipped += 1;
                continue;
            }
        };

        let record_sample = field(idx_sample).to_owned();
        if record_sample.is_empty() {
            bail!("{}: record without sample identifier", path);
        }
        match &sample {
            None => sample = Some(record_sample.clone()),
            Some(existing) if *existing != record_sample => bail!(
                "{}: contains calls for more than one sample: {:?} and {:?}",
                path,
                existing,
                record_sample
            ),
            _ => (),
        }

        let pos: i32 = field(idx_pos)
            .parse()
            .map_err(|e| anyhow!("{}: invalid POS {:?}: {}", path, field(idx_pos), e))?;
        let mut end: i32 = field(idx_end)
            .parse()
            .map_err(|e| anyhow!("{}: invalid END {:?}: {}", path, field(idx_end), e))?;
        let svlen = idx_svlen
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != ".")
            .and_then(|value| value.parse::<i64>().ok());
        // Callers for insertion-like events write `END == POS`; restore the
        // span from the variant length where one was reported.
        if end == pos {
            if let Some(svlen) = svlen {
                if svlen != 0 {
                    end = pos + svlen.unsigned_abs() as i32;
                }
            }
        }

        let genotype =
            Genotype::from_gt(field(idx_gt)).map_err(|e| anyhow!("{}: {}", path, e))?;
        let genes = split_gene_ids(field(idx_genes));
        let extra = idx_extra
            .iter()
            .map(|idx| {
                idx.and_then(|idx| record.get(idx))
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .unwrap_or("nan")
                    .to_owned()
            })
            .collect();

        calls.push(SampleCall {
            interval: SvInterval::new(field(idx_chrom), pos, end, sv_type),
            genotype,
            sample: record_sample,
            genes,
            svlen,
            extra,
        });
    }

    let sample = sample.ok_or_else(|| anyhow!("{}: contains no sample calls", path))?;
    tracing::debug!(
        "{}: read {} calls for sample {:?} ({} records skipped)",
        path,
        calls.len().separate_with_commas(),
        &sample,
        count_skipped
    );

    Ok(SampleCalls { sample, calls })
}

/// Read all per-sample inputs, enforcing unique sample identifiers.
pub fn read_all_sample_calls(
    paths: &[String],
    ann_fields: &[String],
) -> Result<Vec<SampleCalls>, anyhow::Error> {
    let mut result: Vec<SampleCalls> = Vec::new();
    for path in paths {
        let calls = read_sample_calls(path, ann_fields)?;
        if result.iter().any(|existing| existing.sample == calls.sample) {
            bail!(
                "duplicate sample {:?} among the input files (seen again in {})",
                calls.sample,
                path
            );
        }
        result.push(calls);
    }
    tracing::info!(
        "read {} calls for {} samples",
        result
            .iter()
            .map(|input| input.calls.len())
            .sum::<usize>()
            .separate_with_commas(),
        result.len()
    );
    Ok(result)
}
