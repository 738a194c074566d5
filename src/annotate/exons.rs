//! Exon span counts from a fixed exon position BED file.

use std::path::Path;

use anyhow::Context;
use thousands::Separable;

use crate::common::io::open_read_maybe_gz;
use crate::common::ChromMap;
use crate::group::GroupedCalls;
use crate::model::{SvInterval, SvType};
use crate::overlap::OverlapIndex;
use crate::table::Cell;

/// Load exon records from a headerless BED file (first three columns are
/// chromosome, begin, end; the rest is ignored).
#[tracing::instrument]
fn read_exon_bed(path: &Path) -> Result<Vec<SvInterval>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(open_read_maybe_gz(path)?);
    let mut result = Vec::new();
    for record in reader.records() {
        let record = record?;
        let [chrom, begin, end] = [record.get(0), record.get(1), record.get(2)]
            .map(|field| field.unwrap_or_default());
        let begin: i32 = begin
            .parse()
            .with_context(|| format!("invalid begin {:?} in {:?}", begin, path))?;
        let end: i32 = end
            .parse()
            .with_context(|| format!("invalid end {:?} in {:?}", end, path))?;
        // exon records carry no kind, overlap queries ignore it
        result.push(SvInterval::new(chrom, begin, end, SvType::default()));
    }
    tracing::debug!(
        "loaded {} exon records from {:?}",
        result.len().separate_with_commas(),
        path
    );
    Ok(result)
}

/// Append an `EXONS_SPANNED` column holding, per group, the number of exon
/// records that overlap the canonical interval by any amount.
pub fn annotate(
    grouped: &mut GroupedCalls,
    path: &Path,
    chrom_map: &mut ChromMap,
) -> Result<(), anyhow::Error> {
    let exon_index = OverlapIndex::build(read_exon_bed(path)?, chrom_map);
    let group_index = OverlapIndex::build(grouped.intervals.clone(), chrom_map);
    let counts = group_index.count_overlaps(&exon_index);

    grouped.table.add_column("EXONS_SPANNED", Cell::scalar("0"))?;
    let col_idx = grouped.table.col_idx("EXONS_SPANNED")?;
    for (row, count) in grouped.table.rows.iter_mut().zip(counts.iter()) {
        row[col_idx] = Cell::scalar(count.to_string());
    }

    Ok(())
}
