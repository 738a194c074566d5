//! Population frequency source for structural variants.

use std::path::Path;

use anyhow::Context;
use thousands::Separable;

use crate::common::ChromMap;
use crate::group::GroupedCalls;
use crate::model::{SvInterval, SvType};
use crate::overlap::OverlapIndex;
use crate::table::{Cell, Table};

/// Required columns of the frequency table.
const GNOMAD_COLS: &[&str] = &[
    "CHROM", "START", "END", "NAME", "SVTYPE", "AN", "AC", "AF", "N_HOMREF", "N_HET", "N_HOMALT",
    "FREQ_HOMREF", "FREQ_HET", "FREQ_HOMALT", "POPMAX_AF",
];

/// Columns appended to the grouped table, aligned with the tail of
/// `GNOMAD_COLS`.
pub const GNOMAD_ANN_COLS: &[&str] = &[
    "gnomAD_SVTYPE",
    "gnomAD_AN",
    "gnomAD_AC",
    "gnomAD_AF",
    "gnomAD_N_HOMREF",
    "gnomAD_N_HET",
    "gnomAD_N_HOMALT",
    "gnomAD_FREQ_HOMREF",
    "gnomAD_FREQ_HET",
    "gnomAD_FREQ_HOMALT",
    "gnomAD_POPMAX_AF",
];

/// Annotate the group canonical intervals with population frequencies.
///
/// A frequency record applies when it reciprocally overlaps the interval at
/// `min_overlap` with identical kind; when several apply, the last one in
/// file order wins.  Intervals without a match keep `NA` in every column.
#[tracing::instrument(skip(grouped, chrom_map))]
pub fn annotate(
    grouped: &mut GroupedCalls,
    path: &Path,
    min_overlap: f32,
    chrom_map: &mut ChromMap,
) -> Result<(), anyhow::Error> {
    let table = Table::read_tsv(path)?;
    let table = table.select(GNOMAD_COLS)?;

    let mut intervals = Vec::new();
    let mut value_rows = Vec::new();
    let mut count_skipped = 0;
    for (row_idx, row) in table.rows.iter().enumerate() {
        let value = |col: usize| row[col].as_scalar(&table.columns[col]);
        let sv_type = match value(4)?.parse::<SvType>() {
            Ok(sv_type) => sv_type,
            // records of kinds we never call cannot match anything
            Err(_) => {
                count_skipped += 1;
                continue;
            }
        };
        let begin: i32 = value(1)?
            .parse()
            .with_context(|| format!("invalid START in {:?}", path))?;
        let end: i32 = value(2)?
            .parse()
            .with_context(|| format!("invalid END in {:?}", path))?;
        intervals.push(SvInterval::new(value(0)?, begin, end, sv_type));
        value_rows.push(row_idx);
    }
    tracing::debug!(
        "frequency table has {} usable records ({} skipped)",
        intervals.len().separate_with_commas(),
        count_skipped.separate_with_commas()
    );

    let db_index = OverlapIndex::build(intervals, chrom_map);
    let group_index = OverlapIndex::build(grouped.intervals.clone(), chrom_map);

    for name in GNOMAD_ANN_COLS {
        grouped.table.add_column(name, Cell::scalar("NA"))?;
    }
    let base = grouped.table.columns.len() - GNOMAD_ANN_COLS.len();
    for (group_id, db_id) in group_index.intersect(&db_index, Some(min_overlap), true) {
        let row = &table.rows[value_rows[db_id as usize]];
        for (offset, col_idx) in (4..GNOMAD_COLS.len()).enumerate() {
            grouped.table.rows[group_id as usize][base + offset] = row[col_idx].clone();
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::common::ChromMap;
    use crate::group::group_sample_calls;
    use crate::ingest::SampleCalls;
    use crate::model::{Genotype, SampleCall, SvInterval, SvType};
    use crate::table::Cell;

    fn grouped_fixture(
        chrom_map: &mut ChromMap,
        calls: &[(&str, i32, i32, SvType)],
    ) -> crate::group::GroupedCalls {
        let inputs = vec![SampleCalls {
            sample: "A".to_string(),
            calls: calls
                .iter()
                .map(|&(chrom, begin, end, sv_type)| SampleCall {
                    interval: SvInterval::new(chrom, begin, end, sv_type),
                    genotype: Genotype::Het,
                    sample: "A".to_string(),
                    genes: vec![],
                    svlen: None,
                    extra: vec![],
                })
                .collect(),
        }];
        group_sample_calls(&inputs, &[], 0.5, chrom_map).unwrap()
    }

    fn write_freq_table(dir: &std::path::Path, records: &[&str]) -> std::path::PathBuf {
        let path = dir.join("gnomad.tsv");
        let mut contents = String::from(
            "#CHROM\tSTART\tEND\tNAME\tSVTYPE\tAN\tAC\tAF\tN_HOMREF\tN_HET\tN_HOMALT\
             \tFREQ_HOMREF\tFREQ_HET\tFREQ_HOMALT\tPOPMAX_AF\n",
        );
        for record in records {
            contents.push_str(record);
            contents.push('\n');
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn cell<'a>(grouped: &'a crate::group::GroupedCalls, row: usize, column: &str) -> &'a Cell {
        &grouped.table.rows[row][grouped.table.col_idx(column).unwrap()]
    }

    #[test]
    fn annotate_fills_matches_and_defaults() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = write_freq_table(
            &tmp_dir,
            &[
                "1\t1000\t2000\tgnomAD-SV_v2_DEL_1\tDEL\t100\t10\t0.1\t45\t10\t0\t0.9\t0.1\t0.0\t0.12",
            ],
        );

        let mut chrom_map = ChromMap::new();
        let mut grouped = grouped_fixture(
            &mut chrom_map,
            &[
                ("1", 1000, 2000, SvType::Del),
                ("2", 1000, 2000, SvType::Del),
            ],
        );
        super::annotate(&mut grouped, &path, 0.9, &mut chrom_map)?;

        assert_eq!(cell(&grouped, 0, "gnomAD_SVTYPE"), &Cell::scalar("DEL"));
        assert_eq!(cell(&grouped, 0, "gnomAD_AN"), &Cell::scalar("100"));
        assert_eq!(cell(&grouped, 0, "gnomAD_POPMAX_AF"), &Cell::scalar("0.12"));
        // no record on chromosome 2
        assert_eq!(cell(&grouped, 1, "gnomAD_SVTYPE"), &Cell::scalar("NA"));
        assert_eq!(cell(&grouped, 1, "gnomAD_POPMAX_AF"), &Cell::scalar("NA"));

        Ok(())
    }

    #[test]
    fn annotate_requires_kind_match_and_overlap() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = write_freq_table(
            &tmp_dir,
            &[
                "1\t1000\t2000\tgnomAD-SV_v2_DUP_1\tDUP\t100\t10\t0.1\t45\t10\t0\t0.9\t0.1\t0.0\t0.12",
                "1\t1000\t1500\tgnomAD-SV_v2_DEL_1\tDEL\t100\t10\t0.1\t45\t10\t0\t0.9\t0.1\t0.0\t0.12",
            ],
        );

        let mut chrom_map = ChromMap::new();
        let mut grouped =
            grouped_fixture(&mut chrom_map, &[("1", 1000, 2000, SvType::Del)]);
        super::annotate(&mut grouped, &path, 0.9, &mut chrom_map)?;

        // kind mismatch on the first record, insufficient overlap on the second
        assert_eq!(cell(&grouped, 0, "gnomAD_SVTYPE"), &Cell::scalar("NA"));

        Ok(())
    }

    #[test]
    fn annotate_last_match_wins_and_exotic_kinds_are_skipped() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = write_freq_table(
            &tmp_dir,
            &[
                "1\t1000\t2000\tgnomAD-SV_v2_MCNV_1\tMCNV\t1\t1\t1.0\t0\t0\t0\t0\t0\t0\t1.0",
                "1\t1000\t2000\tgnomAD-SV_v2_DEL_1\tDEL\t100\t10\t0.1\t45\t10\t0\t0.9\t0.1\t0.0\t0.12",
                "1\t1010\t2010\tgnomAD-SV_v2_DEL_2\tDEL\t200\t20\t0.2\t90\t20\t0\t0.9\t0.1\t0.0\t0.25",
            ],
        );

        let mut chrom_map = ChromMap::new();
        let mut grouped =
            grouped_fixture(&mut chrom_map, &[("1", 1000, 2000, SvType::Del)]);
        super::annotate(&mut grouped, &path, 0.9, &mut chrom_map)?;

        assert_eq!(cell(&grouped, 0, "gnomAD_AN"), &Cell::scalar("200"));
        assert_eq!(cell(&grouped, 0, "gnomAD_POPMAX_AF"), &Cell::scalar("0.25"));

        Ok(())
    }
}
