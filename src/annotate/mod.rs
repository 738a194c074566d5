//! Multi-source gene and interval annotation.

pub mod exac;
pub mod exons;
pub mod generef;
pub mod gnomad;
pub mod hgmd;
pub mod hpo;
pub mod omim;
pub mod regions;

use std::collections::HashSet;
use std::path::Path;

use multimap::MultiMap;
use thousands::Separable;

use crate::group::GroupedCalls;
use crate::table::{Cell, Table};

/// Columns of the finalized gene reference, in report order.
pub const FINAL_GENE_REF_COLS: &[&str] = &[
    "BioMart Ensembl Gene ID",
    "BioMart Associated Gene Name",
    "HPO Features",
    "OMIM Phenotypes",
    "OMIM Inheritance",
    "ExAC syn_z",
    "ExAC mis_z",
    "ExAC lof_z",
    "ExAC pLI",
    "HGMD disease",
    "HGMD tag",
    "HGMD descr",
    "HGMD JOURNAL_DETAILS",
    "HGMD SVTYPE",
];

/// Build the fully annotated gene reference by folding every gene-level
/// source over the gene-model backbone.
pub fn build_gene_reference(
    path_biomart: &Path,
    path_hpo: Option<&Path>,
    path_omim: &Path,
    path_exac: &Path,
    path_hgmd: &Path,
) -> Result<Table, anyhow::Error> {
    let table = generef::read_gene_backbone(path_biomart)?;
    let table = match path_hpo {
        Some(path) => hpo::annotate(table, path)?,
        None => {
            let mut table = table;
            table.add_column("HPO Features", Cell::scalar("nan"))?;
            table
        }
    };
    let table = omim::annotate(table, path_omim)?;
    let table = exac::annotate(table, path_exac)?;
    let table = hgmd::annotate(table, path_hgmd)?;
    finalize_gene_reference(table)
}

/// Restrict the accumulated gene reference to the final annotation columns
/// and deduplicate.
fn finalize_gene_reference(table: Table) -> Result<Table, anyhow::Error> {
    let mut table = table.select(FINAL_GENE_REF_COLS)?;
    table.dedup_rows();
    tracing::debug!(
        "gene reference has {} annotated rows",
        table.rows.len().separate_with_commas()
    );
    Ok(table)
}

/// Replace the gene-id column of the grouped table by per-gene annotation
/// columns rolled up per variant group.
///
/// The gene lists are exploded into (group, gene) pairs, joined against the
/// gene reference, and re-aggregated in gene-list order.  Disease entries
/// whose tagged kind conflicts with the group's own kind are discarded.
pub fn annotate_genes(grouped: &mut GroupedCalls, gene_ref: &Table) -> Result<(), anyhow::Error> {
    let gene_col = grouped.table.col_idx("Ensembl Gene ID")?;
    let sv_type_col = grouped.table.col_idx("SVTYPE")?;
    let ref_gene_col = gene_ref.col_idx("BioMart Ensembl Gene ID")?;
    let hgmd_kind_col = gene_ref.col_idx("HGMD SVTYPE")?;

    // Explode the gene lists into deduplicated (group, gene) pairs.  A group
    // without genes contributes a single unnamed gene so that it still
    // receives placeholder values.
    let mut exploded: Vec<(usize, String)> = Vec::new();
    let mut seen = HashSet::new();
    for (row_idx, row) in grouped.table.rows.iter().enumerate() {
        let genes = match &row[gene_col] {
            Cell::List(genes) if genes.is_empty() => vec![String::new()],
            Cell::List(genes) => genes.clone(),
            Cell::Scalar(value) => vec![value.clone()],
        };
        for gene in genes {
            if seen.insert((row_idx, gene.clone())) {
                exploded.push((row_idx, gene));
            }
        }
    }

    let mut by_gene: MultiMap<&str, usize> = MultiMap::new();
    for (idx, row) in gene_ref.rows.iter().enumerate() {
        by_gene.insert(
            row[ref_gene_col].as_scalar(&gene_ref.columns[ref_gene_col])?,
            idx,
        );
    }

    let payload_cols = (0..gene_ref.columns.len())
        .filter(|&idx| idx != ref_gene_col)
        .collect::<Vec<_>>();
    let num_out = payload_cols.len() + 1;

    // Per group, collect the per-gene values column by column.
    let mut agg: Vec<Vec<Vec<String>>> = vec![vec![Vec::new(); num_out]; grouped.table.rows.len()];
    for (row_idx, gene) in &exploded {
        let group_kind = grouped.table.rows[*row_idx][sv_type_col]
            .as_scalar("SVTYPE")?
            .to_owned();
        match by_gene.get_vec(gene.as_str()) {
            Some(ref_idxs) => {
                for &ref_idx in ref_idxs {
                    let ref_row = &gene_ref.rows[ref_idx];
                    let hgmd_kind = ref_row[hgmd_kind_col].as_scalar("HGMD SVTYPE")?;
                    if !(hgmd_kind == group_kind
                        || hgmd_kind.is_empty()
                        || hgmd_kind.eq_ignore_ascii_case("nan"))
                    {
                        continue;
                    }
                    agg[*row_idx][0].push(gene.clone());
                    for (out_idx, &col_idx) in payload_cols.iter().enumerate() {
                        agg[*row_idx][out_idx + 1].push(
                            ref_row[col_idx]
                                .as_scalar(&gene_ref.columns[col_idx])?
                                .to_owned(),
                        );
                    }
                }
            }
            None => {
                agg[*row_idx][0].push(gene.clone());
                for out_idx in 0..payload_cols.len() {
                    agg[*row_idx][out_idx + 1].push("nan".to_string());
                }
            }
        }
    }

    // Replace the gene column by the rolled-up annotation columns.
    let mut out_columns = vec!["Ensembl Gene ID".to_string()];
    out_columns.extend(payload_cols.iter().map(|&idx| gene_ref.columns[idx].clone()));

    grouped.table.drop_column("Ensembl Gene ID")?;
    let base = grouped.table.columns.len();
    for name in &out_columns {
        grouped.table.add_column(name, Cell::scalar(""))?;
    }
    for (row_idx, row_agg) in agg.iter().enumerate() {
        if row_agg[0].is_empty() {
            continue;
        }
        for (offset, values) in row_agg.iter().enumerate() {
            grouped.table.rows[row_idx][base + offset] = normalize_rollup(values);
        }
    }

    Ok(())
}

/// `nan` values become `na`; a cell whose values are all `nan` collapses to
/// a single `na`.
fn normalize_rollup(values: &[String]) -> Cell {
    if !values.is_empty()
        && values
            .iter()
            .all(|value| value.eq_ignore_ascii_case("nan"))
    {
        return Cell::List(vec!["na".to_string()]);
    }
    Cell::List(
        values
            .iter()
            .map(|value| {
                if value.eq_ignore_ascii_case("nan") {
                    "na".to_string()
                } else {
                    value.clone()
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::normalize_rollup;
    use crate::common::ChromMap;
    use crate::group::group_sample_calls;
    use crate::ingest::SampleCalls;
    use crate::model::{Genotype, SampleCall, SvInterval, SvType};
    use crate::table::{Cell, Table};

    fn gene_ref_fixture() -> Table {
        let mut table = Table::with_columns(super::FINAL_GENE_REF_COLS);
        #[rustfmt::skip]
        let rows = vec![
            vec!["ENSG01", "GENEA", "Seizure, Ataxia", "nan", "nan", "1.1", "2.2", "3.3", "0.99", "DiseaseX", "DM", "descX", "J:Au:2020:123", "DEL"],
            vec!["ENSG02", "GENEB", "nan", "nan", "nan", "nan", "nan", "nan", "nan", "nan", "nan", "nan", "nan", "nan"],
            vec!["ENSG03", "GENEC", "nan", "nan", "nan", "nan", "nan", "nan", "nan", "DiseaseY", "DM", "descY", "J:Au:2021:456", "DUP"],
        ];
        for row in rows {
            table.push_row(row.iter().copied().map(Cell::scalar).collect());
        }
        table
    }

    fn grouped_fixture(genes: &[&str], sv_type: SvType) -> crate::group::GroupedCalls {
        let mut chrom_map = ChromMap::new();
        let inputs = vec![SampleCalls {
            sample: "A".to_string(),
            calls: vec![SampleCall {
                interval: SvInterval::new("1", 1000, 2000, sv_type),
                genotype: Genotype::Het,
                sample: "A".to_string(),
                genes: genes.iter().map(|gene| gene.to_string()).collect(),
                svlen: None,
                extra: vec![],
            }],
        }];
        group_sample_calls(&inputs, &[], 0.5, &mut chrom_map).unwrap()
    }

    fn cell<'a>(grouped: &'a crate::group::GroupedCalls, column: &str) -> &'a Cell {
        &grouped.table.rows[0][grouped.table.col_idx(column).unwrap()]
    }

    #[test]
    fn annotate_genes_rolls_up_in_gene_list_order() -> Result<(), anyhow::Error> {
        let mut grouped = grouped_fixture(&["ENSG02", "ENSG01"], SvType::Del);
        super::annotate_genes(&mut grouped, &gene_ref_fixture())?;

        assert_eq!(grouped.table.rows.len(), 1);
        assert_eq!(
            cell(&grouped, "Ensembl Gene ID"),
            &Cell::List(vec!["ENSG02".to_string(), "ENSG01".to_string()])
        );
        assert_eq!(
            cell(&grouped, "BioMart Associated Gene Name"),
            &Cell::List(vec!["GENEB".to_string(), "GENEA".to_string()])
        );
        assert_eq!(
            cell(&grouped, "HPO Features"),
            &Cell::List(vec!["na".to_string(), "Seizure, Ataxia".to_string()])
        );
        // both genes lack inheritance annotation, collapse to a single na
        assert_eq!(
            cell(&grouped, "OMIM Inheritance"),
            &Cell::List(vec!["na".to_string()])
        );
        assert_eq!(
            cell(&grouped, "HGMD disease"),
            &Cell::List(vec!["na".to_string(), "DiseaseX".to_string()])
        );

        Ok(())
    }

    #[test]
    fn annotate_genes_discards_kind_conflicting_disease_entries() -> Result<(), anyhow::Error> {
        // ENSG03 only carries a DUP-tagged disease entry, so it contributes
        // nothing to a DEL group.
        let mut grouped = grouped_fixture(&["ENSG03", "ENSG01"], SvType::Del);
        super::annotate_genes(&mut grouped, &gene_ref_fixture())?;

        assert_eq!(
            cell(&grouped, "Ensembl Gene ID"),
            &Cell::List(vec!["ENSG01".to_string()])
        );
        assert_eq!(
            cell(&grouped, "HGMD disease"),
            &Cell::List(vec!["DiseaseX".to_string()])
        );

        Ok(())
    }

    #[test]
    fn annotate_genes_keeps_kind_matching_disease_entries() -> Result<(), anyhow::Error> {
        let mut grouped = grouped_fixture(&["ENSG03"], SvType::Dup);
        super::annotate_genes(&mut grouped, &gene_ref_fixture())?;

        assert_eq!(
            cell(&grouped, "HGMD disease"),
            &Cell::List(vec!["DiseaseY".to_string()])
        );
        assert_eq!(
            cell(&grouped, "HGMD SVTYPE"),
            &Cell::List(vec!["DUP".to_string()])
        );

        Ok(())
    }

    #[test]
    fn annotate_genes_unknown_gene_gets_placeholders() -> Result<(), anyhow::Error> {
        let mut grouped = grouped_fixture(&["ENSG99"], SvType::Del);
        super::annotate_genes(&mut grouped, &gene_ref_fixture())?;

        assert_eq!(
            cell(&grouped, "Ensembl Gene ID"),
            &Cell::List(vec!["ENSG99".to_string()])
        );
        assert_eq!(
            cell(&grouped, "BioMart Associated Gene Name"),
            &Cell::List(vec!["na".to_string()])
        );

        Ok(())
    }

    #[test]
    fn annotate_genes_empty_gene_list_gets_placeholders() -> Result<(), anyhow::Error> {
        let mut grouped = grouped_fixture(&[], SvType::Del);
        super::annotate_genes(&mut grouped, &gene_ref_fixture())?;

        assert_eq!(
            cell(&grouped, "Ensembl Gene ID"),
            &Cell::List(vec!["".to_string()])
        );
        assert_eq!(
            cell(&grouped, "HGMD disease"),
            &Cell::List(vec!["na".to_string()])
        );

        Ok(())
    }

    #[test]
    fn normalize_rollup_values() {
        assert_eq!(
            normalize_rollup(&["a".to_string(), "nan".to_string()]),
            Cell::List(vec!["a".to_string(), "na".to_string()])
        );
        assert_eq!(
            normalize_rollup(&["nan".to_string(), "NaN".to_string()]),
            Cell::List(vec!["na".to_string()])
        );
        assert_eq!(
            normalize_rollup(&["".to_string()]),
            Cell::List(vec!["".to_string()])
        );
    }
}
