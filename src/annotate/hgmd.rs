//! Disease variant database source.
//!
//! The input is a flat export of the gross-lesion tables with one row per
//! database entry: `TABLE`, `TYPE`, `DISEASE`, `TAG`, `DESCR`, `GENE`,
//! `JOURNAL`, `AUTHOR`, `YEAR`, `PMID`.  Header case is not significant.

use std::path::Path;

use indexmap::IndexMap;

use crate::model::SvType;
use crate::table::{prioritized_merge, Cell, Table};

/// The sub-tables of the export and the variant kind they annotate.
const SUB_TABLES: &[(&str, &str, SvType)] = &[
    ("GROSDEL", "", SvType::Del),
    ("GROSINS", "I", SvType::Ins),
    ("GROSINS", "D", SvType::Dup),
];

/// Per-gene accumulator for one sub-table.
#[derive(Debug, Default)]
struct GeneEntry {
    disease: Vec<String>,
    tag: Vec<String>,
    descr: Vec<String>,
    journal_details: Vec<String>,
}

/// Collect one sub-table: filter rows, fold the journal reference fields
/// into one `journal:author:year:pmid` string, aggregate per gene with `, `
/// joins, and tag every row with the sub-table's variant kind.
fn collect_sub_table(
    export: &Table,
    table_name: &str,
    type_tag: &str,
    sv_type: SvType,
) -> Result<Table, anyhow::Error> {
    let idx = |name: &str| export.col_idx(name);
    let (table_col, type_col) = (idx("table")?, idx("type")?);
    let (disease_col, tag_col, descr_col) = (idx("disease")?, idx("tag")?, idx("descr")?);
    let (gene_col, journal_col, author_col) = (idx("gene")?, idx("journal")?, idx("author")?);
    let (year_col, pmid_col) = (idx("year")?, idx("pmid")?);

    let mut by_gene: IndexMap<String, GeneEntry> = IndexMap::new();
    for row in &export.rows {
        let value = |col: usize| row[col].as_scalar(&export.columns[col]);
        if value(table_col)? != table_name || value(type_col)? != type_tag {
            continue;
        }
        let entry = by_gene.entry(value(gene_col)?.to_owned()).or_default();
        entry.disease.push(value(disease_col)?.to_owned());
        entry.tag.push(value(tag_col)?.to_owned());
        entry.descr.push(value(descr_col)?.to_owned());
        entry.journal_details.push(format!(
            "{}:{}:{}:{}",
            value(journal_col)?,
            value(author_col)?,
            value(year_col)?,
            value(pmid_col)?
        ));
    }

    let mut result =
        Table::with_columns(&["gene", "disease", "tag", "descr", "JOURNAL_DETAILS"]);
    for (gene, entry) in by_gene {
        result.push_row(vec![
            Cell::scalar(gene.to_uppercase()),
            Cell::scalar(entry.disease.join(", ")),
            Cell::scalar(entry.tag.join(", ")),
            Cell::scalar(entry.descr.join(", ")),
            Cell::scalar(entry.journal_details.join(", ")),
        ]);
    }
    result.prefix_columns("HGMD");
    result.add_column("HGMD SVTYPE", Cell::scalar(sv_type.to_string()))?;
    Ok(result)
}

/// Fold disease variant entries into the gene reference, matched on gene
/// symbol.  The kind tag attached here is enforced later, during gene
/// rollup against a concrete variant group.
#[tracing::instrument(skip(gene_ref))]
pub fn annotate(gene_ref: Table, path: &Path) -> Result<Table, anyhow::Error> {
    let mut export = Table::read_tsv(path)?;
    // Column lookups below run on the lower-cased header.
    for column in &mut export.columns {
        *column = column.to_lowercase();
    }
    let mut combined = Table::with_columns(&[
        "HGMD gene",
        "HGMD disease",
        "HGMD tag",
        "HGMD descr",
        "HGMD JOURNAL_DETAILS",
        "HGMD SVTYPE",
    ]);
    for &(table_name, type_tag, sv_type) in SUB_TABLES {
        let sub = collect_sub_table(&export, table_name, type_tag, sv_type)?;
        combined.rows.extend(sub.rows);
    }
    combined.dedup_rows();

    prioritized_merge(
        &gene_ref,
        &combined,
        &[("HGMD gene", "BioMart Associated Gene Name")],
    )
}
