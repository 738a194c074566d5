//! Phenotype ontology term source.

use std::path::Path;

use crate::table::{prioritized_merge, Cell, Table};

/// Fold phenotype terms into the gene reference, matched on gene id.
///
/// The free-text feature lists use `; ` as delimiter; they are unified to
/// `, ` so that all aggregated report cells read the same.
#[tracing::instrument(skip(gene_ref))]
pub fn annotate(gene_ref: Table, path: &Path) -> Result<Table, anyhow::Error> {
    let table = Table::read_tsv(path)?;
    let mut table = table.select(&["Gene ID", "Features"])?;
    let features_col = table.col_idx("Features")?;
    for row in &mut table.rows {
        if let Cell::Scalar(value) = &mut row[features_col] {
            *value = value.replace("; ", ", ");
        }
    }
    table.prefix_columns("HPO");
    prioritized_merge(&gene_ref, &table, &[("HPO Gene ID", "BioMart Ensembl Gene ID")])
}
