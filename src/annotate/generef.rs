//! Gene-model backbone for the gene reference.

use std::path::Path;

use thousands::Separable;

use crate::table::{Cell, Table};

/// Read the gene-model TSV and shape it into the canonical join backbone:
/// one row per (gene id, symbol) with the symbol uppercased so that symbol
/// matching is case-insensitive.
#[tracing::instrument]
pub fn read_gene_backbone(path: &Path) -> Result<Table, anyhow::Error> {
    let table = Table::read_tsv(path)?;
    let mut table = table.select(&["Ensembl Gene ID", "Associated Gene Name"])?;
    let name_col = table.col_idx("Associated Gene Name")?;
    for row in &mut table.rows {
        if let Cell::Scalar(value) = &mut row[name_col] {
            *value = value.to_uppercase();
        }
    }
    table.dedup_rows();
    table.prefix_columns("BioMart");
    tracing::debug!(
        "gene backbone has {} rows",
        table.rows.len().separate_with_commas()
    );
    Ok(table)
}
