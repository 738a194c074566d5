//! Intolerance score source.

use std::path::Path;

use crate::table::{prioritized_merge, Table};

/// Fold constraint scores into the gene reference, matched on gene symbol.
#[tracing::instrument(skip(gene_ref))]
pub fn annotate(gene_ref: Table, path: &Path) -> Result<Table, anyhow::Error> {
    let table = Table::read_tsv(path)?;
    let mut table = table.select(&["gene", "syn_z", "mis_z", "lof_z", "pLI"])?;
    table.prefix_columns("ExAC");
    prioritized_merge(
        &gene_ref,
        &table,
        &[("ExAC gene", "BioMart Associated Gene Name")],
    )
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::table::{Cell, Table};

    #[test]
    fn annotate_joins_by_gene_symbol() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("exac.tsv");
        std::fs::write(
            &path,
            "transcript\tgene\tchr\tsyn_z\tmis_z\tlof_z\tpLI\n\
             ENST01.1\tGENEA\t1\t1.1\t2.2\t3.3\t0.99\n",
        )?;

        let mut gene_ref = Table::with_columns(&[
            "BioMart Ensembl Gene ID",
            "BioMart Associated Gene Name",
        ]);
        gene_ref.push_row(vec![Cell::scalar("ENSG01"), Cell::scalar("GENEA")]);
        gene_ref.push_row(vec![Cell::scalar("ENSG02"), Cell::scalar("GENEB")]);

        let table = super::annotate(gene_ref, &path)?;
        assert_eq!(
            table.columns,
            vec![
                "BioMart Ensembl Gene ID",
                "BioMart Associated Gene Name",
                "ExAC syn_z",
                "ExAC mis_z",
                "ExAC lof_z",
                "ExAC pLI",
            ]
        );
        assert_eq!(
            table.rows[0],
            vec![
                Cell::scalar("ENSG01"),
                Cell::scalar("GENEA"),
                Cell::scalar("1.1"),
                Cell::scalar("2.2"),
                Cell::scalar("3.3"),
                Cell::scalar("0.99"),
            ]
        );
        assert_eq!(table.rows[1][2], Cell::scalar("nan"));

        Ok(())
    }
}
