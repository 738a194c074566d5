//! Inheritance database source.

use std::io::BufRead;
use std::path::Path;

use anyhow::anyhow;
use indexmap::IndexMap;

use crate::common::io;
use crate::table::{prioritized_merge, Cell, Table};

/// Inheritance pattern descriptions and their abbreviated codes.
///
/// All patterns naming a phenotype are collected, so a phenotype described
/// as "X-linked dominant" yields both `XLD` and the plain `XL` code.
const INHERITANCE_CODES: &[(&str, &str)] = &[
    ("autosomal dominant", "AD"),
    ("autosomal recessive", "AR"),
    ("x-linked dominant", "XLD"),
    ("x-linked recessive", "XLR"),
    ("y-linked dominant", "YLD"),
    ("y-linked recessive", "YLR"),
    ("x-linked", "XL"),
    ("y-linked", "YL"),
];

/// Reduce a free-text phenotype description to `&`-joined inheritance codes,
/// one entry per `; `-separated phenotype that names at least one pattern.
fn inheritance_from_phenotypes(phenotypes: &str) -> String {
    let mut inheritance = Vec::new();
    for phenotype in phenotypes.split("; ") {
        let phenotype = phenotype.to_lowercase();
        let codes = INHERITANCE_CODES
            .iter()
            .filter(|(description, _)| phenotype.contains(description))
            .map(|(_, code)| *code)
            .collect::<Vec<_>>();
        if !codes.is_empty() {
            inheritance.push(codes.join("&"));
        }
    }
    inheritance.join(", ")
}

/// Read a TSV whose header may be hidden among `#`-prefixed comment lines.
///
/// The last comment line before the first data line is taken as the header;
/// when no comment precedes the data, the first data line is.  Later comment
/// lines (footers) are skipped.
fn read_commented_tsv(path: &Path) -> Result<Table, anyhow::Error> {
    let reader = io::open_read_maybe_gz(path)?;
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if let Some(stripped) = line.strip_prefix('#') {
            if rows.is_empty() {
                header = Some(
                    stripped
                        .split('\t')
                        .map(|field| field.trim().to_string())
                        .collect(),
                );
            }
            continue;
        }
        let fields = line
            .split('\t')
            .map(|field| field.to_string())
            .collect::<Vec<_>>();
        match &header {
            None => header = Some(fields.iter().map(|field| field.trim().to_string()).collect()),
            Some(_) => rows.push(fields),
        }
    }

    let columns = header.ok_or_else(|| anyhow!("{:?}: no header line found", path))?;
    let mut table = Table::new(columns);
    for mut fields in rows {
        fields.resize(table.columns.len(), String::new());
        table.rows.push(fields.into_iter().map(Cell::Scalar).collect());
    }
    Ok(table)
}

/// Fold inheritance annotations into the gene reference, matched on gene id.
///
/// Rows without phenotype description are dropped; the remaining rows are
/// aggregated per gene with ` & ` joins before merging.
#[tracing::instrument(skip(gene_ref))]
pub fn annotate(gene_ref: Table, path: &Path) -> Result<Table, anyhow::Error> {
    let table = read_commented_tsv(path)?;
    let mut table = table.select(&["Mim Number", "Ensembl Gene ID", "Phenotypes"])?;
    let phenotypes_col = table.col_idx("Phenotypes")?;
    table.rows.retain(|row| match &row[phenotypes_col] {
        Cell::Scalar(value) => !value.is_empty() && !value.eq_ignore_ascii_case("nan"),
        Cell::List(_) => true,
    });

    let gene_col = table.col_idx("Ensembl Gene ID")?;
    let mim_col = table.col_idx("Mim Number")?;
    let mut by_gene: IndexMap<String, (Vec<String>, Vec<String>, Vec<String>)> = IndexMap::new();
    for row in &table.rows {
        let gene = row[gene_col].as_scalar("Ensembl Gene ID")?.to_owned();
        let phenotypes = row[phenotypes_col].as_scalar("Phenotypes")?.to_owned();
        let mim = row[mim_col].as_scalar("Mim Number")?.to_owned();
        let inheritance = inheritance_from_phenotypes(&phenotypes);
        let entry = by_gene.entry(gene).or_default();
        entry.0.push(phenotypes);
        entry.1.push(mim);
        entry.2.push(inheritance);
    }

    let mut aggregated = Table::with_columns(&[
        "Ensembl Gene ID",
        "Phenotypes",
        "Mim Number",
        "Inheritance",
    ]);
    for (gene, (phenotypes, mims, inheritances)) in by_gene {
        aggregated.push_row(vec![
            Cell::Scalar(gene),
            Cell::Scalar(phenotypes.join(" & ")),
            Cell::Scalar(mims.join(" & ")),
            Cell::Scalar(inheritances.join(" & ")),
        ]);
    }
    aggregated.prefix_columns("OMIM");

    prioritized_merge(
        &gene_ref,
        &aggregated,
        &[("OMIM Ensembl Gene ID", "BioMart Ensembl Gene ID")],
    )
}
