//! Column-oriented string tables with tagged scalar/list cells and the
//! prioritized annotation merge.

use std::collections::HashSet;
use std::path::Path;

use multimap::MultiMap;

use crate::common::io;

/// Error type for table operations.
#[derive(thiserror::Error, Debug, Clone)]
pub enum TableError {
    /// Column lookup failed.
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    /// A list cell was found where a scalar value is required.
    #[error("unsupported cell shape in column {0}: expected a scalar value")]
    NotAScalar(String),
    /// Column would be added twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
}

/// One table cell, a plain string or a list accumulated by aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Scalar(String),
    List(Vec<String>),
}

impl Cell {
    pub fn scalar<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Cell::Scalar(value.into())
    }

    /// The scalar value of the cell; a list here is an unsupported shape.
    pub fn as_scalar(&self, column: &str) -> Result<&str, TableError> {
        match self {
            Cell::Scalar(value) => Ok(value),
            Cell::List(_) => Err(TableError::NotAScalar(column.to_string())),
        }
    }

    /// Rendition used when writing: scalars as-is, lists joined with `", "`.
    pub fn to_joined(&self) -> String {
        match self {
            Cell::Scalar(value) => value.clone(),
            Cell::List(values) => values.join(", "),
        }
    }

    /// Whether the written rendition would be the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Scalar(value) => value.is_empty(),
            Cell::List(values) => values.iter().all(|value| value.is_empty()),
        }
    }
}

/// In-memory table with named columns.
///
/// Row cells are aligned with `columns`; all mutation helpers keep that
/// alignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_columns(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|name| name.to_string()).collect())
    }

    /// Index of the column with the given name.
    pub fn col_idx(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Append a new column, filling existing rows with `fill`.
    pub fn add_column(&mut self, name: &str, fill: Cell) -> Result<(), TableError> {
        if self.columns.iter().any(|column| column == name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
        Ok(())
    }

    /// Remove a column from the header and all rows.
    pub fn drop_column(&mut self, name: &str) -> Result<(), TableError> {
        let idx = self.col_idx(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(())
    }

    /// Prefix every column name with `prefix` and a space.
    pub fn prefix_columns(&mut self, prefix: &str) {
        for column in &mut self.columns {
            *column = format!("{} {}", prefix, column);
        }
    }

    /// New table restricted to the given columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table, TableError> {
        let idxs = names
            .iter()
            .map(|name| self.col_idx(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut result = Table::with_columns(names);
        for row in &self.rows {
            result
                .rows
                .push(idxs.iter().map(|&idx| row[idx].clone()).collect());
        }
        Ok(result)
    }

    /// Remove duplicate rows, keeping the first occurrence.
    pub fn dedup_rows(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    /// Read a TSV file into a table of scalar cells.
    ///
    /// Headers are normalized (whitespace trimmed, leading `#` removed) and
    /// short rows are padded to the header width.
    pub fn read_tsv<P>(path: P) -> Result<Table, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let mut reader = io::tsv_reader(&path)?;
        let columns = reader
            .headers()?
            .iter()
            .map(io::clean_header)
            .collect::<Vec<_>>();
        let mut result = Table::new(columns);
        for record in reader.records() {
            let record = record?;
            let mut row = record.iter().map(Cell::scalar).collect::<Vec<_>>();
            row.resize(result.columns.len(), Cell::scalar(""));
            result.rows.push(row);
        }
        Ok(result)
    }

    /// Write the table as TSV, joining list cells with `", "`.
    pub fn write_tsv<P>(&self, path: P) -> Result<(), anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let mut writer = io::tsv_writer(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::to_joined))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Left-join annotation columns onto `base` using the declared match-field
/// pairs `(annotation column, base column)`.
///
/// The annotation rows are deduplicated first.  Each pair contributes the
/// inner join of the distinct base key tuples with the annotation table; the
/// union of all pair contributions is deduplicated and joined back onto the
/// base rows.  Base rows without any match keep their row with all
/// annotation values set to `nan`, rows with several matches are duplicated
/// per match.  The annotation-side join columns are dropped from the result.
pub fn prioritized_merge(
    base: &Table,
    annotation: &Table,
    match_fields: &[(&str, &str)],
) -> Result<Table, anyhow::Error> {
    let mut annotation = annotation.clone();
    annotation.dedup_rows();

    let ann_match_cols = match_fields
        .iter()
        .map(|(ann_col, _)| annotation.col_idx(ann_col))
        .collect::<Result<Vec<_>, _>>()?;
    let base_match_cols = match_fields
        .iter()
        .map(|(_, base_col)| base.col_idx(base_col))
        .collect::<Result<Vec<_>, _>>()?;

    let payload_cols = (0..annotation.columns.len())
        .filter(|idx| !ann_match_cols.contains(idx))
        .collect::<Vec<_>>();
    let payload_names = payload_cols
        .iter()
        .map(|&idx| annotation.columns[idx].clone())
        .collect::<Vec<_>>();
    for name in &payload_names {
        if base.columns.contains(name) {
            anyhow::bail!("annotation column {:?} already exists in base table", name);
        }
    }

    // Distinct base key tuples, in first-seen order.
    let mut base_keys: Vec<Vec<Cell>> = Vec::new();
    let mut seen = HashSet::new();
    for row in &base.rows {
        let key = base_match_cols
            .iter()
            .map(|&idx| row[idx].clone())
            .collect::<Vec<_>>();
        if seen.insert(key.clone()) {
            base_keys.push(key);
        }
    }

    // Per match pair, inner-join the key tuples with the annotation rows.
    let mut matched: Vec<(Vec<Cell>, Vec<Cell>)> = Vec::new();
    let mut seen = HashSet::new();
    for (pair_idx, &ann_col) in ann_match_cols.iter().enumerate() {
        let mut by_value: MultiMap<&str, usize> = MultiMap::new();
        for (row_idx, row) in annotation.rows.iter().enumerate() {
            by_value.insert(
                row[ann_col].as_scalar(&annotation.columns[ann_col])?,
                row_idx,
            );
        }
        for key in &base_keys {
            let value = key[pair_idx].as_scalar(&base.columns[base_match_cols[pair_idx]])?;
            if let Some(row_idxs) = by_value.get_vec(value) {
                for &row_idx in row_idxs {
                    let payload = payload_cols
                        .iter()
                        .map(|&idx| annotation.rows[row_idx][idx].clone())
                        .collect::<Vec<_>>();
                    let entry = (key.clone(), payload);
                    if seen.insert(entry.clone()) {
                        matched.push(entry);
                    }
                }
            }
        }
    }

    // Join the union of matches back onto the base rows.
    let mut by_key: MultiMap<Vec<Cell>, usize> = MultiMap::new();
    for (idx, (key, _)) in matched.iter().enumerate() {
        by_key.insert(key.clone(), idx);
    }

    let mut result = Table::new(
        base.columns
            .iter()
            .cloned()
            .chain(payload_names.iter().cloned())
            .collect(),
    );
    for row in &base.rows {
        let key = base_match_cols
            .iter()
            .map(|&idx| row[idx].clone())
            .collect::<Vec<_>>();
        if let Some(match_idxs) = by_key.get_vec(&key) {
            for &match_idx in match_idxs {
                let mut out = row.clone();
                out.extend(matched[match_idx].1.iter().cloned());
                result.rows.push(out);
            }
        } else {
            let mut out = row.clone();
            out.extend(payload_names.iter().map(|_| Cell::scalar("nan")));
            result.rows.push(out);
        }
    }
    result.dedup_rows();

    Ok(result)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{prioritized_merge, Cell, Table};

    fn scalar_row(values: &[&str]) -> Vec<Cell> {
        values.iter().copied().map(Cell::scalar).collect()
    }

    #[test]
    fn cell_to_joined() {
        assert_eq!(Cell::scalar("a").to_joined(), "a");
        assert_eq!(
            Cell::List(vec!["a".to_string(), "b".to_string()]).to_joined(),
            "a, b"
        );
        assert_eq!(Cell::List(vec![]).to_joined(), "");
    }

    #[test]
    fn cell_as_scalar_rejects_lists() {
        let cell = Cell::List(vec!["a".to_string()]);
        assert!(cell.as_scalar("lorem").is_err());
    }

    #[test]
    fn dedup_rows_keeps_first() {
        let mut table = Table::with_columns(&["a", "b"]);
        table.push_row(scalar_row(&["1", "x"]));
        table.push_row(scalar_row(&["2", "y"]));
        table.push_row(scalar_row(&["1", "x"]));
        table.dedup_rows();
        assert_eq!(
            table.rows,
            vec![scalar_row(&["1", "x"]), scalar_row(&["2", "y"])]
        );
    }

    #[test]
    fn select_reorders_columns() -> Result<(), anyhow::Error> {
        let mut table = Table::with_columns(&["a", "b", "c"]);
        table.push_row(scalar_row(&["1", "2", "3"]));
        let selected = table.select(&["c", "a"])?;
        assert_eq!(selected.columns, vec!["c", "a"]);
        assert_eq!(selected.rows, vec![scalar_row(&["3", "1"])]);
        assert!(table.select(&["lorem"]).is_err());

        Ok(())
    }

    #[test]
    fn add_and_drop_column() -> Result<(), anyhow::Error> {
        let mut table = Table::with_columns(&["a"]);
        table.push_row(scalar_row(&["1"]));
        table.add_column("b", Cell::scalar("fill"))?;
        assert_eq!(table.rows, vec![scalar_row(&["1", "fill"])]);
        assert!(table.add_column("b", Cell::scalar("")).is_err());
        table.drop_column("a")?;
        assert_eq!(table.columns, vec!["b"]);
        assert_eq!(table.rows, vec![scalar_row(&["fill"])]);

        Ok(())
    }

    #[test]
    fn prefix_columns() {
        let mut table = Table::with_columns(&["gene", "syn_z"]);
        table.prefix_columns("ExAC");
        assert_eq!(table.columns, vec!["ExAC gene", "ExAC syn_z"]);
    }

    #[test]
    fn read_tsv_normalizes_headers_and_pads_rows() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("table.tsv");
        std::fs::write(&path, "#CHROM\tPOS \tNAME\n1\t100\tfirst\n2\t200\n")?;

        let table = Table::read_tsv(&path)?;
        assert_eq!(table.columns, vec!["CHROM", "POS", "NAME"]);
        assert_eq!(
            table.rows,
            vec![scalar_row(&["1", "100", "first"]), scalar_row(&["2", "200", ""])]
        );

        Ok(())
    }

    #[test]
    fn write_tsv_joins_list_cells() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("out.tsv");

        let mut table = Table::with_columns(&["gene", "features"]);
        table.push_row(vec![
            Cell::scalar("ENSG01"),
            Cell::List(vec!["Seizure".to_string(), "Ataxia".to_string()]),
        ]);
        table.write_tsv(&path)?;

        let written = std::fs::read_to_string(&path)?;
        assert_eq!(written, "gene\tfeatures\nENSG01\tSeizure, Ataxia\n");

        Ok(())
    }

    #[test]
    fn prioritized_merge_left_join_with_misses() -> Result<(), anyhow::Error> {
        let mut base = Table::with_columns(&["gene id", "symbol"]);
        base.push_row(scalar_row(&["ABC1", "A"]));
        base.push_row(scalar_row(&["DEF2", "D"]));

        let mut annotation = Table::with_columns(&["src gene", "src disease"]);
        annotation.push_row(scalar_row(&["ABC1", "X"]));

        let merged = prioritized_merge(&base, &annotation, &[("src gene", "gene id")])?;
        assert_eq!(merged.columns, vec!["gene id", "symbol", "src disease"]);
        assert_eq!(
            merged.rows,
            vec![
                scalar_row(&["ABC1", "A", "X"]),
                scalar_row(&["DEF2", "D", "nan"]),
            ]
        );

        Ok(())
    }

    #[test]
    fn prioritized_merge_duplicates_rows_per_match() -> Result<(), anyhow::Error> {
        let mut base = Table::with_columns(&["gene id"]);
        base.push_row(scalar_row(&["ABC1"]));

        let mut annotation = Table::with_columns(&["src gene", "src disease"]);
        annotation.push_row(scalar_row(&["ABC1", "X"]));
        annotation.push_row(scalar_row(&["ABC1", "Y"]));
        annotation.push_row(scalar_row(&["ABC1", "X"]));

        let merged = prioritized_merge(&base, &annotation, &[("src gene", "gene id")])?;
        assert_eq!(
            merged.rows,
            vec![scalar_row(&["ABC1", "X"]), scalar_row(&["ABC1", "Y"])]
        );

        Ok(())
    }

    #[test]
    fn prioritized_merge_with_empty_annotation() -> Result<(), anyhow::Error> {
        let mut base = Table::with_columns(&["gene id"]);
        base.push_row(scalar_row(&["ABC1"]));

        let annotation = Table::with_columns(&["src gene", "src disease"]);
        let merged = prioritized_merge(&base, &annotation, &[("src gene", "gene id")])?;
        assert_eq!(merged.columns, vec!["gene id", "src disease"]);
        assert_eq!(merged.rows, vec![scalar_row(&["ABC1", "nan"])]);

        Ok(())
    }

    #[test]
    fn prioritized_merge_unions_multiple_pairs() -> Result<(), anyhow::Error> {
        let mut base = Table::with_columns(&["gene id", "symbol"]);
        base.push_row(scalar_row(&["ABC1", "A"]));
        base.push_row(scalar_row(&["DEF2", "D"]));

        let mut annotation = Table::with_columns(&["src gene", "src symbol", "src disease"]);
        annotation.push_row(scalar_row(&["ABC1", "other", "X"]));
        annotation.push_row(scalar_row(&["other", "D", "Y"]));

        let merged = prioritized_merge(
            &base,
            &annotation,
            &[("src gene", "gene id"), ("src symbol", "symbol")],
        )?;
        assert_eq!(merged.columns, vec!["gene id", "symbol", "src disease"]);
        assert_eq!(
            merged.rows,
            vec![scalar_row(&["ABC1", "A", "X"]), scalar_row(&["DEF2", "D", "Y"])]
        );

        Ok(())
    }

    #[test]
    fn prioritized_merge_rejects_column_collisions() {
        let mut base = Table::with_columns(&["gene id", "src disease"]);
        base.push_row(scalar_row(&["ABC1", "pre-existing"]));
        let annotation = Table::with_columns(&["src gene", "src disease"]);

        assert!(prioritized_merge(&base, &annotation, &[("src gene", "gene id")]).is_err());
    }
}
