// src/dataset/mod.rs — In-memory labeled table

pub mod labels;

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use rand::Rng;

use crate::infra::errors::{EvolveError, Result};
pub use labels::LabelSet;

/// A table of string cells with named columns.
///
/// Everything the optimizer needs from a dataset is row selection and column
/// filtering, so cells stay as text and no type inference is attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build from columns and rows. Every row must have one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(EvolveError::Dataset(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(EvolveError::Dataset(format!("duplicate column '{}'", dup)));
        }
        Ok(Self { columns, rows })
    }

    /// Load a CSV file; `.tsv` / `.tab` files are read tab-separated.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => {
                b'\t'
            }
            _ => b',',
        };
        let file = std::fs::File::open(path)?;
        let ds = Self::from_reader(file, delimiter)?;
        tracing::debug!(
            path = %path.display(),
            rows = ds.len(),
            columns = ds.columns.len(),
            "Dataset loaded"
        );
        Ok(ds)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }
        Self::new(columns, rows)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like `column_index`, but a missing column is an error naming what exists.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EvolveError::MissingColumn {
                column: name.to_string(),
                available: self.columns.join(", "),
            })
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// A copy without `name`.
    pub fn drop_column(&self, name: &str) -> Result<Dataset> {
        let idx = self.require_column(name)?;
        let columns = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, c)| c.clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| {
                r.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, c)| c.clone())
                    .collect()
            })
            .collect();
        Ok(Dataset { columns, rows })
    }

    /// A copy with `name` set to `values`, replacing the column if it exists.
    pub fn with_column(&self, name: &str, values: Vec<String>) -> Result<Dataset> {
        if values.len() != self.rows.len() {
            return Err(EvolveError::Dataset(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        let mut out = self.clone();
        match out.column_index(name) {
            Some(idx) => {
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                out.columns.push(name.to_string());
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(out)
    }

    /// A copy holding only the given rows, in the given order.
    /// Out-of-range indices are skipped.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// One row as a column → value map.
    pub fn row_map(&self, i: usize) -> BTreeMap<String, String> {
        self.rows
            .get(i)
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .unwrap_or_default()
    }

    /// Distinct values of `column` in order of first appearance.
    pub fn labels(&self, column: &str) -> Result<LabelSet> {
        Ok(LabelSet::from_values(self.column(column)?))
    }

    /// Draw `n` distinct row indices uniformly at random.
    pub fn sample_indices<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<usize>> {
        if n > self.rows.len() {
            return Err(EvolveError::SampleTooLarge {
                sample_size: n,
                rows: self.rows.len(),
            });
        }
        Ok(rand::seq::index::sample(rng, self.rows.len(), n).into_vec())
    }
}
