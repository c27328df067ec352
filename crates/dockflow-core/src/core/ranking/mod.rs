//! Score tables and the composite multi-criteria ranking algorithm.

pub mod composite;

use serde::{Deserialize, Serialize};

/// One value in a [`ScoreTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Num(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Numeric coercion: `Num` passes through, `Text` is parsed, everything
    /// else fails.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Cell::Num(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Missing => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Cell::Num(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{v}")
                }
            }
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }
}

/// Sort direction for one ranked column.
///
/// `Ascending` favors lower values: the smallest value receives rank 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Ordered mapping from column name to sort direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankSpec {
    columns: Vec<(String, SortOrder)>,
}

impl RankSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.columns.push((column.into(), order));
        self
    }

    pub fn columns(&self) -> &[(String, SortOrder)] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Result of [`composite::rank_composite`]: the fully ranked table plus the
/// best row per group, re-ranked across groups.
#[derive(Debug, Clone, PartialEq)]
pub struct RankOutcome {
    pub all_ranked: ScoreTable,
    pub top_per_group: ScoreTable,
}

/// A set of rows sharing a fixed column schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ScoreTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Appends a row; the arity must match the schema.
    pub fn push_row(&mut self, row: Vec<Cell>) -> bool {
        if row.len() != self.columns.len() {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: Cell) {
        if let Some(idx) = self.column_index(column) {
            if let Some(r) = self.rows.get_mut(row) {
                r[idx] = value;
            }
        }
    }

    /// Adds a new column filled from `values`; `values` must cover every row.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Cell>) -> bool {
        if values.len() != self.rows.len() {
            return false;
        }
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        true
    }

    /// Adds a column holding the same value in every row.
    pub fn add_constant_column(&mut self, name: impl Into<String>, value: Cell) {
        let values = vec![value; self.rows.len()];
        self.add_column(name, values);
    }

    /// Appends all rows of `other`. Schemas must match exactly.
    pub fn concat(&mut self, other: &ScoreTable) -> bool {
        if self.columns != other.columns {
            return false;
        }
        self.rows.extend(other.rows.iter().cloned());
        true
    }

    /// Stable sort of the rows by a numeric column, ascending. Rows whose
    /// cell does not coerce to a number sort last.
    pub fn sort_by_num_column(&mut self, column: &str) {
        let Some(idx) = self.column_index(column) else {
            return;
        };
        self.rows.sort_by(|a, b| {
            match (a[idx].as_num(), b[idx].as_num()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }

    /// Reorders columns to `order`, dropping columns not named there.
    /// Unknown names are skipped.
    pub fn select_columns(&self, order: &[&str]) -> ScoreTable {
        let indices: Vec<usize> = order
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        let columns: Vec<String> = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        ScoreTable { columns, rows }
    }
}
