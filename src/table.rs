use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{Result, anyhow, ensure};

/// Column-name-addressed table of string cells. The empty cell is the
/// missing-value sentinel, mirroring the CSV wire format the corpus
/// arrives in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
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

    pub fn col(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_col(&self, name: &str) -> Result<usize> {
        self.col(name)
            .ok_or_else(|| anyhow!("required column `{name}` is missing"))
    }

    /// Rows shorter than the header list are padded with empty cells,
    /// longer rows truncated.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        ensure!(
            values.len() == self.rows.len(),
            "column `{name}` has {} values for {} rows",
            values.len(),
            self.rows.len()
        );
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn add_const_column(&mut self, name: &str, value: &str) {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.to_string());
        }
    }

    pub fn map_column<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&str) -> String,
    {
        let idx = self.require_col(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    /// Rewrite every cell of an identifier column into its canonical
    /// form so later joins compare like with like.
    pub fn canonicalize_column(&mut self, name: &str) -> Result<()> {
        self.map_column(name, canonical_id)
    }

    pub fn with_renamed_columns(&self, renames: &[(&str, &str)]) -> Table {
        let headers = self
            .headers
            .iter()
            .map(|header| {
                renames
                    .iter()
                    .find(|(from, _)| *from == header.as_str())
                    .map(|(_, to)| to.to_string())
                    .unwrap_or_else(|| header.clone())
            })
            .collect();
        Table {
            headers,
            rows: self.rows.clone(),
        }
    }

    /// Concatenate tables whose schemas may differ: the output header
    /// list is the union of all inputs in first-seen order, and rows
    /// are realigned by column name with empty cells where an input
    /// lacks a column.
    pub fn concat<I>(tables: I) -> Table
    where
        I: IntoIterator<Item = Table>,
    {
        let mut headers: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut collected: Vec<Table> = Vec::new();
        for table in tables {
            for header in table.headers() {
                if !index.contains_key(header) {
                    index.insert(header.clone(), headers.len());
                    headers.push(header.clone());
                }
            }
            collected.push(table);
        }

        let width = headers.len();
        let mut out = Table {
            headers,
            rows: Vec::new(),
        };
        for table in collected {
            let mapping: Vec<usize> = table.headers.iter().map(|h| index[h]).collect();
            for row in table.rows {
                let mut cells = vec![String::new(); width];
                for (src, cell) in row.into_iter().enumerate() {
                    if let Some(&dst) = mapping.get(src) {
                        cells[dst] = cell;
                    }
                }
                out.rows.push(cells);
            }
        }
        out
    }
}

/// Canonical string form of a player identifier. Sources disagree on
/// the native type: some ship `104925` as text, others as a number
/// that round-trips through floats as `104925.0`. Both must reduce to
/// the same key or joins silently miss.
pub fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('.')
        && let Ok(value) = trimmed.parse::<f64>()
        && value.is_finite()
        && value.fract() == 0.0
        && value.abs() < 9e15
    {
        return format!("{}", value as i64);
    }
    trimmed.to_string()
}

pub fn cell_f64(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Render a numeric cell without a spurious `.0` on whole numbers.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Numeric comparison of cells; non-numeric cells order last.
pub fn compare_numeric_cells(a: &str, b: &str) -> Ordering {
    match (cell_f64(a), cell_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
