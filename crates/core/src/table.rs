//! In-memory record table with one typed coercion pass.
//!
//! Raw strings are kept verbatim so the clean output can reproduce the input
//! exactly; rules read the typed [`Cell`] values instead.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::CoreError;
use crate::schema::{self, ColumnKind, Schema};
use crate::types::{RowIndex, YesNo};
use crate::validation::dates::{check_date, DateCheck};

/// Raw values the spreadsheet export uses for a missing cell.
pub const NULL_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

static YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}$").expect("static year pattern is valid")
});

static NULL_CELL: Cell = Cell::Null;

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Year(u16),
    Number(f64),
    Flag(YesNo),
    Date(NaiveDate),
    /// Present but not coercible to the column's kind. Holds the raw text.
    Invalid(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<YesNo> {
        match self {
            Self::Flag(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("<null>"),
            Self::Text(s) | Self::Invalid(s) => f.write_str(s),
            Self::Year(y) => write!(f, "{y}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Flag(flag) => f.write_str(flag.as_str()),
            Self::Date(d) => write!(f, "{}", d.format("%d-%b-%Y")),
        }
    }
}

/// Render a number without a trailing `.0` when it is whole.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Whether a raw value is one of the [`NULL_MARKERS`].
pub fn is_null_marker(raw: &str) -> bool {
    NULL_MARKERS.contains(&raw.trim())
}

/// Coerce one raw value according to `kind`.
pub fn coerce(raw: &str, kind: ColumnKind) -> Cell {
    if is_null_marker(raw) {
        return Cell::Null;
    }
    let trimmed = raw.trim();
    match kind {
        ColumnKind::Text => Cell::Text(raw.to_string()),
        ColumnKind::Identifier => Cell::Text(trimmed.to_string()),
        ColumnKind::Year => {
            if YEAR_PATTERN.is_match(trimmed) {
                trimmed
                    .parse()
                    .map(Cell::Year)
                    .unwrap_or_else(|_| Cell::Invalid(raw.to_string()))
            } else {
                Cell::Invalid(raw.to_string())
            }
        }
        ColumnKind::Decimal | ColumnKind::Count => match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Invalid(raw.to_string()),
        },
        ColumnKind::YesNo => YesNo::parse(raw)
            .map(Cell::Flag)
            .unwrap_or_else(|| Cell::Invalid(raw.to_string())),
        ColumnKind::Date => match check_date(raw) {
            DateCheck::Valid(d) => Cell::Date(d),
            _ => Cell::Invalid(raw.to_string()),
        },
    }
}

/// A column computed from other columns, appended to the outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub name: String,
    pub values: Vec<Cell>,
}

/// The loaded input table.
#[derive(Debug, Clone)]
pub struct RecordTable {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
    raw: Vec<Vec<String>>,
    cells: Vec<Vec<Cell>>,
    derived: Vec<DerivedColumn>,
}

impl RecordTable {
    /// Build a table from a header row and raw string rows.
    pub fn from_records<I, R, S>(headers: Vec<String>, rows: I, schema: &Schema) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positions = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(CoreError::DuplicateColumn(name.clone()));
            }
        }

        let kinds: Vec<ColumnKind> = headers.iter().map(|h| schema.kind_of(h)).collect();
        let mut raw = Vec::new();
        let mut cells = Vec::new();
        for row in rows {
            let mut values: Vec<String> = row.into_iter().map(Into::into).collect();
            // Short rows are padded with nulls; extra trailing fields are dropped.
            values.resize(headers.len(), String::new());
            cells.push(
                values
                    .iter()
                    .zip(&kinds)
                    .map(|(v, kind)| coerce(v, *kind))
                    .collect(),
            );
            raw.push(values);
        }

        Ok(Self {
            headers,
            positions,
            raw,
            cells,
            derived: Vec::new(),
        })
    }

    /// Read a comma-delimited table with a header row.
    pub fn from_reader<R: Read>(reader: R, schema: &Schema) -> Result<Self, CoreError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }
        Self::from_records(headers, rows, schema)
    }

    /// Read the table at `path` using the farmer-record schema.
    pub fn from_path(path: &Path, schema: &Schema) -> Result<Self, CoreError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(std::io::BufReader::new(file), schema)?;
        tracing::info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "Loaded record table",
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn rows(&self) -> std::ops::Range<RowIndex> {
        0..self.raw.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Whether `name` is an input or derived column.
    pub fn has_column(&self, name: &str) -> bool {
        self.positions.contains_key(name) || self.derived.iter().any(|d| d.name == name)
    }

    /// Typed value at (`row`, `column`). Absent columns read as null.
    pub fn cell(&self, row: RowIndex, column: &str) -> &Cell {
        if let Some(&i) = self.positions.get(column) {
            return self.cells.get(row).and_then(|r| r.get(i)).unwrap_or(&NULL_CELL);
        }
        self.derived
            .iter()
            .find(|d| d.name == column)
            .and_then(|d| d.values.get(row))
            .unwrap_or(&NULL_CELL)
    }

    /// Raw input text at (`row`, `column`).
    pub fn raw(&self, row: RowIndex, column: &str) -> Option<&str> {
        let i = *self.positions.get(column)?;
        self.raw.get(row).and_then(|r| r.get(i)).map(String::as_str)
    }

    /// The record identifier, if present.
    pub fn uid(&self, row: RowIndex) -> Option<&str> {
        self.cell(row, schema::UID).as_text()
    }

    /// Store a derived column, replacing any earlier column of the same name.
    pub fn set_derived(&mut self, name: &str, values: Vec<Cell>) {
        let column = DerivedColumn {
            name: name.to_string(),
            values,
        };
        match self.derived.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = column,
            None => self.derived.push(column),
        }
    }

    pub fn derived(&self) -> &[DerivedColumn] {
        &self.derived
    }

    /// Header row of the written outputs: input columns, then derived ones.
    pub fn output_headers(&self) -> Vec<&str> {
        self.headers
            .iter()
            .map(String::as_str)
            .chain(self.derived.iter().map(|d| d.name.as_str()))
            .collect()
    }

    /// One output row: the raw input values followed by derived values.
    pub fn output_row(&self, row: RowIndex) -> Vec<String> {
        let mut out = self.raw.get(row).cloned().unwrap_or_default();
        for column in &self.derived {
            out.push(match column.values.get(row) {
                Some(Cell::Null) | None => String::new(),
                Some(cell) => cell.to_string(),
            });
        }
        out
    }
}
