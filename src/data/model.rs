use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Filter selections and unique-value indices are `BTreeSet`s, so `Value`
/// must be totally ordered.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.2}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Interpret the value as an `f64` for numeric reducers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if v.is_finite() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Truthiness used by the "any-true" reducer (spike flags).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(v) if !v.is_nan() => Some(*v != 0.0),
            Value::Text(s) => parse_bool(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text written to a CSV export. `Null` is the empty field.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Null => String::new(),
        }
    }

    /// Convert to `kind`, or `None` if this value cannot be represented
    /// as that kind. `Null`, null tokens and non-finite floats always convert to `Null`.
    pub fn try_coerce(&self, kind: ColumnKind) -> Option<Value> {
        match (self, kind) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Text(s), _) if is_null_token(s) => Some(Value::Null),
            (Value::Text(s), ColumnKind::Text) => Some(Value::Text(s.clone())),
            (Value::Text(s), ColumnKind::Integer) => s.trim().parse().ok().map(Value::Integer),
            (Value::Text(s), ColumnKind::Float) => s
                .trim()
                .parse::<f64>()
                .ok()
                .map(|v| if v.is_finite() { Value::Float(v) } else { Value::Null }),
            (Value::Text(s), ColumnKind::Bool) => parse_bool(s).map(Value::Bool),
            (Value::Text(s), ColumnKind::Date) => parse_date(s).map(Value::Date),

            (Value::Integer(i), ColumnKind::Integer) => Some(Value::Integer(*i)),
            (Value::Integer(i), ColumnKind::Float) => Some(Value::Float(*i as f64)),
            (Value::Integer(i), ColumnKind::Text) => Some(Value::Text(i.to_string())),
            (Value::Integer(i), ColumnKind::Bool) if *i == 0 || *i == 1 => {
                Some(Value::Bool(*i == 1))
            }

            (Value::Float(v), _) if !v.is_finite() => Some(Value::Null),
            (Value::Float(v), ColumnKind::Float) => Some(Value::Float(*v)),
            (Value::Float(v), ColumnKind::Integer) if v.fract() == 0.0 && v.is_finite() => {
                Some(Value::Integer(*v as i64))
            }
            (Value::Float(v), ColumnKind::Text) => Some(Value::Text(v.to_string())),

            (Value::Bool(b), ColumnKind::Bool) => Some(Value::Bool(*b)),
            (Value::Bool(b), ColumnKind::Integer) => Some(Value::Integer(*b as i64)),
            (Value::Bool(b), ColumnKind::Float) => Some(Value::Float(*b as u8 as f64)),
            (Value::Bool(b), ColumnKind::Text) => Some(Value::Text(b.to_string())),

            (Value::Date(d), ColumnKind::Date) => Some(Value::Date(*d)),
            (Value::Date(d), ColumnKind::Text) => {
                Some(Value::Text(d.format("%Y-%m-%d").to_string()))
            }

            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Permissive cell parsing
// ---------------------------------------------------------------------------

/// Tokens read as missing values, whatever the column type.
pub fn is_null_token(s: &str) -> bool {
    matches!(
        s.trim(),
        "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None" | "NaT"
    )
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "t" => Some(true),
        "false" | "no" | "n" | "f" => Some(false),
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Parse a calendar date from any of the common spellings.
/// US `m/d/Y` wins over European `d/m/Y` when both would parse.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(d);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

// ---------------------------------------------------------------------------
// Column schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Bool,
    Date,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    /// Narrowest kind that represents every value, trying
    /// Integer → Float → Bool → Date before falling back to Text.
    /// A column with no non-null cells is Text.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value> + Clone) -> ColumnKind {
        let candidates = [
            ColumnKind::Integer,
            ColumnKind::Float,
            ColumnKind::Bool,
            ColumnKind::Date,
        ];
        let has_data = values
            .clone()
            .into_iter()
            .any(|v| !matches!(v.try_coerce(ColumnKind::Text), Some(Value::Null)));
        if !has_data {
            return ColumnKind::Text;
        }
        candidates
            .into_iter()
            .find(|kind| {
                values
                    .clone()
                    .into_iter()
                    .all(|v| v.try_coerce(*kind).is_some())
            })
            .unwrap_or(ColumnKind::Text)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Bool => "bool",
            ColumnKind::Date => "date",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// A single row; `values[i]` belongs to `Table::columns[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Record { values }
    }

    pub fn get(&self, column: usize) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// An ordered sequence of records sharing one schema, with pre-computed
/// unique values per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Record>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<Value>>,
}

impl Table {
    /// Build a table and its column indices. Every row must have exactly one
    /// value per column.
    pub fn new(columns: Vec<Column>, rows: Vec<Record>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.values.len() != columns.len())
        {
            return Err(Error::MalformedInput(format!(
                "row {i} has {} values but the table has {} columns",
                row.values.len(),
                columns.len()
            )));
        }
        Ok(Self::from_parts(columns, rows))
    }

    fn from_parts(columns: Vec<Column>, rows: Vec<Record>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = columns
            .iter()
            .map(|c| (c.name.clone(), BTreeSet::new()))
            .collect();

        for row in &rows {
            for (col, val) in columns.iter().zip(&row.values) {
                if let Some(set) = unique_values.get_mut(&col.name) {
                    set.insert(val.clone());
                }
            }
        }
        Table {
            columns,
            rows,
            unique_values,
        }
    }

    /// A new table with the same columns holding the given rows, in the
    /// order given.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Self::from_parts(self.columns.clone(), rows)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of a column, or `UnknownColumn`.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// All values of one column in row order.
    pub fn values<'a>(&'a self, name: &str) -> Result<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |r| r.get(idx)))
    }

    /// Numeric values of one column; `None` for null cells.
    /// Fails with `NotNumeric` unless the column is Integer or Float.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.require_column(name)?;
        if !self.columns[idx].kind.is_numeric() {
            return Err(Error::NotNumeric(name.to_string()));
        }
        Ok(self.rows.iter().map(|r| r.get(idx).as_f64()).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
