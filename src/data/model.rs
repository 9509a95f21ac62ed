use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;

// ---------------------------------------------------------------------------
// Cell – a single dynamically-typed value read from a row-oriented source
// ---------------------------------------------------------------------------

/// One cell from a spreadsheet or JSON record, before the column type is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::DateTime(ms) => write!(f, "{ms}"),
            Cell::Null => Ok(()),
        }
    }
}

impl Cell {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    fn is_integral(&self) -> bool {
        match self {
            Cell::Integer(_) => true,
            Cell::Float(v) => v.fract() == 0.0 && v.abs() < i64::MAX as f64,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Column type inference for row-oriented sources
// ---------------------------------------------------------------------------

/// Storage type chosen for a column of [`Cell`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

fn infer_column(cells: &[Cell]) -> Inferred {
    let mut present = cells.iter().filter(|c| **c != Cell::Null).peekable();
    if present.peek().is_none() {
        // An all-empty column reads as missing floats.
        return Inferred::Float;
    }
    let present: Vec<&Cell> = present.collect();

    if present.iter().all(|c| c.as_f64().is_some()) {
        if present.iter().all(|c| c.is_integral()) {
            return Inferred::Int;
        }
        return Inferred::Float;
    }
    if present.iter().all(|c| matches!(c, Cell::Bool(_))) {
        return Inferred::Bool;
    }
    if present.iter().all(|c| matches!(c, Cell::DateTime(_))) {
        return Inferred::DateTime;
    }
    Inferred::Text
}

fn build_array(cells: &[Cell], kind: Inferred) -> (DataType, ArrayRef) {
    match kind {
        Inferred::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Integer(i) => Some(*i),
                    Cell::Float(v) => Some(*v as i64),
                    _ => None,
                })
                .collect();
            (DataType::Int64, Arc::new(Int64Array::from(values)))
        }
        Inferred::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(Cell::as_f64).collect();
            (DataType::Float64, Arc::new(Float64Array::from(values)))
        }
        Inferred::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            (DataType::Boolean, Arc::new(BooleanArray::from(values)))
        }
        Inferred::DateTime => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Cell::DateTime(ms) => Some(*ms),
                    _ => None,
                })
                .collect();
            (
                DataType::Timestamp(TimeUnit::Millisecond, None),
                Arc::new(TimestampMillisecondArray::from(values)),
            )
        }
        Inferred::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            (DataType::Utf8, Arc::new(StringArray::from(values)))
        }
    }
}

/// Build a typed [`RecordBatch`] from a header row and row-major cells.
/// Short rows are padded with nulls.
pub fn batch_from_rows(headers: &[String], rows: &[Vec<Cell>]) -> Result<RecordBatch> {
    if headers.is_empty() {
        bail!("No columns found");
    }

    let mut fields = Vec::with_capacity(headers.len());
    let mut arrays = Vec::with_capacity(headers.len());

    for (idx, name) in headers.iter().enumerate() {
        let cells: Vec<Cell> = rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or(Cell::Null))
            .collect();
        let (data_type, array) = build_array(&cells, infer_column(&cells));
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .context("assembling columns into a table")
}

/// Rename repeated column names to `name.1`, `name.2`, ... so every column
/// can be addressed by name.  Suffixes that collide with a name already in the
/// table are skipped.
fn dedupe_column_names(batch: RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut taken: HashSet<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let mut kept: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut renamed = false;

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let name = f.name();
            if kept.insert(name.clone()) {
                return (**f).clone();
            }
            renamed = true;
            let n = next_suffix.entry(name.clone()).or_insert(1);
            let unique = loop {
                let candidate = format!("{name}.{n}");
                *n += 1;
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            };
            (**f).clone().with_name(unique)
        })
        .collect();

    if !renamed {
        return Ok(batch);
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
        .context("renaming duplicate columns")
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// A loaded input file: one table with named, typed, equal-length columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// File the table was read from.
    pub source: PathBuf,
    pub batch: RecordBatch,
}

impl Dataset {
    pub fn new(source: &Path, batch: RecordBatch) -> Result<Self> {
        Ok(Dataset {
            source: source.to_path_buf(),
            batch: dedupe_column_names(batch)?,
        })
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// The one-line shape summary shown under the file selector.
    pub fn summary(&self) -> String {
        format!(
            "Rows: {} | Columns: {} | Headings: {:?}",
            self.num_rows(),
            self.num_columns(),
            self.column_names()
        )
    }
}
