use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use calamine::{Data, Reader, open_workbook_auto};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Cell, Dataset, batch_from_rows};

/// Milliseconds between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25_569.0;
const MS_PER_DAY: f64 = 86_400_000.0;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, column types inferred from every record
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first worksheet, header row
/// * `.parquet` – any flat Parquet file
/// * `.json`    – `[{ "col": value, ... }, ...]`
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let batch = match ext.as_str() {
        "csv" => load_csv(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    Dataset::new(path, batch)
}

fn concat(schema: SchemaRef, batches: &[RecordBatch]) -> Result<RecordBatch> {
    concat_batches(&schema, batches).context("combining record batches")
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// First row is the header.  The schema is inferred from all records, so a
/// column is numeric only when every non-empty cell parses as a number.
/// Date-like text stays text.
fn load_csv(path: &Path) -> Result<RecordBatch> {
    let mut file = File::open(path).context("opening CSV")?;
    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, None)
        .context("inferring CSV column types")?;
    file.rewind().context("rewinding CSV")?;

    let schema = Arc::new(temporal_as_text(&schema));
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)
        .context("building CSV reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("parsing CSV rows")?;

    concat(schema, &batches)
}

fn temporal_as_text(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            if f.data_type().is_temporal() {
                Field::new(f.name(), DataType::Utf8, true)
            } else {
                f.as_ref().clone()
            }
        })
        .collect();
    Schema::new(fields)
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<RecordBatch> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .context("reading first worksheet")?;

    let mut rows = range.rows();
    let header_row = rows.next().context("worksheet is empty")?;
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Data::Empty => format!("Unnamed: {i}"),
            other => other.to_string(),
        })
        .collect();

    let body: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    batch_from_rows(&headers, &body)
}

fn spreadsheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::Int(i) => Cell::Integer(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => {
            let ms = (dt.as_f64() - EXCEL_UNIX_EPOCH_DAYS) * MS_PER_DAY;
            Cell::DateTime(ms.round() as i64)
        }
        Data::Empty => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("reading parquet record batch")?;

    concat(schema, &batches)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Region": "North", "Sales": 120.5 },
///   { "Region": "South", "Sales": 80 }
/// ]
/// ```
///
/// Keys become columns in first-seen order; a key missing from a record is null.
fn load_json(path: &Path) -> Result<RecordBatch> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows: Vec<Vec<Cell>> = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_cell).unwrap_or(Cell::Null))
                .collect()
        })
        .collect();

    batch_from_rows(&headers, &rows)
}

fn json_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use rust_xlsxwriter::Workbook;

    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_csv_with_inferred_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "sales.csv",
            "Region,Sales,Price,Active\nA,10,1.5,true\nA,20,,false\nB,5,2.25,true\n",
        );

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.num_rows(), 3);
        assert_eq!(ds.column_names(), vec!["Region", "Sales", "Price", "Active"]);

        let schema = ds.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);
        assert_eq!(schema.field(3).data_type(), &DataType::Boolean);

        let sales = ds.column("Sales").unwrap().as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(sales.values().to_vec(), vec![10, 20, 5]);
        assert!(ds.column("Price").unwrap().is_null(1));
    }

    #[test]
    fn csv_dates_stay_textual() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "dated.csv",
            "Date,Region,Sales\n2024-01-15,A,10\n2024-01-16,B,5\n2024-01-15T08:30:00,A,7\n",
        );

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.schema().field(0).data_type(), &DataType::Utf8);
        let dates = ds.column("Date").unwrap().as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(dates.value(0), "2024-01-15");

        let classes = crate::data::columns::classify(&ds);
        assert_eq!(classes.textual, vec!["Date", "Region"]);
        assert_eq!(classes.numeric, vec!["Sales"]);
    }

    #[test]
    fn extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "upper.CSV", "k,v\nx,1\n");
        assert_eq!(load_file(&path).unwrap().num_rows(), 1);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "notes.txt", "k,v\nx,1\n");
        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_file(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn malformed_csv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.csv", "a,b\n1,2\n3,4,5,6\n");
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn reads_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "sales.json",
            r#"[{"Region":"A","Sales":10},{"Region":"B","Sales":2.5,"Note":"late"}]"#,
        );

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.column_names(), vec!["Region", "Sales", "Note"]);
        let sales = ds.column("Sales").unwrap().as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(sales.value(0), 10.0);
        assert!(ds.column("Note").unwrap().is_null(0));
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "obj.json", r#"{"Region":"A"}"#);
        assert!(load_file(&path).is_err());
        let path = write_file(&dir, "nums.json", "[1, 2]");
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn reads_first_worksheet_of_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Region").unwrap();
        sheet.write_string(0, 1, "Sales").unwrap();
        for (row, (region, sales)) in [("A", 10.0), ("A", 20.0), ("B", 5.0)].iter().enumerate() {
            sheet.write_string(row as u32 + 1, 0, *region).unwrap();
            sheet.write_number(row as u32 + 1, 1, *sales).unwrap();
        }
        workbook.save(&path).unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.num_rows(), 3);
        let region = ds.column("Region").unwrap().as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(region.value(2), "B");
        assert_eq!(ds.schema().field(1).data_type(), &DataType::Int64);
    }
}
