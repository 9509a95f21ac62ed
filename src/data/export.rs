use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, BooleanArray, Float64Array};
use arrow::compute::cast;
use arrow::csv::WriterBuilder;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use rust_xlsxwriter::{Format, Workbook};

use super::columns::is_numeric;

/// Whether `path` names a CSV destination (case-insensitive extension).
pub fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Write a report table to `dest`: CSV when the extension is `.csv`,
/// otherwise an Excel workbook.  No index column is written in either case.
pub fn export_report(batch: &RecordBatch, dest: &Path) -> Result<()> {
    if is_csv_path(dest) {
        write_csv(batch, dest)
    } else {
        write_xlsx(batch, dest)
    }
}

fn write_csv(batch: &RecordBatch, dest: &Path) -> Result<()> {
    let file = File::create(dest)
        .with_context(|| format!("creating {}", dest.display()))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch).context("writing CSV rows")?;
    Ok(())
}

fn write_xlsx(batch: &RecordBatch, dest: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    let options = FormatOptions::default();
    for (col_idx, field) in batch.schema().fields().iter().enumerate() {
        let col = u16::try_from(col_idx).context("too many columns for a worksheet")?;
        sheet
            .write_string_with_format(0, col, field.name(), &header)
            .context("writing header")?;

        let array = batch.column(col_idx);
        let first_row = 1u32;

        if is_numeric(array.data_type()) {
            let floats = cast(array, &DataType::Float64).context("converting numbers")?;
            let floats = floats
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64 values")?;
            for row in 0..floats.len() {
                if floats.is_valid(row) {
                    sheet
                        .write_number(first_row + row as u32, col, floats.value(row))
                        .context("writing number")?;
                }
            }
        } else if let Some(bools) = array.as_any().downcast_ref::<BooleanArray>() {
            for row in 0..bools.len() {
                if bools.is_valid(row) {
                    sheet
                        .write_boolean(first_row + row as u32, col, bools.value(row))
                        .context("writing boolean")?;
                }
            }
        } else {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &options)
                .context("formatting column")?;
            for row in 0..array.len() {
                if array.is_valid(row) {
                    sheet
                        .write_string(first_row + row as u32, col, formatter.value(row).to_string())
                        .context("writing text")?;
                }
            }
        }
    }

    workbook
        .save(dest)
        .with_context(|| format!("saving workbook {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use calamine::{Data, Reader, open_workbook_auto};

    use super::*;
    use crate::data::loader::load_file;

    fn report() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Region", DataType::Utf8, true),
            Field::new("Sales", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["A", "B"])),
                Arc::new(Int64Array::from(vec![30, 5])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn csv_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.csv");
        let original = report();

        export_report(&original, &dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "Region,Sales\nA,30\nB,5\n");

        let reread = load_file(&dest).unwrap();
        assert_eq!(reread.batch, original);
    }

    #[test]
    fn non_csv_destination_writes_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.xlsx");

        export_report(&report(), &dest).unwrap();

        let mut workbook = open_workbook_auto(&dest).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows[0], vec![Data::String("Region".into()), Data::String("Sales".into())]);
        assert_eq!(rows[1][0], Data::String("A".into()));
        assert_eq!(rows[1][1], Data::Float(30.0));
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn csv_extension_check_ignores_case() {
        assert!(is_csv_path(Path::new("out/Report.CSV")));
        assert!(!is_csv_path(Path::new("out/report.xlsx")));
        assert!(!is_csv_path(Path::new("out/report")));
    }

    #[test]
    fn unwritable_destination_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("report.csv");
        assert!(export_report(&report(), &dest).is_err());
        let dest = dir.path().join("missing-dir").join("report.xlsx");
        assert!(export_report(&report(), &dest).is_err());
    }
}
