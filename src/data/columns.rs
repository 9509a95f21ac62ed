use arrow::datatypes::DataType;

use super::model::Dataset;

/// Split of a dataset's columns into groupable text and aggregatable numbers.
/// Columns of any other storage type (booleans, dates, ...) are in neither list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClassification {
    pub textual: Vec<String>,
    pub numeric: Vec<String>,
}

pub fn is_textual(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

pub fn is_numeric(data_type: &DataType) -> bool {
    data_type.is_integer() || data_type.is_floating()
}

/// Derive the classification from the dataset's schema.  Never cached, so it
/// can't drift from the table it describes.
pub fn classify(dataset: &Dataset) -> ColumnClassification {
    let mut classes = ColumnClassification::default();
    for field in dataset.schema().fields() {
        if is_textual(field.data_type()) {
            classes.textual.push(field.name().clone());
        } else if is_numeric(field.data_type()) {
            classes.numeric.push(field.name().clone());
        }
    }
    classes
}
