use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, UInt32Array};
use arrow::compute::{
    CastOptions, SortColumn, SortOptions, cast, cast_with_options, lexsort_to_indices, take,
    take_record_batch,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use thiserror::Error;

use super::columns::is_numeric;
use super::model::Dataset;

// ---------------------------------------------------------------------------
// Aggregation functions
// ---------------------------------------------------------------------------

/// The six reductions a report can apply to its value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    Sum,
    Mean,
    Max,
    Min,
    Count,
    Median,
}

impl AggregateFn {
    /// All functions in dropdown order.
    pub const ALL: [AggregateFn; 6] = [
        AggregateFn::Sum,
        AggregateFn::Mean,
        AggregateFn::Max,
        AggregateFn::Min,
        AggregateFn::Count,
        AggregateFn::Median,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFn::Sum => "sum",
            AggregateFn::Mean => "mean",
            AggregateFn::Max => "max",
            AggregateFn::Min => "min",
            AggregateFn::Count => "count",
            AggregateFn::Median => "median",
        }
    }

    fn needs_numbers(self) -> bool {
        self != AggregateFn::Count
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateFn {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateFn::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ReportError::UnknownAggregation(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unknown aggregation function '{0}' (expected sum, mean, max, min, count or median)")]
    UnknownAggregation(String),

    #[error("column '{0}' does not exist in the dataset")]
    ColumnNotFound(String),

    #[error("group column and value column must be different (both are '{0}')")]
    SameColumn(String),

    #[error("cannot compute {agg} of column '{column}' with non-numeric type {data_type}")]
    NonNumeric {
        agg: AggregateFn,
        column: String,
        data_type: DataType,
    },

    #[error("{agg} of column '{column}' overflows a 64-bit integer")]
    Overflow { agg: AggregateFn, column: String },

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Row indices for each distinct group key, in first-seen order.
struct Groups {
    /// Index of the first row of every group; used to take the key values.
    first_rows: Vec<u32>,
    members: Vec<Vec<usize>>,
}

fn partition(keys: &ArrayRef) -> Result<Groups, ArrowError> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(keys.as_ref(), &options)?;

    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups = Groups {
        first_rows: Vec::new(),
        members: Vec::new(),
    };

    for row in 0..keys.len() {
        if keys.is_null(row) {
            continue;
        }
        let key = formatter.value(row).to_string();
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.first_rows.push(row as u32);
            groups.members.push(Vec::new());
            groups.members.len() - 1
        });
        groups.members[slot].push(row);
    }
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Reductions
// ---------------------------------------------------------------------------

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn reduce_floats(agg: AggregateFn, mut values: Vec<f64>) -> Option<f64> {
    let n = values.len();
    match agg {
        AggregateFn::Sum => Some(values.iter().sum()),
        AggregateFn::Mean => (n > 0).then(|| values.iter().sum::<f64>() / n as f64),
        AggregateFn::Max => values.into_iter().reduce(f64::max),
        AggregateFn::Min => values.into_iter().reduce(f64::min),
        AggregateFn::Median => median(&mut values),
        AggregateFn::Count => Some(n as f64),
    }
}

/// Sum, max or min over integers.  `None` when the sum overflows.
fn reduce_ints(agg: AggregateFn, values: &[i64]) -> Option<Option<i64>> {
    match agg {
        AggregateFn::Max => Some(values.iter().copied().max()),
        AggregateFn::Min => Some(values.iter().copied().min()),
        _ => values
            .iter()
            .try_fold(0i64, |acc, v| acc.checked_add(*v))
            .map(Some),
    }
}

fn aggregate(
    agg: AggregateFn,
    column: &str,
    values: &ArrayRef,
    groups: &Groups,
) -> Result<ArrayRef, ReportError> {
    if agg == AggregateFn::Count {
        let counts: Vec<i64> = groups
            .members
            .iter()
            .map(|rows| rows.iter().filter(|&&r| values.is_valid(r)).count() as i64)
            .collect();
        return Ok(Arc::new(Int64Array::from(counts)));
    }

    let keeps_integers = values.data_type().is_integer()
        && matches!(agg, AggregateFn::Sum | AggregateFn::Max | AggregateFn::Min);

    if keeps_integers {
        // Unsigned values past i64::MAX must fail rather than turn into nulls.
        let strict = CastOptions {
            safe: false,
            ..Default::default()
        };
        let ints = cast_with_options(values, &DataType::Int64, &strict)?;
        let ints = ints
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| ArrowError::CastError("expected Int64 values".into()))?;

        let mut out = Vec::with_capacity(groups.members.len());
        for rows in &groups.members {
            let present: Vec<i64> = rows
                .iter()
                .filter(|&&r| ints.is_valid(r))
                .map(|&r| ints.value(r))
                .collect();
            let reduced = reduce_ints(agg, &present).ok_or_else(|| ReportError::Overflow {
                agg,
                column: column.to_string(),
            })?;
            out.push(reduced);
        }
        return Ok(Arc::new(Int64Array::from(out)));
    }

    let floats = cast(values, &DataType::Float64)?;
    let floats = floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ArrowError::CastError("expected Float64 values".into()))?;

    let out: Vec<Option<f64>> = groups
        .members
        .iter()
        .map(|rows| {
            let present: Vec<f64> = rows
                .iter()
                .filter(|&&r| floats.is_valid(r))
                .map(|&r| floats.value(r))
                .filter(|v| !v.is_nan())
                .collect();
            reduce_floats(agg, present)
        })
        .collect();
    Ok(Arc::new(Float64Array::from(out)))
}

// ---------------------------------------------------------------------------
// Report – a built, identified result table
// ---------------------------------------------------------------------------

/// Identity of one successful report build.  Later builds get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportId(pub u64);

/// A grouped-and-aggregated table together with the request that produced it.
#[derive(Debug, Clone)]
pub struct Report {
    pub id: ReportId,
    pub group_column: String,
    pub value_column: String,
    pub agg: AggregateFn,
    /// Two columns: group key, aggregated value.
    pub table: RecordBatch,
}

impl Report {
    /// e.g. `sum of Sales by Region`.
    pub fn caption(&self) -> String {
        format!("{} of {} by {}", self.agg, self.value_column, self.group_column)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Group `dataset` by `group_col`, reduce `value_col` with `agg` per group, and
/// sort the two-column result by the reduced value, largest first.
///
/// Rows with a null group key are dropped.  Equal values keep ascending key
/// order; null results sort last.
pub fn build_report(
    dataset: &Dataset,
    group_col: &str,
    agg: AggregateFn,
    value_col: &str,
) -> Result<RecordBatch, ReportError> {
    let keys = dataset
        .column(group_col)
        .ok_or_else(|| ReportError::ColumnNotFound(group_col.to_string()))?;
    let values = dataset
        .column(value_col)
        .ok_or_else(|| ReportError::ColumnNotFound(value_col.to_string()))?;

    if group_col == value_col {
        return Err(ReportError::SameColumn(group_col.to_string()));
    }
    if agg.needs_numbers() && !is_numeric(values.data_type()) {
        return Err(ReportError::NonNumeric {
            agg,
            column: value_col.to_string(),
            data_type: values.data_type().clone(),
        });
    }

    let groups = partition(keys)?;
    let key_array = take(keys.as_ref(), &UInt32Array::from(groups.first_rows.clone()), None)?;
    let value_array = aggregate(agg, value_col, values, &groups)?;

    let schema = Arc::new(Schema::new(vec![
        Field::new(group_col, key_array.data_type().clone(), true),
        Field::new(value_col, value_array.data_type().clone(), true),
    ]));
    let unsorted = RecordBatch::try_new(schema, vec![key_array.clone(), value_array.clone()])?;

    let order = lexsort_to_indices(
        &[
            SortColumn {
                values: value_array,
                options: Some(SortOptions {
                    descending: true,
                    nulls_first: false,
                }),
            },
            SortColumn {
                values: key_array,
                options: Some(SortOptions {
                    descending: false,
                    nulls_first: false,
                }),
            },
        ],
        None,
    )?;

    Ok(take_record_batch(&unsorted, &order)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::Path;

    use arrow::array::{StringArray, UInt64Array};

    use super::*;
    use crate::data::model::{Cell, batch_from_rows};

    fn dataset(rows: Vec<Vec<Cell>>) -> Dataset {
        let headers: Vec<String> = ["Region", "Sales", "Note"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Dataset::new(Path::new("sales.csv"), batch_from_rows(&headers, &rows).unwrap()).unwrap()
    }

    fn region_sales() -> Dataset {
        dataset(vec![
            vec![Cell::Text("A".into()), Cell::Integer(10), Cell::Text("x".into())],
            vec![Cell::Text("A".into()), Cell::Integer(20), Cell::Null],
            vec![Cell::Text("B".into()), Cell::Integer(5), Cell::Text("y".into())],
        ])
    }

    fn mixed() -> Dataset {
        dataset(vec![
            vec![Cell::Text("North".into()), Cell::Float(3.5), Cell::Null],
            vec![Cell::Text("South".into()), Cell::Float(9.0), Cell::Null],
            vec![Cell::Text("East".into()), Cell::Float(1.0), Cell::Null],
            vec![Cell::Text("North".into()), Cell::Float(8.0), Cell::Null],
            vec![Cell::Null, Cell::Float(100.0), Cell::Null],
            vec![Cell::Text("East".into()), Cell::Null, Cell::Null],
            vec![Cell::Text("West".into()), Cell::Float(3.5), Cell::Null],
            vec![Cell::Text("East".into()), Cell::Float(2.0), Cell::Null],
        ])
    }

    fn keys(batch: &RecordBatch) -> Vec<String> {
        let col = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        (0..col.len()).map(|i| col.value(i).to_string()).collect()
    }

    fn float_values(batch: &RecordBatch) -> Vec<Option<f64>> {
        let col = cast(batch.column(1), &DataType::Float64).unwrap();
        let col = col.as_any().downcast_ref::<Float64Array>().unwrap();
        (0..col.len())
            .map(|i| col.is_valid(i).then(|| col.value(i)))
            .collect()
    }

    fn int_values(batch: &RecordBatch) -> Vec<i64> {
        let col = batch.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
        col.values().to_vec()
    }

    #[test]
    fn sum_groups_and_sorts_descending() {
        let report = build_report(&region_sales(), "Region", AggregateFn::Sum, "Sales").unwrap();
        assert_eq!(keys(&report), vec!["A", "B"]);
        assert_eq!(int_values(&report), vec![30, 5]);
        assert_eq!(report.schema().field(0).name(), "Region");
        assert_eq!(report.schema().field(1).name(), "Sales");
    }

    #[test]
    fn count_groups_rows() {
        let report = build_report(&region_sales(), "Region", AggregateFn::Count, "Sales").unwrap();
        assert_eq!(keys(&report), vec!["A", "B"]);
        assert_eq!(int_values(&report), vec![2, 1]);
    }

    #[test]
    fn count_skips_nulls_and_accepts_text() {
        let report = build_report(&region_sales(), "Region", AggregateFn::Count, "Note").unwrap();
        assert_eq!(keys(&report), vec!["A", "B"]);
        assert_eq!(int_values(&report), vec![1, 1]);
    }

    #[test]
    fn mean_and_median_are_floats() {
        let ds = region_sales();
        let mean = build_report(&ds, "Region", AggregateFn::Mean, "Sales").unwrap();
        assert_eq!(mean.schema().field(1).data_type(), &DataType::Float64);
        assert_eq!(float_values(&mean), vec![Some(15.0), Some(5.0)]);

        let median = build_report(&mixed(), "Region", AggregateFn::Median, "Sales").unwrap();
        assert_eq!(keys(&median), vec!["South", "North", "West", "East"]);
        assert_eq!(
            float_values(&median),
            vec![Some(9.0), Some(5.75), Some(3.5), Some(1.5)]
        );
    }

    #[test]
    fn min_and_max_keep_integer_type() {
        let ds = region_sales();
        let max = build_report(&ds, "Region", AggregateFn::Max, "Sales").unwrap();
        assert_eq!(max.schema().field(1).data_type(), &DataType::Int64);
        assert_eq!(int_values(&max), vec![20, 5]);

        let min = build_report(&ds, "Region", AggregateFn::Min, "Sales").unwrap();
        assert_eq!(keys(&min), vec!["A", "B"]);
        assert_eq!(int_values(&min), vec![10, 5]);
    }

    #[test]
    fn ties_keep_ascending_key_order() {
        let report = build_report(&mixed(), "Region", AggregateFn::Min, "Sales").unwrap();
        // North and West both have a minimum of 3.5.
        assert_eq!(keys(&report), vec!["South", "North", "West", "East"]);
    }

    #[test]
    fn one_row_per_distinct_non_null_key() {
        let ds = mixed();
        for agg in AggregateFn::ALL {
            let report = build_report(&ds, "Region", agg, "Sales").unwrap();
            assert_eq!(report.num_rows(), 4, "{agg}");
            let distinct: BTreeSet<String> = keys(&report).into_iter().collect();
            assert_eq!(distinct.len(), report.num_rows(), "{agg}");
        }
    }

    #[test]
    fn values_are_non_increasing_for_every_function() {
        let ds = mixed();
        for agg in AggregateFn::ALL {
            let report = build_report(&ds, "Region", agg, "Sales").unwrap();
            let values: Vec<f64> = float_values(&report).into_iter().flatten().collect();
            assert!(values.windows(2).all(|w| w[0] >= w[1]), "{agg}: {values:?}");
        }
    }

    #[test]
    fn changing_the_function_keeps_the_key_set() {
        let ds = mixed();
        let reference: BTreeSet<String> =
            keys(&build_report(&ds, "Region", AggregateFn::Sum, "Sales").unwrap())
                .into_iter()
                .collect();
        for agg in AggregateFn::ALL {
            let got: BTreeSet<String> = keys(&build_report(&ds, "Region", agg, "Sales").unwrap())
                .into_iter()
                .collect();
            assert_eq!(got, reference, "{agg}");
        }
    }

    #[test]
    fn count_is_never_negative() {
        let report = build_report(&mixed(), "Region", AggregateFn::Count, "Sales").unwrap();
        assert!(int_values(&report).iter().all(|&c| c >= 0));
        // East has one null Sales value.
        assert_eq!(int_values(&report), vec![2, 2, 1, 1]);
        assert_eq!(keys(&report), vec!["East", "North", "South", "West"]);
    }

    #[test]
    fn numeric_function_on_text_column_fails() {
        for agg in [
            AggregateFn::Sum,
            AggregateFn::Mean,
            AggregateFn::Max,
            AggregateFn::Min,
            AggregateFn::Median,
        ] {
            let err = build_report(&region_sales(), "Region", agg, "Note").unwrap_err();
            assert!(matches!(err, ReportError::NonNumeric { .. }), "{agg}");
        }
    }

    #[test]
    fn missing_or_repeated_columns_fail() {
        let ds = region_sales();
        assert!(matches!(
            build_report(&ds, "Country", AggregateFn::Sum, "Sales"),
            Err(ReportError::ColumnNotFound(c)) if c == "Country"
        ));
        assert!(matches!(
            build_report(&ds, "Region", AggregateFn::Sum, "Revenue"),
            Err(ReportError::ColumnNotFound(c)) if c == "Revenue"
        ));
        assert!(matches!(
            build_report(&ds, "Sales", AggregateFn::Count, "Sales"),
            Err(ReportError::SameColumn(_))
        ));
    }

    #[test]
    fn integer_overflow_is_reported() {
        let ds = dataset(vec![
            vec![Cell::Text("A".into()), Cell::Integer(i64::MAX), Cell::Null],
            vec![Cell::Text("A".into()), Cell::Integer(1), Cell::Null],
        ]);
        assert!(matches!(
            build_report(&ds, "Region", AggregateFn::Sum, "Sales"),
            Err(ReportError::Overflow { .. })
        ));
    }

    #[test]
    fn unsigned_values_beyond_i64_fail_instead_of_vanishing() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Region", DataType::Utf8, true),
            Field::new("Hits", DataType::UInt64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["A", "A", "B"])),
                Arc::new(UInt64Array::from(vec![1, u64::MAX, 2])),
            ],
        )
        .unwrap();
        let ds = Dataset::new(Path::new("hits.parquet"), batch).unwrap();

        for agg in [AggregateFn::Sum, AggregateFn::Max, AggregateFn::Min] {
            let err = build_report(&ds, "Region", agg, "Hits").unwrap_err();
            assert!(matches!(err, ReportError::Arrow(_)), "{agg}: {err}");
        }
        // Float aggregations still see every value.
        assert!(build_report(&ds, "Region", AggregateFn::Mean, "Hits").is_ok());
    }

    #[test]
    fn caption_names_the_aggregation() {
        let report = Report {
            id: ReportId(1),
            group_column: "Region".into(),
            value_column: "Sales".into(),
            agg: AggregateFn::Median,
            table: build_report(&region_sales(), "Region", AggregateFn::Median, "Sales").unwrap(),
        };
        assert_eq!(report.caption(), "median of Sales by Region");
    }

    #[test]
    fn parses_exactly_six_function_names() {
        for agg in AggregateFn::ALL {
            assert_eq!(agg.as_str().parse::<AggregateFn>().unwrap(), agg);
        }
        assert!("std".parse::<AggregateFn>().is_err());
        assert!("Sum".parse::<AggregateFn>().is_err());
        assert!("".parse::<AggregateFn>().is_err());
    }
}
