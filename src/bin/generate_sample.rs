use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const REGIONS: [(&str, f64); 4] = [("North", 1.4), ("South", 1.0), ("East", 0.8), ("West", 1.2)];
const PRODUCTS: [(&str, f64); 5] = [
    ("Widget", 19.99),
    ("Gadget", 34.50),
    ("Gizmo", 12.25),
    ("Doohickey", 7.80),
    ("Sprocket", 54.00),
];
const ROWS: usize = 500;

/// 2024-01-01T00:00:00Z
const START_MS: i64 = 1_704_067_200_000;
const DAY_MS: i64 = 86_400_000;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// One generated sales line.
struct Sale {
    region: &'static str,
    product: &'static str,
    units: i64,
    sales: f64,
    day: i64,
}

fn generate(rng: &mut SimpleRng) -> Vec<Sale> {
    (0..ROWS)
        .map(|_| {
            let (region, demand) = REGIONS[rng.below(REGIONS.len())];
            let (product, price) = PRODUCTS[rng.below(PRODUCTS.len())];
            let units = 1 + (rng.next_f64() * 40.0 * demand) as i64;
            let discount = 0.85 + rng.next_f64() * 0.15;
            let sales = (units as f64 * price * discount * 100.0).round() / 100.0;
            let day = rng.below(365) as i64;
            Sale { region, product, units, sales, day }
        })
        .collect()
}

fn write_csv(path: &str, sales: &[Sale]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("Failed to create {path}"))?;
    writer.write_record(["Region", "Product", "Units", "Sales", "Day"])?;
    for s in sales {
        writer.write_record([
            s.region.to_string(),
            s.product.to_string(),
            s.units.to_string(),
            format!("{:.2}", s.sales),
            s.day.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, sales: &[Sale]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Region", DataType::Utf8, false),
        Field::new("Product", DataType::Utf8, false),
        Field::new("Units", DataType::Int64, false),
        Field::new("Sales", DataType::Float64, false),
        Field::new("Date", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(sales.iter().map(|s| s.region))),
            Arc::new(StringArray::from_iter_values(sales.iter().map(|s| s.product))),
            Arc::new(Int64Array::from_iter_values(sales.iter().map(|s| s.units))),
            Arc::new(Float64Array::from_iter_values(sales.iter().map(|s| s.sales))),
            Arc::new(TimestampMillisecondArray::from_iter_values(
                sales.iter().map(|s| START_MS + s.day * DAY_MS),
            )),
        ],
    )?;

    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let sales = generate(&mut rng);

    write_csv("sample_sales.csv", &sales)?;
    write_parquet("sample_sales.parquet", &sales)?;

    println!(
        "Wrote {} sales rows across {} regions to sample_sales.csv and sample_sales.parquet",
        sales.len(),
        REGIONS.len()
    );
    Ok(())
}
