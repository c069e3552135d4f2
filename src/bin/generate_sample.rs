use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use parquet::arrow::ArrowWriter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

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

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Clone)]
struct Job {
    factory: String,
    work_shape: i64,
    input_ed: f64,
    input_length: f64,
    input_qty: i64,
    direction_ed: f64,
    output_ed: f64,
    steel_category: String,
    work_start: NaiveDateTime,
    work_end: NaiveDateTime,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn generate_jobs(rng: &mut SimpleRng, n: usize) -> Vec<Job> {
    let factories = ["P1", "P2"];
    let categories = ["CARBON", "ALLOY", "STS", "BEARING", "SPRING", "TOOL"];
    let diameters = [65.0, 80.0, 95.0, 110.0, 130.0, 150.0];

    let mut clock = NaiveDate::from_ymd_opt(2023, 1, 2)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .unwrap_or_default();

    let mut jobs = Vec::with_capacity(n);
    for _ in 0..n {
        let input_ed = *rng.pick(&diameters);
        let direction_ed = input_ed - 5.0;
        let input_length = round2(rng.gauss(4000.0, 350.0).max(1500.0));
        let input_qty = (rng.gauss(40.0, 12.0).max(1.0)) as i64;
        let minutes = (input_qty as f64 * input_length / 4000.0 * 1.5 + rng.gauss(0.0, 6.0))
            .max(3.0) as i64;
        let work_start = clock + Duration::minutes((rng.next_f64() * 20.0) as i64);
        let work_end = work_start + Duration::minutes(minutes) + Duration::seconds(
            (rng.next_f64() * 59.0) as i64,
        );
        let work_shape = 1 + work_start.hour() as i64 / 8;

        jobs.push(Job {
            factory: rng.pick(&factories).to_string(),
            work_shape,
            input_ed,
            input_length,
            input_qty,
            direction_ed,
            output_ed: round2(direction_ed + rng.gauss(0.3, 0.15)),
            steel_category: rng.pick(&categories).to_string(),
            work_start,
            work_end,
        });
        clock = work_end;
    }
    jobs
}

fn write_csv(path: &Path, jobs: &[Job]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "FACTORY",
        "WORK_SHAPE",
        "INPUT_ED",
        "INPUT_LENGTH",
        "INPUT_QTY",
        "DIRECTION_ED",
        "OUTPUT_ED",
        "STEEL_CATEGORY",
        "WORK_START_DT",
        "WORK_END_DT",
    ])?;
    for job in jobs {
        writer.write_record([
            job.factory.clone(),
            job.work_shape.to_string(),
            job.input_ed.to_string(),
            job.input_length.to_string(),
            job.input_qty.to_string(),
            job.direction_ed.to_string(),
            job.output_ed.to_string(),
            job.steel_category.clone(),
            job.work_start.format(TIMESTAMP_FORMAT).to_string(),
            job.work_end.format(TIMESTAMP_FORMAT).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, jobs: &[Job]) -> Result<()> {
    let text = |f: fn(&Job) -> String| -> ArrayRef {
        Arc::new(StringArray::from(jobs.iter().map(f).collect::<Vec<_>>()))
    };
    let float = |f: fn(&Job) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(jobs.iter().map(f).collect::<Vec<_>>()))
    };
    let int = |f: fn(&Job) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(jobs.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("FACTORY", DataType::Utf8, false),
        Field::new("WORK_SHAPE", DataType::Int64, false),
        Field::new("INPUT_ED", DataType::Float64, false),
        Field::new("INPUT_LENGTH", DataType::Float64, false),
        Field::new("INPUT_QTY", DataType::Int64, false),
        Field::new("DIRECTION_ED", DataType::Float64, false),
        Field::new("OUTPUT_ED", DataType::Float64, false),
        Field::new("STEEL_CATEGORY", DataType::Utf8, false),
        Field::new("WORK_START_DT", DataType::Utf8, false),
        Field::new("WORK_END_DT", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|j| j.factory.clone()),
            int(|j| j.work_shape),
            float(|j| j.input_ed),
            float(|j| j.input_length),
            int(|j| j.input_qty),
            float(|j| j.direction_ed),
            float(|j| j.output_ed),
            text(|j| j.steel_category.clone()),
            text(|j| j.work_start.format(TIMESTAMP_FORMAT).to_string()),
            text(|j| j.work_end.format(TIMESTAMP_FORMAT).to_string()),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let mut jobs = generate_jobs(&mut rng, 600);

    // Re-export glitches: a handful of exact duplicate rows.
    let dupes: Vec<Job> = jobs.iter().step_by(97).cloned().collect();
    jobs.extend(dupes);

    let dir = Path::new("data");
    std::fs::create_dir_all(dir).context("creating data directory")?;

    // The hand-written steel_ai_01_on.csv stays untouched.
    let csv_path = dir.join("steel_ai_01_on_synthetic.csv");
    write_csv(&csv_path, &jobs)?;
    let parquet_path = dir.join("steel_ai_01_on_synthetic.parquet");
    write_parquet(&parquet_path, &jobs)?;

    println!(
        "Wrote {} jobs ({} duplicated) to {} and {}",
        jobs.len(),
        jobs.len() - 600,
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
