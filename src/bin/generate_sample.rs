use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;

#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic brain-scan cohort dataset", long_about = None)]
struct Cli {
    /// Output file; the extension (.csv, .parquet or .pq) picks the format
    #[arg(default_value = "data/dataset.csv")]
    output: PathBuf,

    /// Seed for the random generator
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// `Some(v)` except for a `rate` share of draws, mimicking gaps in a
    /// real export.
    fn maybe(&mut self, rate: f64, v: f64) -> Option<f64> {
        (self.next_f64() >= rate).then_some(v)
    }
}

/// One synthetic visit.
struct Visit {
    subject: String,
    group: &'static str,
    sex: &'static str,
    age: i64,
    etiv: Option<f64>,
    nwbv: Option<f64>,
    asf: Option<f64>,
    mmse: Option<f64>,
}

/// Cohort label, subject count, mean normalised whole-brain volume.
const COHORTS: [(&str, usize, f64); 3] = [
    ("Nondemented", 190, 0.740),
    ("Demented", 146, 0.716),
    ("Converted", 37, 0.727),
];

fn generate(rng: &mut SimpleRng) -> Vec<Visit> {
    let mut visits = Vec::new();
    let mut subject_no = 1;

    for &(group, subjects, nwbv_mean) in &COHORTS {
        for _ in 0..subjects {
            let sex = if rng.next_f64() < 0.57 { "F" } else { "M" };
            let base_etiv = if sex == "F" { 1410.0 } else { 1580.0 };
            let etiv = rng.gauss(base_etiv, 150.0).clamp(1100.0, 2000.0);
            let age = rng.gauss(77.0, 7.5).round().clamp(60.0, 98.0) as i64;
            let mmse = match group {
                "Demented" => rng.gauss(24.5, 4.0),
                _ => rng.gauss(29.0, 1.0),
            }
            .round()
            .clamp(4.0, 30.0);
            let nwbv = (rng.gauss(nwbv_mean, 0.035) * 1000.0).round() / 1000.0;

            visits.push(Visit {
                subject: format!("OAS2_{subject_no:04}"),
                group,
                sex,
                age,
                etiv: rng.maybe(0.02, etiv.round()),
                nwbv: rng.maybe(0.02, nwbv),
                // Atlas scaling factor is inversely proportional to eTIV.
                asf: rng.maybe(0.02, (1755.0 / etiv * 1000.0).round() / 1000.0),
                mmse: rng.maybe(0.05, mmse),
            });
            subject_no += 1;
        }
    }

    visits
}

fn opt_cell(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn write_csv(visits: &[Visit], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(["Subject ID", "Group", "M/F", "Age", "MMSE", "eTIV", "nWBV", "ASF"])?;
    for v in visits {
        writer.write_record([
            v.subject.clone(),
            v.group.to_string(),
            v.sex.to_string(),
            v.age.to_string(),
            opt_cell(v.mmse),
            opt_cell(v.etiv),
            opt_cell(v.nwbv),
            opt_cell(v.asf),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(visits: &[Visit], path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Subject ID", DataType::Utf8, false),
        Field::new("Group", DataType::Utf8, false),
        Field::new("M/F", DataType::Utf8, false),
        Field::new("Age", DataType::Int64, false),
        Field::new("MMSE", DataType::Float64, true),
        Field::new("eTIV", DataType::Float64, true),
        Field::new("nWBV", DataType::Float64, true),
        Field::new("ASF", DataType::Float64, true),
    ]));

    let floats = |f: fn(&Visit) -> Option<f64>| -> ArrayRef {
        Arc::new(visits.iter().map(f).collect::<Float64Array>())
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(visits.iter().map(|v| v.subject.as_str()))),
        Arc::new(StringArray::from_iter_values(visits.iter().map(|v| v.group))),
        Arc::new(StringArray::from_iter_values(visits.iter().map(|v| v.sex))),
        Arc::new(Int64Array::from_iter_values(visits.iter().map(|v| v.age))),
        floats(|v| v.mmse),
        floats(|v| v.etiv),
        floats(|v| v.nwbv),
        floats(|v| v.asf),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let path = cli.output.as_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut rng = SimpleRng::new(cli.seed);
    let visits = generate(&mut rng);

    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => write_csv(&visits, path)?,
        Some("parquet") | Some("pq") => write_parquet(&visits, path)?,
        _ => bail!("output must end in .csv or .parquet: {}", path.display()),
    }

    info!("Wrote {} visits to {}", visits.len(), path.display());
    Ok(())
}
