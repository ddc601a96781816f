use anyhow::{Context, Result};
use serde_json::{Value, json};

use qpcr_panda::data::loader::{JsonSheet, JsonWorkbookFile};

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
}

/// Wells A1..H12 in plate order.
fn wells() -> Vec<String> {
    ('A'..='H')
        .flat_map(|row| (1..=12).map(move |col| format!("{row}{col}")))
        .collect()
}

/// Export layout of the plate reader: a blank index column plus 7 data columns.
const PLATE_COLUMNS: [&str; 8] = [
    "",
    "Well",
    "Fluor",
    "Target",
    "Content",
    "Sample",
    "Cq",
    "Starting Quantity (SQ)",
];

fn replicate_sheet(name: &str, target: &str, base_cq: &[Option<f64>], rng: &mut SimpleRng) -> JsonSheet {
    let rows = wells()
        .into_iter()
        .zip(base_cq)
        .enumerate()
        .map(|(i, (well, cq))| {
            let cq = match cq {
                Some(mean) => json!((rng.gauss(*mean, 0.25) * 100.0).round() / 100.0),
                None => json!("Undetermined"),
            };
            vec![
                json!(i),
                json!(well),
                json!("FAM"),
                json!(target),
                json!(if i < 88 { "Unkn" } else { "NTC" }),
                json!(format!("WW-{:02}", i / 4 + 1)),
                cq,
                Value::Null,
            ]
        })
        .collect();

    JsonSheet {
        name: name.to_string(),
        columns: PLATE_COLUMNS.iter().map(|c| json!(c)).collect(),
        rows,
    }
}

fn sample_sheet() -> JsonSheet {
    let rows = wells()
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i < 88)
        .map(|(i, well)| {
            let dilution = if i % 3 == 0 { 2 } else { 1 };
            vec![
                json!(well),
                json!(format!("WW-{:02}", i / 4 + 1)),
                json!(dilution),
                json!(dilution * 10),
            ]
        })
        .collect();

    JsonSheet {
        name: "sample_info".to_string(),
        columns: ["Well", "Sample ID", "Dilution factor SARS-CoV-2", "Dilution factor PMMV"]
            .iter()
            .map(|c| json!(c))
            .collect(),
        rows,
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // Per-well mean Cq per assay; roughly a fifth of target wells are non-detects,
    // the last 8 wells are no-template controls.
    let assays = [("N1", 31.0, 0.2), ("N2", 32.5, 0.25), ("PMMV", 22.0, 0.0)];

    let mut sheets = vec![sample_sheet()];
    for (target, mean, dropout) in assays {
        let base: Vec<Option<f64>> = (0..96)
            .map(|i| {
                if i >= 88 || rng.next_f64() < dropout {
                    None
                } else {
                    Some(rng.gauss(mean, 1.5))
                }
            })
            .collect();
        for rep in 1..=3 {
            let name = format!("{target}_rep{rep}");
            sheets.push(replicate_sheet(&name, target, &base, &mut rng));
        }
    }

    let workbook = JsonWorkbookFile { sheets };
    let output_path = std::env::args().nth(1).unwrap_or_else(|| "sample_data.json".to_string());
    let text = serde_json::to_string_pretty(&workbook).context("serialising workbook")?;
    std::fs::write(&output_path, text).with_context(|| format!("writing {output_path}"))?;

    println!(
        "Wrote {} sheets ({} wells each) to {output_path}",
        workbook.sheets.len(),
        wells().len()
    );
    Ok(())
}
