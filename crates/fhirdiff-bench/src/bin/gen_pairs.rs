//! Generates an NDJSON corpus of bundle pairs for `fhirdiff batch`.
//!
//! Usage: `gen-pairs [COUNT] [small|medium|large]`. Each line holds one
//! reference bundle and a noisy prediction of it; the corpus is written to
//! `target/bench-fixtures/pairs.ndjson`.

use std::error::Error;
use std::fs;
use std::io::{BufWriter, Write};

use fhirdiff_bench::{SizeTier, generate_pair, pairs_fixture_path};
use fhirdiff_core::RecordPair;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let count: u64 = match args.next() {
        Some(n) => n.parse()?,
        None => 20,
    };
    let tier = match args.next().as_deref() {
        None | Some("small") => SizeTier::Small,
        Some("medium") => SizeTier::Medium,
        Some("large") => SizeTier::Large,
        Some(other) => return Err(format!("unknown tier `{other}`").into()),
    };

    let path = pairs_fixture_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    eprintln!("Generating {count} {tier:?} bundle pairs...");
    let mut out = BufWriter::new(fs::File::create(&path)?);
    for seed in 0..count {
        let (reference, prediction) = generate_pair(&tier.config(seed));
        let pair = RecordPair {
            true_value: reference,
            pred_value: prediction,
            type_name: None,
        };
        serde_json::to_writer(&mut out, &pair)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    let meta = fs::metadata(&path)?;
    eprintln!(
        "Wrote {} ({:.1} MB)",
        path.display(),
        meta.len() as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}
