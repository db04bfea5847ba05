//! Train the outlier model from a reading log
//!
//! Summarizes the gas readings in the log, fits scaler + forest, writes the
//! artifact and probes it with a fixed set of values.
//!
//! Run with
//! `cargo run -p gasguard-ml --example train_model -- [sensor_data.csv] [model/isolation_forest.json]`.

use std::env;

use gasguard_core::sensors::GAS_SENSOR;
use gasguard_core::CsvStore;
use gasguard_ml::{sweep, LogSummary, Trainer, DEFAULT_SWEEP_VALUES};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let log_path = args.next().unwrap_or_else(|| "sensor_data.csv".to_string());
    let model_path = args
        .next()
        .unwrap_or_else(|| "model/isolation_forest.json".to_string());

    let readings = CsvStore::new(&log_path).load_all()?;
    println!("Loaded {} readings from {}", readings.len(), log_path);
    print!("{}", LogSummary::from_readings(&readings, GAS_SENSOR));

    let trainer = Trainer::default();
    let artifact = trainer.train(&readings)?;
    artifact.save(&model_path)?;

    let stats = artifact.forest.stats();
    println!(
        "\nSaved {} ({} trees, subsample {}, contamination {:?}, seed {})",
        model_path, stats.num_trees, stats.subsample_size, trainer.forest.contamination, trainer.forest.seed
    );
    println!("Decision threshold: {:.4}", stats.threshold);

    println!("\nProbe values:");
    for point in sweep(&artifact, GAS_SENSOR, DEFAULT_SWEEP_VALUES)? {
        let status = if point.outlier { "OUTLIER" } else { "normal" };
        println!("  {:>9.0} ppm  score {:.3}  {}", point.value, point.score, status);
    }

    Ok(())
}
