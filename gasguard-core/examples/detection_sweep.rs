//! Detection sweep
//!
//! Feeds a fixed set of gas readings through the engine with empty history
//! and prints each verdict, then replays a rising series through the
//! ingestion boundary to show the trend and velocity channels.
//!
//! Run with `cargo run -p gasguard-core --example detection_sweep`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use gasguard_core::{
    EnsembleDetector, FixedClock, IngestRequest, Ingestor, MemoryStore, ThresholdSet, Verdict,
};

fn print_verdict(verdict: &Verdict) {
    let fired: Vec<String> = verdict
        .details
        .iter()
        .filter(|(_, result)| result.detected)
        .map(|(method, result)| format!("{method}={}", result.label))
        .collect();

    println!(
        "  {:>8.1} ppm  {:<20} confidence {:.2}  [{}]",
        verdict.value,
        verdict.anomaly_type,
        verdict.confidence,
        fired.join(", ")
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let thresholds = ThresholdSet::default();
    println!(
        "Levels: warning {} / critical {} / extreme {} ppm",
        thresholds.warning, thresholds.critical, thresholds.extreme
    );

    println!("\nSingle readings, no history:");
    let engine = EnsembleDetector::new(thresholds.clone(), Arc::new(MemoryStore::new()));
    for value in [50.0, 250.0, 300.0, 500.0, 1000.0, 1500.0] {
        print_verdict(&engine.evaluate(value, "mq5_01")?);
    }

    println!("\nRising series, one reading every 30 s:");
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let engine = EnsembleDetector::builder(thresholds, Arc::new(MemoryStore::new())).build()?;
    let ingestor = Ingestor::new(engine, clock.clone());
    for value in [120.0, 125.0, 122.0, 140.0, 165.0, 190.0, 260.0, 310.0] {
        let outcome = ingestor.ingest(IngestRequest::new("MQ-5", value).with_sensor_id("kitchen-1"))?;
        print_verdict(&outcome.verdict);
        clock.advance(Duration::seconds(30));
    }

    Ok(())
}
