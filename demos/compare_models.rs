//! Compare the four predictors on an OHLCV file or a synthetic series.
//!
//! ```text
//! RUST_LOG=info cargo run --example compare_models -- data/GOOG.csv
//! ```

use anofox_seqcast::data::load_ohlcv_csv;
use anofox_seqcast::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

fn synthetic(n: usize) -> Result<Series> {
    let base = Utc.with_ymd_and_hms(2018, 1, 2, 0, 0, 0).unwrap();
    let mut builder = SeriesBuilder::new()
        .timestamps((0..n).map(|i| base + Duration::days(i as i64)).collect());
    for (k, column) in ohlcv_columns().into_iter().enumerate() {
        let level = if k == 4 { 2.0e6 } else { 1200.0 };
        builder = builder.column(
            column,
            (0..n)
                .map(|i| {
                    let t = i as f64;
                    level * (1.0 + 0.0004 * t + 0.03 * (t / 9.0 + k as f64 * 0.2).sin())
                })
                .collect(),
        );
    }
    builder.build()
}

fn print_reports(reports: &[ExperimentReport]) {
    for report in reports {
        println!("\n{}", "=".repeat(80));
        println!(
            "{}: {} epochs, best epoch {}",
            report.name,
            report.history.epochs_run(),
            report.history.best_epoch + 1
        );
        println!("{}", "=".repeat(80));
        print!("{}", report.metrics);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let series = match std::env::args().nth(1) {
        Some(path) => load_ohlcv_csv(path)?,
        None => synthetic(500)?,
    };
    println!("Loaded {} rows", series.len());

    let training = TrainingConfig::default().with_epochs(20);

    let single = PipelineConfig::single_step().with_training(training.clone());
    let prepared = prepare(&series, &single)?;
    let registry =
        PredictorRegistry::single_step(Hyperparameters::simple_rnn(), Hyperparameters::lstm());
    print_reports(&compare(&prepared, &registry)?);

    let multi = PipelineConfig::multi_step(ohlcv_columns()).with_training(training);
    let prepared = prepare(&series, &multi)?;
    let encoder_decoder = Hyperparameters::new(32, Hyperparameters::encoder_decoder().activation);
    let registry = PredictorRegistry::multi_step(
        encoder_decoder,
        Hyperparameters::attention_from(Hyperparameters::lstm(), encoder_decoder),
    );
    print_reports(&compare(&prepared, &registry)?);

    Ok(())
}
