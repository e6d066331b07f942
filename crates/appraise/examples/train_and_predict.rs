//! Train, score, predict and save a house price model.
//!
//! Reads an Ames-style CSV when a path is given, otherwise uses synthetic
//! houses. Set `RUST_LOG=appraise=debug` to see per-round training logs.
//!
//! Run with:
//! ```bash
//! cargo run --example train_and_predict -- AmesHousing.csv
//! ```

use appraise::data::{CsvOptions, CsvRecordSource};
use appraise::model::TreeParams;
use appraise::testing::{reference_house, synthetic_houses};
use appraise::{FeatureSchema, HouseRecord, ModelStore, Normalization, PriceModelConfig, Session};
use tracing_subscriber::EnvFilter;

fn main() -> appraise::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // =========================================================================
    // 1. Load Records
    // =========================================================================
    let records: Vec<HouseRecord> = match std::env::args().nth(1) {
        Some(path) => {
            let options = CsvOptions {
                skip_incomplete_rows: true,
                ..Default::default()
            };
            CsvRecordSource::open_with(&path, options)?.read_all()?
        }
        None => synthetic_houses(1500, 42),
    };
    println!("Loaded {} records", records.len());

    // =========================================================================
    // 2. Configure and Train
    // =========================================================================
    let config = PriceModelConfig::builder()
        .n_trees(200)
        .learning_rate(0.1)
        .tree(TreeParams::depth_wise(6))
        .normalization(Normalization::MinMax)
        .build()?;
    let session = Session::new(config);
    let model = session.fit(&records)?;

    // =========================================================================
    // 3. Evaluate
    // =========================================================================
    // Scored on the training records: this measures fit, not generalization.
    let metrics = session.evaluate(&model, &records)?;
    println!("\n=== Training Fit ===");
    println!("{metrics}");

    // =========================================================================
    // 4. Predict and Persist
    // =========================================================================
    let house = reference_house();
    let prediction = session.predict(&model, &house)?;
    println!(
        "\nReference house ({} sq ft, quality {}): {prediction}",
        house.above_grade_living_area, house.overall_quality
    );

    let store = ModelStore::default();
    store.save(&model, "model.aprs")?;
    let reloaded = store.load("model.aprs", &FeatureSchema::standard())?;
    assert_eq!(session.predict(&reloaded, &house)?, prediction);
    println!("Saved to model.aprs ({} trees)", reloaded.forest().n_trees());

    Ok(())
}
