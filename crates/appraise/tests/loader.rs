//! CSV record source integration tests.
//!
//! Columns are bound by header name, so the physical column order of the
//! file must not change what the extractor produces.

use std::io::Write;

use appraise::data::{ColumnMapping, CsvOptions, CsvRecordSource, DatasetLoadError};
use appraise::testing::synthetic_houses;
use appraise::{FeatureExtractor, FeatureField, HouseRecord, Session};

/// Synthetic houses with whole-dollar prices, so every cell survives a
/// text round trip exactly.
fn houses(n: usize, seed: u64) -> Vec<HouseRecord> {
    synthetic_houses(n, seed)
        .into_iter()
        .map(|mut h| {
            h.sale_price = h.sale_price.map(f32::round);
            h
        })
        .collect()
}

fn ames_header() -> Vec<String> {
    let mapping = ColumnMapping::ames();
    FeatureField::ALL
        .into_iter()
        .map(|f| mapping.column(f).to_string())
        .chain([mapping.target().to_string()])
        .collect()
}

/// Cell text for the column `name`; columns the mapping does not know are
/// filled with the row number.
fn cell(record: &HouseRecord, row: usize, name: &str, mapping: &ColumnMapping) -> String {
    if name == mapping.target() {
        return record.sale_price.map(|p| p.to_string()).unwrap_or_default();
    }
    match FeatureField::ALL.into_iter().find(|&f| mapping.column(f) == name) {
        Some(field) => field.value(record).to_string(),
        None => row.to_string(),
    }
}

fn write_csv(header: &[String], records: &[HouseRecord]) -> tempfile::NamedTempFile {
    let mapping = ColumnMapping::ames();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", header.join(",")).unwrap();
    for (row, record) in records.iter().enumerate() {
        let cells: Vec<String> = header.iter().map(|name| cell(record, row, name, &mapping)).collect();
        writeln!(file, "{}", cells.join(",")).unwrap();
    }
    file.flush().unwrap();
    file
}

// =============================================================================
// Column binding
// =============================================================================

#[test]
fn column_order_does_not_change_extraction() {
    let houses = houses(50, 31);

    let canonical = ames_header();
    let mut shuffled = canonical.clone();
    shuffled.reverse();
    shuffled.swap(0, 4);
    shuffled.insert(3, "Order".to_string());

    let a = write_csv(&canonical, &houses);
    let b = write_csv(&shuffled, &houses);
    let from_a = CsvRecordSource::open(a.path()).unwrap().read_all().unwrap();
    let from_b = CsvRecordSource::open(b.path()).unwrap().read_all().unwrap();

    assert_eq!(from_a, houses);
    assert_eq!(from_a, from_b);

    let extractor = FeatureExtractor::standard();
    for (x, y) in from_a.iter().zip(&from_b) {
        assert_eq!(extractor.extract(x).unwrap(), extractor.extract(y).unwrap());
    }
}

#[test]
fn streamed_records_match_read_all() {
    let houses = houses(25, 32);
    let file = write_csv(&ames_header(), &houses);

    let options = CsvOptions {
        batch_size: 4,
        ..Default::default()
    };
    let source = CsvRecordSource::open_with(file.path(), options).unwrap();
    let streamed: Vec<HouseRecord> = source.records().unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(streamed, source.read_all().unwrap());
    assert_eq!(streamed, houses);
}

#[test]
fn missing_column_is_a_load_error() {
    let header: Vec<String> = ames_header().into_iter().filter(|n| n != "Year Built").collect();
    let file = write_csv(&header, &houses(3, 34));
    let err = CsvRecordSource::open(file.path()).unwrap_err();
    assert!(matches!(err, DatasetLoadError::MissingColumn(ref name) if name == "Year Built"));
}

// =============================================================================
// CSV → model
// =============================================================================

#[test]
fn csv_records_train_a_model() {
    let houses = houses(120, 33);
    let file = write_csv(&ames_header(), &houses);

    let records = CsvRecordSource::open(file.path()).unwrap().read_all().unwrap();
    let session = Session::default();
    let model = session.fit(&records).unwrap();
    let metrics = session.evaluate(&model, &records).unwrap();
    assert_eq!(metrics.n_samples, 120);
    assert!(metrics.r_squared > 0.5, "R^2 = {}", metrics.r_squared);
}
