//! Deterministic synthetic records for tests and demos.

use rand::prelude::*;

use crate::data::HouseRecord;

/// The reference house: quality 7, 2000 sq ft, priced at 200 000.
pub fn reference_house() -> HouseRecord {
    HouseRecord {
        overall_quality: 7.0,
        above_grade_living_area: 2000.0,
        garage_car_capacity: 2.0,
        garage_area: 500.0,
        total_basement_area: 850.0,
        first_floor_area: 1000.0,
        full_bath_count: 2.0,
        year_built: 2005.0,
        year_remodeled: 2005.0,
        lot_area: 8000.0,
        sale_price: Some(200_000.0),
    }
}

/// Generate `n` Ames-like houses with a sale price that depends mostly on
/// quality and living area, plus uniform noise.
///
/// All fields are finite and non-negative; integer-valued fields are whole
/// numbers.
pub fn synthetic_houses(n: usize, seed: u64) -> Vec<HouseRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let quality = rng.gen_range(1..=10) as f32;
            let living = rng.gen_range(600.0..3500.0f32).round();
            let first_floor = (living * rng.gen_range(0.45..0.9f32)).round();
            let basement = (first_floor * rng.gen_range(0.0..1.1f32)).round();
            let cars = rng.gen_range(0..=3) as f32;
            let garage = if cars == 0.0 {
                0.0
            } else {
                (cars * rng.gen_range(200.0..300.0f32)).round()
            };
            let baths = rng.gen_range(1..=3) as f32;
            let built = rng.gen_range(1900..=2010) as f32;
            let remodeled = if rng.gen_bool(0.4) {
                rng.gen_range(built as u32..=2010) as f32
            } else {
                built
            };
            let lot = rng.gen_range(2000.0..20000.0f32).round();

            let price = 15_000.0 * quality
                + 60.0 * living
                + 25.0 * basement
                + 8_000.0 * cars
                + 400.0 * (built - 1900.0)
                + 0.5 * lot
                + (rng.r#gen::<f32>() * 2.0 - 1.0) * 10_000.0;

            HouseRecord {
                overall_quality: quality,
                above_grade_living_area: living,
                garage_car_capacity: cars,
                garage_area: garage,
                total_basement_area: basement,
                first_floor_area: first_floor,
                full_bath_count: baths,
                year_built: built,
                year_remodeled: remodeled,
                lot_area: lot,
                sale_price: Some(price.max(10_000.0)),
            }
        })
        .collect()
}

/// `n` copies of `record` whose area fields and price are perturbed by up
/// to `relative_noise` (e.g. `0.01` for ±1%).
pub fn noisy_copies(record: &HouseRecord, n: usize, relative_noise: f32, seed: u64) -> Vec<HouseRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut jitter = move |v: f32| v * (1.0 + (rng.r#gen::<f32>() * 2.0 - 1.0) * relative_noise);
    (0..n)
        .map(|_| {
            let mut r = *record;
            r.above_grade_living_area = jitter(r.above_grade_living_area);
            r.garage_area = jitter(r.garage_area);
            r.total_basement_area = jitter(r.total_basement_area);
            r.first_floor_area = jitter(r.first_floor_area);
            r.lot_area = jitter(r.lot_area);
            r.sale_price = r.sale_price.map(&mut jitter);
            r
        })
        .collect()
}
