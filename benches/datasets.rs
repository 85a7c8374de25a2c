use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tspage::{DataType, PageBuilder, PageHeader, Timestamp, TsEncoding, Value};

pub const DEFAULT_SEED: u64 = 0x_5453_5041_4745_4245; // fixed seed for stable benchmarks

/// Regularly spaced timestamps with jitter, random walk values.
pub fn generate_rows(seed: u64, points: usize) -> Vec<(Timestamp, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(points);
    let mut t: Timestamp = 1_700_000_000_000;
    let mut v = 0.0f64;
    for _ in 0..points {
        t += 1_000 + rng.random_range(0..50);
        v += rng.random_range(-1.0..1.0);
        rows.push((t, v));
    }
    rows
}

pub fn build_double_page(rows: &[(Timestamp, f64)]) -> (Vec<u8>, PageHeader) {
    let mut b = PageBuilder::new(DataType::Double, TsEncoding::DeltaVarint, TsEncoding::Plain)
        .expect("page builder");
    for (t, v) in rows {
        b.push(*t, Value::Double(*v)).expect("push row");
    }
    b.finish().expect("finish page")
}
