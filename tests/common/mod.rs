#![allow(dead_code)]

use std::sync::Once;
use voxsample::{Data, GridType, StructuredVolume};

static TRACING: Once = Once::new();

/// Route library logs to the test harness output
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .init();
    });
}

/// Regular volume with unit spacing at the origin
pub fn regular_volume(dimensions: [i32; 3], data: impl Into<Data>) -> StructuredVolume {
    let mut volume = StructuredVolume::new(GridType::StructuredRegular);
    volume.set_param("dimensions", dimensions);
    volume.set_param("data", data.into());
    volume
}

/// Values of `f` at every voxel of a unit-spaced lattice, x fastest
pub fn lattice(dimensions: [i32; 3], f: impl Fn(f32, f32, f32) -> f32) -> Vec<f32> {
    let mut values = Vec::new();
    for z in 0..dimensions[2] {
        for y in 0..dimensions[1] {
            for x in 0..dimensions[0] {
                values.push(f(x as f32, y as f32, z as f32));
            }
        }
    }
    values
}
