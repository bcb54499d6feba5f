mod common;

use common::{init_tracing, lattice, regular_volume};
use std::sync::Arc;
use voxsample::{
    error, Data, ErrorCode, Filter, GridType, IntervalIterator, Pt3, StructuredVolume,
    ValueRange, ValueSelector, Vec3, VolumeError,
};

fn cube() -> StructuredVolume {
    regular_volume([2, 2, 2], (0..8).map(|v| v as f32).collect::<Vec<_>>())
}

#[test]
fn trilinear_center_of_cube() {
    init_tracing();
    let mut volume = cube();
    volume.commit().unwrap();

    let sampler = volume.new_sampler().unwrap();
    assert_eq!(sampler.filter(), Filter::Trilinear);
    let value = sampler.sample(&Pt3::new(0.5, 0.5, 0.5), 0, 0.0);
    assert!((value - 3.5).abs() < 1e-6);
}

#[test]
fn origin_sample_for_every_filter() {
    init_tracing();
    for filter in [Filter::Nearest, Filter::Trilinear, Filter::Tricubic] {
        let mut volume = cube();
        volume.set_param("filter", filter.as_int());
        volume.commit().unwrap();

        let sampler = volume.new_sampler().unwrap();
        assert_eq!(sampler.filter(), filter);
        assert_eq!(sampler.sample(&Pt3::new(0.0, 0.0, 0.0), 0, 0.0), 0.0);
    }
}

#[test]
fn lattice_points_are_exact() {
    init_tracing();
    let dims = [5, 4, 6];
    let values = lattice(dims, |x, y, z| (x * 7.0 + y * 3.0 - z).sin() * 10.0);
    let mut volume = regular_volume(dims, values.clone());
    volume.commit().unwrap();

    for filter in [Filter::Nearest, Filter::Trilinear, Filter::Tricubic] {
        let sampler = volume.new_sampler().unwrap().with_filter(filter);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let expected = values[(x + dims[0] * (y + dims[1] * z)) as usize];
                    let p = Pt3::new(x as f32, y as f32, z as f32);
                    let value = sampler.sample(&p, 0, 0.0);
                    assert!(
                        (value - expected).abs() < 1e-4,
                        "{:?} at {:?}: {} vs {}",
                        filter,
                        p,
                        value,
                        expected
                    );
                }
            }
        }
    }
}

#[test]
fn short_data_fails_and_keeps_prior_state() {
    init_tracing();
    let mut volume = cube();
    volume.commit().unwrap();
    let before = Arc::clone(volume.committed().unwrap());
    let sampler = volume.new_sampler().unwrap();

    volume.set_param("data", Data::from(vec![1.0f32; 7]));
    match volume.commit() {
        Err(VolumeError::Attribute { index, .. }) => assert_eq!(index, 0),
        other => panic!("unexpected commit result {:?}", other),
    }
    assert_eq!(error::last_error_code(), ErrorCode::InvalidArgument);
    assert!(error::last_error_message().contains("attribute 0"));

    assert!(Arc::ptr_eq(volume.committed().unwrap(), &before));
    assert_eq!(volume.value_range(0), Ok(ValueRange::new(0.0, 7.0)));
    let value = sampler.sample(&Pt3::new(0.5, 0.5, 0.5), 0, 0.0);
    assert!((value - 3.5).abs() < 1e-6);
}

#[test]
fn samplers_keep_their_snapshot() {
    init_tracing();
    let mut volume = cube();
    volume.commit().unwrap();
    let old = volume.new_sampler().unwrap();

    volume.set_param("data", Data::from(vec![10.0f32; 8]));
    volume.commit().unwrap();
    let new = volume.new_sampler().unwrap();

    let p = Pt3::new(1.0, 1.0, 1.0);
    assert_eq!(old.sample(&p, 0, 0.0), 7.0);
    assert_eq!(new.sample(&p, 0, 0.0), 10.0);
}

#[test]
fn recommit_builds_identical_ranges() {
    init_tracing();
    let dims = [11, 7, 9];
    let mut volume = regular_volume(dims, lattice(dims, |x, y, z| x * y - z * z));
    volume.commit().unwrap();
    let first = Arc::clone(volume.committed().unwrap());
    volume.commit().unwrap();
    let second = volume.committed().unwrap();

    assert!(!Arc::ptr_eq(&first, second));
    assert_eq!(first.accel, second.accel);
}

#[test]
fn multiple_attribute_types() {
    init_tracing();
    let mut volume = StructuredVolume::new(GridType::StructuredRegular);
    volume.set_param("dimensions", [2, 2, 2]);
    volume.set_param(
        "data",
        vec![
            Data::from(vec![0u8, 1, 2, 3, 4, 5, 6, 255]),
            Data::from(vec![-4i16; 8]),
            Data::from(vec![1u16; 8]),
            Data::from(vec![0.25f64; 8]),
        ],
    );
    volume.commit().unwrap();

    assert_eq!(volume.num_attributes(), Ok(4));
    assert_eq!(volume.value_range(0), Ok(ValueRange::new(0.0, 255.0)));
    assert_eq!(volume.value_range(1), Ok(ValueRange::new(-4.0, -4.0)));

    let sampler = volume.new_sampler().unwrap();
    let values = sampler.sample_m(&Pt3::new(0.5, 0.5, 0.5), &[1, 2, 3], 0.0);
    assert!((values[0] + 4.0).abs() < 1e-6);
    assert!((values[1] - 1.0).abs() < 1e-6);
    assert!((values[2] - 0.25).abs() < 1e-6);
}

#[test]
fn rectilinear_sampling_follows_coordinates() {
    init_tracing();
    let mut volume = StructuredVolume::new(GridType::StructuredRectilinear);
    volume.set_param("dimensions", [3, 2, 2]);
    volume.set_param("xCoordinates", Data::from(vec![0.0f32, 1.0, 5.0]));
    volume.set_param("yCoordinates", Data::from(vec![0.0f32, 1.0]));
    volume.set_param("zCoordinates", Data::from(vec![0.0f32, 1.0]));
    // Field equal to the x coordinate
    volume.set_param(
        "data",
        Data::from(lattice([3, 2, 2], |x, _, _| [0.0, 1.0, 5.0][x as usize])),
    );
    volume.commit().unwrap();

    let sampler = volume.new_sampler().unwrap();
    let p = Pt3::new(3.0, 0.5, 0.5);
    assert!((sampler.sample(&p, 0, 0.0) - 3.0).abs() < 1e-5);
    let g = sampler.gradient(&p, 0, 0.0);
    assert!((g.x - 1.0).abs() < 1e-5);
    assert!(g.y.abs() < 1e-6 && g.z.abs() < 1e-6);
}

#[test]
fn tricubic_undershoot_is_found_by_intervals() {
    init_tracing();
    let values: Vec<f32> = (0..9).map(|x| if x >= 5 { 100.0 } else { 0.0 }).collect();
    let mut volume = regular_volume([9, 1, 1], values);
    volume.set_param("filter", Filter::Tricubic.as_int());
    volume.commit().unwrap();
    let sampler = volume.new_sampler().unwrap();

    let dip = sampler.sample(&Pt3::new(3.667, 0.0, 0.0), 0, 0.0);
    assert!(dip < -7.0, "{}", dip);
    let state = volume.committed().unwrap();
    assert!(state.accel.brick_range(0, 0, [0, 0, 0]).contains(dip));
    assert!(volume.value_range(0).unwrap().contains(dip));

    let below_zero: Vec<_> = IntervalIterator::new(
        &sampler,
        &Pt3::new(-1.0, 0.0, 0.0),
        &Vec3::new(1.0, 0.0, 0.0),
        (0.0, 100.0),
        ValueSelector::new().with_value(-5.0),
    )
    .collect();
    assert!(below_zero.iter().any(|i| i.t_range.0 <= 4.667 && i.t_range.1 >= 4.667));
}
