//! Committed voxel attributes.

use crate::data::Data;
use crate::volume::temporal::{TimeConfig, EMPTY_VOXEL_VALUE};

/// One scalar field over the grid together with its time layout
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    data: Data,
    time: TimeConfig,
}

impl Attribute {
    pub fn new(data: Data, time: TimeConfig) -> Self {
        Self { data, time }
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn time_config(&self) -> &TimeConfig {
        &self.time
    }

    /// Value of `voxel` (linear index, x fastest) at `time`
    #[inline]
    pub fn value(&self, voxel: usize, time: f32) -> f32 {
        self.time.resolve(&self.data, voxel, time)
    }

    /// Call `f` with every value `voxel` can take over all times.
    /// A voxel without time samples reports its fallback value.
    pub fn for_each_sample(&self, voxel: usize, mut f: impl FnMut(f32)) {
        let range = self.time.sample_range(voxel);
        if range.is_empty() {
            f(EMPTY_VOXEL_VALUE);
            return;
        }
        for index in range {
            f(self.data.get_f32(index));
        }
    }
}

/// Ordered attributes of a committed volume
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    attributes: Vec<Attribute>,
}

impl AttributeStore {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Panics if `index` is out of range
    #[inline]
    pub fn get(&self, index: usize) -> &Attribute {
        assert!(
            index < self.attributes.len(),
            "attribute index {} out of range ({} attributes)",
            index,
            self.attributes.len()
        );
        &self.attributes[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_cover_all_steps() {
        let attribute = Attribute::new(
            Data::from(vec![1.0f32, 4.0, -2.0, 0.5]),
            TimeConfig::Structured { num_timesteps: 2 },
        );

        let mut seen = Vec::new();
        attribute.for_each_sample(1, |v| seen.push(v));
        assert_eq!(seen, vec![-2.0, 0.5]);
        assert!((attribute.value(0, 0.5) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_voxel_reports_fallback() {
        let attribute = Attribute::new(
            Data::from(vec![3.0f32]),
            TimeConfig::Unstructured {
                offsets: vec![0u64, 0].into(),
                counts: vec![0u8, 1].into(),
                times: vec![0.5f32].into(),
            },
        );

        let mut seen = Vec::new();
        attribute.for_each_sample(0, |v| seen.push(v));
        assert_eq!(seen, vec![EMPTY_VOXEL_VALUE]);
        assert_eq!(attribute.value(1, 0.0), 3.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_store_index_checked() {
        let store = AttributeStore::new(vec![Attribute::new(
            Data::from(vec![0u8]),
            TimeConfig::Static,
        )]);
        assert_eq!(store.len(), 1);
        store.get(1);
    }
}
