//! Time-varying (motion blurred) attributes.
//!
//! Two encodings are accepted and normalized at commit time:
//!
//! * **structured**: every voxel has `N` values at uniformly spaced times
//!   over `[0, 1]`, stored contiguously per voxel (`voxel * N + step`).
//! * **unstructured**: every voxel declares its own sample count; samples
//!   are packed back to back and each carries an explicit time stamp.
//!   Per-voxel counts are turned into absolute offsets once, with an
//!   exclusive prefix sum, so lookups are O(log count).

use crate::data::Data;
use crate::error::{Result, VolumeError};
use std::ops::Range;
use std::sync::Arc;

/// Value returned for a voxel that declares no time samples
pub const EMPTY_VOXEL_VALUE: f32 = 0.0;

#[derive(Debug, Clone, PartialEq)]
pub enum TimeConfig {
    Static,
    Structured {
        num_timesteps: usize,
    },
    Unstructured {
        /// Offset of each voxel's first sample
        offsets: Arc<[u64]>,
        counts: Arc<[u8]>,
        times: Arc<[f32]>,
    },
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Query times clamp to `[0, 1]`; a NaN time samples time 0
#[inline]
fn clamp_time(time: f32) -> f32 {
    if time.is_nan() {
        0.0
    } else {
        time.clamp(0.0, 1.0)
    }
}

impl TimeConfig {
    /// Build the time configuration for attribute `attribute` from its raw
    /// `timeConfig` / `timeData` entries.
    ///
    /// A one-entry `timeConfig` is structured (the entry is the number of
    /// steps); a longer one holds a sample count per voxel.
    pub fn from_params(
        attribute: usize,
        time_config: &Data,
        time_data: Option<&Data>,
        attribute_len: usize,
        voxel_count: usize,
    ) -> Result<Self> {
        let config = time_config.as_u8().ok_or_else(|| {
            VolumeError::time_config(
                attribute,
                format!(
                    "time config must hold uchar values, got {:?}",
                    time_config.data_type()
                ),
            )
        })?;

        match config.len() {
            0 => Err(VolumeError::time_config(attribute, "empty time config")),
            1 => Self::structured(attribute, config[0], time_data),
            _ => Self::unstructured(attribute, config, time_data, attribute_len, voxel_count),
        }
    }

    fn structured(attribute: usize, num_timesteps: u8, time_data: Option<&Data>) -> Result<Self> {
        if num_timesteps == 0 {
            return Err(VolumeError::time_config(
                attribute,
                "structured time config must declare at least one time step",
            ));
        }
        if time_data.is_some() {
            return Err(VolumeError::time_config(
                attribute,
                "time samples supplied for a structured time config",
            ));
        }
        Ok(TimeConfig::Structured {
            num_timesteps: num_timesteps as usize,
        })
    }

    fn unstructured(
        attribute: usize,
        counts: &[u8],
        time_data: Option<&Data>,
        attribute_len: usize,
        voxel_count: usize,
    ) -> Result<Self> {
        if counts.len() != voxel_count {
            return Err(VolumeError::time_config(
                attribute,
                format!(
                    "per-voxel time config has {} entries for {} voxels",
                    counts.len(),
                    voxel_count
                ),
            ));
        }

        let time_data = time_data.ok_or_else(|| {
            VolumeError::time_config(attribute, "per-voxel time config without time samples")
        })?;
        let times = time_data.as_f32().ok_or_else(|| {
            VolumeError::time_config(
                attribute,
                format!("time data must hold float values, got {:?}", time_data.data_type()),
            )
        })?;
        if times.len() != attribute_len {
            return Err(VolumeError::time_config(
                attribute,
                format!(
                    "mismatched data and time sample sizes ({} values, {} time stamps)",
                    attribute_len,
                    times.len()
                ),
            ));
        }

        // Exclusive prefix sum over the per-voxel counts
        let mut offsets = Vec::with_capacity(counts.len());
        let mut running = 0u64;
        for &count in counts {
            offsets.push(running);
            running += count as u64;
        }

        for (voxel, (&offset, &count)) in offsets.iter().zip(counts).enumerate() {
            let begin = offset as usize;
            let end = begin + count as usize;
            if end > times.len() {
                return Err(VolumeError::time_config(
                    attribute,
                    format!(
                        "voxel {} declares {} time samples at offset {} but only {} are available",
                        voxel,
                        count,
                        begin,
                        times.len().saturating_sub(begin)
                    ),
                ));
            }

            let stamps = &times[begin..end];
            if stamps.iter().any(|t| !(0.0..=1.0).contains(t)) {
                return Err(VolumeError::time_config(
                    attribute,
                    format!("voxel {} has time stamps outside [0, 1]", voxel),
                ));
            }
            if stamps.windows(2).any(|w| w[1] <= w[0]) {
                return Err(VolumeError::time_config(
                    attribute,
                    format!("voxel {} time stamps are not strictly increasing", voxel),
                ));
            }
        }

        Ok(TimeConfig::Unstructured {
            offsets: offsets.into(),
            counts: counts.into(),
            times: Arc::from(times),
        })
    }

    pub fn is_time_varying(&self) -> bool {
        !matches!(self, TimeConfig::Static)
    }

    /// Minimum number of attribute values this configuration addresses
    pub fn required_len(&self, voxel_count: usize) -> usize {
        match self {
            TimeConfig::Static => voxel_count,
            TimeConfig::Structured { num_timesteps } => voxel_count * num_timesteps,
            TimeConfig::Unstructured {
                offsets, counts, ..
            } => match (offsets.last(), counts.last()) {
                (Some(&offset), Some(&count)) => offset as usize + count as usize,
                _ => 0,
            },
        }
    }

    /// Indices into the attribute array holding the samples of `voxel`.
    /// Empty for an unstructured voxel without samples.
    pub fn sample_range(&self, voxel: usize) -> Range<usize> {
        match self {
            TimeConfig::Static => voxel..voxel + 1,
            TimeConfig::Structured { num_timesteps } => {
                voxel * num_timesteps..(voxel + 1) * num_timesteps
            }
            TimeConfig::Unstructured {
                offsets, counts, ..
            } => {
                let begin = offsets[voxel] as usize;
                begin..begin + counts[voxel] as usize
            }
        }
    }

    /// Value of `voxel` at `time`, which is clamped to `[0, 1]` (NaN reads
    /// as 0)
    #[inline]
    pub fn resolve(&self, data: &Data, voxel: usize, time: f32) -> f32 {
        match self {
            TimeConfig::Static => data.get_f32(voxel),

            TimeConfig::Structured { num_timesteps } => {
                let n = *num_timesteps;
                let base = voxel * n;
                if n == 1 {
                    return data.get_f32(base);
                }
                let t = clamp_time(time) * (n - 1) as f32;
                let step = (t.floor() as usize).min(n - 2);
                let frac = t - step as f32;
                lerp(
                    data.get_f32(base + step),
                    data.get_f32(base + step + 1),
                    frac,
                )
            }

            TimeConfig::Unstructured {
                offsets,
                counts,
                times,
            } => {
                let begin = offsets[voxel] as usize;
                let count = counts[voxel] as usize;
                match count {
                    0 => EMPTY_VOXEL_VALUE,
                    1 => data.get_f32(begin),
                    _ => {
                        let stamps = &times[begin..begin + count];
                        let time = clamp_time(time);
                        if time <= stamps[0] {
                            return data.get_f32(begin);
                        }
                        if time >= stamps[count - 1] {
                            return data.get_f32(begin + count - 1);
                        }
                        // First stamp strictly after `time`; lies in 1..count
                        let upper = stamps.partition_point(|&s| s <= time);
                        let lower = upper - 1;
                        let frac = (time - stamps[lower]) / (stamps[upper] - stamps[lower]);
                        lerp(
                            data.get_f32(begin + lower),
                            data.get_f32(begin + upper),
                            frac,
                        )
                    }
                }
            }
        }
    }
}
