//! Sampling of structured scalar volumes.
//!
//! Stage parameters on a [`StructuredVolume`], [`commit`](StructuredVolume::commit)
//! them, then query the committed snapshot through a [`Sampler`] or walk a
//! ray with an [`IntervalIterator`].

pub mod accel;
pub mod config;
pub mod data;
pub mod error;
pub mod iterator;
pub mod params;
pub mod sampler;
pub mod types;
pub mod volume;

pub use accel::AccelerationGrid;
pub use config::{ConfigError, VolumeDescriptor};
pub use data::{Data, DataType};
pub use error::{ErrorCode, Result, VolumeError};
pub use iterator::{Hit, HitIterator, Interval, IntervalIterator, ValueSelector};
pub use params::{ParamValue, ParameterSet};
pub use sampler::Sampler;
pub use types::{Filter, Pt3, ValueRange, Vec3, AABB};
pub use volume::grid::{Grid, GridType};
pub use volume::StructuredVolume;
