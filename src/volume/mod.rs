//! Structured volumes: staged parameters, commit and the committed
//! snapshot samplers read from.

pub mod attribute;
pub mod commit;
pub mod grid;
pub mod temporal;

use crate::error::{self, Result, VolumeError};
use crate::params::{ParamValue, ParameterSet};
use crate::sampler::Sampler;
use crate::types::{ValueRange, AABB};
use commit::CommittedState;
use grid::{Grid, GridType};
use std::sync::Arc;

/// A structured volume of one [`GridType`].
///
/// Parameters are staged with [`set_param`](Self::set_param) and take
/// effect on [`commit`](Self::commit). Samplers keep the snapshot they
/// were created from, so committing again never disturbs them.
#[derive(Debug, Clone)]
pub struct StructuredVolume {
    grid_type: GridType,
    params: ParameterSet,
    committed: Option<Arc<CommittedState>>,
}

/// Report `error` through the error boundary and hand it back
fn reported<T>(error: VolumeError) -> Result<T> {
    error::report(&error);
    Err(error)
}

impl StructuredVolume {
    pub fn new(grid_type: GridType) -> Self {
        Self {
            grid_type,
            params: ParameterSet::new(),
            committed: None,
        }
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.set(name, value);
    }

    pub fn remove_param(&mut self, name: &str) -> Option<ParamValue> {
        self.params.remove(name)
    }

    /// Validate the staged parameters and install the new snapshot. On
    /// failure the previously committed state stays in place.
    pub fn commit(&mut self) -> Result<()> {
        match commit::commit(self.grid_type, &self.params) {
            Ok(state) => {
                self.committed = Some(Arc::new(state));
                Ok(())
            }
            Err(error) => reported(error),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// The current committed snapshot
    pub fn committed(&self) -> Result<&Arc<CommittedState>> {
        match &self.committed {
            Some(state) => Ok(state),
            None => reported(VolumeError::NotCommitted),
        }
    }

    pub fn bounding_box(&self) -> Result<AABB> {
        Ok(self.committed()?.geometry.as_grid().bounding_box())
    }

    pub fn num_attributes(&self) -> Result<usize> {
        Ok(self.committed()?.attributes.len())
    }

    /// Value range of `attribute` over all voxels and times
    pub fn value_range(&self, attribute: usize) -> Result<ValueRange> {
        let state = self.committed()?;
        let count = state.attributes.len();
        if attribute >= count {
            return reported(VolumeError::AttributeIndex {
                index: attribute,
                count,
            });
        }
        Ok(state.accel.value_range(attribute))
    }

    pub fn new_sampler(&self) -> Result<Sampler> {
        Ok(Sampler::new(self.committed()?.clone()))
    }
}
