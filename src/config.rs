use crate::data::Data;
use crate::types::Filter;
use crate::volume::grid::{GridType, RectilinearGrid};
use crate::volume::StructuredVolume;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read volume descriptor {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write volume descriptor {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse volume descriptor: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Grid layout and filtering of a volume, stored as JSON.
///
/// Voxel payloads are not part of the descriptor; they are staged
/// separately as [`Data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    pub grid_type: GridType,
    pub dimensions: [i32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_origin: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_spacing: Option<[f32; 3]>,
    /// Per-axis coordinates for rectilinear grids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[Vec<f32>; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_filter: Option<Filter>,
}

impl VolumeDescriptor {
    pub fn new(grid_type: GridType, dimensions: [i32; 3]) -> Self {
        Self {
            grid_type,
            dimensions,
            grid_origin: None,
            grid_spacing: None,
            coordinates: None,
            filter: None,
            gradient_filter: None,
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_json_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Stage every described parameter on `volume`. Entries left out of
    /// the descriptor are removed so the volume's defaults apply.
    pub fn apply(&self, volume: &mut StructuredVolume) {
        volume.set_param("dimensions", self.dimensions);

        match self.grid_origin {
            Some(origin) => volume.set_param("gridOrigin", origin),
            None => {
                volume.remove_param("gridOrigin");
            }
        }
        match self.grid_spacing {
            Some(spacing) => volume.set_param("gridSpacing", spacing),
            None => {
                volume.remove_param("gridSpacing");
            }
        }

        for axis in 0..3 {
            let name = RectilinearGrid::coordinate_param(axis);
            match &self.coordinates {
                Some(coordinates) => {
                    volume.set_param(name, Data::from(coordinates[axis].as_slice()))
                }
                None => {
                    volume.remove_param(name);
                }
            }
        }

        for (name, filter) in [("filter", self.filter), ("gradientFilter", self.gradient_filter)] {
            match filter {
                Some(filter) => volume.set_param(name, filter.as_int()),
                None => {
                    volume.remove_param(name);
                }
            }
        }
    }

    /// New volume of the described grid type with the descriptor applied
    pub fn create_volume(&self) -> StructuredVolume {
        let mut volume = StructuredVolume::new(self.grid_type);
        self.apply(&mut volume);
        volume
    }
}
