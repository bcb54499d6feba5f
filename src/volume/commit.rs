// Validation of staged parameters into an immutable committed state.
//
// Everything is built off to the side; the caller installs the result
// only when every rule passed.

use crate::accel::AccelerationGrid;
use crate::data::Data;
use crate::error::{Result, VolumeError};
use crate::params::{ParamValue, ParameterSet};
use crate::types::Filter;
use crate::volume::attribute::{Attribute, AttributeStore};
use crate::volume::grid::{
    Geometry, Grid, GridType, RectilinearGrid, RegularGrid, SphericalGrid,
};
use crate::volume::temporal::TimeConfig;
use std::sync::Arc;
use tracing::debug;

/// Snapshot read by samplers and iterators
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedState {
    pub geometry: Geometry,
    pub attributes: AttributeStore,
    pub accel: AccelerationGrid,
    pub filter: Filter,
    pub gradient_filter: Filter,
}

/// Validate `params` for a volume of `grid_type` and build its committed
/// state, including the acceleration grid
pub fn commit(grid_type: GridType, params: &ParameterSet) -> Result<CommittedState> {
    let geometry = build_geometry(grid_type, params)?;
    let grid = geometry.as_grid();
    let voxel_count = grid.voxel_count();

    let data = data_list(params, "data")?.ok_or(VolumeError::MissingParameter("data"))?;
    if data.is_empty() {
        return Err(VolumeError::invalid("data", "at least one attribute is required"));
    }

    debug!(
        grid = ?grid_type,
        dimensions = ?grid.dimensions(),
        attributes = data.len(),
        "commit starting"
    );

    let time_configs = data_list(params, "timeConfig")?;
    let time_data = data_list(params, "timeData")?;
    check_time_lengths(data.len(), time_configs.as_deref(), time_data.as_deref())?;

    let mut attributes = Vec::with_capacity(data.len());
    for (index, values) in data.iter().enumerate() {
        let values = values
            .as_ref()
            .ok_or_else(|| VolumeError::attribute(index, "no data supplied"))?;

        let config = time_configs.as_ref().map(|configs| &configs[index]);
        let stamps = time_data.as_ref().and_then(|stamps| stamps[index].as_ref());
        attributes.push(build_attribute(index, values, config, stamps, voxel_count)?);
    }

    let filter = parse_filter(params, "filter")?.unwrap_or_default();
    let gradient_filter = parse_filter(params, "gradientFilter")?.unwrap_or(filter);

    // Ranges must bound what either committed filter reads
    let range_filter = if gradient_filter == Filter::Tricubic {
        Filter::Tricubic
    } else {
        filter
    };

    let attributes = AttributeStore::new(attributes);
    let accel = AccelerationGrid::build(grid, &attributes, range_filter);

    debug!(
        grid = ?grid_type,
        attributes = attributes.len(),
        filter = ?filter,
        gradient_filter = ?gradient_filter,
        "commit complete"
    );

    Ok(CommittedState {
        geometry,
        attributes,
        accel,
        filter,
        gradient_filter,
    })
}

fn build_geometry(grid_type: GridType, params: &ParameterSet) -> Result<Geometry> {
    let dimensions = params.vec3i("dimensions")?;

    Ok(match grid_type {
        GridType::StructuredRegular => Geometry::Regular(RegularGrid::new(
            dimensions,
            params.vec3f_or("gridOrigin", [0.0; 3])?,
            params.vec3f_or("gridSpacing", [1.0; 3])?,
        )?),
        GridType::StructuredSpherical => Geometry::Spherical(SphericalGrid::new(
            dimensions,
            params.vec3f_or("gridOrigin", [0.0; 3])?,
            params.vec3f_or("gridSpacing", [1.0; 3])?,
        )?),
        GridType::StructuredRectilinear => {
            let coordinate = |axis: usize| -> Result<Arc<[f32]>> {
                let name = RectilinearGrid::coordinate_param(axis);
                match params.data_opt(name)? {
                    Some(Data::Float(values)) => Ok(values.clone()),
                    Some(_) => Err(VolumeError::ParameterType {
                        name,
                        expected: "float data",
                    }),
                    None => Err(VolumeError::MissingParameter(name)),
                }
            };
            Geometry::Rectilinear(RectilinearGrid::new(
                dimensions,
                [coordinate(0)?, coordinate(1)?, coordinate(2)?],
            )?)
        }
    })
}

/// A parameter given either as one array or as an ordered list of arrays
fn data_list(params: &ParameterSet, name: &'static str) -> Result<Option<Vec<Option<Data>>>> {
    match params.get(name) {
        Some(ParamValue::Data(data)) => Ok(Some(vec![Some(data.clone())])),
        Some(ParamValue::DataArray(list)) => Ok(Some(list.clone())),
        Some(_) => Err(VolumeError::ParameterType {
            name,
            expected: "data or data array",
        }),
        None => Ok(None),
    }
}

fn check_time_lengths(
    attribute_count: usize,
    time_configs: Option<&[Option<Data>]>,
    time_data: Option<&[Option<Data>]>,
) -> Result<()> {
    match (time_configs, time_data) {
        (None, Some(_)) => Err(VolumeError::invalid(
            "timeData",
            "time data supplied without a timeConfig",
        )),
        (Some(configs), _) if configs.len() != attribute_count => Err(VolumeError::invalid(
            "timeConfig",
            format!(
                "has {} entries but there are {} attributes",
                configs.len(),
                attribute_count
            ),
        )),
        (_, Some(stamps)) if stamps.len() != attribute_count => Err(VolumeError::invalid(
            "timeData",
            format!(
                "has {} entries but there are {} attributes",
                stamps.len(),
                attribute_count
            ),
        )),
        _ => Ok(()),
    }
}

fn build_attribute(
    index: usize,
    values: &Data,
    time_config: Option<&Option<Data>>,
    time_data: Option<&Data>,
    voxel_count: usize,
) -> Result<Attribute> {
    if !values.data_type().is_voxel_type() {
        return Err(VolumeError::attribute(
            index,
            format!("unsupported voxel type {:?}", values.data_type()),
        ));
    }

    let time = match time_config {
        None => TimeConfig::Static,
        Some(None) => return Err(VolumeError::time_config(index, "empty time config")),
        Some(Some(config)) => {
            TimeConfig::from_params(index, config, time_data, values.len(), voxel_count)?
        }
    };

    let required = time.required_len(voxel_count);
    if values.len() < required {
        return Err(VolumeError::attribute(
            index,
            format!(
                "{} values supplied but {} are required for {} voxels",
                values.len(),
                required,
                voxel_count
            ),
        ));
    }

    Ok(Attribute::new(values.clone(), time))
}

fn parse_filter(params: &ParameterSet, name: &'static str) -> Result<Option<Filter>> {
    params
        .int_opt(name)?
        .map(|value| {
            Filter::try_from(value).map_err(|unknown| {
                VolumeError::invalid(name, format!("unknown filter {}", unknown))
            })
        })
        .transpose()
}
