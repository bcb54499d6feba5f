//! Point sampling of committed volumes.
//!
//! A [`Sampler`] is created from one committed snapshot and resolves the
//! grid type once; the per-geometry [`StructuredSampler`] is generic over
//! the grid so the hot paths are monomorphized.

pub mod kernel;
pub mod stencil;

use crate::accel::AccelerationGrid;
use crate::types::{Filter, Pt3, Vec3, AABB};
use crate::volume::attribute::Attribute;
use crate::volume::commit::CommittedState;
use crate::volume::grid::{Geometry, Grid, RectilinearGrid, RegularGrid, SphericalGrid};
use rayon::prelude::*;
use stencil::{CellLocation, TRICUBIC_OFFSETS, TRILINEAR_OFFSETS};
use std::sync::Arc;

/// Voxels (and cell position) a filter reads for one sample point
enum Footprint {
    Nearest(usize),
    Trilinear { voxels: [usize; 8], frac: [f32; 3] },
    Tricubic { voxels: [usize; 64], frac: [f32; 3] },
}

/// Sampler over one geometry type
#[derive(Debug, Clone)]
pub struct StructuredSampler<G: Grid> {
    grid: G,
    state: Arc<CommittedState>,
    filter: Filter,
    gradient_filter: Filter,
}

impl<G: Grid> StructuredSampler<G> {
    pub fn new(grid: G, state: Arc<CommittedState>) -> Self {
        Self {
            grid,
            filter: state.filter,
            gradient_filter: state.gradient_filter,
            state,
        }
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    #[inline]
    fn attribute(&self, index: usize) -> &Attribute {
        self.state.attributes.get(index)
    }

    /// Index coordinates of `p`, or `None` outside the domain
    #[inline]
    fn locate(&self, p: &Pt3) -> Option<Pt3> {
        let index = self.grid.object_to_index(p);
        self.grid.in_domain(&index).then_some(index)
    }

    fn footprint(&self, filter: Filter, index: &Pt3) -> Footprint {
        match filter {
            Filter::Nearest => Footprint::Nearest(stencil::nearest_voxel(&self.grid, index)),
            Filter::Trilinear => {
                let cell = CellLocation::new(self.grid.dimensions(), index);
                Footprint::Trilinear {
                    voxels: stencil::gather(&self.grid, cell.base, &TRILINEAR_OFFSETS),
                    frac: cell.frac,
                }
            }
            Filter::Tricubic => {
                let cell = CellLocation::new(self.grid.dimensions(), index);
                Footprint::Tricubic {
                    voxels: stencil::gather(&self.grid, cell.base, &TRICUBIC_OFFSETS),
                    frac: cell.frac,
                }
            }
        }
    }

    fn evaluate(footprint: &Footprint, attribute: &Attribute, time: f32) -> f32 {
        match footprint {
            Footprint::Nearest(voxel) => attribute.value(*voxel, time),
            Footprint::Trilinear { voxels, frac } => {
                kernel::trilinear(&voxels.map(|v| attribute.value(v, time)), *frac)
            }
            Footprint::Tricubic { voxels, frac } => {
                kernel::tricubic(&voxels.map(|v| attribute.value(v, time)), *frac)
            }
        }
    }

    /// Gradient with respect to index coordinates
    fn evaluate_gradient(footprint: &Footprint, attribute: &Attribute, time: f32) -> Vec3 {
        let gradient = match footprint {
            Footprint::Nearest(_) => [0.0; 3],
            Footprint::Trilinear { voxels, frac } => {
                kernel::trilinear_gradient(&voxels.map(|v| attribute.value(v, time)), *frac)
            }
            Footprint::Tricubic { voxels, frac } => {
                let values = voxels.map(|v| attribute.value(v, time));
                let coefficients =
                    kernel::tricubic_coefficients(&kernel::tricubic_constraints(&values));
                kernel::tricubic_gradient(&coefficients, *frac)
            }
        };
        Vec3::from(gradient)
    }

    pub fn sample(&self, p: &Pt3, attribute: usize, time: f32) -> f32 {
        let attribute = self.attribute(attribute);
        match self.locate(p) {
            Some(index) => Self::evaluate(&self.footprint(self.filter, &index), attribute, time),
            None => f32::NAN,
        }
    }

    pub fn gradient(&self, p: &Pt3, attribute: usize, time: f32) -> Vec3 {
        let attribute = self.attribute(attribute);
        match self.locate(p) {
            Some(index) => {
                let footprint = self.footprint(self.gradient_filter, &index);
                let gradient = Self::evaluate_gradient(&footprint, attribute, time);
                self.grid.gradient_to_object(p, &index, &gradient)
            }
            None => Vec3::repeat(f32::NAN),
        }
    }

    /// Sample several attributes at one point, gathering the stencil once
    pub fn sample_m(&self, p: &Pt3, attributes: &[usize], time: f32) -> Vec<f32> {
        let attributes: Vec<_> = attributes.iter().map(|&a| self.attribute(a)).collect();
        match self.locate(p) {
            Some(index) => {
                let footprint = self.footprint(self.filter, &index);
                attributes
                    .iter()
                    .map(|attribute| Self::evaluate(&footprint, attribute, time))
                    .collect()
            }
            None => vec![f32::NAN; attributes.len()],
        }
    }

    pub fn gradient_m(&self, p: &Pt3, attributes: &[usize], time: f32) -> Vec<Vec3> {
        let attributes: Vec<_> = attributes.iter().map(|&a| self.attribute(a)).collect();
        match self.locate(p) {
            Some(index) => {
                let footprint = self.footprint(self.gradient_filter, &index);
                attributes
                    .iter()
                    .map(|attribute| {
                        let gradient = Self::evaluate_gradient(&footprint, attribute, time);
                        self.grid.gradient_to_object(p, &index, &gradient)
                    })
                    .collect()
            }
            None => vec![Vec3::repeat(f32::NAN); attributes.len()],
        }
    }

    /// Sample many points in parallel. `times` holds one time per point;
    /// `None` samples at time 0.
    pub fn sample_n(&self, points: &[Pt3], attribute: usize, times: Option<&[f32]>) -> Vec<f32> {
        check_times(points, times);
        points
            .par_iter()
            .enumerate()
            .map(|(i, p)| self.sample(p, attribute, times.map_or(0.0, |t| t[i])))
            .collect()
    }

    pub fn gradient_n(&self, points: &[Pt3], attribute: usize, times: Option<&[f32]>) -> Vec<Vec3> {
        check_times(points, times);
        points
            .par_iter()
            .enumerate()
            .map(|(i, p)| self.gradient(p, attribute, times.map_or(0.0, |t| t[i])))
            .collect()
    }
}

fn check_times(points: &[Pt3], times: Option<&[f32]>) {
    if let Some(times) = times {
        assert_eq!(
            times.len(),
            points.len(),
            "one time per sample point is required"
        );
    }
}

/// Sampler over a committed volume, resolved to its geometry
#[derive(Debug, Clone)]
pub enum Sampler {
    Regular(StructuredSampler<RegularGrid>),
    Rectilinear(StructuredSampler<RectilinearGrid>),
    Spherical(StructuredSampler<SphericalGrid>),
}

macro_rules! dispatch {
    ($sampler:expr, $inner:ident => $body:expr) => {
        match $sampler {
            Sampler::Regular($inner) => $body,
            Sampler::Rectilinear($inner) => $body,
            Sampler::Spherical($inner) => $body,
        }
    };
}

impl Sampler {
    pub fn new(state: Arc<CommittedState>) -> Self {
        match &state.geometry {
            Geometry::Regular(grid) => {
                Sampler::Regular(StructuredSampler::new(grid.clone(), state.clone()))
            }
            Geometry::Rectilinear(grid) => {
                Sampler::Rectilinear(StructuredSampler::new(grid.clone(), state.clone()))
            }
            Geometry::Spherical(grid) => {
                Sampler::Spherical(StructuredSampler::new(grid.clone(), state.clone()))
            }
        }
    }

    /// Override the value filter of this sampler only. Acceleration ranges
    /// stay those of the committed filters.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        dispatch!(&mut self, s => s.filter = filter);
        self
    }

    /// Override the gradient filter of this sampler only
    pub fn with_gradient_filter(mut self, filter: Filter) -> Self {
        dispatch!(&mut self, s => s.gradient_filter = filter);
        self
    }

    pub fn filter(&self) -> Filter {
        dispatch!(self, s => s.filter)
    }

    pub fn gradient_filter(&self) -> Filter {
        dispatch!(self, s => s.gradient_filter)
    }

    pub fn grid(&self) -> &dyn Grid {
        dispatch!(self, s => s.grid() as &dyn Grid)
    }

    pub fn state(&self) -> &Arc<CommittedState> {
        dispatch!(self, s => &s.state)
    }

    pub fn accel(&self) -> &AccelerationGrid {
        &self.state().accel
    }

    pub fn num_attributes(&self) -> usize {
        self.state().attributes.len()
    }

    pub fn bounding_box(&self) -> AABB {
        self.grid().bounding_box()
    }

    pub fn sample(&self, p: &Pt3, attribute: usize, time: f32) -> f32 {
        dispatch!(self, s => s.sample(p, attribute, time))
    }

    pub fn gradient(&self, p: &Pt3, attribute: usize, time: f32) -> Vec3 {
        dispatch!(self, s => s.gradient(p, attribute, time))
    }

    pub fn sample_m(&self, p: &Pt3, attributes: &[usize], time: f32) -> Vec<f32> {
        dispatch!(self, s => s.sample_m(p, attributes, time))
    }

    pub fn gradient_m(&self, p: &Pt3, attributes: &[usize], time: f32) -> Vec<Vec3> {
        dispatch!(self, s => s.gradient_m(p, attributes, time))
    }

    pub fn sample_n(&self, points: &[Pt3], attribute: usize, times: Option<&[f32]>) -> Vec<f32> {
        dispatch!(self, s => s.sample_n(points, attribute, times))
    }

    pub fn gradient_n(&self, points: &[Pt3], attribute: usize, times: Option<&[f32]>) -> Vec<Vec3> {
        dispatch!(self, s => s.gradient_n(points, attribute, times))
    }
}
