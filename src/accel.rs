// Brick hierarchy of per-region value ranges used to skip empty space.
//
// Level 0 partitions the cell domain into bricks of BRICK_SIZE^3 cells;
// each brick records a range that holds every value the sampling filter
// can produce inside its cells. Every further level merges 2x2x2 bricks
// of the level below until a single root brick remains.

use crate::sampler::kernel::TRICUBIC_OVERSHOOT;
use crate::types::{Filter, ValueRange};
use crate::volume::attribute::{Attribute, AttributeStore};
use crate::volume::grid::Grid;
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// Cells along each axis of a level 0 brick
pub const BRICK_SIZE: u32 = 4;

/// Coordinate of a brick within one level
pub type BrickCoord = [u32; 3];

/// Layout of one level of the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelShape {
    /// Number of bricks along each axis
    pub bricks: [u32; 3],
    /// Cells covered by one brick along each axis
    pub cells_per_brick: u32,
}

impl LevelShape {
    pub fn brick_count(&self) -> usize {
        self.bricks.iter().map(|&b| b as usize).product()
    }

    #[inline]
    fn linear(&self, coord: BrickCoord) -> usize {
        let [bx, by, _] = self.bricks;
        coord[0] as usize + bx as usize * (coord[1] as usize + by as usize * coord[2] as usize)
    }

    #[inline]
    fn coord(&self, index: usize) -> BrickCoord {
        let bx = self.bricks[0] as usize;
        let by = self.bricks[1] as usize;
        [
            (index % bx) as u32,
            ((index / bx) % by) as u32,
            (index / (bx * by)) as u32,
        ]
    }
}

/// Voxels a filter reads beyond the corners of its cell, and how far its
/// result may leave the range of the voxels it reads (as a fraction of
/// their span)
fn filter_reach(filter: Filter) -> (u32, f32) {
    match filter {
        Filter::Nearest | Filter::Trilinear => (0, 0.0),
        Filter::Tricubic => (1, TRICUBIC_OVERSHOOT),
    }
}

/// Per-attribute value range hierarchies over a committed grid
#[derive(Debug, Clone, PartialEq)]
pub struct AccelerationGrid {
    dimensions: [u32; 3],
    filter: Filter,
    levels: Vec<LevelShape>,
    /// `ranges[attribute][level][brick]`
    ranges: Vec<Vec<Vec<ValueRange>>>,
}

/// Cells along each axis; a single voxel layer still counts as one cell
fn cell_counts(dimensions: [u32; 3]) -> [u32; 3] {
    dimensions.map(|d| d.saturating_sub(1).max(1))
}

fn level_shapes(dimensions: [u32; 3]) -> Vec<LevelShape> {
    let cells = cell_counts(dimensions);
    let mut shapes = vec![LevelShape {
        bricks: cells.map(|c| c.div_ceil(BRICK_SIZE)),
        cells_per_brick: BRICK_SIZE,
    }];

    loop {
        let last = shapes[shapes.len() - 1];
        if last.bricks == [1, 1, 1] {
            break;
        }
        shapes.push(LevelShape {
            bricks: last.bricks.map(|b| b.div_ceil(2)),
            cells_per_brick: last.cells_per_brick * 2,
        });
    }

    shapes
}

impl AccelerationGrid {
    /// Scan every attribute of `grid` and build its range hierarchy. The
    /// ranges bound every value `filter` can interpolate.
    pub fn build(grid: &dyn Grid, attributes: &AttributeStore, filter: Filter) -> Self {
        let start = Instant::now();
        let dimensions = grid.dimensions();
        let levels = level_shapes(dimensions);

        let ranges: Vec<_> = attributes
            .iter()
            .map(|attribute| Self::build_hierarchy(grid, attribute, &levels, filter))
            .collect();

        debug!(
            filter = ?filter,
            attributes = ranges.len(),
            levels = levels.len(),
            bricks = levels[0].brick_count(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "acceleration grid built"
        );

        Self {
            dimensions,
            filter,
            levels,
            ranges,
        }
    }

    fn build_hierarchy(
        grid: &dyn Grid,
        attribute: &Attribute,
        levels: &[LevelShape],
        filter: Filter,
    ) -> Vec<Vec<ValueRange>> {
        let dimensions = grid.dimensions();
        let voxel_count = grid.voxel_count();
        let base = levels[0];
        let (halo, overshoot) = filter_reach(filter);

        // Level 0: scan voxels, each brick writes only its own slot
        let mut leaf = vec![ValueRange::EMPTY; base.brick_count()];
        leaf.par_iter_mut().enumerate().for_each(|(index, range)| {
            let (lo, hi) = voxel_bounds(dimensions, base, base.coord(index));
            let lo = lo.map(|v| v.saturating_sub(halo));
            let hi: [u32; 3] = std::array::from_fn(|a| (hi[a] + halo).min(dimensions[a] - 1));
            for z in lo[2]..=hi[2] {
                for y in lo[1]..=hi[1] {
                    for x in lo[0]..=hi[0] {
                        let voxel = grid.linear_index(x, y, z);
                        assert!(
                            voxel < voxel_count,
                            "voxel ({}, {}, {}) outside a grid of {:?}",
                            x,
                            y,
                            z,
                            dimensions
                        );
                        attribute.for_each_sample(voxel, |v| range.extend(v));
                    }
                }
            }
            *range = range.widen(overshoot);
        });

        let mut hierarchy = Vec::with_capacity(levels.len());
        hierarchy.push(leaf);

        // Upper levels: union of up to 2x2x2 children, one level at a time
        for pair in levels.windows(2) {
            let (below_shape, shape) = (pair[0], pair[1]);
            let below = &hierarchy[hierarchy.len() - 1];

            let mut level = vec![ValueRange::EMPTY; shape.brick_count()];
            level.par_iter_mut().enumerate().for_each(|(index, range)| {
                let [cx, cy, cz] = shape.coord(index);
                for dz in 0..2 {
                    for dy in 0..2 {
                        for dx in 0..2 {
                            let child = [cx * 2 + dx, cy * 2 + dy, cz * 2 + dz];
                            if (0..3).all(|a| child[a] < below_shape.bricks[a]) {
                                *range = range.union(&below[below_shape.linear(child)]);
                            }
                        }
                    }
                }
            });

            hierarchy.push(level);
        }

        hierarchy
    }

    pub fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }

    /// Filter whose interpolated values the ranges bound
    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn num_attributes(&self) -> usize {
        self.ranges.len()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> LevelShape {
        self.levels[level]
    }

    pub fn bricks_per_dimension(&self, level: usize) -> [u32; 3] {
        self.levels[level].bricks
    }

    pub fn brick_range(&self, attribute: usize, level: usize, coord: BrickCoord) -> ValueRange {
        let shape = self.levels[level];
        assert!(
            (0..3).all(|a| coord[a] < shape.bricks[a]),
            "brick {:?} outside level {} of {:?} bricks",
            coord,
            level,
            shape.bricks
        );
        self.ranges[attribute][level][shape.linear(coord)]
    }

    /// Inclusive voxel index bounds of the cells a brick covers
    pub fn brick_voxel_bounds(&self, level: usize, coord: BrickCoord) -> ([u32; 3], [u32; 3]) {
        voxel_bounds(self.dimensions, self.levels[level], coord)
    }

    /// Conservative range over the cells of the inclusive voxel box `[lo, hi]`
    pub fn range_over_region(&self, attribute: usize, lo: [u32; 3], hi: [u32; 3]) -> ValueRange {
        let shape = self.levels[0];
        let mut first = [0u32; 3];
        let mut last = [0u32; 3];
        for axis in 0..3 {
            // Brick b touches voxels b*S ..= b*S + S
            first[axis] = lo[axis].saturating_sub(BRICK_SIZE).div_ceil(BRICK_SIZE);
            last[axis] = (hi[axis] / BRICK_SIZE).min(shape.bricks[axis] - 1);
            if first[axis] > last[axis] {
                return ValueRange::EMPTY;
            }
        }

        let leaf = &self.ranges[attribute][0];
        let mut range = ValueRange::EMPTY;
        for z in first[2]..=last[2] {
            for y in first[1]..=last[1] {
                for x in first[0]..=last[0] {
                    range = range.union(&leaf[shape.linear([x, y, z])]);
                }
            }
        }
        range
    }

    /// Range of the whole attribute (the root brick)
    pub fn value_range(&self, attribute: usize) -> ValueRange {
        let root = self.levels.len() - 1;
        self.ranges[attribute][root][0]
    }
}

fn voxel_bounds(dimensions: [u32; 3], shape: LevelShape, coord: BrickCoord) -> ([u32; 3], [u32; 3]) {
    let mut lo = [0u32; 3];
    let mut hi = [0u32; 3];
    for axis in 0..3 {
        let last_voxel = dimensions[axis] - 1;
        lo[axis] = (coord[axis] * shape.cells_per_brick).min(last_voxel);
        hi[axis] = ((coord[axis] + 1) * shape.cells_per_brick).min(last_voxel);
    }
    (lo, hi)
}
