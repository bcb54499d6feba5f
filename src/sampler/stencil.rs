// Fixed voxel neighbourhoods read by the interpolation kernels.
//
// Both stencils are x-major: offset (x, y, z) lives at the index where z
// varies fastest.

use crate::types::Pt3;
use crate::volume::grid::Grid;

/// Corners of the unit cell, index `4x + 2y + z`
pub const TRILINEAR_OFFSETS: [[i32; 3]; 8] = trilinear_offsets();

/// Offsets in `[-1, 2]^3`, index `16(x+1) + 4(y+1) + (z+1)`
pub const TRICUBIC_OFFSETS: [[i32; 3]; 64] = tricubic_offsets();

const fn trilinear_offsets() -> [[i32; 3]; 8] {
    let mut offsets = [[0; 3]; 8];
    let mut i = 0;
    while i < 8 {
        offsets[i] = [(i >> 2) as i32 & 1, (i >> 1) as i32 & 1, i as i32 & 1];
        i += 1;
    }
    offsets
}

const fn tricubic_offsets() -> [[i32; 3]; 64] {
    let mut offsets = [[0; 3]; 64];
    let mut i = 0;
    while i < 64 {
        offsets[i] = [(i / 16) as i32 - 1, ((i / 4) % 4) as i32 - 1, (i % 4) as i32 - 1];
        i += 1;
    }
    offsets
}

/// Index of offset `(x, y, z)` in [`TRICUBIC_OFFSETS`]
#[inline]
pub const fn tricubic_index(x: i32, y: i32, z: i32) -> usize {
    ((x + 1) * 16 + (y + 1) * 4 + (z + 1)) as usize
}

/// Lower corner of the cell holding a continuous index coordinate and the
/// position inside it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellLocation {
    pub base: [i32; 3],
    /// Fractional position in `[0, 1]` per axis
    pub frac: [f32; 3],
}

impl CellLocation {
    /// Locate `index` in a lattice of `dimensions` voxels. The last cell
    /// along an axis absorbs its far face; a single voxel layer maps to
    /// cell 0 with zero fraction.
    pub fn new(dimensions: [u32; 3], index: &Pt3) -> Self {
        let mut base = [0i32; 3];
        let mut frac = [0f32; 3];
        for axis in 0..3 {
            if dimensions[axis] < 2 {
                continue;
            }
            let last_cell = dimensions[axis] as i32 - 2;
            let cell = (index[axis].floor() as i32).clamp(0, last_cell);
            base[axis] = cell;
            frac[axis] = (index[axis] - cell as f32).clamp(0.0, 1.0);
        }
        Self { base, frac }
    }
}

/// Linear voxel indices of `offsets` around `base`, clamped to the grid
#[inline]
pub fn gather<G: Grid + ?Sized, const N: usize>(
    grid: &G,
    base: [i32; 3],
    offsets: &[[i32; 3]; N],
) -> [usize; N] {
    let dims = grid.dimensions();
    let clamp = |axis: usize, v: i32| v.clamp(0, dims[axis] as i32 - 1) as u32;

    let mut voxels = [0usize; N];
    for (voxel, offset) in voxels.iter_mut().zip(offsets) {
        *voxel = grid.linear_index(
            clamp(0, base[0] + offset[0]),
            clamp(1, base[1] + offset[1]),
            clamp(2, base[2] + offset[2]),
        );
    }
    voxels
}

/// Linear index of the voxel nearest to `index`
#[inline]
pub fn nearest_voxel<G: Grid + ?Sized>(grid: &G, index: &Pt3) -> usize {
    let dims = grid.dimensions();
    let round = |axis: usize| (index[axis].round() as i32).clamp(0, dims[axis] as i32 - 1) as u32;
    grid.linear_index(round(0), round(1), round(2))
}
