//! Interpolation kernels over gathered voxel stencils
//!
//! All functions work in index space on one cell: `frac` is the position
//! inside the cell, in `[0, 1]` per axis, and gradients are with respect
//! to index coordinates.
//!
//! Tricubic interpolation follows Lekien and Marsden: the 64 polynomial
//! coefficients are a fixed linear map of 64 constraints (value, first
//! derivatives, mixed second derivatives and the mixed third derivative
//! at the 8 cell corners). That 64x64 map is the Kronecker cube of the
//! 1D cubic Hermite basis, so it is applied one axis at a time instead of
//! being stored as a matrix. With central-difference derivatives this is
//! the tensor product Catmull-Rom spline.

use crate::sampler::stencil::tricubic_index;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Multilinear blend of the 8 cell corners (index `4x + 2y + z`)
pub fn trilinear(values: &[f32; 8], frac: [f32; 3]) -> f32 {
    let [fx, fy, fz] = frac;

    // Collapse z, then y, then x
    let c00 = lerp(values[0], values[1], fz);
    let c01 = lerp(values[2], values[3], fz);
    let c10 = lerp(values[4], values[5], fz);
    let c11 = lerp(values[6], values[7], fz);

    lerp(lerp(c00, c01, fy), lerp(c10, c11, fy), fx)
}

/// Analytic gradient of [`trilinear`]
pub fn trilinear_gradient(values: &[f32; 8], frac: [f32; 3]) -> [f32; 3] {
    let [fx, fy, fz] = frac;
    let v = values;

    let dx = lerp(
        lerp(v[4] - v[0], v[5] - v[1], fz),
        lerp(v[6] - v[2], v[7] - v[3], fz),
        fy,
    );
    let dy = lerp(
        lerp(v[2] - v[0], v[3] - v[1], fz),
        lerp(v[6] - v[4], v[7] - v[5], fz),
        fx,
    );
    let dz = lerp(
        lerp(v[1] - v[0], v[3] - v[2], fy),
        lerp(v[5] - v[4], v[7] - v[6], fy),
        fx,
    );

    [dx, dy, dz]
}

/// Bound on how far a tricubic value strays outside the values it reads,
/// as a fraction of their span.
///
/// The tricubic weights are a tensor product of 1D Catmull-Rom weights,
/// whose absolute sum peaks at 1.25 (at t = 0.5). They sum to 1, so the
/// negative weights total at most `(1.25^3 - 1) / 2`.
pub const TRICUBIC_OVERSHOOT: f32 = (1.25 * 1.25 * 1.25 - 1.0) / 2.0;

/// Cubic Hermite basis: maps `[f(0), f(1), f'(0), f'(1)]` to the
/// coefficients of `1, t, t^2, t^3`
const HERMITE: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [-3.0, 3.0, -2.0, -1.0],
    [2.0, -2.0, 1.0, 1.0],
];

/// Derivative order per axis of each block of 8 constraints:
/// f, d/dx, d/dy, d/dz, d2/dxdy, d2/dxdz, d2/dydz, d3/dxdydz
const CONSTRAINT_BLOCKS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 1, 0],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Central difference taps (offset, sign); the 1/2 weight is applied once
/// per differentiated axis
const CENTRAL: [(i32, f32); 2] = [(1, 1.0), (-1, -1.0)];
const IDENTITY: [(i32, f32); 1] = [(0, 1.0)];

fn taps(order: usize) -> &'static [(i32, f32)] {
    if order == 1 {
        &CENTRAL
    } else {
        &IDENTITY
    }
}

#[inline]
fn corner_bits(corner: usize) -> [usize; 3] {
    [(corner >> 2) & 1, (corner >> 1) & 1, corner & 1]
}

/// Build the 64 constraints from the 4x4x4 stencil. Entry
/// `block * 8 + corner` holds the block's derivative at corner
/// `4x + 2y + z`.
pub fn tricubic_constraints(values: &[f32; 64]) -> [f32; 64] {
    let mut constraints = [0f32; 64];

    for (block, order) in CONSTRAINT_BLOCKS.iter().enumerate() {
        let weight = 0.5f32.powi((order[0] + order[1] + order[2]) as i32);

        for corner in 0..8 {
            let c = corner_bits(corner).map(|b| b as i32);
            let mut sum = 0.0;
            for &(dx, sx) in taps(order[0]) {
                for &(dy, sy) in taps(order[1]) {
                    for &(dz, sz) in taps(order[2]) {
                        sum += sx * sy * sz * values[tricubic_index(c[0] + dx, c[1] + dy, c[2] + dz)];
                    }
                }
            }
            constraints[block * 8 + corner] = weight * sum;
        }
    }

    constraints
}

#[inline]
fn hermite(line: [f32; 4]) -> [f32; 4] {
    HERMITE.map(|row| row[0] * line[0] + row[1] * line[1] + row[2] * line[2] + row[3] * line[3])
}

/// Polynomial coefficients from the constraints; coefficient
/// `16i + 4j + k` multiplies `x^i y^j z^k`
pub fn tricubic_coefficients(constraints: &[f32; 64]) -> [f32; 64] {
    // Per axis slot: corner value (0, 1) or corner derivative (2, 3)
    let mut h = [[[0f32; 4]; 4]; 4];
    for (block, order) in CONSTRAINT_BLOCKS.iter().enumerate() {
        for corner in 0..8 {
            let c = corner_bits(corner);
            h[c[0] + 2 * order[0]][c[1] + 2 * order[1]][c[2] + 2 * order[2]] =
                constraints[block * 8 + corner];
        }
    }

    for plane in h.iter_mut() {
        for line in plane.iter_mut() {
            *line = hermite(*line);
        }
    }
    for plane in h.iter_mut() {
        for z in 0..4 {
            let line = hermite([plane[0][z], plane[1][z], plane[2][z], plane[3][z]]);
            for y in 0..4 {
                plane[y][z] = line[y];
            }
        }
    }
    for y in 0..4 {
        for z in 0..4 {
            let line = hermite([h[0][y][z], h[1][y][z], h[2][y][z], h[3][y][z]]);
            for x in 0..4 {
                h[x][y][z] = line[x];
            }
        }
    }

    let mut coefficients = [0f32; 64];
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                coefficients[16 * i + 4 * j + k] = h[i][j][k];
            }
        }
    }
    coefficients
}

#[inline]
fn powers(t: f32) -> [f32; 4] {
    [1.0, t, t * t, t * t * t]
}

#[inline]
fn derivative_powers(t: f32) -> [f32; 4] {
    [0.0, 1.0, 2.0 * t, 3.0 * t * t]
}

pub fn tricubic_eval(coefficients: &[f32; 64], frac: [f32; 3]) -> f32 {
    let (px, py, pz) = (powers(frac[0]), powers(frac[1]), powers(frac[2]));
    let mut sum = 0.0;
    for i in 0..4 {
        for j in 0..4 {
            let row = &coefficients[16 * i + 4 * j..16 * i + 4 * j + 4];
            let inner = row[0] * pz[0] + row[1] * pz[1] + row[2] * pz[2] + row[3] * pz[3];
            sum += px[i] * py[j] * inner;
        }
    }
    sum
}

pub fn tricubic_gradient(coefficients: &[f32; 64], frac: [f32; 3]) -> [f32; 3] {
    let (px, py, pz) = (powers(frac[0]), powers(frac[1]), powers(frac[2]));
    let (dx, dy, dz) = (
        derivative_powers(frac[0]),
        derivative_powers(frac[1]),
        derivative_powers(frac[2]),
    );

    let mut gradient = [0f32; 3];
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                let a = coefficients[16 * i + 4 * j + k];
                gradient[0] += a * dx[i] * py[j] * pz[k];
                gradient[1] += a * px[i] * dy[j] * pz[k];
                gradient[2] += a * px[i] * py[j] * dz[k];
            }
        }
    }
    gradient
}

/// Tricubic value straight from the 4x4x4 stencil
pub fn tricubic(values: &[f32; 64], frac: [f32; 3]) -> f32 {
    tricubic_eval(&tricubic_coefficients(&tricubic_constraints(values)), frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::stencil::{TRICUBIC_OFFSETS, TRILINEAR_OFFSETS};

    fn stencil_of(f: impl Fn(f32, f32, f32) -> f32) -> [f32; 64] {
        TRICUBIC_OFFSETS.map(|[x, y, z]| f(x as f32, y as f32, z as f32))
    }

    fn quadratic(x: f32, y: f32, z: f32) -> f32 {
        1.0 + 2.0 * x - y + 0.5 * z + x * x * y - 0.25 * x * y * z + 0.3 * y * y * z * z
    }

    fn quadratic_gradient(x: f32, y: f32, z: f32) -> [f32; 3] {
        [
            2.0 + 2.0 * x * y - 0.25 * y * z,
            -1.0 + x * x - 0.25 * x * z + 0.6 * y * z * z,
            0.5 - 0.25 * x * y + 0.6 * y * y * z,
        ]
    }

    #[test]
    fn test_trilinear_cube_center() {
        let values: [f32; 8] = TRILINEAR_OFFSETS.map(|[x, y, z]| (x + 2 * y + 4 * z) as f32);
        assert!((trilinear(&values, [0.5, 0.5, 0.5]) - 3.5).abs() < 1e-6);
        assert_eq!(trilinear(&values, [0.0, 0.0, 0.0]), 0.0);
        assert_eq!(trilinear(&values, [1.0, 1.0, 1.0]), 7.0);

        let g = trilinear_gradient(&values, [0.2, 0.7, 0.4]);
        assert!((g[0] - 1.0).abs() < 1e-6);
        assert!((g[1] - 2.0).abs() < 1e-6);
        assert!((g[2] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_field_has_single_coefficient() {
        let coefficients = tricubic_coefficients(&tricubic_constraints(&[2.5; 64]));
        assert!((coefficients[0] - 2.5).abs() < 1e-6);
        assert!(coefficients[1..].iter().all(|c| c.abs() < 1e-6));
    }

    #[test]
    fn test_constraint_weights() {
        // f = x * y * z has d3/dxdydz = 1 everywhere and f = 1 at corner 7
        let constraints = tricubic_constraints(&stencil_of(|x, y, z| x * y * z));
        assert!((constraints[7] - 1.0).abs() < 1e-6);
        assert!((constraints[7 * 8] - 1.0).abs() < 1e-6);
        // d/dx at corner (0, 1, 1) is y * z = 1
        assert!((constraints[8 + 3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tricubic_exact_at_corners() {
        let values: [f32; 64] = std::array::from_fn(|i| ((i * 37) % 11) as f32 - 3.0);
        let coefficients = tricubic_coefficients(&tricubic_constraints(&values));
        for corner in 0..8 {
            let c = corner_bits(corner);
            let frac = c.map(|b| b as f32);
            let expected = values[tricubic_index(c[0] as i32, c[1] as i32, c[2] as i32)];
            assert!((tricubic_eval(&coefficients, frac) - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_tricubic_reproduces_quadratics() {
        let coefficients = tricubic_coefficients(&tricubic_constraints(&stencil_of(quadratic)));
        for frac in [[0.3, 0.7, 0.45], [0.0, 0.5, 1.0], [0.9, 0.1, 0.6]] {
            let [x, y, z] = frac;
            assert!((tricubic_eval(&coefficients, frac) - quadratic(x, y, z)).abs() < 5e-4);

            let g = tricubic_gradient(&coefficients, frac);
            let expected = quadratic_gradient(x, y, z);
            for axis in 0..3 {
                assert!((g[axis] - expected[axis]).abs() < 5e-4);
            }
        }
    }

    #[test]
    fn test_tricubic_overshoot_is_bounded() {
        // A lone high voxel behind the cell pulls the field below zero
        let spike = stencil_of(|x, _, _| if x < 0.0 { 1.0 } else { 0.0 });
        assert!(tricubic(&spike, [1.0 / 3.0, 0.5, 0.5]) < -0.07);

        for seed in 0..40usize {
            let values: [f32; 64] =
                std::array::from_fn(|i| ((i * 7 + seed * 13) % 5 == 0) as u8 as f32);
            let coefficients = tricubic_coefficients(&tricubic_constraints(&values));
            for step in 0..27 {
                let frac = [step % 3, (step / 3) % 3, step / 9].map(|s| 0.25 + 0.25 * s as f32);
                let v = tricubic_eval(&coefficients, frac);
                assert!(v >= -TRICUBIC_OVERSHOOT - 1e-5, "{} at {:?}", v, frac);
                assert!(v <= 1.0 + TRICUBIC_OVERSHOOT + 1e-5, "{} at {:?}", v, frac);
            }
        }
    }

    #[test]
    fn test_neighbouring_cells_meet_with_matching_gradient() {
        // 5x4x4 lattice; cells at x = 1 and x = 2 share the face x = 2
        let field = |x: i32, y: i32, z: i32| (((x * 31 + y * 17 + z * 7) % 13) as f32 - 6.0) / 6.0;
        let left: [f32; 64] = TRICUBIC_OFFSETS.map(|[x, y, z]| field(x + 1, y + 1, z + 1));
        let right: [f32; 64] = TRICUBIC_OFFSETS.map(|[x, y, z]| field(x + 2, y + 1, z + 1));
        let left = tricubic_coefficients(&tricubic_constraints(&left));
        let right = tricubic_coefficients(&tricubic_constraints(&right));

        for (fy, fz) in [(0.0, 0.0), (0.3, 0.8), (0.5, 0.5), (0.95, 0.1)] {
            let a = tricubic_eval(&left, [1.0, fy, fz]);
            let b = tricubic_eval(&right, [0.0, fy, fz]);
            assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);

            let ga = tricubic_gradient(&left, [1.0, fy, fz]);
            let gb = tricubic_gradient(&right, [0.0, fy, fz]);
            for axis in 0..3 {
                assert!((ga[axis] - gb[axis]).abs() < 1e-4, "{:?} vs {:?}", ga, gb);
            }
        }
    }

    #[test]
    fn test_tricubic_matches_catmull_rom_along_axis() {
        // Field varying along x only reduces to the 1D Catmull-Rom spline
        let p = [0.0f32, 1.0, 4.0, 2.0];
        let values = stencil_of(|x, _, _| p[(x + 1.0) as usize]);
        let t = 0.4f32;
        let expected = 0.5
            * ((2.0 * p[1])
                + (-p[0] + p[2]) * t
                + (2.0 * p[0] - 5.0 * p[1] + 4.0 * p[2] - p[3]) * t * t
                + (-p[0] + 3.0 * p[1] - 3.0 * p[2] + p[3]) * t * t * t);
        assert!((tricubic(&values, [t, 0.2, 0.8]) - expected).abs() < 1e-5);
    }
}
