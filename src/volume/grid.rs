// Structured grid geometries: the mapping between object space and the
// continuous index space of the voxel lattice.

use crate::error::{Result, VolumeError};
use crate::types::{Pt3, Vec3, AABB};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;

const DEGREES_PER_RADIAN: f32 = 180.0 / PI;

/// Slack (in index units) allowed when deciding whether a point lies in
/// the domain, so the far faces of the grid survive float round-off
pub const DOMAIN_EPSILON: f32 = 1e-4;

/// Structured grid type a volume is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GridType {
    StructuredRegular,
    StructuredRectilinear,
    StructuredSpherical,
}

/// Common interface for the structured geometries.
/// Must be Sync so samplers can be shared across threads.
pub trait Grid: Send + Sync {
    /// Number of voxels along each axis
    fn dimensions(&self) -> [u32; 3];

    /// Continuous index coordinates of an object-space point. The result
    /// is not clamped and may lie outside the lattice.
    fn object_to_index(&self, p: &Pt3) -> Pt3;

    /// Object-space position of a (possibly fractional) index coordinate
    fn index_to_object(&self, index: &Pt3) -> Pt3;

    fn bounding_box(&self) -> AABB;

    /// Convert a gradient taken with respect to index coordinates into one
    /// with respect to object coordinates
    fn gradient_to_object(&self, object: &Pt3, index: &Pt3, gradient: &Vec3) -> Vec3;

    /// Whether an index-aligned box maps to an axis-aligned box in object
    /// space
    fn axis_aligned(&self) -> bool;

    fn voxel_count(&self) -> usize {
        let [x, y, z] = self.dimensions();
        x as usize * y as usize * z as usize
    }

    /// Flat voxel index, x fastest
    #[inline]
    fn linear_index(&self, x: u32, y: u32, z: u32) -> usize {
        let [dx, dy, _] = self.dimensions();
        x as usize + dx as usize * (y as usize + dy as usize * z as usize)
    }

    /// Whether `index` lies inside the lattice, with [`DOMAIN_EPSILON`] slack
    fn in_domain(&self, index: &Pt3) -> bool {
        let dims = self.dimensions();
        (0..3).all(|axis| {
            let upper = (dims[axis] - 1) as f32;
            index[axis] >= -DOMAIN_EPSILON && index[axis] <= upper + DOMAIN_EPSILON
        })
    }
}

fn check_dimensions(dimensions: [i32; 3]) -> Result<[u32; 3]> {
    if dimensions.iter().any(|&d| d < 1) {
        return Err(VolumeError::invalid(
            "dimensions",
            format!("every extent must be at least 1, got {:?}", dimensions),
        ));
    }
    Ok([
        dimensions[0] as u32,
        dimensions[1] as u32,
        dimensions[2] as u32,
    ])
}

fn check_spacing(name: &'static str, spacing: [f32; 3]) -> Result<()> {
    if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(VolumeError::invalid(
            name,
            format!("components must be finite and positive, got {:?}", spacing),
        ));
    }
    Ok(())
}

/// Uniformly spaced lattice: `object = origin + index * spacing`
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGrid {
    pub dimensions: [u32; 3],
    pub origin: Pt3,
    pub spacing: Vec3,
}

impl RegularGrid {
    pub fn new(dimensions: [i32; 3], origin: [f32; 3], spacing: [f32; 3]) -> Result<Self> {
        let dimensions = check_dimensions(dimensions)?;
        if origin.iter().any(|o| !o.is_finite()) {
            return Err(VolumeError::invalid("gridOrigin", "components must be finite"));
        }
        check_spacing("gridSpacing", spacing)?;

        Ok(Self {
            dimensions,
            origin: Pt3::from(origin),
            spacing: Vec3::from(spacing),
        })
    }
}

impl Grid for RegularGrid {
    fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }

    fn object_to_index(&self, p: &Pt3) -> Pt3 {
        Pt3::from((p - self.origin).component_div(&self.spacing))
    }

    fn index_to_object(&self, index: &Pt3) -> Pt3 {
        self.origin + index.coords.component_mul(&self.spacing)
    }

    fn bounding_box(&self) -> AABB {
        let upper = Pt3::new(
            (self.dimensions[0] - 1) as f32,
            (self.dimensions[1] - 1) as f32,
            (self.dimensions[2] - 1) as f32,
        );
        AABB::new(self.origin, self.index_to_object(&upper))
    }

    fn gradient_to_object(&self, _object: &Pt3, _index: &Pt3, gradient: &Vec3) -> Vec3 {
        gradient.component_div(&self.spacing)
    }

    fn axis_aligned(&self) -> bool {
        true
    }
}

/// Lattice with arbitrary, strictly increasing coordinates along each axis
#[derive(Debug, Clone, PartialEq)]
pub struct RectilinearGrid {
    pub dimensions: [u32; 3],
    pub coordinates: [Arc<[f32]>; 3],
}

impl RectilinearGrid {
    const COORDINATE_PARAMS: [&'static str; 3] = ["xCoordinates", "yCoordinates", "zCoordinates"];

    pub fn new(dimensions: [i32; 3], coordinates: [Arc<[f32]>; 3]) -> Result<Self> {
        let dimensions = check_dimensions(dimensions)?;

        for axis in 0..3 {
            let name = Self::COORDINATE_PARAMS[axis];
            let coords = &coordinates[axis];
            if coords.len() != dimensions[axis] as usize {
                return Err(VolumeError::invalid(
                    name,
                    format!(
                        "expected {} coordinates, got {}",
                        dimensions[axis],
                        coords.len()
                    ),
                ));
            }
            if coords.iter().any(|c| !c.is_finite()) {
                return Err(VolumeError::invalid(name, "coordinates must be finite"));
            }
            if coords.windows(2).any(|w| w[1] <= w[0]) {
                return Err(VolumeError::invalid(
                    name,
                    "coordinates must be strictly increasing",
                ));
            }
        }

        Ok(Self {
            dimensions,
            coordinates,
        })
    }

    pub fn coordinate_param(axis: usize) -> &'static str {
        Self::COORDINATE_PARAMS[axis]
    }

    /// Cell along `axis` holding coordinate `x`, clamped to the valid cells
    fn cell(&self, axis: usize, x: f32) -> usize {
        let coords = &self.coordinates[axis];
        if coords.len() < 2 {
            return 0;
        }
        let upper = coords.partition_point(|&c| c <= x);
        upper.saturating_sub(1).min(coords.len() - 2)
    }

    fn axis_to_index(&self, axis: usize, x: f32) -> f32 {
        let coords = &self.coordinates[axis];
        if coords.len() < 2 {
            return x - coords[0];
        }
        // Bisection to the bracketing cell, extrapolating past the ends
        let i = self.cell(axis, x);
        i as f32 + (x - coords[i]) / (coords[i + 1] - coords[i])
    }

    fn index_to_axis(&self, axis: usize, index: f32) -> f32 {
        let coords = &self.coordinates[axis];
        if coords.len() < 2 {
            return coords[0] + index;
        }
        let i = (index.floor().max(0.0) as usize).min(coords.len() - 2);
        let frac = index - i as f32;
        coords[i] + frac * (coords[i + 1] - coords[i])
    }
}

impl Grid for RectilinearGrid {
    fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }

    fn object_to_index(&self, p: &Pt3) -> Pt3 {
        Pt3::new(
            self.axis_to_index(0, p.x),
            self.axis_to_index(1, p.y),
            self.axis_to_index(2, p.z),
        )
    }

    fn index_to_object(&self, index: &Pt3) -> Pt3 {
        Pt3::new(
            self.index_to_axis(0, index.x),
            self.index_to_axis(1, index.y),
            self.index_to_axis(2, index.z),
        )
    }

    fn bounding_box(&self) -> AABB {
        let first = |axis: usize| self.coordinates[axis][0];
        let last = |axis: usize| self.coordinates[axis][self.coordinates[axis].len() - 1];
        AABB::new(
            Pt3::new(first(0), first(1), first(2)),
            Pt3::new(last(0), last(1), last(2)),
        )
    }

    fn gradient_to_object(&self, object: &Pt3, _index: &Pt3, gradient: &Vec3) -> Vec3 {
        let mut result = Vec3::zeros();
        for axis in 0..3 {
            let coords = &self.coordinates[axis];
            if coords.len() < 2 {
                continue;
            }
            let i = self.cell(axis, object[axis]);
            result[axis] = gradient[axis] / (coords[i + 1] - coords[i]);
        }
        result
    }

    fn axis_aligned(&self) -> bool {
        true
    }
}

/// Lattice over (radius, inclination, azimuth); angles in degrees.
/// Inclination is measured from +z, azimuth from +x towards +y.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalGrid {
    pub dimensions: [u32; 3],
    pub origin: Vec3,
    pub spacing: Vec3,
}

impl SphericalGrid {
    pub fn new(dimensions: [i32; 3], origin: [f32; 3], spacing: [f32; 3]) -> Result<Self> {
        let dimensions = check_dimensions(dimensions)?;
        if origin.iter().any(|o| !o.is_finite()) {
            return Err(VolumeError::invalid("gridOrigin", "components must be finite"));
        }
        check_spacing("gridSpacing", spacing)?;

        let extent = |axis: usize| origin[axis] + (dimensions[axis] - 1) as f32 * spacing[axis];

        if origin[0] < 0.0 {
            return Err(VolumeError::invalid(
                "gridOrigin",
                "radius range must not be negative",
            ));
        }
        if origin[1] < 0.0 || extent(1) > 180.0 {
            return Err(VolumeError::invalid(
                "gridSpacing",
                "inclination range must lie within [0, 180] degrees",
            ));
        }
        if origin[2] < 0.0 || extent(2) > 360.0 {
            return Err(VolumeError::invalid(
                "gridSpacing",
                "azimuth range must lie within [0, 360] degrees",
            ));
        }

        Ok(Self {
            dimensions,
            origin: Vec3::from(origin),
            spacing: Vec3::from(spacing),
        })
    }

    fn max_radius(&self) -> f32 {
        self.origin.x + (self.dimensions[0] - 1) as f32 * self.spacing.x
    }
}

impl Grid for SphericalGrid {
    fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }

    fn object_to_index(&self, p: &Pt3) -> Pt3 {
        let r = p.coords.norm();
        let (inclination, azimuth) = if r > 0.0 {
            let inclination = (p.z / r).clamp(-1.0, 1.0).acos() * DEGREES_PER_RADIAN;
            let mut azimuth = p.y.atan2(p.x) * DEGREES_PER_RADIAN;
            if azimuth < 0.0 {
                azimuth += 360.0;
            }
            (inclination, azimuth)
        } else {
            (0.0, 0.0)
        };

        Pt3::from((Vec3::new(r, inclination, azimuth) - self.origin).component_div(&self.spacing))
    }

    fn index_to_object(&self, index: &Pt3) -> Pt3 {
        let q = self.origin + index.coords.component_mul(&self.spacing);
        let (r, inclination, azimuth) = (q.x, q.y / DEGREES_PER_RADIAN, q.z / DEGREES_PER_RADIAN);
        Pt3::new(
            r * inclination.sin() * azimuth.cos(),
            r * inclination.sin() * azimuth.sin(),
            r * inclination.cos(),
        )
    }

    fn bounding_box(&self) -> AABB {
        let r = self.max_radius();
        AABB::new(Pt3::new(-r, -r, -r), Pt3::new(r, r, r))
    }

    fn gradient_to_object(&self, object: &Pt3, _index: &Pt3, gradient: &Vec3) -> Vec3 {
        let (x, y, z) = (object.x, object.y, object.z);
        let rho2 = x * x + y * y;
        let r2 = rho2 + z * z;
        if r2 <= f32::EPSILON {
            return Vec3::zeros();
        }
        let r = r2.sqrt();
        let rho = rho2.sqrt();

        let mut result = object.coords / r * (gradient.x / self.spacing.x);

        // Inclination and azimuth are singular on the z axis
        if rho > f32::EPSILON {
            let d_inclination = Vec3::new(x * z / (r2 * rho), y * z / (r2 * rho), -rho / r2);
            let d_azimuth = Vec3::new(-y / rho2, x / rho2, 0.0);
            result += d_inclination * (gradient.y * DEGREES_PER_RADIAN / self.spacing.y);
            result += d_azimuth * (gradient.z * DEGREES_PER_RADIAN / self.spacing.z);
        }

        result
    }

    fn axis_aligned(&self) -> bool {
        false
    }
}

/// The closed set of supported geometries
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Regular(RegularGrid),
    Rectilinear(RectilinearGrid),
    Spherical(SphericalGrid),
}

impl Geometry {
    pub fn as_grid(&self) -> &dyn Grid {
        match self {
            Geometry::Regular(g) => g,
            Geometry::Rectilinear(g) => g,
            Geometry::Spherical(g) => g,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Pt3, b: &Pt3) -> bool {
        (a - b).norm() < 1e-4
    }

    #[test]
    fn test_regular_roundtrip() {
        let grid = RegularGrid::new([4, 5, 6], [1.0, -2.0, 0.5], [0.5, 2.0, 1.0]).unwrap();
        let index = Pt3::new(1.25, 3.5, 4.0);
        let object = grid.index_to_object(&index);
        assert!(close(&grid.object_to_index(&object), &index));

        let bbox = grid.bounding_box();
        assert!(close(&bbox.max, &Pt3::new(2.5, 6.0, 5.5)));
        assert_eq!(grid.voxel_count(), 120);
        assert_eq!(grid.linear_index(1, 2, 3), 1 + 4 * (2 + 5 * 3));
    }

    #[test]
    fn test_regular_rejects_bad_spacing() {
        assert!(RegularGrid::new([2, 2, 2], [0.0; 3], [1.0, 0.0, 1.0]).is_err());
        assert!(RegularGrid::new([2, 2, 2], [0.0; 3], [1.0, -1.0, 1.0]).is_err());
        assert!(RegularGrid::new([2, 0, 2], [0.0; 3], [1.0; 3]).is_err());
    }

    #[test]
    fn test_domain_check_has_slack() {
        let grid = RegularGrid::new([3, 3, 3], [0.0; 3], [0.1; 3]).unwrap();
        let far = grid.object_to_index(&Pt3::new(0.2, 0.2, 0.2));
        assert!(grid.in_domain(&far));
        assert!(!grid.in_domain(&Pt3::new(2.1, 0.0, 0.0)));
        assert!(!grid.in_domain(&Pt3::new(-0.01, 0.0, 0.0)));
    }

    #[test]
    fn test_rectilinear_mapping() {
        let grid = RectilinearGrid::new(
            [3, 2, 2],
            [
                vec![0.0, 1.0, 3.0].into(),
                vec![0.0, 2.0].into(),
                vec![-1.0, 1.0].into(),
            ],
        )
        .unwrap();

        let index = grid.object_to_index(&Pt3::new(2.0, 1.0, 0.0));
        assert!(close(&index, &Pt3::new(1.5, 0.5, 0.5)));
        assert!(close(&grid.index_to_object(&index), &Pt3::new(2.0, 1.0, 0.0)));

        // Gradient of index x w.r.t. object x in the wide cell is 1/2
        let g = grid.gradient_to_object(&Pt3::new(2.0, 1.0, 0.0), &index, &Vec3::new(1.0, 0.0, 0.0));
        assert!((g.x - 0.5).abs() < 1e-6);

        let unsorted = RectilinearGrid::new(
            [2, 1, 1],
            [vec![1.0, 1.0].into(), vec![0.0].into(), vec![0.0].into()],
        );
        assert!(unsorted.is_err());
    }

    #[test]
    fn test_spherical_mapping() {
        let grid = SphericalGrid::new([5, 19, 37], [0.0, 0.0, 0.0], [0.5, 10.0, 10.0]).unwrap();

        // On the +y axis: r = 1, inclination 90, azimuth 90
        let index = grid.object_to_index(&Pt3::new(0.0, 1.0, 0.0));
        assert!(close(&index, &Pt3::new(2.0, 9.0, 9.0)));
        assert!(close(&grid.index_to_object(&index), &Pt3::new(0.0, 1.0, 0.0)));

        // Negative azimuths wrap into [0, 360)
        let index = grid.object_to_index(&Pt3::new(0.0, -1.0, 0.0));
        assert!((index.z - 27.0).abs() < 1e-4);

        assert!(SphericalGrid::new([2, 2, 2], [0.0, 0.0, 0.0], [1.0, 181.0, 1.0]).is_err());
        assert!(SphericalGrid::new([2, 2, 2], [-1.0, 0.0, 0.0], [1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_spherical_radial_gradient() {
        let grid = SphericalGrid::new([5, 19, 37], [0.0, 0.0, 0.0], [0.5, 10.0, 10.0]).unwrap();
        let p = Pt3::new(0.6, 0.0, 0.8);
        let index = grid.object_to_index(&p);
        // d(index.r)/dp = p / (r * spacing.r)
        let g = grid.gradient_to_object(&p, &index, &Vec3::new(1.0, 0.0, 0.0));
        assert!((g - Vec3::new(1.2, 0.0, 1.6)).norm() < 1e-4);
    }
}
