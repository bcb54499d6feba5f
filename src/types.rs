use serde::{Deserialize, Serialize};

pub type Pt3 = nalgebra::Point3<f32>;
pub type Vec3 = nalgebra::Vector3<f32>;

/// Axis-aligned bounding box in object space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub min: Pt3,
    pub max: Pt3,
}

impl AABB {
    pub fn new(min: Pt3, max: Pt3) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Slab test. Returns the parametric `[t0, t1]` overlap of the ray with
    /// the box, clipped to `t_range`, or `None` if they do not meet.
    pub fn intersect_ray(
        &self,
        origin: &Pt3,
        direction: &Vec3,
        t_range: (f32, f32),
    ) -> Option<(f32, f32)> {
        let (mut t0, mut t1) = t_range;

        for axis in 0..3 {
            let inv = 1.0 / direction[axis];
            let mut near = (self.min[axis] - origin[axis]) * inv;
            let mut far = (self.max[axis] - origin[axis]) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            // NaN from 0 * inf (origin on a slab plane with a parallel ray)
            // leaves the current bound untouched
            if near > t0 {
                t0 = near;
            }
            if far < t1 {
                t1 = far;
            }
            if t0 > t1 {
                return None;
            }
        }

        Some((t0, t1))
    }
}

/// Closed scalar interval `[lower, upper]`.
///
/// The empty range is `(+inf, -inf)`; it absorbs nothing on union and
/// overlaps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub lower: f32,
    pub upper: f32,
}

impl ValueRange {
    pub const EMPTY: ValueRange = ValueRange {
        lower: f32::INFINITY,
        upper: f32::NEG_INFINITY,
    };

    pub fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.lower <= self.upper)
    }

    /// Grow to include `value`. NaN values are ignored.
    #[inline]
    pub fn extend(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.lower = self.lower.min(value);
        self.upper = self.upper.max(value);
    }

    #[inline]
    pub fn union(&self, other: &ValueRange) -> ValueRange {
        ValueRange {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Grow both ends by `fraction` of the span; empty ranges stay empty
    #[inline]
    pub fn widen(&self, fraction: f32) -> ValueRange {
        if self.is_empty() || fraction == 0.0 {
            return *self;
        }
        let pad = (self.upper - self.lower) * fraction;
        ValueRange {
            lower: self.lower - pad,
            upper: self.upper + pad,
        }
    }

    #[inline]
    pub fn overlaps(&self, other: &ValueRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.lower <= other.upper
            && other.lower <= self.upper
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Interpolation order used by samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Nearest,
    Trilinear,
    Tricubic,
}

impl Filter {
    pub fn as_int(self) -> i32 {
        match self {
            Filter::Nearest => 0,
            Filter::Trilinear => 1,
            Filter::Tricubic => 2,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Trilinear
    }
}

impl TryFrom<i32> for Filter {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Filter::Nearest),
            1 => Ok(Filter::Trilinear),
            2 => Ok(Filter::Tricubic),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_range_overlaps_nothing() {
        let empty = ValueRange::EMPTY;
        assert!(empty.is_empty());
        assert!(!empty.overlaps(&ValueRange::new(-1e30, 1e30)));
        assert!(!ValueRange::new(0.0, 1.0).overlaps(&empty));

        let merged = empty.union(&ValueRange::new(2.0, 3.0));
        assert_eq!(merged, ValueRange::new(2.0, 3.0));
    }

    #[test]
    fn test_extend_skips_nan() {
        let mut range = ValueRange::EMPTY;
        range.extend(f32::NAN);
        assert!(range.is_empty());
        range.extend(4.0);
        range.extend(-1.0);
        assert_eq!(range, ValueRange::new(-1.0, 4.0));
        assert_eq!(range.widen(0.5), ValueRange::new(-3.5, 6.5));
        assert!(ValueRange::EMPTY.widen(0.5).is_empty());
    }

    #[test]
    fn test_ray_box_overlap() {
        let bbox = AABB::new(Pt3::new(0.0, 0.0, 0.0), Pt3::new(1.0, 1.0, 1.0));
        let hit = bbox
            .intersect_ray(
                &Pt3::new(-1.0, 0.5, 0.5),
                &Vec3::new(1.0, 0.0, 0.0),
                (0.0, f32::INFINITY),
            )
            .unwrap();
        assert!((hit.0 - 1.0).abs() < 1e-6);
        assert!((hit.1 - 2.0).abs() < 1e-6);

        let miss = bbox.intersect_ray(
            &Pt3::new(-1.0, 2.0, 0.5),
            &Vec3::new(1.0, 0.0, 0.0),
            (0.0, f32::INFINITY),
        );
        assert!(miss.is_none());
    }

    #[test]
    fn test_filter_from_int() {
        assert_eq!(Filter::try_from(0), Ok(Filter::Nearest));
        assert_eq!(Filter::try_from(2), Ok(Filter::Tricubic));
        assert_eq!(Filter::try_from(7), Err(7));
        assert_eq!(Filter::default(), Filter::Trilinear);
    }
}
