// Ray interval iteration over the acceleration grid.
//
// For axis-aligned grids the ray is cut at every brick boundary of one
// hierarchy level (level 0 unless a coarser depth is asked for); each
// piece reports the range of the brick it lies in, and pieces whose range
// cannot hold a selected value are skipped. Spherical bricks are not boxes
// in object space, so those grids yield one interval over the bounding
// box carrying the whole attribute range.
//
// Hit iteration marches the selected intervals and reports where the
// field crosses an isovalue.

use crate::sampler::Sampler;
use crate::types::{Pt3, ValueRange, Vec3};
use std::collections::VecDeque;

/// Values an interval must be able to contain to be reported.
/// An empty selector selects every interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSelector {
    ranges: Vec<ValueRange>,
    values: Vec<f32>,
}

impl ValueSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.ranges.push(range);
        self
    }

    /// Select intervals that may contain the isovalue `value`
    pub fn with_value(mut self, value: f32) -> Self {
        self.values.push(value);
        self
    }

    pub fn ranges(&self) -> &[ValueRange] {
        &self.ranges
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.values.is_empty()
    }

    pub fn selects(&self, range: &ValueRange) -> bool {
        self.is_empty()
            || self.ranges.iter().any(|r| r.overlaps(range))
            || self.values.iter().any(|&v| range.contains(v))
    }
}

/// A ray segment and the values the field may take along it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub t_range: (f32, f32),
    pub value_range: ValueRange,
    /// Ray parameter step that advances about one cell
    pub nominal_delta_t: f32,
}

pub struct IntervalIterator {
    sampler: Sampler,
    attribute: usize,
    origin: Pt3,
    direction: Vec3,
    t_range: (f32, f32),
    selector: ValueSelector,
    /// Hierarchy level whose bricks cut the ray
    level: usize,
    /// Sorted ray parameters of the entry, exit and brick crossings
    crossings: Vec<f32>,
    cursor: usize,
}

impl IntervalIterator {
    /// Iterate the intervals of attribute 0 along `origin + t * direction`
    /// for `t` within `t_range`
    pub fn new(
        sampler: &Sampler,
        origin: &Pt3,
        direction: &Vec3,
        t_range: (f32, f32),
        selector: ValueSelector,
    ) -> Self {
        let mut iter = Self {
            sampler: sampler.clone(),
            attribute: 0,
            origin: *origin,
            direction: *direction,
            t_range,
            selector,
            level: 0,
            crossings: Vec::new(),
            cursor: 0,
        };
        iter.crossings = iter.crossings();
        iter
    }

    /// Cut the ray at the bricks `depth` levels above level 0, so each
    /// step up yields fewer, wider intervals. Depths past the root clamp
    /// to the root. Restarts iteration.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.level = depth.min(self.sampler.accel().level_count() - 1);
        self.crossings = self.crossings();
        self.cursor = 0;
        self
    }

    /// Report ranges of `attribute` instead of attribute 0
    pub fn with_attribute(mut self, attribute: usize) -> Self {
        assert!(
            attribute < self.sampler.num_attributes(),
            "attribute index {} out of range ({} attributes)",
            attribute,
            self.sampler.num_attributes()
        );
        self.attribute = attribute;
        self
    }

    fn crossings(&self) -> Vec<f32> {
        if self.direction.norm_squared() == 0.0 {
            return Vec::new();
        }
        let Some((t0, t1)) = self
            .sampler
            .bounding_box()
            .intersect_ray(&self.origin, &self.direction, self.t_range)
        else {
            return Vec::new();
        };

        let mut crossings = vec![t0, t1];

        let grid = self.sampler.grid();
        if grid.axis_aligned() {
            let dims = grid.dimensions();
            let shape = self.sampler.accel().level(self.level);
            for axis in 0..3 {
                if self.direction[axis] == 0.0 {
                    continue;
                }
                for brick in 1..shape.bricks[axis] {
                    let voxel = (brick * shape.cells_per_brick).min(dims[axis] - 1);
                    let mut index = Pt3::origin();
                    index[axis] = voxel as f32;
                    let plane = grid.index_to_object(&index)[axis];
                    let t = (plane - self.origin[axis]) / self.direction[axis];
                    if t > t0 && t < t1 {
                        crossings.push(t);
                    }
                }
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        crossings.dedup();
        crossings
    }

    fn brick_interval(&self, t0: f32, t1: f32) -> Interval {
        let grid = self.sampler.grid();
        let accel = self.sampler.accel();
        let dims = grid.dimensions();
        let shape = accel.level(self.level);

        let mid = self.origin + self.direction * (0.5 * (t0 + t1));
        let index = grid.object_to_index(&mid);
        let coord: [u32; 3] = std::array::from_fn(|axis| {
            let brick = (index[axis] / shape.cells_per_brick as f32).floor().max(0.0) as u32;
            brick.min(shape.bricks[axis] - 1)
        });

        // Average cell size of the brick along each axis
        let (lo, hi) = accel.brick_voxel_bounds(self.level, coord);
        let lo_object = grid.index_to_object(&Pt3::new(lo[0] as f32, lo[1] as f32, lo[2] as f32));
        let hi_object = grid.index_to_object(&Pt3::new(hi[0] as f32, hi[1] as f32, hi[2] as f32));
        let mut nominal = f32::INFINITY;
        for axis in 0..3 {
            let cells = hi[axis] - lo[axis];
            if cells == 0 || dims[axis] < 2 || self.direction[axis] == 0.0 {
                continue;
            }
            let cell = (hi_object[axis] - lo_object[axis]) / cells as f32;
            nominal = nominal.min(cell / self.direction[axis].abs());
        }
        if !nominal.is_finite() {
            nominal = t1 - t0;
        }

        Interval {
            t_range: (t0, t1),
            value_range: accel.brick_range(self.attribute, self.level, coord),
            nominal_delta_t: nominal,
        }
    }

    fn domain_interval(&self, t0: f32, t1: f32) -> Interval {
        let grid = self.sampler.grid();
        // Radial spacing, from the bounding radius over the radial cells
        let radius = 0.5 * self.sampler.bounding_box().size().x;
        let cells = grid.dimensions()[0].saturating_sub(1).max(1);
        Interval {
            t_range: (t0, t1),
            value_range: self.sampler.accel().value_range(self.attribute),
            nominal_delta_t: radius / cells as f32 / self.direction.norm(),
        }
    }

    pub fn next_interval(&mut self) -> Option<Interval> {
        while self.cursor + 1 < self.crossings.len() {
            let (t0, t1) = (self.crossings[self.cursor], self.crossings[self.cursor + 1]);
            self.cursor += 1;
            if t1 <= t0 {
                continue;
            }

            let interval = if self.sampler.grid().axis_aligned() {
                self.brick_interval(t0, t1)
            } else {
                self.domain_interval(t0, t1)
            };
            if self.selector.selects(&interval.value_range) {
                return Some(interval);
            }
        }
        None
    }
}

impl Iterator for IntervalIterator {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        self.next_interval()
    }
}

/// Bisection steps taken before the final linear estimate of a crossing
const REFINE_STEPS: usize = 12;

/// Where a ray meets an isovalue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t: f32,
    /// The isovalue crossed
    pub value: f32,
}

/// Isovalue crossings along a ray, in increasing `t`.
///
/// Only intervals whose range can hold one of the isovalues are marched,
/// at their nominal step; each sign change is then refined by bisection.
pub struct HitIterator {
    intervals: IntervalIterator,
    values: Vec<f32>,
    time: f32,
    pending: VecDeque<Hit>,
    last_t: f32,
}

impl HitIterator {
    pub fn new(
        sampler: &Sampler,
        origin: &Pt3,
        direction: &Vec3,
        t_range: (f32, f32),
        values: &[f32],
        time: f32,
    ) -> Self {
        let selector = values
            .iter()
            .fold(ValueSelector::new(), |selector, &v| selector.with_value(v));
        Self {
            intervals: IntervalIterator::new(sampler, origin, direction, t_range, selector),
            values: values.to_vec(),
            time,
            pending: VecDeque::new(),
            last_t: f32::NEG_INFINITY,
        }
    }

    /// Find crossings of `attribute` instead of attribute 0
    pub fn with_attribute(mut self, attribute: usize) -> Self {
        self.intervals = self.intervals.with_attribute(attribute);
        self
    }

    fn field(&self, t: f32) -> f32 {
        let intervals = &self.intervals;
        let p = intervals.origin + intervals.direction * t;
        intervals.sampler.sample(&p, intervals.attribute, self.time)
    }

    /// Narrow a bracketing step `[ta, tb]` with field offsets `da`, `db`
    /// of opposite sign
    fn refine(&self, mut ta: f32, mut tb: f32, mut da: f32, mut db: f32, value: f32) -> f32 {
        for _ in 0..REFINE_STEPS {
            let tm = 0.5 * (ta + tb);
            let dm = self.field(tm) - value;
            if dm == 0.0 {
                return tm;
            }
            if (dm < 0.0) == (da < 0.0) {
                ta = tm;
                da = dm;
            } else {
                tb = tm;
                db = dm;
            }
        }
        ta + (tb - ta) * da / (da - db)
    }

    fn march(&self, interval: &Interval) -> Vec<Hit> {
        let (t0, t1) = interval.t_range;
        let steps = ((t1 - t0) / interval.nominal_delta_t).ceil().max(1.0) as usize;
        let dt = (t1 - t0) / steps as f32;

        let mut hits = Vec::new();
        let mut ta = t0;
        let mut fa = self.field(t0);
        for &value in &self.values {
            if fa == value {
                hits.push(Hit { t: t0, value });
            }
        }

        for step in 1..=steps {
            let tb = if step == steps { t1 } else { t0 + dt * step as f32 };
            let fb = self.field(tb);
            for &value in &self.values {
                let (da, db) = (fa - value, fb - value);
                if db == 0.0 {
                    hits.push(Hit { t: tb, value });
                } else if da * db < 0.0 {
                    let t = self.refine(ta, tb, da, db, value);
                    hits.push(Hit { t, value });
                }
            }
            ta = tb;
            fa = fb;
        }

        hits.sort_by(|a, b| a.t.total_cmp(&b.t));
        hits
    }

    pub fn next_hit(&mut self) -> Option<Hit> {
        if self.values.is_empty() {
            return None;
        }
        loop {
            while let Some(hit) = self.pending.pop_front() {
                // A crossing on a shared interval end is found from both sides
                if hit.t > self.last_t {
                    self.last_t = hit.t;
                    return Some(hit);
                }
            }
            let interval = self.intervals.next_interval()?;
            self.pending = self.march(&interval).into();
        }
    }
}

impl Iterator for HitIterator {
    type Item = Hit;

    fn next(&mut self) -> Option<Hit> {
        self.next_hit()
    }
}
