use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box used by the BVH and by box-shaped primitives.
///
/// An AABB is three intervals, one per axis. The empty box (all intervals
/// empty) is valid and is the identity for [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

/// Result of a ray/box slab test.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SlabHit {
    /// Parameter where the ray enters the box (negative if the origin is inside).
    pub t_min: f32,
    /// Parameter where the ray leaves the box.
    pub t_max: f32,
}

impl SlabHit {
    /// The ray origin lies inside the box.
    #[inline]
    pub fn inside(&self) -> bool {
        self.t_min < 0.0 && self.t_max > 0.0
    }
}

/// Thin boxes are padded to at least this extent per axis.
const MIN_EXTENT: f32 = 0.0001;

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };

    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB from two corner points (in any order).
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let lo = a.min(b);
        let hi = a.max(b);
        Self::new(
            Interval::new(lo.x, hi.x),
            Interval::new(lo.y, hi.y),
            Interval::new(lo.z, hi.z),
        )
    }

    /// Box centred on the origin with the given full extent per axis.
    pub fn centered(size: Vec3) -> Self {
        Self::from_points(-size * 0.5, size * 0.5)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    fn axis_interval_mut(&mut self, n: usize) -> &mut Interval {
        match n {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Extent per axis, zero for empty boxes.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max() - self.min()
        }
    }

    /// Surface area. Used as a cheap split heuristic, zero for empty boxes.
    pub fn area(&self) -> f32 {
        let d = self.size();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Volume, zero for empty boxes.
    pub fn volume(&self) -> f32 {
        let d = self.size();
        d.x * d.y * d.z
    }

    /// Slab test against the ray's full line, ignoring the ray interval.
    ///
    /// Returns `None` when the line misses the box.
    #[inline]
    pub fn slab(&self, r: &Ray) -> Option<SlabHit> {
        let t1 = (self.min() - r.origin) * r.inv_direction;
        let t2 = (self.max() - r.origin) * r.inv_direction;

        let t_min = t1.min(t2).max_element();
        let t_max = t1.max(t2).min_element();

        (t_min < t_max).then_some(SlabHit { t_min, t_max })
    }

    /// Test if a ray intersects this AABB within the ray's valid interval.
    #[inline]
    pub fn hit(&self, r: &Ray) -> bool {
        self.hit_distance(r) >= 0.0
    }

    /// Lower bound of the ray parameter at which the ray can touch the box.
    ///
    /// Returns a non-negative value on a hit (zero when the origin is inside)
    /// or `-1.0` when the box is missed or lies outside the ray's interval.
    #[inline]
    pub fn hit_distance(&self, r: &Ray) -> f32 {
        match self.slab(r) {
            Some(slab) if slab.t_max >= r.interval.min && slab.t_min <= r.interval.max => {
                slab.t_min.max(0.0)
            }
            _ => -1.0,
        }
    }

    /// Box/box overlap test (touching boxes overlap).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x.min <= other.x.max
            && self.x.max >= other.x.min
            && self.y.min <= other.y.max
            && self.y.max >= other.y.min
            && self.z.min <= other.z.max
            && self.z.max >= other.z.min
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Whether `other` lies completely inside this box.
    pub fn contains_box(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.contains_point(other.min()) && self.contains_point(other.max()))
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        if self.is_empty() {
            return;
        }
        for axis in 0..3 {
            let interval = self.axis_interval_mut(axis);
            if interval.size() < MIN_EXTENT {
                *interval = interval.expand(MIN_EXTENT);
            }
        }
    }

    /// Translate (move) the AABB by an offset vector.
    pub fn translate(&self, offset: Vec3) -> Aabb {
        Aabb::from_points(self.min() + offset, self.max() + offset)
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let d = self.size();

        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Split the box in half along its longest axis.
    pub fn split(&self) -> (Aabb, Aabb) {
        let axis = self.longest_axis();
        let mid = self.axis_interval(axis).center();

        let mut left = *self;
        let mut right = *self;
        left.axis_interval_mut(axis).max = mid;
        right.axis_interval_mut(axis).min = mid;
        (left, right)
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(self.x.center(), self.y.center(), self.z.center())
    }

    /// The 8 corner points.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl FromIterator<Aabb> for Aabb {
    fn from_iter<I: IntoIterator<Item = Aabb>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, &b))
    }
}
