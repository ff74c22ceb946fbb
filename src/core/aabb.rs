use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &p in points {
            bounds.min = bounds.min.min(p);
            bounds.max = bounds.max.max(p);
        }
        bounds
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    pub fn extents(&self) -> Vec3 {
        0.5 * (self.max - self.min)
    }

    /// Surface area, the cost metric for tree insertion.
    pub fn surface_area(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    pub fn combine(a: &Aabb, b: &Aabb) -> Aabb {
        Aabb {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    pub fn combine_with(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
            && other.max.z <= self.max.z
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.min.y <= other.max.y
            && self.min.z <= other.max.z
            && other.min.x <= self.max.x
            && other.min.y <= self.max.y
            && other.min.z <= self.max.z
    }

    /// Grows the box by `amount` on every side.
    pub fn extend(&mut self, amount: f32) {
        let r = Vec3::splat(amount);
        self.min -= r;
        self.max += r;
    }

    pub fn extended(&self, amount: f32) -> Aabb {
        let mut out = *self;
        out.extend(amount);
        out
    }

    /// Grows the box along the direction of `displacement` only.
    pub fn extend_towards(&mut self, displacement: Vec3) {
        if displacement.x < 0.0 {
            self.min.x += displacement.x;
        } else {
            self.max.x += displacement.x;
        }
        if displacement.y < 0.0 {
            self.min.y += displacement.y;
        } else {
            self.max.y += displacement.y;
        }
        if displacement.z < 0.0 {
            self.min.z += displacement.z;
        } else {
            self.max.z += displacement.z;
        }
    }

    /// Component-wise scale. Negative factors swap the bounds.
    pub fn scale(&mut self, factor: Vec3) {
        let a = self.min * factor;
        let b = self.max * factor;
        self.min = a.min(b);
        self.max = a.max(b);
    }

    /// Slab test against the segment `p1 → p2`, clipped to `max_fraction`.
    /// Returns the entry fraction when the segment touches the box.
    pub fn ray_cast(&self, p1: Vec3, p2: Vec3, max_fraction: f32) -> Option<f32> {
        let d = p2 - p1;
        let mut t_min = 0.0_f32;
        let mut t_max = max_fraction;

        for axis in 0..3 {
            let origin = p1[axis];
            let dir = d[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_encloses_both() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(-2.0), Vec3::splat(-1.0));
        let c = Aabb::combine(&a, &b);
        assert!(c.contains(&a));
        assert!(c.contains(&b));
    }

    #[test]
    fn overlap_is_symmetric_and_tight() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let touching = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let apart = Aabb::new(Vec3::new(1.1, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&apart));
    }

    #[test]
    fn ray_cast_hits_front_face() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let t = b
            .ray_cast(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0), 1.0)
            .unwrap();
        assert!((t - 0.4).abs() < 1e-5);

        assert!(b
            .ray_cast(Vec3::new(-5.0, 2.0, 0.0), Vec3::new(5.0, 2.0, 0.0), 1.0)
            .is_none());
    }

    #[test]
    fn extend_towards_grows_one_side() {
        let mut b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        b.extend_towards(Vec3::new(-2.0, 3.0, 0.0));
        assert_eq!(b.min.x, -2.0);
        assert_eq!(b.max.x, 1.0);
        assert_eq!(b.max.y, 4.0);
    }
}
