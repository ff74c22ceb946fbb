//! Narrow-phase contact generation for every shape pair.
//!
//! One routine per ordered pair; the dispatch table in
//! [`crate::dynamics::contact`] swaps shapes so each routine only sees its
//! canonical order. All routines write manifolds whose local points lie on
//! the core geometry; skin radii are applied by the world-manifold
//! projection and the solver.

mod capsule;
mod hull;
mod sphere;

pub use capsule::{collide_capsules, collide_hull_capsule, collide_triangle_capsule};
pub use hull::{collide_hulls, collide_triangle_hull};
pub use sphere::{
    collide_capsule_sphere, collide_hull_sphere, collide_spheres, collide_triangle_sphere,
};

use glam::Vec3;

use super::gjk::SimplexCache;
use super::sat::SatCache;

/// Per-contact caches shared by GJK and SAT between frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvexCache {
    pub simplex: SimplexCache,
    pub sat: SatCache,
}

/// Closest point on segment `[a, b]` to `p`, with its parameter.
pub(crate) fn closest_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let denom = ab.length_squared();
    if denom < f32::EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / denom).clamp(0.0, 1.0);
    (a + t * ab, t)
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`.
/// Returns (point on 1, point on 2, s, t).
pub(crate) fn closest_between_segments(
    p1: Vec3,
    q1: Vec3,
    p2: Vec3,
    q2: Vec3,
) -> (Vec3, Vec3, f32, f32) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    let (mut s, mut t);
    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2, 0.0, 0.0);
    }
    if a <= f32::EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            s = if denom > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
        }
    }

    (p1 + s * d1, p2 + t * d2, s, t)
}

/// Unit normal of a triangle with CCW winding.
pub(crate) fn triangle_normal(v1: Vec3, v2: Vec3, v3: Vec3) -> Vec3 {
    (v2 - v1).cross(v3 - v1).normalize_or_zero()
}

/// Feature region of the closest point on a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TriangleRegion {
    Vertex(usize),
    Edge(usize),
    Face,
}

/// Closest point on triangle `(v1, v2, v3)` to `p`, with its Voronoi
/// region. Edges are numbered by their first vertex: edge i runs
/// `v[i] → v[(i + 1) % 3]`.
pub(crate) fn closest_on_triangle(
    p: Vec3,
    v1: Vec3,
    v2: Vec3,
    v3: Vec3,
) -> (Vec3, TriangleRegion) {
    let ab = v2 - v1;
    let ac = v3 - v1;
    let ap = p - v1;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (v1, TriangleRegion::Vertex(0));
    }

    let bp = p - v2;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (v2, TriangleRegion::Vertex(1));
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return (v1 + t * ab, TriangleRegion::Edge(0));
    }

    let cp = p - v3;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (v3, TriangleRegion::Vertex(2));
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return (v1 + t * ac, TriangleRegion::Edge(2));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (v2 + t * (v3 - v2), TriangleRegion::Edge(1));
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (v1 + ab * v + ac * w, TriangleRegion::Face)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn segment_closest_point_clamps() {
        let (p, t) = closest_on_segment(Vec3::new(5.0, 1.0, 0.0), Vec3::ZERO, Vec3::X);
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(t, 1.0);
    }

    #[test]
    fn segment_pair_parallel_is_stable() {
        let (a, b, _, _) = closest_between_segments(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.5, 1.0, 0.0),
            Vec3::new(2.5, 1.0, 0.0),
        );
        assert_relative_eq!((a - b).length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn triangle_regions_classify() {
        let v1 = Vec3::ZERO;
        let v2 = Vec3::new(2.0, 0.0, 0.0);
        let v3 = Vec3::new(0.0, 0.0, 2.0);

        let (_, region) = closest_on_triangle(Vec3::new(0.5, 1.0, 0.5), v1, v2, v3);
        assert_eq!(region, TriangleRegion::Face);

        let (p, region) = closest_on_triangle(Vec3::new(1.0, 1.0, -3.0), v1, v2, v3);
        assert_eq!(region, TriangleRegion::Edge(0));
        assert_relative_eq!(p.z, 0.0);

        let (_, region) = closest_on_triangle(Vec3::new(-1.0, 0.0, -1.0), v1, v2, v3);
        assert_eq!(region, TriangleRegion::Vertex(0));
    }
}
