use glam::Vec3;

use crate::core::shape::GjkProxy;
use crate::core::transform::Transform;

const MAX_ITERATIONS: u32 = 20;

/// Indices of the last simplex vertices, kept across frames to seed the
/// next query. Temporal coherence makes most warm queries converge in one
/// or two iterations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexCache {
    pub count: u8,
    pub index_a: [u32; 4],
    pub index_b: [u32; 4],
}

/// Closest points between two convex proxies.
#[derive(Debug, Clone, Copy)]
pub struct GjkOutput {
    /// Closest point on proxy A, world frame.
    pub point_a: Vec3,
    /// Closest point on proxy B, world frame.
    pub point_b: Vec3,
    pub distance: f32,
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimplexVertex {
    /// Support point on A, world frame.
    wa: Vec3,
    /// Support point on B, world frame.
    wb: Vec3,
    /// Minkowski difference `wa - wb`.
    w: Vec3,
    /// Barycentric weight after the last solve.
    weight: f32,
    index_a: u32,
    index_b: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Simplex {
    vertices: [SimplexVertex; 4],
    count: usize,
}

impl Simplex {
    fn read_cache(
        &mut self,
        cache: &SimplexCache,
        xf_a: &Transform,
        proxy_a: &GjkProxy,
        xf_b: &Transform,
        proxy_b: &GjkProxy,
    ) {
        self.count = 0;
        let cached = cache.count as usize;
        if cached == 0 {
            return;
        }
        for i in 0..cached.min(4) {
            let ia = cache.index_a[i];
            let ib = cache.index_b[i];
            if ia >= proxy_a.count() || ib >= proxy_b.count() {
                // Geometry changed under the cache.
                self.count = 0;
                return;
            }
            let wa = xf_a.transform_point(proxy_a.vertex(ia));
            let wb = xf_b.transform_point(proxy_b.vertex(ib));
            self.vertices[i] = SimplexVertex {
                wa,
                wb,
                w: wa - wb,
                weight: 0.0,
                index_a: ia,
                index_b: ib,
            };
            self.count = i + 1;
        }
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.count = self.count as u8;
        for i in 0..self.count {
            cache.index_a[i] = self.vertices[i].index_a;
            cache.index_b[i] = self.vertices[i].index_b;
        }
    }

    fn closest_point(&self) -> Vec3 {
        let mut p = Vec3::ZERO;
        for i in 0..self.count {
            p += self.vertices[i].weight * self.vertices[i].w;
        }
        p
    }

    fn witness_points(&self) -> (Vec3, Vec3) {
        let mut pa = Vec3::ZERO;
        let mut pb = Vec3::ZERO;
        for i in 0..self.count {
            pa += self.vertices[i].weight * self.vertices[i].wa;
            pb += self.vertices[i].weight * self.vertices[i].wb;
        }
        (pa, pb)
    }

    fn solve(&mut self) {
        match self.count {
            1 => self.vertices[0].weight = 1.0,
            2 => self.solve2(),
            3 => self.solve3(),
            4 => self.solve4(),
            _ => unreachable!(),
        }
    }

    fn solve2(&mut self) {
        let a = self.vertices[0].w;
        let b = self.vertices[1].w;
        let e = b - a;
        let t = -a.dot(e);
        if t <= 0.0 {
            self.vertices[0].weight = 1.0;
            self.count = 1;
            return;
        }
        let denom = e.dot(e);
        if t >= denom {
            self.vertices[0] = self.vertices[1];
            self.vertices[0].weight = 1.0;
            self.count = 1;
            return;
        }
        let t = t / denom;
        self.vertices[0].weight = 1.0 - t;
        self.vertices[1].weight = t;
        self.count = 2;
    }

    fn solve3(&mut self) {
        let (weights, kept) = closest_on_triangle(
            self.vertices[0].w,
            self.vertices[1].w,
            self.vertices[2].w,
        );
        self.reduce(&[0, 1, 2], &weights, kept);
    }

    fn solve4(&mut self) {
        let a = self.vertices[0].w;
        let b = self.vertices[1].w;
        let c = self.vertices[2].w;
        let d = self.vertices[3].w;

        // Signed volume tests: the origin is inside when it sits on the
        // interior side of all four faces.
        let outside_abc = same_side_check(a, b, c, d);
        let outside_acd = same_side_check(a, c, d, b);
        let outside_adb = same_side_check(a, d, b, c);
        let outside_bdc = same_side_check(b, d, c, a);

        if !outside_abc && !outside_acd && !outside_adb && !outside_bdc {
            // Enclosed: the proxies overlap. Keep the tetrahedron with
            // uniform weights so witness points stay finite.
            for v in self.vertices.iter_mut() {
                v.weight = 0.25;
            }
            self.count = 4;
            return;
        }

        // Otherwise reduce to the closest face region.
        let mut best_dist = f32::INFINITY;
        let mut best: Option<([usize; 3], [f32; 3], usize)> = None;
        let faces: [([usize; 3], bool); 4] = [
            ([0, 1, 2], outside_abc),
            ([0, 2, 3], outside_acd),
            ([0, 3, 1], outside_adb),
            ([1, 3, 2], outside_bdc),
        ];
        for (indices, outside) in faces {
            if !outside {
                continue;
            }
            let (weights, kept) = closest_on_triangle(
                self.vertices[indices[0]].w,
                self.vertices[indices[1]].w,
                self.vertices[indices[2]].w,
            );
            let mut p = Vec3::ZERO;
            for i in 0..3 {
                p += weights[i] * self.vertices[indices[i]].w;
            }
            let dist = p.length_squared();
            if dist < best_dist {
                best_dist = dist;
                best = Some((indices, weights, kept));
            }
        }

        if let Some((indices, weights, kept)) = best {
            self.reduce(&indices, &weights, kept);
        } else {
            // Degenerate tetrahedron; keep the first vertex.
            self.vertices[0].weight = 1.0;
            self.count = 1;
        }
    }

    /// Compacts the simplex to the vertices with non-zero weight.
    fn reduce(&mut self, indices: &[usize; 3], weights: &[f32; 3], kept_mask: usize) {
        let mut out: [SimplexVertex; 4] = Default::default();
        let mut count = 0;
        for i in 0..3 {
            if kept_mask & (1 << i) != 0 {
                out[count] = self.vertices[indices[i]];
                out[count].weight = weights[i];
                count += 1;
            }
        }
        self.vertices = out;
        self.count = count;
    }

    fn search_direction(&self) -> Vec3 {
        match self.count {
            1 => -self.vertices[0].w,
            2 => {
                let e = self.vertices[1].w - self.vertices[0].w;
                let to_origin = -self.vertices[0].w;
                let d = e.cross(to_origin).cross(e);
                if d.length_squared() > f32::EPSILON {
                    d
                } else {
                    // Origin on the segment line; any perpendicular works.
                    let axis = if e.x.abs() < 0.5 * e.length() {
                        Vec3::X
                    } else {
                        Vec3::Y
                    };
                    e.cross(axis)
                }
            }
            3 => {
                let n = (self.vertices[1].w - self.vertices[0].w)
                    .cross(self.vertices[2].w - self.vertices[0].w);
                if n.dot(self.vertices[0].w) > 0.0 {
                    -n
                } else {
                    n
                }
            }
            _ => Vec3::ZERO,
        }
    }
}

/// Whether the origin lies strictly outside the plane of triangle `abc`,
/// taking `d` as the interior witness.
fn same_side_check(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> bool {
    let n = (b - a).cross(c - a);
    let signed_origin = -a.dot(n);
    let signed_d = (d - a).dot(n);
    signed_origin * signed_d < 0.0
}

/// Barycentric weights of the point on triangle `abc` closest to the
/// origin, plus the bitmask of vertices that remain in the reduced simplex.
fn closest_on_triangle(a: Vec3, b: Vec3, c: Vec3) -> ([f32; 3], usize) {
    let ab = b - a;
    let ac = c - a;
    let ap = -a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ([1.0, 0.0, 0.0], 0b001);
    }

    let bp = -b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return ([0.0, 1.0, 0.0], 0b010);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return ([1.0 - t, t, 0.0], 0b011);
    }

    let cp = -c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return ([0.0, 0.0, 1.0], 0b100);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return ([1.0 - t, 0.0, t], 0b101);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return ([0.0, 1.0 - t, t], 0b110);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    ([1.0 - v - w, v, w], 0b111)
}

/// GJK distance between two convex proxies.
///
/// Returns closest points on each proxy (world frame) and the separation
/// distance; overlapping proxies report zero distance with coincident
/// points. When `use_radius` is set the proxies' skin radii shrink the
/// reported distance and push the witness points onto the skins.
pub fn gjk_distance(
    xf_a: &Transform,
    proxy_a: &GjkProxy,
    xf_b: &Transform,
    proxy_b: &GjkProxy,
    use_radius: bool,
    cache: Option<&mut SimplexCache>,
) -> GjkOutput {
    let mut local_cache = SimplexCache::default();
    let cache_slot = match cache {
        Some(slot) => slot,
        None => &mut local_cache,
    };

    let mut simplex = Simplex::default();
    simplex.read_cache(cache_slot, xf_a, proxy_a, xf_b, proxy_b);

    if simplex.count == 0 {
        let direction = xf_b.position - xf_a.position;
        let direction = if direction.length_squared() > f32::EPSILON {
            direction
        } else {
            Vec3::X
        };
        let ia = proxy_a.support(xf_a.inverse_transform_vector(direction));
        let ib = proxy_b.support(xf_b.inverse_transform_vector(-direction));
        let wa = xf_a.transform_point(proxy_a.vertex(ia));
        let wb = xf_b.transform_point(proxy_b.vertex(ib));
        simplex.vertices[0] = SimplexVertex {
            wa,
            wb,
            w: wa - wb,
            weight: 1.0,
            index_a: ia,
            index_b: ib,
        };
        simplex.count = 1;
    }

    let mut iterations = 0;
    while iterations < MAX_ITERATIONS {
        // Remember the current vertices to detect cycling.
        let saved: Vec<(u32, u32)> = (0..simplex.count)
            .map(|i| (simplex.vertices[i].index_a, simplex.vertices[i].index_b))
            .collect();

        simplex.solve();

        if simplex.count == 4 {
            // Origin enclosed: overlap.
            break;
        }

        let direction = simplex.search_direction();
        if direction.length_squared() < f32::EPSILON * f32::EPSILON {
            // Origin exactly on the simplex boundary; treat as touching.
            break;
        }

        let ia = proxy_a.support(xf_a.inverse_transform_vector(direction));
        let ib = proxy_b.support(xf_b.inverse_transform_vector(-direction));

        iterations += 1;

        if saved.contains(&(ia, ib)) {
            // No progress; the closest feature is found.
            break;
        }

        let wa = xf_a.transform_point(proxy_a.vertex(ia));
        let wb = xf_b.transform_point(proxy_b.vertex(ib));
        let slot = simplex.count;
        simplex.vertices[slot] = SimplexVertex {
            wa,
            wb,
            w: wa - wb,
            weight: 0.0,
            index_a: ia,
            index_b: ib,
        };
        simplex.count += 1;
    }

    // Resolve barycentric weights one final time for witness points.
    simplex.solve();
    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut distance = if simplex.count == 4 {
        0.0
    } else {
        simplex.closest_point().length()
    };

    simplex.write_cache(cache_slot);

    if use_radius {
        let ra = proxy_a.radius;
        let rb = proxy_b.radius;
        if distance > ra + rb && distance > f32::EPSILON {
            let normal = (point_b - point_a) / distance;
            distance -= ra + rb;
            point_a += ra * normal;
            point_b -= rb * normal;
        } else {
            let mid = 0.5 * (point_a + point_b);
            point_a = mid;
            point_b = mid;
            distance = 0.0;
        }
    }

    GjkOutput {
        point_a,
        point_b,
        distance,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::Shape;
    use approx::assert_relative_eq;
    use glam::Quat;

    fn proxy_of(shape: &Shape) -> GjkProxy {
        shape.gjk_proxy(0)
    }

    #[test]
    fn separated_spheres_report_center_distance() {
        let a = Shape::sphere(0.5);
        let b = Shape::sphere(0.5);
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(3.0, 0.0, 0.0));

        let out = gjk_distance(&xf_a, &proxy_of(&a), &xf_b, &proxy_of(&b), true, None);
        assert_relative_eq!(out.distance, 2.0, epsilon = 1e-4);
        assert_relative_eq!(out.point_a.x, 0.5, epsilon = 1e-4);
        assert_relative_eq!(out.point_b.x, 2.5, epsilon = 1e-4);
    }

    #[test]
    fn box_pair_distance_face_to_face() {
        let a = Shape::cuboid(Vec3::splat(0.5));
        let b = Shape::cuboid(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(2.0, 0.0, 0.0));

        let out = gjk_distance(&xf_a, &proxy_of(&a), &xf_b, &proxy_of(&b), false, None);
        assert_relative_eq!(out.distance, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn overlapping_boxes_report_zero() {
        let a = Shape::cuboid(Vec3::splat(0.5));
        let b = Shape::cuboid(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.5, 0.0, 0.0));

        let out = gjk_distance(&xf_a, &proxy_of(&a), &xf_b, &proxy_of(&b), false, None);
        assert_relative_eq!(out.distance, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn query_is_symmetric() {
        let a = Shape::cuboid(Vec3::new(0.5, 0.25, 0.75));
        let b = Shape::sphere(0.3);
        let xf_a = Transform::new(
            Vec3::new(0.2, 1.5, -0.4),
            Quat::from_axis_angle(Vec3::Y, 0.7),
        );
        let xf_b = Transform::from_position(Vec3::new(2.0, 1.0, 1.0));

        let ab = gjk_distance(&xf_a, &proxy_of(&a), &xf_b, &proxy_of(&b), true, None);
        let ba = gjk_distance(&xf_b, &proxy_of(&b), &xf_a, &proxy_of(&a), true, None);
        assert_relative_eq!(ab.distance, ba.distance, epsilon = 1e-3);
    }

    #[test]
    fn cache_seeds_follow_up_queries()
    {
        let a = Shape::cuboid(Vec3::splat(0.5));
        let b = Shape::cuboid(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let mut xf_b = Transform::from_position(Vec3::new(3.0, 0.0, 0.0));

        let mut cache = SimplexCache::default();
        let cold = gjk_distance(
            &xf_a,
            &proxy_of(&a),
            &xf_b,
            &proxy_of(&b),
            false,
            Some(&mut cache),
        );
        assert!(cache.count > 0);

        xf_b.position.x -= 0.01;
        let warm = gjk_distance(
            &xf_a,
            &proxy_of(&a),
            &xf_b,
            &proxy_of(&b),
            false,
            Some(&mut cache),
        );
        assert_relative_eq!(warm.distance, cold.distance - 0.01, epsilon = 1e-4);
        assert!(warm.iterations <= cold.iterations);
    }
}
