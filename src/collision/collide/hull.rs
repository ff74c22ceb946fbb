use glam::Vec3;

use crate::collision::clip::{clip_polygon, reduce_points, ClipVertex, ContactCandidate};
use crate::collision::manifold::{FeatureKey, Manifold, ManifoldPoint};
use crate::collision::sat::{
    edge_pair_separation, face_separation, query_edge_directions, query_face_directions, SatCache,
};
use crate::config;
use crate::core::hull::{HalfEdgeHull, Plane};
use crate::core::transform::Transform;

use super::closest_between_segments;

/// Axis selection hysteresis: faces win ties against edges, and the
/// previous frame's reference face wins against the other hull's.
const AXIS_TOLERANCE: f32 = 0.1 * config::LINEAR_SLOP;

/// Hull–hull SAT with a feature-pair cache.
///
/// The cached axis from the previous frame is retried first; while it
/// still separates the hulls the full face/edge sweeps are skipped
/// entirely. On overlap the axis of greatest separation picks either a
/// reference-face clip or an edge–edge closest-point manifold.
#[allow(clippy::too_many_arguments)]
pub fn collide_hulls(
    manifold: &mut Manifold,
    xf_a: &Transform,
    hull_a: &HalfEdgeHull,
    radius_a: f32,
    xf_b: &Transform,
    hull_b: &HalfEdgeHull,
    radius_b: f32,
    cache: &mut SatCache,
) -> bool {
    manifold.clear();
    let total = radius_a + radius_b;

    // Fast path: the cached separating axis is usually still separating.
    let cached_separation = match *cache {
        SatCache::Empty => None,
        SatCache::FaceA { index, .. } => {
            Some(face_separation(xf_a, hull_a, index, xf_b, hull_b))
        }
        SatCache::FaceB { index, .. } => {
            Some(face_separation(xf_b, hull_b, index, xf_a, hull_a))
        }
        SatCache::Edges { edge_a, edge_b, .. } => {
            edge_pair_separation(xf_a, hull_a, edge_a, xf_b, hull_b, edge_b)
        }
    };
    if let Some(separation) = cached_separation {
        if separation > total + config::LINEAR_SLOP {
            return true;
        }
    }

    let face_a = query_face_directions(xf_a, hull_a, xf_b, hull_b);
    if face_a.separation > total {
        *cache = SatCache::FaceA {
            index: face_a.index,
            separation: face_a.separation,
        };
        return false;
    }

    let face_b = query_face_directions(xf_b, hull_b, xf_a, hull_a);
    if face_b.separation > total {
        *cache = SatCache::FaceB {
            index: face_b.index,
            separation: face_b.separation,
        };
        return false;
    }

    let edges = query_edge_directions(xf_a, hull_a, xf_b, hull_b);
    if edges.separation > total {
        *cache = SatCache::Edges {
            edge_a: edges.edge_a,
            edge_b: edges.edge_b,
            separation: edges.separation,
        };
        return false;
    }

    // All axes overlap: pick the one of least penetration, preferring
    // faces for manifold quality.
    let max_face = face_a.separation.max(face_b.separation);
    if edges.separation > max_face + AXIS_TOLERANCE {
        build_edge_manifold(manifold, xf_a, hull_a, edges.edge_a, xf_b, hull_b, edges.edge_b);
        *cache = SatCache::Edges {
            edge_a: edges.edge_a,
            edge_b: edges.edge_b,
            separation: edges.separation,
        };
        return false;
    }

    if face_b.separation > face_a.separation + AXIS_TOLERANCE {
        build_face_manifold(
            manifold, xf_b, hull_b, face_b.index, xf_a, hull_a, total, true,
        );
        *cache = SatCache::FaceB {
            index: face_b.index,
            separation: face_b.separation,
        };
    } else {
        build_face_manifold(
            manifold, xf_a, hull_a, face_a.index, xf_b, hull_b, total, false,
        );
        *cache = SatCache::FaceA {
            index: face_a.index,
            separation: face_a.separation,
        };
    }
    false
}

/// Clips the incident face of the other hull against the reference face's
/// side planes. `flipped` means the reference hull is shape B, so the
/// manifold normal and point roles swap back to the A→B convention.
#[allow(clippy::too_many_arguments)]
fn build_face_manifold(
    manifold: &mut Manifold,
    xf_ref: &Transform,
    hull_ref: &HalfEdgeHull,
    ref_face: u32,
    xf_inc: &Transform,
    hull_inc: &HalfEdgeHull,
    total: f32,
    flipped: bool,
) {
    let ref_plane_world = hull_ref.planes[ref_face as usize].transformed(xf_ref);
    let ref_normal = ref_plane_world.normal;

    // Incident face: most antiparallel to the reference normal.
    let inc_face = hull_inc.support_face(xf_inc.inverse_transform_vector(-ref_normal));
    let inc_polygon = hull_inc.face_vertices(inc_face);

    let mut polygon: Vec<ClipVertex> = inc_polygon
        .iter()
        .enumerate()
        .map(|(i, v)| ClipVertex {
            point: xf_inc.transform_point(*v),
            id: (inc_face << 8) | i as u32,
        })
        .collect();

    // Side planes through the reference face boundary.
    let ref_polygon = hull_ref.face_vertices(ref_face);
    for i in 0..ref_polygon.len() {
        let a = xf_ref.transform_point(ref_polygon[i]);
        let b = xf_ref.transform_point(ref_polygon[(i + 1) % ref_polygon.len()]);
        let side_normal = (b - a).cross(ref_normal).normalize_or_zero();
        polygon = clip_polygon(&polygon, &Plane::new(side_normal, a), i as u32);
        if polygon.is_empty() {
            return;
        }
    }

    let mut candidates: Vec<ContactCandidate> = Vec::with_capacity(polygon.len());
    for vertex in polygon {
        let separation = ref_plane_world.distance(vertex.point);
        if separation <= total {
            candidates.push(ContactCandidate {
                point: vertex.point,
                depth: -separation,
                id: vertex.id,
            });
        }
    }
    if candidates.is_empty() {
        return;
    }

    let reduced = if candidates.len() > config::MAX_MANIFOLD_POINTS {
        reduce_points(&candidates, ref_normal)
    } else {
        candidates
    };

    // World normal must point from A to B.
    let normal = if flipped { -ref_normal } else { ref_normal };
    let (xf_a, xf_b) = if flipped {
        (xf_inc, xf_ref)
    } else {
        (xf_ref, xf_inc)
    };
    manifold.local_normal = xf_a.inverse_transform_vector(normal);

    for candidate in reduced {
        // Point on the reference surface and on the incident surface.
        let on_ref = candidate.point + candidate.depth * ref_normal;
        let (world_a, world_b) = if flipped {
            (candidate.point, on_ref)
        } else {
            (on_ref, candidate.point)
        };
        let key = if flipped {
            FeatureKey::new(candidate.id, ref_face)
        } else {
            FeatureKey::new(ref_face, candidate.id)
        };
        if manifold.points.try_push(ManifoldPoint::new(
            xf_a.inverse_transform_point(world_a),
            xf_b.inverse_transform_point(world_b),
            key,
        )).is_err()
        {
            break;
        }
    }
}

/// Closest points between the two witness edges.
#[allow(clippy::too_many_arguments)]
fn build_edge_manifold(
    manifold: &mut Manifold,
    xf_a: &Transform,
    hull_a: &HalfEdgeHull,
    edge_a: u32,
    xf_b: &Transform,
    hull_b: &HalfEdgeHull,
    edge_b: u32,
) {
    let (a1, a2) = hull_a.edge_segment(edge_a);
    let (b1, b2) = hull_b.edge_segment(edge_b);
    let pa1 = xf_a.transform_point(a1);
    let pa2 = xf_a.transform_point(a2);
    let pb1 = xf_b.transform_point(b1);
    let pb2 = xf_b.transform_point(b2);

    let (on_a, on_b, _, _) = closest_between_segments(pa1, pa2, pb1, pb2);

    let mut normal = (pa2 - pa1).cross(pb2 - pb1).normalize_or_zero();
    if normal.length_squared() < 0.5 {
        // Parallel edges should have been a face case; bail out.
        log::trace!("degenerate edge pair {edge_a}/{edge_b}");
        return;
    }
    // Orient from A to B using the hull centroids.
    let centroid_a = xf_a.transform_point(hull_a.centroid);
    if normal.dot(on_a - centroid_a) < 0.0 {
        normal = -normal;
    }

    manifold.local_normal = xf_a.inverse_transform_vector(normal);
    manifold.points.push(ManifoldPoint::new(
        xf_a.inverse_transform_point(on_a),
        xf_b.inverse_transform_point(on_b),
        FeatureKey::new(edge_a, edge_b),
    ));
}

/// Triangle–hull: the triangle runs through the hull SAT path as a
/// degenerate two-face hull, sharing the feature cache layout.
#[allow(clippy::too_many_arguments)]
pub fn collide_triangle_hull(
    manifold: &mut Manifold,
    xf_a: &Transform,
    v1: Vec3,
    v2: Vec3,
    v3: Vec3,
    radius_a: f32,
    xf_b: &Transform,
    hull_b: &HalfEdgeHull,
    radius_b: f32,
    cache: &mut SatCache,
) {
    let triangle = HalfEdgeHull::new_triangle(v1, v2, v3);
    collide_hulls(
        manifold, xf_a, &triangle, radius_a, xf_b, hull_b, radius_b, cache,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    #[test]
    fn stacked_boxes_make_four_points() {
        let a = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let b = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.0, 0.99, 0.0));

        let mut m = Manifold::default();
        let mut cache = SatCache::default();
        collide_hulls(&mut m, &xf_a, &a, 0.0, &xf_b, &b, 0.0, &mut cache);

        assert_eq!(m.points.len(), 4);
        assert_relative_eq!(m.local_normal.y, 1.0, epsilon = 1e-4);
        assert!(matches!(cache, SatCache::FaceA { .. } | SatCache::FaceB { .. }));
    }

    #[test]
    fn separated_boxes_cache_the_axis() {
        let a = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let b = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(3.0, 0.0, 0.0));

        let mut m = Manifold::default();
        let mut cache = SatCache::default();
        let from_cache = collide_hulls(&mut m, &xf_a, &a, 0.0, &xf_b, &b, 0.0, &mut cache);
        assert!(!from_cache);
        assert!(m.points.is_empty());
        assert!(!matches!(cache, SatCache::Empty));

        // Second query hits the cached axis.
        let from_cache = collide_hulls(&mut m, &xf_a, &a, 0.0, &xf_b, &b, 0.0, &mut cache);
        assert!(from_cache);
    }

    #[test]
    fn crossed_edges_make_edge_contact() {
        let a = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let b = HalfEdgeHull::new_box(Vec3::splat(0.5));
        // Box B rotated 45° about z and x, overlapping corner to corner.
        let xf_a = Transform::IDENTITY;
        let q = Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_4)
            * Quat::from_axis_angle(Vec3::X, std::f32::consts::FRAC_PI_4);
        let xf_b = Transform::new(Vec3::new(1.15, 0.0, 0.0), q);

        let mut m = Manifold::default();
        let mut cache = SatCache::default();
        collide_hulls(&mut m, &xf_a, &a, 0.0, &xf_b, &b, 0.0, &mut cache);

        if let SatCache::Edges { .. } = cache {
            assert_eq!(m.points.len(), 1);
            assert!(m.local_normal.x > 0.5);
        } else {
            // A face axis may win within tolerance; still expect points.
            assert!(!m.points.is_empty());
        }
    }

    #[test]
    fn offset_stack_clips_to_overlap_region() {
        let a = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let b = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.6, 0.95, 0.0));

        let mut m = Manifold::default();
        let mut cache = SatCache::default();
        collide_hulls(&mut m, &xf_a, &a, 0.0, &xf_b, &b, 0.0, &mut cache);

        assert!(!m.points.is_empty());
        // All contact points lie in the x-overlap band.
        for p in &m.points {
            assert!(p.local_point_a.x >= 0.05 && p.local_point_a.x <= 0.55);
        }
    }

    #[test]
    fn triangle_hull_face_contact() {
        let hull = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.0, 0.45, 0.0));

        let mut m = Manifold::default();
        let mut cache = SatCache::default();
        collide_triangle_hull(
            &mut m,
            &xf_a,
            Vec3::new(-2.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(0.0, 0.0, -2.0),
            0.0,
            &xf_b,
            &hull,
            0.0,
            &mut cache,
        );

        assert!(!m.points.is_empty());
        // Normal points from the triangle up into the box.
        assert!(m.local_normal.y > 0.9);
    }
}
