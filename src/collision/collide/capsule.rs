use std::sync::Arc;

use glam::Vec3;

use crate::collision::clip::{clip_segment, ClipVertex};
use crate::collision::gjk::gjk_distance;
use crate::collision::manifold::{FeatureKey, Manifold, ManifoldPoint};
use crate::core::hull::{HalfEdgeHull, Plane};
use crate::core::shape::GjkProxy;
use crate::core::transform::Transform;

use super::{closest_between_segments, closest_on_segment, closest_on_triangle, triangle_normal, TriangleRegion};

const PARALLEL_TOLERANCE: f32 = 0.005;

/// Capsule–capsule: closest points between the two core segments; nearly
/// parallel capsules get a two-point manifold spanning their overlap.
#[allow(clippy::too_many_arguments)]
pub fn collide_capsules(
    manifold: &mut Manifold,
    xf_a: &Transform,
    a1: Vec3,
    a2: Vec3,
    radius_a: f32,
    xf_b: &Transform,
    b1: Vec3,
    b2: Vec3,
    radius_b: f32,
) {
    manifold.clear();

    let pa1 = xf_a.transform_point(a1);
    let pa2 = xf_a.transform_point(a2);
    let pb1 = xf_b.transform_point(b1);
    let pb2 = xf_b.transform_point(b2);

    let (ca, cb, _, _) = closest_between_segments(pa1, pa2, pb1, pb2);
    let d = cb - ca;
    let total = radius_a + radius_b;
    if d.length_squared() > total * total {
        return;
    }

    let dir_a = pa2 - pa1;
    let dir_b = pb2 - pb1;
    let len_a = dir_a.length();
    let len_b = dir_b.length();

    if len_a > f32::EPSILON && len_b > f32::EPSILON {
        let axis_a = dir_a / len_a;
        let axis_b = dir_b / len_b;
        let parallel = axis_a.cross(axis_b).length() < PARALLEL_TOLERANCE;

        if parallel {
            // Project B's endpoints onto A's span and keep the overlap.
            let t1 = (pb1 - pa1).dot(axis_a);
            let t2 = (pb2 - pa1).dot(axis_a);
            let lo = t1.min(t2).max(0.0);
            let hi = t1.max(t2).min(len_a);
            if hi - lo > f32::EPSILON {
                let perp = {
                    let r = (pb1 - pa1) - axis_a * (pb1 - pa1).dot(axis_a);
                    let len = r.length();
                    if len > f32::EPSILON {
                        r / len
                    } else {
                        axis_a.any_orthonormal_vector()
                    }
                };
                manifold.local_normal = xf_a.inverse_transform_vector(perp);
                for (i, t) in [lo, hi].into_iter().enumerate() {
                    let on_a = pa1 + t * axis_a;
                    let (on_b, _) = closest_on_segment(on_a, pb1, pb2);
                    manifold.points.push(ManifoldPoint::new(
                        xf_a.inverse_transform_point(on_a),
                        xf_b.inverse_transform_point(on_b),
                        FeatureKey::new(i as u32, i as u32),
                    ));
                }
                return;
            }
        }
    }

    let distance = d.length();
    let normal = if distance > f32::EPSILON {
        d / distance
    } else {
        dir_a.cross(cb - pa1).normalize_or_zero()
    };
    let normal = if normal.length_squared() > 0.5 {
        normal
    } else {
        Vec3::Y
    };

    manifold.local_normal = xf_a.inverse_transform_vector(normal);
    manifold.points.push(ManifoldPoint::new(
        xf_a.inverse_transform_point(ca),
        xf_b.inverse_transform_point(cb),
        FeatureKey::new(2, 2),
    ));
}

/// Hull–capsule: GJK for the separated case, face clipping of the capsule
/// segment when deep or resting flat on a face.
pub fn collide_hull_capsule(
    manifold: &mut Manifold,
    xf_a: &Transform,
    hull: &Arc<HalfEdgeHull>,
    radius_a: f32,
    xf_b: &Transform,
    b1: Vec3,
    b2: Vec3,
    radius_b: f32,
) {
    manifold.clear();
    let total = radius_a + radius_b;

    // Capsule segment in hull-local coordinates.
    let q1 = xf_a.inverse_transform_point(xf_b.transform_point(b1));
    let q2 = xf_a.inverse_transform_point(xf_b.transform_point(b2));

    let segment_proxy = GjkProxy::from_points(&[q1, q2], 0.0);
    let hull_proxy = GjkProxy::from_hull(hull.clone(), 0.0);
    let identity = Transform::IDENTITY;
    let query = gjk_distance(&identity, &hull_proxy, &identity, &segment_proxy, false, None);

    if query.distance > total {
        return;
    }

    if query.distance > 10.0 * f32::EPSILON {
        // Shallow: witness points decide the normal.
        let normal = (query.point_b - query.point_a) / query.distance;

        // Capsule lying on a face produces a line contact; detect it by
        // comparing the segment axis against the supporting face.
        let face = hull.support_face(normal);
        let face_normal = hull.planes[face as usize].normal;
        let axis = (q2 - q1).normalize_or_zero();
        if face_normal.dot(normal) > 0.999 && axis.dot(face_normal).abs() < 0.05 {
            if clip_segment_to_face(manifold, hull, face, q1, q2, total, xf_a, xf_b) {
                return;
            }
        }

        manifold.local_normal = normal;
        manifold.points.push(ManifoldPoint::new(
            query.point_a,
            xf_b.inverse_transform_point(xf_a.transform_point(query.point_b)),
            FeatureKey::new(face, 2),
        ));
        return;
    }

    // Deep: reference face is the one the segment penetrates least.
    let mut best_face = 0u32;
    let mut best_separation = f32::NEG_INFINITY;
    for (i, plane) in hull.planes.iter().enumerate() {
        let separation = plane.distance(q1).min(plane.distance(q2));
        if separation > best_separation {
            best_separation = separation;
            best_face = i as u32;
        }
    }
    clip_segment_to_face(manifold, hull, best_face, q1, q2, total, xf_a, xf_b);
}

/// Clips the capsule segment against the side planes of a reference face
/// and emits the points still within `total` of the face plane.
#[allow(clippy::too_many_arguments)]
fn clip_segment_to_face(
    manifold: &mut Manifold,
    hull: &HalfEdgeHull,
    face: u32,
    q1: Vec3,
    q2: Vec3,
    total: f32,
    xf_a: &Transform,
    xf_b: &Transform,
) -> bool {
    let plane = hull.planes[face as usize];
    let polygon = hull.face_vertices(face);

    let mut segment = [
        ClipVertex { point: q1, id: 0 },
        ClipVertex { point: q2, id: 1 },
    ];
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        let side_normal = (b - a).cross(plane.normal).normalize_or_zero();
        let side = Plane::new(side_normal, a);
        match clip_segment(&segment, &side, i as u32) {
            Some(clipped) => segment = clipped,
            None => return false,
        }
    }

    let mut any = false;
    for vertex in segment {
        let separation = plane.distance(vertex.point);
        if separation > total {
            continue;
        }
        let on_face = vertex.point - separation * plane.normal;
        manifold.points.push(ManifoldPoint::new(
            on_face,
            xf_b.inverse_transform_point(xf_a.transform_point(vertex.point)),
            FeatureKey::new(face, vertex.id),
        ));
        any = true;
    }
    if any {
        manifold.local_normal = plane.normal;
    }
    any
}

/// Triangle–capsule: closest features between the segment and the face,
/// with the same wing-vertex silhouette rules as the sphere routine and a
/// two-point manifold when the capsule lies along the face.
#[allow(clippy::too_many_arguments)]
pub fn collide_triangle_capsule(
    manifold: &mut Manifold,
    xf_a: &Transform,
    v1: Vec3,
    v2: Vec3,
    v3: Vec3,
    wings: [Option<Vec3>; 3],
    radius_a: f32,
    xf_b: &Transform,
    b1: Vec3,
    b2: Vec3,
    radius_b: f32,
) {
    manifold.clear();
    let total = radius_a + radius_b;

    // Segment in triangle-local coordinates.
    let q1 = xf_a.inverse_transform_point(xf_b.transform_point(b1));
    let q2 = xf_a.inverse_transform_point(xf_b.transform_point(b2));

    // Closest pair over endpoint-face and edge-edge candidates.
    let mut best: Option<(Vec3, Vec3, f32)> = None;
    let mut consider = |on_tri: Vec3, on_seg: Vec3| {
        let dist = (on_seg - on_tri).length_squared();
        if best.map(|(_, _, d)| dist < d).unwrap_or(true) {
            best = Some((on_tri, on_seg, dist));
        }
    };

    for q in [q1, q2] {
        let (p, _) = closest_on_triangle(q, v1, v2, v3);
        consider(p, q);
    }
    let verts = [v1, v2, v3];
    for i in 0..3 {
        let (on_edge, on_seg, _, _) =
            closest_between_segments(verts[i], verts[(i + 1) % 3], q1, q2);
        consider(on_edge, on_seg);
    }

    let (on_tri, on_seg, dist_sq) = best.unwrap();
    if dist_sq > total * total {
        return;
    }

    let face_normal = triangle_normal(v1, v2, v3);
    let (_, region) = closest_on_triangle(on_seg, v1, v2, v3);

    // Wing silhouette: an internal edge must not own the contact.
    let edge_accepts = |edge: usize| -> bool {
        match wings[edge] {
            None => true,
            Some(wing) => {
                let a = verts[edge];
                let b = verts[(edge + 1) % 3];
                let neighbor_normal = triangle_normal(b, a, wing);
                (on_seg - b).dot(neighbor_normal) > 0.0
            }
        }
    };
    let accepted = match region {
        TriangleRegion::Face => true,
        TriangleRegion::Edge(edge) => edge_accepts(edge),
        TriangleRegion::Vertex(v) => edge_accepts(v) && edge_accepts((v + 2) % 3),
    };
    if !accepted {
        return;
    }

    let axis = (q2 - q1).normalize_or_zero();
    let lying_flat = axis.dot(face_normal).abs() < 0.05 && region == TriangleRegion::Face;

    if lying_flat {
        // Clip the segment against the triangle's edge side planes.
        let centroid = (v1 + v2 + v3) / 3.0;
        let mut segment = [
            ClipVertex { point: q1, id: 0 },
            ClipVertex { point: q2, id: 1 },
        ];
        let mut ok = true;
        for i in 0..3 {
            let a = verts[i];
            let b = verts[(i + 1) % 3];
            let mut side_normal = (b - a).cross(face_normal).normalize_or_zero();
            if side_normal.dot(centroid - a) > 0.0 {
                side_normal = -side_normal;
            }
            match clip_segment(&segment, &Plane::new(side_normal, a), i as u32) {
                Some(clipped) => segment = clipped,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            let side = if (q1 - v1).dot(face_normal) >= 0.0 {
                face_normal
            } else {
                -face_normal
            };
            let mut any = false;
            for vertex in segment {
                let separation = (vertex.point - v1).dot(side);
                if separation > total {
                    continue;
                }
                let on_face = vertex.point - separation * side;
                manifold.points.push(ManifoldPoint::new(
                    on_face,
                    xf_b.inverse_transform_point(xf_a.transform_point(vertex.point)),
                    FeatureKey::new(8, vertex.id),
                ));
                any = true;
            }
            if any {
                manifold.local_normal = side;
                return;
            }
        }
    }

    let distance = dist_sq.sqrt();
    let normal = if distance > f32::EPSILON {
        (on_seg - on_tri) / distance
    } else if (on_seg - v1).dot(face_normal) >= 0.0 {
        face_normal
    } else {
        -face_normal
    };

    let key_a = match region {
        TriangleRegion::Face => 0,
        TriangleRegion::Edge(edge) => 1 + edge as u32,
        TriangleRegion::Vertex(v) => 4 + v as u32,
    };

    manifold.local_normal = normal;
    manifold.points.push(ManifoldPoint::new(
        on_tri,
        xf_b.inverse_transform_point(xf_a.transform_point(on_seg)),
        FeatureKey::new(key_a, 2),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parallel_capsules_make_two_points() {
        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.0, 0.5, 0.0));
        collide_capsules(
            &mut m,
            &xf_a,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            0.3,
            &xf_b,
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(1.5, 0.0, 0.0),
            0.3,
        );
        assert_eq!(m.points.len(), 2);
        assert_relative_eq!(m.local_normal.y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn crossed_capsules_make_one_point() {
        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.0, 0.5, 0.0));
        collide_capsules(
            &mut m,
            &xf_a,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            0.3,
            &xf_b,
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.3,
        );
        assert_eq!(m.points.len(), 1);
        assert_relative_eq!(m.local_normal.y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn capsule_resting_on_box_face_makes_line_contact() {
        let hull = Arc::new(HalfEdgeHull::new_box(Vec3::new(2.0, 0.5, 2.0)));
        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.0, 0.75, 0.0));
        collide_hull_capsule(
            &mut m,
            &xf_a,
            &hull,
            0.0,
            &xf_b,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            0.3,
        );
        assert_eq!(m.points.len(), 2);
        assert_relative_eq!(m.local_normal.y, 1.0, epsilon = 1e-3);
        for p in &m.points {
            assert_relative_eq!(p.local_point_a.y, 0.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn capsule_flat_on_triangle_makes_line_contact() {
        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.5, 0.25, 0.5));
        collide_triangle_capsule(
            &mut m,
            &xf_a,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 0.0),
            [None, None, None],
            0.0,
            &xf_b,
            Vec3::new(-0.3, 0.0, 0.0),
            Vec3::new(0.3, 0.0, 0.0),
            0.3,
        );
        assert_eq!(m.points.len(), 2);
        assert!(m.local_normal.y > 0.99);
    }
}
