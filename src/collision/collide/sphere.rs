use glam::Vec3;

use crate::collision::manifold::{FeatureKey, Manifold, ManifoldPoint};
use crate::core::hull::HalfEdgeHull;
use crate::core::transform::Transform;

use super::{closest_on_segment, closest_on_triangle, triangle_normal, TriangleRegion};

/// Sphere–sphere: analytic circle test on the center distance.
pub fn collide_spheres(
    manifold: &mut Manifold,
    xf_a: &Transform,
    center_a: Vec3,
    radius_a: f32,
    xf_b: &Transform,
    center_b: Vec3,
    radius_b: f32,
) {
    manifold.clear();

    let ca = xf_a.transform_point(center_a);
    let cb = xf_b.transform_point(center_b);
    let d = cb - ca;
    let distance_sq = d.length_squared();
    let total = radius_a + radius_b;
    if distance_sq > total * total {
        return;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > f32::EPSILON {
        d / distance
    } else {
        Vec3::Y
    };

    manifold.local_normal = xf_a.inverse_transform_vector(normal);
    manifold
        .points
        .push(ManifoldPoint::new(center_a, center_b, FeatureKey::new(0, 0)));
}

/// Capsule–sphere: closest point on the capsule segment to the center.
pub fn collide_capsule_sphere(
    manifold: &mut Manifold,
    xf_a: &Transform,
    point1: Vec3,
    point2: Vec3,
    radius_a: f32,
    xf_b: &Transform,
    center_b: Vec3,
    radius_b: f32,
) {
    manifold.clear();

    let cb = xf_b.transform_point(center_b);
    let p1 = xf_a.transform_point(point1);
    let p2 = xf_a.transform_point(point2);
    let (on_segment, t) = closest_on_segment(cb, p1, p2);

    let d = cb - on_segment;
    let distance_sq = d.length_squared();
    let total = radius_a + radius_b;
    if distance_sq > total * total {
        return;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > f32::EPSILON {
        d / distance
    } else {
        // Center on the axis; push out sideways.
        let side = (p2 - p1).cross(Vec3::Y);
        if side.length_squared() > f32::EPSILON {
            side.normalize()
        } else {
            Vec3::X
        }
    };

    // Stable key by segment region.
    let key_a = if t <= 0.0 {
        0
    } else if t >= 1.0 {
        1
    } else {
        2
    };

    manifold.local_normal = xf_a.inverse_transform_vector(normal);
    manifold.points.push(ManifoldPoint::new(
        xf_a.inverse_transform_point(on_segment),
        center_b,
        FeatureKey::new(key_a, 0),
    ));
}

/// Triangle–sphere with concavity-aware edge classification: a candidate
/// edge or vertex normal is dropped when the wing vertex across that edge
/// says the sphere actually rests on the neighboring face (internal edge
/// silhouette).
#[allow(clippy::too_many_arguments)]
pub fn collide_triangle_sphere(
    manifold: &mut Manifold,
    xf_a: &Transform,
    v1: Vec3,
    v2: Vec3,
    v3: Vec3,
    wings: [Option<Vec3>; 3],
    radius_a: f32,
    xf_b: &Transform,
    center_b: Vec3,
    radius_b: f32,
) {
    manifold.clear();

    // Work in the triangle's local frame.
    let center = xf_a.inverse_transform_point(xf_b.transform_point(center_b));
    let (closest, region) = closest_on_triangle(center, v1, v2, v3);

    let d = center - closest;
    let distance_sq = d.length_squared();
    let total = radius_a + radius_b;
    if distance_sq > total * total {
        return;
    }

    let face_normal = triangle_normal(v1, v2, v3);
    let verts = [v1, v2, v3];

    // An edge (or its vertices) owned by a coplanar-or-convex neighbor
    // keeps the contact; when the center sits behind the neighbor's plane
    // the neighbor face owns it and this triangle stays silent.
    let edge_accepts = |edge: usize| -> bool {
        match wings[edge] {
            None => true,
            Some(wing) => {
                let a = verts[edge];
                let b = verts[(edge + 1) % 3];
                // Neighbor triangle (b, a, wing) with consistent winding.
                let neighbor_normal = triangle_normal(b, a, wing);
                (center - b).dot(neighbor_normal) > 0.0
            }
        }
    };

    let accepted = match region {
        TriangleRegion::Face => true,
        TriangleRegion::Edge(edge) => edge_accepts(edge),
        TriangleRegion::Vertex(v) => {
            // Both edges meeting at the vertex must accept.
            let incoming = (v + 2) % 3;
            edge_accepts(v) && edge_accepts(incoming)
        }
    };
    if !accepted {
        return;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > f32::EPSILON {
        d / distance
    } else {
        face_normal
    };

    let key_a = match region {
        TriangleRegion::Face => 0,
        TriangleRegion::Edge(edge) => 1 + edge as u32,
        TriangleRegion::Vertex(v) => 4 + v as u32,
    };

    manifold.local_normal = normal;
    manifold.points.push(ManifoldPoint::new(
        closest,
        center_b,
        FeatureKey::new(key_a, 0),
    ));
}

/// Hull–sphere: deepest face when the center is inside, closest surface
/// point otherwise.
pub fn collide_hull_sphere(
    manifold: &mut Manifold,
    xf_a: &Transform,
    hull: &HalfEdgeHull,
    radius_a: f32,
    xf_b: &Transform,
    center_b: Vec3,
    radius_b: f32,
) {
    manifold.clear();

    let center = xf_a.inverse_transform_point(xf_b.transform_point(center_b));
    let total = radius_a + radius_b;

    // Deepest face: the face plane with maximum signed distance.
    let mut best_face = 0usize;
    let mut best_separation = f32::NEG_INFINITY;
    for (i, plane) in hull.planes.iter().enumerate() {
        let separation = plane.distance(center);
        if separation > total {
            return;
        }
        if separation > best_separation {
            best_separation = separation;
            best_face = i;
        }
    }

    if best_separation < f32::EPSILON {
        // Center inside the hull: push out through the shallowest face.
        let plane = hull.planes[best_face];
        let on_face = center - best_separation * plane.normal;
        manifold.local_normal = plane.normal;
        manifold.points.push(ManifoldPoint::new(
            on_face,
            center_b,
            FeatureKey::new(best_face as u32, 0),
        ));
        return;
    }

    // Outside: closest point on the supporting face polygon.
    let polygon = hull.face_vertices(best_face as u32);
    let mut closest = polygon[0];
    let mut closest_dist = f32::INFINITY;
    // Projection onto the face plane, then clamp to the polygon boundary.
    let plane = hull.planes[best_face];
    let projected = center - plane.distance(center) * plane.normal;
    let mut inside = true;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        let edge_out = (b - a).cross(plane.normal);
        if (projected - a).dot(edge_out) > 0.0 {
            inside = false;
        }
        let (p, _) = closest_on_segment(center, a, b);
        let dist = (center - p).length_squared();
        if dist < closest_dist {
            closest_dist = dist;
            closest = p;
        }
    }
    if inside {
        closest = projected;
    }

    let d = center - closest;
    let distance_sq = d.length_squared();
    if distance_sq > total * total {
        return;
    }
    let distance = distance_sq.sqrt();
    let normal = if distance > f32::EPSILON {
        d / distance
    } else {
        plane.normal
    };

    manifold.local_normal = normal;
    manifold.points.push(ManifoldPoint::new(
        closest,
        center_b,
        FeatureKey::new(best_face as u32, 0),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spheres_touching_produce_one_point() {
        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.9, 0.0, 0.0));
        collide_spheres(&mut m, &xf_a, Vec3::ZERO, 0.5, &xf_b, Vec3::ZERO, 0.5);
        assert_eq!(m.points.len(), 1);
        assert_relative_eq!(m.local_normal.x, 1.0, epsilon = 1e-5);

        // Separated: no points.
        let xf_far = Transform::from_position(Vec3::new(1.2, 0.0, 0.0));
        collide_spheres(&mut m, &xf_a, Vec3::ZERO, 0.5, &xf_far, Vec3::ZERO, 0.5);
        assert!(m.points.is_empty());
    }

    #[test]
    fn capsule_sphere_hits_cylinder_side() {
        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.6, 0.2, 0.0));
        collide_capsule_sphere(
            &mut m,
            &xf_a,
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            0.3,
            &xf_b,
            Vec3::ZERO,
            0.4,
        );
        assert_eq!(m.points.len(), 1);
        assert_relative_eq!(m.local_normal.x, 1.0, epsilon = 1e-5);
        // Interior region key.
        assert_eq!(m.points[0].key.key_a, 2);
    }

    #[test]
    fn hull_sphere_face_contact() {
        let hull = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.0, 0.8, 0.0));
        collide_hull_sphere(&mut m, &xf_a, &hull, 0.0, &xf_b, Vec3::ZERO, 0.4);
        assert_eq!(m.points.len(), 1);
        assert_relative_eq!(m.local_normal.y, 1.0, epsilon = 1e-4);
        assert_relative_eq!(m.points[0].local_point_a.y, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn internal_edge_contact_is_rejected() {
        // Flat pair of triangles: the sphere pressing sideways against the
        // shared edge from below the neighbor's plane must be silent.
        let v1 = Vec3::new(0.0, 0.0, 1.0);
        let v2 = Vec3::new(0.0, 0.0, -1.0);
        let v3 = Vec3::new(-2.0, 0.0, 0.0);
        // Neighbor across edge 0 is coplanar.
        let wing = Some(Vec3::new(2.0, 0.0, 0.0));

        let mut m = Manifold::default();
        let xf_a = Transform::IDENTITY;
        // Sphere resting on the shared edge from above: accepted.
        let xf_above = Transform::from_position(Vec3::new(0.0, 0.3, 0.0));
        collide_triangle_sphere(
            &mut m,
            &xf_a,
            v1,
            v2,
            v3,
            [wing, None, None],
            0.0,
            &xf_above,
            Vec3::ZERO,
            0.5,
        );
        assert_eq!(m.points.len(), 1);
        assert!(m.local_normal.y > 0.9);

        // Sphere below the surface plane pushing sideways into the edge:
        // the wing overturns the edge normal.
        let xf_below = Transform::from_position(Vec3::new(0.3, -0.2, 0.0));
        collide_triangle_sphere(
            &mut m,
            &xf_a,
            v1,
            v2,
            v3,
            [wing, None, None],
            0.0,
            &xf_below,
            Vec3::ZERO,
            0.5,
        );
        assert!(m.points.is_empty());
    }
}
