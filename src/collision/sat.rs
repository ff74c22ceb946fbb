use glam::Vec3;

use crate::core::hull::HalfEdgeHull;
use crate::core::transform::Transform;

/// Separating-axis witness: which feature realised the best separation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SatCache {
    #[default]
    Empty,
    /// Reference face on hull A.
    FaceA {
        index: u32,
        separation: f32,
    },
    /// Reference face on hull B.
    FaceB {
        index: u32,
        separation: f32,
    },
    /// Edge pair realising the axis.
    Edges {
        edge_a: u32,
        edge_b: u32,
        separation: f32,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FaceQuery {
    pub index: u32,
    pub separation: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeQuery {
    pub edge_a: u32,
    pub edge_b: u32,
    pub separation: f32,
}

/// Maximum separation of `hull_b` over the face planes of `hull_a`.
pub fn query_face_directions(
    xf_a: &Transform,
    hull_a: &HalfEdgeHull,
    xf_b: &Transform,
    hull_b: &HalfEdgeHull,
) -> FaceQuery {
    // Work in B's frame so supports need no per-face transform.
    let xf = xf_b.mul_transpose(xf_a);

    let mut best = FaceQuery {
        index: 0,
        separation: f32::NEG_INFINITY,
    };

    for (index, plane) in hull_a.planes.iter().enumerate() {
        let plane_b = plane.transformed(&xf);
        let support = hull_b.vertices[hull_b.support_vertex(-plane_b.normal) as usize];
        let separation = plane_b.distance(support);
        if separation > best.separation {
            best = FaceQuery {
                index: index as u32,
                separation,
            };
        }
    }

    best
}

/// Re-evaluates the separation of one cached face axis.
pub fn face_separation(
    xf_a: &Transform,
    hull_a: &HalfEdgeHull,
    face: u32,
    xf_b: &Transform,
    hull_b: &HalfEdgeHull,
) -> f32 {
    let xf = xf_b.mul_transpose(xf_a);
    let plane_b = hull_a.planes[face as usize].transformed(&xf);
    let support = hull_b.vertices[hull_b.support_vertex(-plane_b.normal) as usize];
    plane_b.distance(support)
}

/// Whether two hull edges form a face of the Minkowski difference, i.e.
/// their Gauss-map arcs intersect. Only such pairs can realise the minimum
/// separation, which prunes the quadratic edge sweep hard.
fn is_minkowski_face(a: Vec3, b: Vec3, b_cross_a: Vec3, c: Vec3, d: Vec3, d_cross_c: Vec3) -> bool {
    let cba = c.dot(b_cross_a);
    let dba = d.dot(b_cross_a);
    let adc = a.dot(d_cross_c);
    let bdc = b.dot(d_cross_c);

    cba * dba < 0.0 && adc * bdc < 0.0 && cba * bdc > 0.0
}

/// Separation of two edge segments along their cross axis, oriented away
/// from hull A.
fn edge_separation(p_a: Vec3, e_a: Vec3, p_b: Vec3, e_b: Vec3, centroid_a: Vec3) -> Option<f32> {
    let normal = e_a.cross(e_b);
    let len = normal.length();
    // Parallel edges build no new axis; the face queries cover them.
    if len < 1e-5 * (e_a.length() * e_b.length()).sqrt().max(1e-12) {
        return None;
    }
    let mut n = normal / len;
    if n.dot(p_a - centroid_a) < 0.0 {
        n = -n;
    }
    Some(n.dot(p_b - p_a))
}

/// Maximum separation over Gauss-map-filtered edge pairs.
pub fn query_edge_directions(
    xf_a: &Transform,
    hull_a: &HalfEdgeHull,
    xf_b: &Transform,
    hull_b: &HalfEdgeHull,
) -> EdgeQuery {
    // Work in A's frame.
    let xf = xf_a.mul_transpose(xf_b);
    let centroid_a = hull_a.centroid;

    let mut best = EdgeQuery {
        edge_a: 0,
        edge_b: 0,
        separation: f32::NEG_INFINITY,
    };

    for index_a in 0..hull_a.edges.len() as u32 {
        let half_a = hull_a.edges[index_a as usize];
        if half_a.twin < index_a {
            continue;
        }
        let (pa1, pa2) = hull_a.edge_segment(index_a);
        let e_a = pa2 - pa1;
        // Outward normals of the two faces meeting at edge A.
        let u_a = hull_a.planes[half_a.face as usize].normal;
        let v_a = hull_a.planes[hull_a.edges[half_a.twin as usize].face as usize].normal;

        for index_b in 0..hull_b.edges.len() as u32 {
            let half_b = hull_b.edges[index_b as usize];
            if half_b.twin < index_b {
                continue;
            }
            let (qb1, qb2) = hull_b.edge_segment(index_b);
            let pb1 = xf.transform_point(qb1);
            let pb2 = xf.transform_point(qb2);
            let e_b = pb2 - pb1;
            let u_b = xf.transform_vector(hull_b.planes[half_b.face as usize].normal);
            let v_b =
                xf.transform_vector(hull_b.planes[hull_b.edges[half_b.twin as usize].face as usize].normal);

            if !is_minkowski_face(u_a, v_a, -e_a, -u_b, -v_b, -e_b) {
                continue;
            }

            if let Some(separation) = edge_separation(pa1, e_a, pb1, e_b, centroid_a) {
                if separation > best.separation {
                    best = EdgeQuery {
                        edge_a: index_a,
                        edge_b: index_b,
                        separation,
                    };
                }
            }
        }
    }

    best
}

/// Re-evaluates the separation of one cached edge pair.
pub fn edge_pair_separation(
    xf_a: &Transform,
    hull_a: &HalfEdgeHull,
    edge_a: u32,
    xf_b: &Transform,
    hull_b: &HalfEdgeHull,
    edge_b: u32,
) -> Option<f32> {
    let xf = xf_a.mul_transpose(xf_b);
    let (pa1, pa2) = hull_a.edge_segment(edge_a);
    let (qb1, qb2) = hull_b.edge_segment(edge_b);
    let pb1 = xf.transform_point(qb1);
    let pb2 = xf.transform_point(qb2);
    edge_separation(pa1, pa2 - pa1, pb1, pb2 - pb1, hull_a.centroid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    #[test]
    fn face_query_reports_gap() {
        let a = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let b = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(1.5, 0.0, 0.0));

        let query = query_face_directions(&xf_a, &a, &xf_b, &b);
        assert_relative_eq!(query.separation, 0.5, epsilon = 1e-5);
        // Winning face is +x.
        let normal = a.planes[query.index as usize].normal;
        assert_relative_eq!(normal.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn face_query_reports_penetration_depth() {
        let a = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let b = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.8, 0.0, 0.0));

        let query = query_face_directions(&xf_a, &a, &xf_b, &b);
        assert_relative_eq!(query.separation, -0.2, epsilon = 1e-5);
    }

    #[test]
    fn crossed_edges_realise_the_axis() {
        // Two boxes rotated 45° about y, meeting corner edge to corner
        // edge along x: the separating axis is an edge-edge cross.
        let a = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let b = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let q = Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_4);
        let xf_a = Transform::new(Vec3::ZERO, q);
        let q2 = Quat::from_axis_angle(Vec3::X, std::f32::consts::FRAC_PI_4);
        let xf_b = Transform::new(Vec3::new(1.6, 0.0, 0.0), q2);

        let edges = query_edge_directions(&xf_a, &a, &xf_b, &b);
        let faces_a = query_face_directions(&xf_a, &a, &xf_b, &b);
        let faces_b = query_face_directions(&xf_b, &b, &xf_a, &a);
        // All three queries agree the hulls are separated.
        assert!(edges.separation > 0.0 || faces_a.separation > 0.0 || faces_b.separation > 0.0);
    }
}
