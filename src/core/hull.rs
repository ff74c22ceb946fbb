use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::transform::Transform;

/// Oriented plane in `normal · p = offset` form, normal pointing outward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            offset: normal.dot(point),
        }
    }

    /// Signed distance of `point` above the plane.
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    pub fn transformed(&self, xf: &Transform) -> Plane {
        let normal = xf.rotation * self.normal;
        Plane {
            normal,
            offset: self.offset + normal.dot(xf.position),
        }
    }
}

/// Directed edge of the hull boundary. Twin edges run the same segment in
/// opposite directions on the two incident faces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HalfEdge {
    pub origin: u32,
    pub twin: u32,
    pub face: u32,
    pub prev: u32,
    pub next: u32,
}

/// Convex polygon face, referenced by one of its boundary half-edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Face {
    pub edge: u32,
}

/// Read-only half-edge mesh of a convex polytope.
///
/// Hulls are built once, at asset-authoring time, and never mutated by the
/// simulator. Faces are convex polygons wound counter-clockwise when viewed
/// from outside; every half-edge has a twin on the adjacent face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalfEdgeHull {
    pub vertices: Vec<Vec3>,
    pub edges: Vec<HalfEdge>,
    pub faces: Vec<Face>,
    pub planes: Vec<Plane>,
    pub centroid: Vec3,
}

impl HalfEdgeHull {
    /// Builds a hull from faces given as CCW vertex-index loops.
    ///
    /// This is the entry point for externally computed hulls (e.g. a
    /// quickhull result); the loops must describe a closed convex surface.
    pub fn from_faces(vertices: Vec<Vec3>, face_loops: &[Vec<u32>]) -> Self {
        use std::collections::HashMap;

        let mut edges: Vec<HalfEdge> = Vec::new();
        let mut faces: Vec<Face> = Vec::with_capacity(face_loops.len());
        let mut planes: Vec<Plane> = Vec::with_capacity(face_loops.len());
        // (from, to) -> edge index, for twin linking.
        let mut edge_map: HashMap<(u32, u32), u32> = HashMap::new();

        for (face_index, loop_vertices) in face_loops.iter().enumerate() {
            let n = loop_vertices.len();
            debug_assert!(n >= 3);

            let first_edge = edges.len() as u32;
            faces.push(Face { edge: first_edge });

            for i in 0..n {
                let from = loop_vertices[i];
                let to = loop_vertices[(i + 1) % n];
                let edge_index = first_edge + i as u32;

                edges.push(HalfEdge {
                    origin: from,
                    twin: u32::MAX,
                    face: face_index as u32,
                    prev: first_edge + ((i + n - 1) % n) as u32,
                    next: first_edge + ((i + 1) % n) as u32,
                });

                edge_map.insert((from, to), edge_index);
                if let Some(&twin) = edge_map.get(&(to, from)) {
                    edges[edge_index as usize].twin = twin;
                    edges[twin as usize].twin = edge_index;
                }
            }

            // Newell plane so slightly non-planar input stays well behaved.
            let mut normal = Vec3::ZERO;
            for i in 0..n {
                let a = vertices[loop_vertices[i] as usize];
                let b = vertices[loop_vertices[(i + 1) % n] as usize];
                normal += (a - b).cross(a + b);
            }
            let normal = normal.normalize_or_zero();
            planes.push(Plane::new(normal, vertices[loop_vertices[0] as usize]));
        }

        let centroid = if vertices.is_empty() {
            Vec3::ZERO
        } else {
            vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32
        };

        let hull = Self {
            vertices,
            edges,
            faces,
            planes,
            centroid,
        };
        hull.validate();
        hull
    }

    /// Axis-aligned box hull centered at the origin.
    pub fn new_box(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let faces = [
            vec![4, 5, 6, 7], // +z
            vec![1, 0, 3, 2], // -z
            vec![5, 1, 2, 6], // +x
            vec![0, 4, 7, 3], // -x
            vec![7, 6, 2, 3], // +y
            vec![0, 1, 5, 4], // -y
        ];
        Self::from_faces(vertices, &faces)
    }

    /// Degenerate two-face hull over one triangle. The SAT path collides
    /// triangles this way, so mesh faces and real hulls share one routine.
    pub fn new_triangle(v1: Vec3, v2: Vec3, v3: Vec3) -> Self {
        Self::from_faces(vec![v1, v2, v3], &[vec![0, 1, 2], vec![2, 1, 0]])
    }

    /// Polygonal cylinder hull about the local y axis: two n-gon caps
    /// joined by n side quads, centered at the origin.
    pub fn new_cylinder(half_height: f32, radius: f32, segment_count: usize) -> Self {
        debug_assert!(segment_count >= 3);
        let n = segment_count as u32;

        // Bottom ring first, then the top ring.
        let mut vertices = Vec::with_capacity(2 * segment_count);
        for ring_y in [-half_height, half_height] {
            for i in 0..segment_count {
                let angle = i as f32 * std::f32::consts::TAU / segment_count as f32;
                let (sin, cos) = angle.sin_cos();
                vertices.push(Vec3::new(radius * cos, ring_y, radius * sin));
            }
        }

        let mut faces = Vec::with_capacity(segment_count + 2);
        // Bottom cap faces -y with the rings wound by increasing angle.
        faces.push((0..n).collect::<Vec<u32>>());
        // Top cap reversed to face +y.
        let mut top: Vec<u32> = (n..2 * n).collect();
        top.reverse();
        faces.push(top);
        // Side quads.
        for i in 0..n {
            let j = (i + 1) % n;
            faces.push(vec![i, n + i, n + j, j]);
        }

        Self::from_faces(vertices, &faces)
    }

    /// Index of the vertex with maximum projection along `direction`
    /// (local frame).
    pub fn support_vertex(&self, direction: Vec3) -> u32 {
        let mut best = 0u32;
        let mut best_dot = f32::NEG_INFINITY;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = v.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = i as u32;
            }
        }
        best
    }

    /// Index of the face whose outward normal best matches `direction`
    /// (local frame).
    pub fn support_face(&self, direction: Vec3) -> u32 {
        let mut best = 0u32;
        let mut best_dot = f32::NEG_INFINITY;
        for (i, plane) in self.planes.iter().enumerate() {
            let d = plane.normal.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = i as u32;
            }
        }
        best
    }

    /// Vertex loop of a face, in CCW order.
    pub fn face_vertices(&self, face: u32) -> Vec<Vec3> {
        let mut out = Vec::new();
        let first = self.faces[face as usize].edge;
        let mut edge = first;
        loop {
            out.push(self.vertices[self.edges[edge as usize].origin as usize]);
            edge = self.edges[edge as usize].next;
            if edge == first {
                break;
            }
        }
        out
    }

    /// Endpoints of a half-edge in local space.
    pub fn edge_segment(&self, edge: u32) -> (Vec3, Vec3) {
        let e = self.edges[edge as usize];
        let twin = self.edges[e.twin as usize];
        (
            self.vertices[e.origin as usize],
            self.vertices[twin.origin as usize],
        )
    }

    /// Validates the half-edge invariants. Debug builds only; malformed
    /// hulls are programmer errors, not runtime conditions.
    pub fn validate(&self) {
        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(self.faces.len(), self.planes.len());
            for (i, edge) in self.edges.iter().enumerate() {
                debug_assert!(edge.twin != u32::MAX, "open edge {i}");
                let twin = &self.edges[edge.twin as usize];
                debug_assert_eq!(twin.twin as usize, i);
                debug_assert_eq!(self.edges[edge.next as usize].prev as usize, i);
                debug_assert_eq!(self.edges[edge.prev as usize].next as usize, i);
            }
            for (i, face) in self.faces.iter().enumerate() {
                let mut edge = face.edge;
                let mut steps = 0;
                loop {
                    debug_assert_eq!(self.edges[edge as usize].face as usize, i);
                    edge = self.edges[edge as usize].next;
                    steps += 1;
                    debug_assert!(steps <= self.edges.len());
                    if edge == face.edge {
                        break;
                    }
                }
            }
        }
    }

    /// Mass, center of mass, and inertia about the origin, by tetrahedral
    /// decomposition against the centroid.
    pub fn mass_data(&self, density: f32) -> (f32, Vec3, glam::Mat3) {
        let mut volume = 0.0_f32;
        let mut center = Vec3::ZERO;
        let mut diag = Vec3::ZERO;
        let mut off_diag = Vec3::ZERO;

        let reference = self.centroid;
        for face_index in 0..self.faces.len() as u32 {
            let polygon = self.face_vertices(face_index);
            for i in 1..polygon.len() - 1 {
                let a = polygon[0] - reference;
                let b = polygon[i] - reference;
                let c = polygon[i + 1] - reference;

                let det = a.dot(b.cross(c));
                let tet_volume = det / 6.0;
                volume += tet_volume;
                center += tet_volume * 0.25 * (a + b + c);

                // Canonical tetrahedron inertia integrals.
                for axis in 0..3 {
                    let j = (axis + 1) % 3;
                    let k = (axis + 2) % 3;
                    diag[axis] += det / 60.0
                        * (a[axis] * a[axis]
                            + b[axis] * b[axis]
                            + c[axis] * c[axis]
                            + a[axis] * b[axis]
                            + a[axis] * c[axis]
                            + b[axis] * c[axis]);
                    off_diag[axis] += det / 120.0
                        * (2.0 * (a[j] * a[k] + b[j] * b[k] + c[j] * c[k])
                            + a[j] * b[k]
                            + a[k] * b[j]
                            + a[j] * c[k]
                            + a[k] * c[j]
                            + b[j] * c[k]
                            + b[k] * c[j]);
                }
            }
        }

        if volume <= f32::EPSILON {
            return (0.0, reference, glam::Mat3::ZERO);
        }

        let mass = density * volume;
        let local_center = reference + center / volume;
        let density_scale = density;

        // Inertia about `reference`, then shifted to the origin frame.
        let ixx = density_scale * (diag.y + diag.z);
        let iyy = density_scale * (diag.x + diag.z);
        let izz = density_scale * (diag.x + diag.y);
        let ixy = -density_scale * off_diag.z;
        let ixz = -density_scale * off_diag.y;
        let iyz = -density_scale * off_diag.x;

        let inertia_about_reference = glam::Mat3::from_cols(
            Vec3::new(ixx, ixy, ixz),
            Vec3::new(ixy, iyy, iyz),
            Vec3::new(ixz, iyz, izz),
        );

        // Parallel axis theorem: reference frame -> center of mass -> origin.
        let inertia_about_com = inertia_about_reference
            - mass * super::transform::steiner(local_center - reference);
        let inertia_origin = inertia_about_com + mass * super::transform::steiner(local_center);

        (mass, local_center, inertia_origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_hull_is_well_formed() {
        let hull = HalfEdgeHull::new_box(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(hull.vertices.len(), 8);
        assert_eq!(hull.faces.len(), 6);
        assert_eq!(hull.edges.len(), 24);
        hull.validate();

        // Every face plane contains the hull on its back side.
        for plane in &hull.planes {
            for v in &hull.vertices {
                assert!(plane.distance(*v) < 1e-4);
            }
        }
    }

    #[test]
    fn support_vertex_picks_extreme_corner() {
        let hull = HalfEdgeHull::new_box(Vec3::splat(0.5));
        let v = hull.vertices[hull.support_vertex(Vec3::new(1.0, 1.0, 1.0)) as usize];
        assert_relative_eq!(v.x, 0.5);
        assert_relative_eq!(v.y, 0.5);
        assert_relative_eq!(v.z, 0.5);
    }

    #[test]
    fn box_mass_matches_analytic() {
        let h = Vec3::new(0.5, 0.5, 0.5);
        let hull = HalfEdgeHull::new_box(h);
        let (mass, center, inertia) = hull.mass_data(1.0);
        assert_relative_eq!(mass, 1.0, epsilon = 1e-4);
        assert!(center.length() < 1e-4);
        // Unit cube: I = m/12 * (ly² + lz²) = 1/6 per axis.
        assert_relative_eq!(inertia.x_axis.x, 1.0 / 6.0, epsilon = 1e-3);
        assert_relative_eq!(inertia.y_axis.y, 1.0 / 6.0, epsilon = 1e-3);
    }

    #[test]
    fn cylinder_hull_is_well_formed() {
        let hull = HalfEdgeHull::new_cylinder(1.0, 0.5, 8);
        assert_eq!(hull.vertices.len(), 16);
        assert_eq!(hull.faces.len(), 10);
        assert_eq!(hull.edges.len(), 48);
        hull.validate();

        for plane in &hull.planes {
            for v in &hull.vertices {
                assert!(plane.distance(*v) < 1e-4);
            }
        }

        // The caps face straight up and down.
        let has_up = hull.planes.iter().any(|p| p.normal.y > 0.999);
        let has_down = hull.planes.iter().any(|p| p.normal.y < -0.999);
        assert!(has_up && has_down);

        let top = hull.vertices[hull.support_vertex(Vec3::Y) as usize];
        assert_relative_eq!(top.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn triangle_hull_has_two_faces() {
        let hull = HalfEdgeHull::new_triangle(
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        assert_eq!(hull.faces.len(), 2);
        assert_eq!(hull.edges.len(), 6);
        // Front/back normals oppose each other.
        let n0 = hull.planes[0].normal;
        let n1 = hull.planes[1].normal;
        assert_relative_eq!(n0.dot(n1), -1.0, epsilon = 1e-5);
    }
}
