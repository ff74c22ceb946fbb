use std::f32::consts::PI;
use std::sync::Arc;

use arrayvec::ArrayVec;
use glam::{Mat3, Quat, Vec3};

use crate::config;

use super::aabb::Aabb;
use super::hull::HalfEdgeHull;
use super::mesh::{TriangleMesh, NO_WING};
use super::transform::{steiner, Transform};

/// Mass properties of a shape about the body origin.
#[derive(Debug, Clone, Copy)]
pub struct MassData {
    pub mass: f32,
    /// Center of mass in the body's local frame.
    pub center: Vec3,
    /// Inertia tensor about the body origin.
    pub inertia: Mat3,
}

/// Output of a shape-level ray cast.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub fraction: f32,
    pub normal: Vec3,
}

/// Collision geometry attached to a fixture.
///
/// Convex hulls and triangle meshes reference immutable, externally built
/// geometry; cloning a shape is cheap.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Capsule {
        point1: Vec3,
        point2: Vec3,
        radius: f32,
    },
    /// One mesh face materialised as a standalone shape. The wing vertices
    /// are the neighbor-triangle vertices across each edge, used to reject
    /// internal-edge normals.
    Triangle {
        v1: Vec3,
        v2: Vec3,
        v3: Vec3,
        wing1: Option<Vec3>,
        wing2: Option<Vec3>,
        wing3: Option<Vec3>,
        radius: f32,
    },
    Hull {
        hull: Arc<HalfEdgeHull>,
        radius: f32,
    },
    /// Cylinder about the local y axis, backed by a polygonal boundary
    /// hull. Collides through the hull routines; the explicit dimensions
    /// stay available for mass queries and debug drawing.
    Cylinder {
        hull: Arc<HalfEdgeHull>,
        half_height: f32,
        cylinder_radius: f32,
        radius: f32,
    },
    Mesh {
        mesh: Arc<TriangleMesh>,
        scale: f32,
        radius: f32,
    },
}

/// Discriminant used to index the contact dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShapeKind {
    Sphere = 0,
    Capsule = 1,
    Triangle = 2,
    Hull = 3,
    Mesh = 4,
}

impl Shape {
    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere {
            center: Vec3::ZERO,
            radius,
        }
    }

    pub fn capsule(point1: Vec3, point2: Vec3, radius: f32) -> Self {
        Shape::Capsule {
            point1,
            point2,
            radius,
        }
    }

    pub fn hull(hull: Arc<HalfEdgeHull>) -> Self {
        Shape::Hull {
            hull,
            radius: config::HULL_RADIUS,
        }
    }

    /// Box built as an eight-vertex hull.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Shape::hull(Arc::new(HalfEdgeHull::new_box(half_extents)))
    }

    /// Cylinder approximated by a 16-segment boundary hull.
    pub fn cylinder(half_height: f32, radius: f32) -> Self {
        Shape::cylinder_with_segments(half_height, radius, 16)
    }

    pub fn cylinder_with_segments(half_height: f32, radius: f32, segment_count: usize) -> Self {
        Shape::Cylinder {
            hull: Arc::new(HalfEdgeHull::new_cylinder(half_height, radius, segment_count)),
            half_height,
            cylinder_radius: radius,
            radius: config::HULL_RADIUS,
        }
    }

    pub fn mesh(mesh: Arc<TriangleMesh>) -> Self {
        Shape::Mesh {
            mesh,
            scale: 1.0,
            radius: config::HULL_RADIUS,
        }
    }

    /// Dispatch discriminant. Cylinders are hull-backed and dispatch as
    /// hulls, keeping the contact table at the five core kinds.
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere { .. } => ShapeKind::Sphere,
            Shape::Capsule { .. } => ShapeKind::Capsule,
            Shape::Triangle { .. } => ShapeKind::Triangle,
            Shape::Hull { .. } | Shape::Cylinder { .. } => ShapeKind::Hull,
            Shape::Mesh { .. } => ShapeKind::Mesh,
        }
    }

    /// The boundary hull and skin radius of hull-backed shapes.
    pub fn as_hull(&self) -> Option<(&Arc<HalfEdgeHull>, f32)> {
        match self {
            Shape::Hull { hull, radius } | Shape::Cylinder { hull, radius, .. } => {
                Some((hull, *radius))
            }
            _ => None,
        }
    }

    /// Skin radius added around the core geometry.
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Sphere { radius, .. }
            | Shape::Capsule { radius, .. }
            | Shape::Triangle { radius, .. }
            | Shape::Hull { radius, .. }
            | Shape::Cylinder { radius, .. }
            | Shape::Mesh { radius, .. } => *radius,
        }
    }

    /// World-frame AABB of the shape under `xf`.
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            Shape::Sphere { center, radius } => {
                let c = xf.transform_point(*center);
                Aabb::from_center(c, Vec3::splat(*radius))
            }
            Shape::Capsule {
                point1,
                point2,
                radius,
            } => {
                let p1 = xf.transform_point(*point1);
                let p2 = xf.transform_point(*point2);
                let mut aabb = Aabb::from_points(&[p1, p2]);
                aabb.extend(*radius);
                aabb
            }
            Shape::Triangle {
                v1, v2, v3, radius, ..
            } => {
                let mut aabb = Aabb::from_points(&[
                    xf.transform_point(*v1),
                    xf.transform_point(*v2),
                    xf.transform_point(*v3),
                ]);
                aabb.extend(*radius + config::LINEAR_SLOP);
                aabb
            }
            Shape::Hull { hull, radius } | Shape::Cylinder { hull, radius, .. } => {
                let mut aabb = Aabb::empty();
                for v in &hull.vertices {
                    let p = xf.transform_point(*v);
                    aabb.min = aabb.min.min(p);
                    aabb.max = aabb.max.max(p);
                }
                if *radius > 0.0 {
                    aabb.extend(*radius);
                }
                aabb
            }
            Shape::Mesh { mesh, scale, radius } => {
                // Conservative: bound the rotated local box corners.
                let b = mesh.bounds;
                let corners = [
                    Vec3::new(b.min.x, b.min.y, b.min.z),
                    Vec3::new(b.max.x, b.min.y, b.min.z),
                    Vec3::new(b.min.x, b.max.y, b.min.z),
                    Vec3::new(b.max.x, b.max.y, b.min.z),
                    Vec3::new(b.min.x, b.min.y, b.max.z),
                    Vec3::new(b.max.x, b.min.y, b.max.z),
                    Vec3::new(b.min.x, b.max.y, b.max.z),
                    Vec3::new(b.max.x, b.max.y, b.max.z),
                ];
                let mut aabb = Aabb::empty();
                for c in corners {
                    let p = xf.transform_point(c * *scale);
                    aabb.min = aabb.min.min(p);
                    aabb.max = aabb.max.max(p);
                }
                if *radius > 0.0 {
                    aabb.extend(*radius);
                }
                aabb
            }
        }
    }

    /// Mass properties about the body origin. Triangles and meshes are
    /// static geometry and report zero mass.
    pub fn mass_data(&self, density: f32) -> MassData {
        match self {
            Shape::Sphere { center, radius } => {
                let r = *radius;
                let mass = density * (4.0 / 3.0) * PI * r * r * r;
                let i = 0.4 * mass * r * r;
                let inertia = Mat3::from_diagonal(Vec3::splat(i)) + mass * steiner(*center);
                MassData {
                    mass,
                    center: *center,
                    inertia,
                }
            }
            Shape::Capsule {
                point1,
                point2,
                radius,
            } => {
                let r = *radius;
                let d = *point2 - *point1;
                let h = d.length();
                let center = 0.5 * (*point1 + *point2);

                let cylinder_mass = density * PI * r * r * h;
                let sphere_mass = density * (4.0 / 3.0) * PI * r * r * r;
                let mass = cylinder_mass + sphere_mass;

                // Inertia in the canonical frame, axis along Y.
                let cyl_y = 0.5 * cylinder_mass * r * r;
                let cyl_xz = cylinder_mass * (r * r / 4.0 + h * h / 12.0);
                // Two hemispheres shifted to the cylinder ends.
                let hemi = 0.4 * sphere_mass * r * r;
                let shift = sphere_mass * (0.5 * h * (3.0 / 8.0) * r + 0.25 * h * h);
                let i_y = cyl_y + hemi;
                let i_xz = cyl_xz + hemi + shift;

                let local = Mat3::from_diagonal(Vec3::new(i_xz, i_y, i_xz));
                let rotation = if h > f32::EPSILON {
                    Quat::from_rotation_arc(Vec3::Y, d / h)
                } else {
                    Quat::IDENTITY
                };
                let r_mat = Mat3::from_quat(rotation);
                let inertia_com = r_mat * local * r_mat.transpose();

                MassData {
                    mass,
                    center,
                    inertia: inertia_com + mass * steiner(center),
                }
            }
            Shape::Triangle { v1, v2, v3, .. } => MassData {
                mass: 0.0,
                center: (*v1 + *v2 + *v3) / 3.0,
                inertia: Mat3::ZERO,
            },
            // Cylinders use their boundary hull so mass matches the
            // geometry the solver actually collides.
            Shape::Hull { hull, .. } | Shape::Cylinder { hull, .. } => {
                let (mass, center, inertia) = hull.mass_data(density);
                MassData {
                    mass,
                    center,
                    inertia,
                }
            }
            Shape::Mesh { mesh, .. } => MassData {
                mass: 0.0,
                center: mesh.bounds.center(),
                inertia: Mat3::ZERO,
            },
        }
    }

    /// Casts the segment `p1 → p2` (world frame) against this shape.
    pub fn ray_cast(&self, xf: &Transform, p1: Vec3, p2: Vec3, max_fraction: f32) -> Option<RayHit> {
        match self {
            Shape::Sphere { center, radius } => {
                ray_cast_sphere(xf.transform_point(*center), *radius, p1, p2, max_fraction)
            }
            Shape::Capsule {
                point1,
                point2,
                radius,
            } => ray_cast_capsule(
                xf.transform_point(*point1),
                xf.transform_point(*point2),
                *radius,
                p1,
                p2,
                max_fraction,
            ),
            Shape::Triangle { v1, v2, v3, .. } => ray_cast_triangle(
                xf.transform_point(*v1),
                xf.transform_point(*v2),
                xf.transform_point(*v3),
                p1,
                p2,
                max_fraction,
            ),
            Shape::Hull { hull, .. } | Shape::Cylinder { hull, .. } => {
                ray_cast_hull(hull, xf, p1, p2, max_fraction)
            }
            Shape::Mesh { mesh, scale, .. } => {
                // Cast in mesh-local, unscaled space so the static tree
                // can prune.
                let inv_scale = 1.0 / *scale;
                let q1 = xf.inverse_transform_point(p1) * inv_scale;
                let q2 = xf.inverse_transform_point(p2) * inv_scale;
                let mut best: Option<RayHit> = None;
                mesh.bvh().ray_cast(q1, q2, |triangle, max| {
                    let (a, b, c) = mesh.triangle_vertices(triangle);
                    if let Some(hit) = ray_cast_triangle(a, b, c, q1, q2, max) {
                        if best.map(|b| hit.fraction < b.fraction).unwrap_or(true) {
                            best = Some(hit);
                            return hit.fraction;
                        }
                    }
                    max
                });
                best.map(|hit| {
                    RayHit {
                        fraction: hit.fraction.min(max_fraction),
                        normal: xf.transform_vector(hit.normal),
                    }
                })
                .filter(|hit| hit.fraction <= max_fraction)
            }
        }
    }

    /// Materialises one mesh face as a triangle shape with wing vertices.
    pub fn child_triangle(&self, triangle: u32) -> Shape {
        match self {
            Shape::Mesh { mesh, scale, radius } => {
                let tri = &mesh.triangles[triangle as usize];
                let s = *scale;
                let wing = |w: u32| {
                    if w == NO_WING {
                        None
                    } else {
                        Some(mesh.vertices[w as usize] * s)
                    }
                };
                Shape::Triangle {
                    v1: mesh.vertices[tri.verts[0] as usize] * s,
                    v2: mesh.vertices[tri.verts[1] as usize] * s,
                    v3: mesh.vertices[tri.verts[2] as usize] * s,
                    wing1: wing(tri.wings[0]),
                    wing2: wing(tri.wings[1]),
                    wing3: wing(tri.wings[2]),
                    radius: *radius,
                }
            }
            _ => unreachable!("child_triangle on a non-mesh shape"),
        }
    }

    /// Vertex-set view for GJK. For meshes, `child` selects the triangle.
    pub fn gjk_proxy(&self, child: u32) -> GjkProxy {
        match self {
            Shape::Sphere { center, radius } => GjkProxy::from_buffer(&[*center], *radius),
            Shape::Capsule {
                point1,
                point2,
                radius,
            } => GjkProxy::from_buffer(&[*point1, *point2], *radius),
            Shape::Triangle {
                v1, v2, v3, radius, ..
            } => GjkProxy::from_buffer(&[*v1, *v2, *v3], *radius),
            Shape::Hull { hull, radius } | Shape::Cylinder { hull, radius, .. } => GjkProxy {
                vertices: VertexSet::Shared(hull.clone()),
                radius: *radius,
            },
            Shape::Mesh { mesh, scale, radius } => {
                let tri = &mesh.triangles[child as usize];
                let s = *scale;
                GjkProxy::from_buffer(
                    &[
                        mesh.vertices[tri.verts[0] as usize] * s,
                        mesh.vertices[tri.verts[1] as usize] * s,
                        mesh.vertices[tri.verts[2] as usize] * s,
                    ],
                    *radius,
                )
            }
        }
    }
}

/// Vertex set behind a [`GjkProxy`]: either a small inline buffer or the
/// shared vertex array of a hull.
#[derive(Debug, Clone)]
pub enum VertexSet {
    Inline(ArrayVec<Vec3, 3>),
    Shared(Arc<HalfEdgeHull>),
}

/// Convex point-set view consumed by the GJK and TOI routines.
#[derive(Debug, Clone)]
pub struct GjkProxy {
    pub vertices: VertexSet,
    pub radius: f32,
}

impl GjkProxy {
    /// Proxy over an explicit point set (at most three points).
    pub fn from_points(points: &[Vec3], radius: f32) -> Self {
        Self::from_buffer(points, radius)
    }

    /// Proxy over a hull's shared vertex array.
    pub fn from_hull(hull: Arc<HalfEdgeHull>, radius: f32) -> Self {
        Self {
            vertices: VertexSet::Shared(hull),
            radius,
        }
    }

    fn from_buffer(points: &[Vec3], radius: f32) -> Self {
        let mut buffer = ArrayVec::new();
        for p in points {
            buffer.push(*p);
        }
        Self {
            vertices: VertexSet::Inline(buffer),
            radius,
        }
    }

    pub fn vertex(&self, index: u32) -> Vec3 {
        match &self.vertices {
            VertexSet::Inline(buffer) => buffer[index as usize],
            VertexSet::Shared(hull) => hull.vertices[index as usize],
        }
    }

    pub fn count(&self) -> u32 {
        match &self.vertices {
            VertexSet::Inline(buffer) => buffer.len() as u32,
            VertexSet::Shared(hull) => hull.vertices.len() as u32,
        }
    }

    /// Support vertex index along `direction` (local frame).
    pub fn support(&self, direction: Vec3) -> u32 {
        let mut best = 0u32;
        let mut best_dot = f32::NEG_INFINITY;
        for i in 0..self.count() {
            let d = self.vertex(i).dot(direction);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        best
    }
}

fn ray_cast_sphere(
    center: Vec3,
    radius: f32,
    p1: Vec3,
    p2: Vec3,
    max_fraction: f32,
) -> Option<RayHit> {
    let d = p2 - p1;
    let m = p1 - center;
    let a = d.dot(d);
    if a < f32::EPSILON {
        return None;
    }
    let b = m.dot(d);
    let c = m.dot(m) - radius * radius;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / a;
    if t < 0.0 || t > max_fraction {
        return None;
    }
    let normal = (m + t * d).normalize_or_zero();
    Some(RayHit {
        fraction: t,
        normal,
    })
}

fn ray_cast_capsule(
    a: Vec3,
    b: Vec3,
    radius: f32,
    p1: Vec3,
    p2: Vec3,
    max_fraction: f32,
) -> Option<RayHit> {
    let axis = b - a;
    let axis_len_sq = axis.length_squared();
    if axis_len_sq < f32::EPSILON {
        return ray_cast_sphere(a, radius, p1, p2, max_fraction);
    }

    // Infinite cylinder about the axis, then cap spheres.
    let d = p2 - p1;
    let m = p1 - a;
    let axis_n = axis / axis_len_sq.sqrt();
    let d_perp = d - axis_n * d.dot(axis_n);
    let m_perp = m - axis_n * m.dot(axis_n);

    let qa = d_perp.dot(d_perp);
    let qb = m_perp.dot(d_perp);
    let qc = m_perp.dot(m_perp) - radius * radius;

    let mut best: Option<RayHit> = None;
    if qa > f32::EPSILON {
        let disc = qb * qb - qa * qc;
        if disc >= 0.0 {
            let t = (-qb - disc.sqrt()) / qa;
            if t >= 0.0 && t <= max_fraction {
                let hit_point = p1 + t * d;
                let s = (hit_point - a).dot(axis_n);
                if s >= 0.0 && s * s <= axis_len_sq {
                    let on_axis = a + axis_n * s;
                    return Some(RayHit {
                        fraction: t,
                        normal: (hit_point - on_axis).normalize_or_zero(),
                    });
                }
            }
        }
    }

    for cap in [a, b] {
        if let Some(hit) = ray_cast_sphere(cap, radius, p1, p2, max_fraction) {
            if best.map(|b| hit.fraction < b.fraction).unwrap_or(true) {
                best = Some(hit);
            }
        }
    }
    best
}

fn ray_cast_triangle(
    v1: Vec3,
    v2: Vec3,
    v3: Vec3,
    p1: Vec3,
    p2: Vec3,
    max_fraction: f32,
) -> Option<RayHit> {
    let normal = (v2 - v1).cross(v3 - v1);
    let normal_len = normal.length();
    if normal_len < f32::EPSILON {
        return None;
    }
    let normal = normal / normal_len;

    let d = p2 - p1;
    let denom = normal.dot(d);
    if denom.abs() < f32::EPSILON {
        return None;
    }
    let t = normal.dot(v1 - p1) / denom;
    if t < 0.0 || t > max_fraction {
        return None;
    }

    let p = p1 + t * d;
    // Inside test via edge-plane signs.
    let c1 = (v2 - v1).cross(p - v1).dot(normal);
    let c2 = (v3 - v2).cross(p - v2).dot(normal);
    let c3 = (v1 - v3).cross(p - v3).dot(normal);
    if c1 >= -f32::EPSILON && c2 >= -f32::EPSILON && c3 >= -f32::EPSILON {
        let facing = if denom < 0.0 { normal } else { -normal };
        return Some(RayHit {
            fraction: t,
            normal: facing,
        });
    }
    None
}

fn ray_cast_hull(
    hull: &HalfEdgeHull,
    xf: &Transform,
    p1: Vec3,
    p2: Vec3,
    max_fraction: f32,
) -> Option<RayHit> {
    // Clip the parametric interval against every face half-space, in the
    // hull's local frame.
    let q1 = xf.inverse_transform_point(p1);
    let q2 = xf.inverse_transform_point(p2);
    let d = q2 - q1;

    let mut t_enter = 0.0_f32;
    let mut t_exit = max_fraction;
    let mut enter_normal = Vec3::ZERO;

    for plane in &hull.planes {
        let dist = plane.distance(q1);
        let denom = plane.normal.dot(d);

        if denom.abs() < f32::EPSILON {
            if dist > 0.0 {
                return None;
            }
            continue;
        }

        let t = -dist / denom;
        if denom < 0.0 {
            // Entering.
            if t > t_enter {
                t_enter = t;
                enter_normal = plane.normal;
            }
        } else if t < t_exit {
            t_exit = t;
        }
        if t_enter > t_exit {
            return None;
        }
    }

    if enter_normal == Vec3::ZERO {
        // Started inside.
        return None;
    }

    Some(RayHit {
        fraction: t_enter,
        normal: xf.transform_vector(enter_normal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sphere_mass_matches_analytic() {
        let shape = Shape::sphere(0.5);
        let data = shape.mass_data(2.0);
        let expected = 2.0 * (4.0 / 3.0) * PI * 0.125;
        assert_relative_eq!(data.mass, expected, epsilon = 1e-4);
    }

    #[test]
    fn box_ray_cast_reports_entry_face() {
        let shape = Shape::cuboid(Vec3::splat(0.5));
        let xf = Transform::IDENTITY;
        let hit = shape
            .ray_cast(&xf, Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0), 1.0)
            .unwrap();
        assert_relative_eq!(hit.fraction, 0.45, epsilon = 1e-4);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn capsule_ray_cast_hits_side_and_cap() {
        let shape = Shape::capsule(Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, 0.5, 0.0), 0.25);
        let xf = Transform::IDENTITY;

        let side = shape
            .ray_cast(&xf, Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), 1.0)
            .unwrap();
        assert_relative_eq!(side.normal.x, -1.0, epsilon = 1e-3);

        let cap = shape
            .ray_cast(&xf, Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, -3.0, 0.0), 1.0)
            .unwrap();
        assert!(cap.normal.y > 0.9);
    }

    #[test]
    fn mesh_ray_cast_descends_bvh() {
        let mesh = Arc::new(TriangleMesh::grid(8, 8, 1.0, |_, _| 0.0));
        let shape = Shape::mesh(mesh);
        let xf = Transform::IDENTITY;
        let hit = shape
            .ray_cast(&xf, Vec3::new(0.2, 2.0, 0.2), Vec3::new(0.2, -2.0, 0.2), 1.0)
            .unwrap();
        assert_relative_eq!(hit.fraction, 0.5, epsilon = 1e-4);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn cylinder_mass_tracks_the_analytic_volume() {
        let shape = Shape::cylinder(1.0, 0.5);
        let data = shape.mass_data(2.0);
        // A 16-gon prism carries slightly less volume than the round
        // cylinder it approximates.
        let analytic = 2.0 * PI * 0.25 * 2.0;
        assert!(data.mass < analytic);
        assert!(data.mass > 0.95 * analytic, "mass {}", data.mass);
        assert!(data.center.length() < 1e-4);
    }

    #[test]
    fn cylinder_aabb_and_ray_cast_use_the_boundary_hull() {
        let shape = Shape::cylinder(1.0, 0.5);
        let xf = Transform::IDENTITY;

        let aabb = shape.compute_aabb(&xf);
        assert_relative_eq!(aabb.max.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(aabb.max.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(aabb.max.z, 0.5, epsilon = 1e-5);

        // Down the axis onto the top cap.
        let top = shape
            .ray_cast(&xf, Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, -3.0, 0.0), 1.0)
            .unwrap();
        assert_relative_eq!(top.fraction, 2.0 / 6.0, epsilon = 1e-4);
        assert!(top.normal.y > 0.999);

        // Sideways into the wall; the hit sits on a flat of the 16-gon.
        let side = shape
            .ray_cast(&xf, Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0), 1.0)
            .unwrap();
        assert!(side.normal.x < -0.9);
        assert!((0.44..=0.46).contains(&side.fraction), "t={}", side.fraction);
    }

    #[test]
    fn cylinder_dispatches_as_a_hull() {
        let shape = Shape::cylinder(1.0, 0.5);
        assert_eq!(shape.kind(), ShapeKind::Hull);
        assert!(shape.as_hull().is_some());
    }

    #[test]
    fn gjk_proxy_support_is_extreme() {
        let shape = Shape::cuboid(Vec3::ONE);
        let proxy = shape.gjk_proxy(0);
        let idx = proxy.support(Vec3::new(1.0, -1.0, 1.0));
        let v = proxy.vertex(idx);
        assert_relative_eq!(v.x, 1.0);
        assert_relative_eq!(v.y, -1.0);
        assert_relative_eq!(v.z, 1.0);
    }
}
