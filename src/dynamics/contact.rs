use arrayvec::ArrayVec;
use glam::Vec3;

use crate::collision::cluster::{cluster_manifolds, ClusterObservation};
use crate::collision::collide::{
    collide_capsule_sphere, collide_capsules, collide_hull_capsule, collide_hull_sphere,
    collide_hulls, collide_spheres, collide_triangle_capsule, collide_triangle_hull,
    collide_triangle_sphere, ConvexCache,
};
use crate::collision::gjk::gjk_distance;
use crate::collision::manifold::{Manifold, WorldManifold};
use crate::config::{self, MAX_MANIFOLDS};
use crate::core::aabb::Aabb;
use crate::core::fixture::FixtureId;
use crate::core::shape::{Shape, ShapeKind};
use crate::core::transform::Transform;
use crate::utils::arena::Id;

pub type ContactId = Id<Contact>;

/// Cached feature state for one mesh triangle overlapping the other shape.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TriangleCache {
    pub index: u32,
    pub cache: ConvexCache,
}

/// Extra state carried by mesh contacts: a fat AABB of the convex shape
/// in the mesh's frame and the BVH query results against it.
#[derive(Debug, Clone)]
pub(crate) struct MeshContactState {
    pub aabb: Aabb,
    pub moved: bool,
    pub triangles: Vec<TriangleCache>,
}

/// Edge in the contact graph between two fixtures.
///
/// Fixture A always holds the canonical side of the dispatch table (mesh
/// before hull before triangle before capsule before sphere), arranged at
/// creation time.
#[derive(Debug, Clone)]
pub struct Contact {
    pub fixture_a: FixtureId,
    pub fixture_b: FixtureId,
    pub manifolds: ArrayVec<Manifold, MAX_MANIFOLDS>,
    /// Mixed friction coefficient of the two fixtures.
    pub friction: f32,
    /// Mixed restitution coefficient of the two fixtures.
    pub restitution: f32,
    pub(crate) cache: ConvexCache,
    pub(crate) overlapping: bool,
    pub(crate) island_flag: bool,
    pub(crate) mesh: Option<MeshContactState>,
}

/// Geometric mean, so a frictionless material kills friction entirely.
pub fn mix_friction(a: f32, b: f32) -> f32 {
    (a * b).sqrt()
}

/// The bouncier surface wins.
pub fn mix_restitution(a: f32, b: f32) -> f32 {
    a.max(b)
}

/// Decides the canonical fixture order for a shape pair. Returns `None`
/// for pairs with no collision routine (mesh–mesh and the triangle
/// combinations static geometry never needs).
pub(crate) fn dispatch_order(a: ShapeKind, b: ShapeKind) -> Option<bool> {
    use ShapeKind::*;
    match (a, b) {
        (Sphere, Sphere)
        | (Capsule, Sphere)
        | (Capsule, Capsule)
        | (Triangle, Sphere)
        | (Triangle, Capsule)
        | (Triangle, Hull)
        | (Hull, Sphere)
        | (Hull, Capsule)
        | (Hull, Hull)
        | (Mesh, Sphere)
        | (Mesh, Capsule)
        | (Mesh, Hull) => Some(false),
        (Sphere, Capsule)
        | (Sphere, Triangle)
        | (Capsule, Triangle)
        | (Hull, Triangle)
        | (Sphere, Hull)
        | (Capsule, Hull)
        | (Sphere, Mesh)
        | (Capsule, Mesh)
        | (Hull, Mesh) => Some(true),
        _ => None,
    }
}

impl Contact {
    pub(crate) fn new(
        fixture_a: FixtureId,
        fixture_b: FixtureId,
        shape_a: &Shape,
        friction: f32,
        restitution: f32,
    ) -> Self {
        let mesh = match shape_a {
            Shape::Mesh { .. } => Some(MeshContactState {
                aabb: Aabb::empty(),
                moved: true,
                triangles: Vec::new(),
            }),
            _ => None,
        };
        Self {
            fixture_a,
            fixture_b,
            manifolds: ArrayVec::new(),
            friction,
            restitution,
            cache: ConvexCache::default(),
            overlapping: false,
            island_flag: false,
            mesh,
        }
    }

    pub fn is_overlapping(&self) -> bool {
        self.overlapping
    }

    /// Total number of contact points across all manifolds.
    pub fn point_count(&self) -> usize {
        self.manifolds.iter().map(|m| m.points.len()).sum()
    }

    /// Regenerates the manifolds for the current transforms, then copies
    /// persistent impulses from the previous frame's points by feature key.
    pub(crate) fn evaluate(
        &mut self,
        shape_a: &Shape,
        xf_a: &Transform,
        shape_b: &Shape,
        xf_b: &Transform,
        warm_start: bool,
    ) {
        let old_manifolds = std::mem::take(&mut self.manifolds);

        if self.mesh.is_some() {
            self.evaluate_mesh(shape_a, xf_a, shape_b, xf_b);
        } else {
            self.evaluate_convex(shape_a, xf_a, shape_b, xf_b);
        }

        if warm_start {
            for manifold in self.manifolds.iter_mut() {
                for old in old_manifolds.iter() {
                    manifold.warm_start_from(old);
                }
            }
        }
    }

    fn evaluate_convex(
        &mut self,
        shape_a: &Shape,
        xf_a: &Transform,
        shape_b: &Shape,
        xf_b: &Transform,
    ) {
        let mut manifold = Manifold::default();

        match (shape_a, shape_b) {
            (
                Shape::Sphere {
                    center: ca,
                    radius: ra,
                },
                Shape::Sphere {
                    center: cb,
                    radius: rb,
                },
            ) => collide_spheres(&mut manifold, xf_a, *ca, *ra, xf_b, *cb, *rb),
            (
                Shape::Capsule {
                    point1,
                    point2,
                    radius: ra,
                },
                Shape::Sphere {
                    center: cb,
                    radius: rb,
                },
            ) => collide_capsule_sphere(
                &mut manifold,
                xf_a,
                *point1,
                *point2,
                *ra,
                xf_b,
                *cb,
                *rb,
            ),
            (
                Shape::Capsule {
                    point1: a1,
                    point2: a2,
                    radius: ra,
                },
                Shape::Capsule {
                    point1: b1,
                    point2: b2,
                    radius: rb,
                },
            ) => collide_capsules(&mut manifold, xf_a, *a1, *a2, *ra, xf_b, *b1, *b2, *rb),
            (
                Shape::Triangle {
                    v1,
                    v2,
                    v3,
                    wing1,
                    wing2,
                    wing3,
                    radius: ra,
                },
                Shape::Sphere {
                    center: cb,
                    radius: rb,
                },
            ) => collide_triangle_sphere(
                &mut manifold,
                xf_a,
                *v1,
                *v2,
                *v3,
                [*wing1, *wing2, *wing3],
                *ra,
                xf_b,
                *cb,
                *rb,
            ),
            (
                Shape::Triangle {
                    v1,
                    v2,
                    v3,
                    wing1,
                    wing2,
                    wing3,
                    radius: ra,
                },
                Shape::Capsule {
                    point1,
                    point2,
                    radius: rb,
                },
            ) => collide_triangle_capsule(
                &mut manifold,
                xf_a,
                *v1,
                *v2,
                *v3,
                [*wing1, *wing2, *wing3],
                *ra,
                xf_b,
                *point1,
                *point2,
                *rb,
            ),
            (
                Shape::Triangle {
                    v1,
                    v2,
                    v3,
                    radius: ra,
                    ..
                },
                _,
            ) if shape_b.as_hull().is_some() => {
                let (hb, rb) = shape_b.as_hull().unwrap();
                collide_triangle_hull(
                    &mut manifold,
                    xf_a,
                    *v1,
                    *v2,
                    *v3,
                    *ra,
                    xf_b,
                    hb,
                    rb,
                    &mut self.cache.sat,
                );
            }
            // Hull-backed shapes (hulls and cylinders) share the hull
            // routines.
            _ => match (shape_a.as_hull(), shape_b.as_hull()) {
                (Some((ha, ra)), Some((hb, rb))) => {
                    collide_hulls(
                        &mut manifold,
                        xf_a,
                        ha,
                        ra,
                        xf_b,
                        hb,
                        rb,
                        &mut self.cache.sat,
                    );
                }
                (Some((ha, ra)), None) => match shape_b {
                    Shape::Sphere {
                        center: cb,
                        radius: rb,
                    } => collide_hull_sphere(&mut manifold, xf_a, ha, ra, xf_b, *cb, *rb),
                    Shape::Capsule {
                        point1,
                        point2,
                        radius: rb,
                    } => collide_hull_capsule(
                        &mut manifold,
                        xf_a,
                        ha,
                        ra,
                        xf_b,
                        *point1,
                        *point2,
                        *rb,
                    ),
                    _ => log::warn!(
                        "no collision routine for pair {:?}/{:?}",
                        shape_a.kind(),
                        shape_b.kind()
                    ),
                },
                _ => log::warn!(
                    "no collision routine for pair {:?}/{:?}",
                    shape_a.kind(),
                    shape_b.kind()
                ),
            },
        }

        if !manifold.points.is_empty() {
            self.manifolds.push(manifold);
        }
    }

    /// Mesh against a convex shape: collide each cached triangle, then
    /// reduce the raw manifolds through the cluster solver.
    fn evaluate_mesh(
        &mut self,
        shape_a: &Shape,
        xf_a: &Transform,
        shape_b: &Shape,
        xf_b: &Transform,
    ) {
        let state = self.mesh.as_mut().expect("mesh contact without state");
        let mut observations: Vec<ClusterObservation> = Vec::new();
        let mut manifold = Manifold::default();

        for entry in state.triangles.iter_mut() {
            let triangle = shape_a.child_triangle(entry.index);
            manifold.clear();

            match (&triangle, shape_b) {
                (
                    Shape::Triangle {
                        v1,
                        v2,
                        v3,
                        wing1,
                        wing2,
                        wing3,
                        radius: ra,
                    },
                    Shape::Sphere {
                        center: cb,
                        radius: rb,
                    },
                ) => collide_triangle_sphere(
                    &mut manifold,
                    xf_a,
                    *v1,
                    *v2,
                    *v3,
                    [*wing1, *wing2, *wing3],
                    *ra,
                    xf_b,
                    *cb,
                    *rb,
                ),
                (
                    Shape::Triangle {
                        v1,
                        v2,
                        v3,
                        wing1,
                        wing2,
                        wing3,
                        radius: ra,
                    },
                    Shape::Capsule {
                        point1,
                        point2,
                        radius: rb,
                    },
                ) => collide_triangle_capsule(
                    &mut manifold,
                    xf_a,
                    *v1,
                    *v2,
                    *v3,
                    [*wing1, *wing2, *wing3],
                    *ra,
                    xf_b,
                    *point1,
                    *point2,
                    *rb,
                ),
                (
                    Shape::Triangle {
                        v1, v2, v3, radius: ra, ..
                    },
                    _,
                ) if shape_b.as_hull().is_some() => {
                    let (hb, rb) = shape_b.as_hull().unwrap();
                    collide_triangle_hull(
                        &mut manifold,
                        xf_a,
                        *v1,
                        *v2,
                        *v3,
                        *ra,
                        xf_b,
                        hb,
                        rb,
                        &mut entry.cache.sat,
                    );
                }
                _ => continue,
            }

            // Depth per point for the reducer, from the current transforms.
            let world = WorldManifold::initialize(
                &manifold,
                xf_a,
                shape_a.radius(),
                xf_b,
                shape_b.radius(),
            );
            for (point, world_point) in manifold.points.iter().zip(world.points.iter()) {
                let mut key = point.key;
                key.triangle = entry.index;
                observations.push(ClusterObservation {
                    local_point_a: point.local_point_a,
                    local_point_b: point.local_point_b,
                    normal: manifold.local_normal,
                    depth: -world_point.separation,
                    key,
                });
            }
        }

        self.manifolds = cluster_manifolds(&observations);
    }

    /// Sensor overlap test: GJK distance within tolerance. Mesh sensors
    /// test their cached triangles.
    pub(crate) fn test_overlap(
        &self,
        shape_a: &Shape,
        xf_a: &Transform,
        shape_b: &Shape,
        xf_b: &Transform,
    ) -> bool {
        let tolerance = 10.0 * f32::EPSILON + config::LINEAR_SLOP;
        match &self.mesh {
            Some(state) => state.triangles.iter().any(|entry| {
                let proxy_a = shape_a.gjk_proxy(entry.index);
                let proxy_b = shape_b.gjk_proxy(0);
                gjk_distance(xf_a, &proxy_a, xf_b, &proxy_b, true, None).distance <= tolerance
            }),
            None => {
                let proxy_a = shape_a.gjk_proxy(0);
                let proxy_b = shape_b.gjk_proxy(0);
                gjk_distance(xf_a, &proxy_a, xf_b, &proxy_b, true, None).distance <= tolerance
            }
        }
    }

    /// Recomputes the convex shape's AABB in the mesh's frame, keeping the
    /// fat box when it still contains the tight one (the mesh-frame analog
    /// of the broad-phase proxy policy).
    pub(crate) fn synchronize_mesh(
        &mut self,
        shape_a: &Shape,
        xf_a: &Transform,
        shape_b: &Shape,
        xf_b: &Transform,
        displacement: Vec3,
    ) {
        let Some(state) = self.mesh.as_mut() else {
            return;
        };
        let scale = match shape_a {
            Shape::Mesh { scale, .. } => *scale,
            _ => 1.0,
        };

        // Shape B's AABB in mesh-local, unscaled coordinates.
        let xf = xf_a.mul_transpose(xf_b);
        let mut aabb = shape_b.compute_aabb(&xf);
        aabb.scale(Vec3::splat(1.0 / scale));

        if state.aabb.contains(&aabb) {
            state.moved = false;
            return;
        }

        let mut fat = aabb.extended(config::AABB_EXTENSION);
        let local_displacement = xf_a.inverse_transform_vector(displacement) / scale;
        fat.extend_towards(config::AABB_MULTIPLIER * local_displacement);
        state.aabb = fat;
        state.moved = true;
    }

    /// Re-queries the mesh BVH when the tracked AABB moved, carrying SAT
    /// caches over for triangles that persist.
    pub(crate) fn find_mesh_pairs(&mut self, shape_a: &Shape) {
        let Some(state) = self.mesh.as_mut() else {
            return;
        };
        if !state.moved {
            return;
        }

        let Shape::Mesh { mesh, .. } = shape_a else {
            return;
        };

        let old = std::mem::take(&mut state.triangles);
        mesh.bvh().query(&state.aabb, |triangle| {
            let cache = old
                .iter()
                .find(|entry| entry.index == triangle)
                .map(|entry| entry.cache)
                .unwrap_or_default();
            state.triangles.push(TriangleCache {
                index: triangle,
                cache,
            });
            true
        });
        state.moved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_order_covers_the_matrix() {
        use ShapeKind::*;
        // Primary pairs keep their order.
        assert_eq!(dispatch_order(Hull, Sphere), Some(false));
        assert_eq!(dispatch_order(Mesh, Hull), Some(false));
        assert_eq!(dispatch_order(Triangle, Hull), Some(false));
        // Reversed pairs swap.
        assert_eq!(dispatch_order(Sphere, Hull), Some(true));
        assert_eq!(dispatch_order(Hull, Triangle), Some(true));
        // Unsupported pairs produce no contact.
        assert_eq!(dispatch_order(Mesh, Mesh), None);
        assert_eq!(dispatch_order(Triangle, Triangle), None);
        assert_eq!(dispatch_order(Mesh, Triangle), None);
    }

    #[test]
    fn friction_and_restitution_mixing() {
        assert!((mix_friction(0.5, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
        assert_eq!(mix_restitution(0.2, 0.8), 0.8);
    }
}
