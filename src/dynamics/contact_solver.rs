use arrayvec::ArrayVec;
use glam::{Mat3, Quat, Vec3};

use crate::config;
use crate::core::transform::Transform;

use super::island::{Position, SolverProps, Velocity};

/// Velocity-constraint block for one contact point.
#[derive(Debug, Clone, Copy)]
struct PointConstraint {
    r_a: Vec3,
    r_b: Vec3,
    local_point_a: Vec3,
    local_point_b: Vec3,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    velocity_bias: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

/// Constraint block for one manifold of a contact.
#[derive(Debug, Clone)]
struct ManifoldConstraint {
    /// Index of the source manifold inside the contact.
    manifold_index: usize,
    normal: Vec3,
    tangent1: Vec3,
    tangent2: Vec3,
    local_normal: Vec3,
    points: ArrayVec<PointConstraint, { config::MAX_MANIFOLD_POINTS }>,
}

/// All manifold blocks of one contact, plus the body data they touch.
#[derive(Debug, Clone)]
pub(crate) struct ContactConstraint {
    /// Position of this contact in the island's contact list.
    pub island_contact: usize,
    index_a: usize,
    index_b: usize,
    friction: f32,
    restitution: f32,
    radius_a: f32,
    radius_b: f32,
    manifolds: Vec<ManifoldConstraint>,
}

/// Input for building one contact constraint.
pub(crate) struct ContactConstraintSource<'a> {
    pub island_contact: usize,
    pub index_a: usize,
    pub index_b: usize,
    pub friction: f32,
    pub restitution: f32,
    pub radius_a: f32,
    pub radius_b: f32,
    pub manifolds: &'a [crate::collision::manifold::Manifold],
}

/// Sequential-impulse contact solver over one island.
///
/// The velocity pass solves friction rows inside the cone then the normal
/// row with accumulated clamping; the position pass applies pseudo
/// impulses directly to the position/orientation state.
pub(crate) struct ContactSolver {
    constraints: Vec<ContactConstraint>,
}

fn body_transform(position: &Position, local_center: Vec3) -> Transform {
    Transform {
        position: position.c - position.q * local_center,
        rotation: position.q,
    }
}

impl ContactSolver {
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Builds effective masses and restitution bias for every point.
    #[allow(clippy::too_many_arguments)]
    pub fn add_constraint(
        &mut self,
        source: ContactConstraintSource<'_>,
        positions: &[Position],
        velocities: &[Velocity],
        inv_inertias: &[Mat3],
        props: &[SolverProps],
    ) {
        let index_a = source.index_a;
        let index_b = source.index_b;
        let xf_a = body_transform(&positions[index_a], props[index_a].local_center);
        let xf_b = body_transform(&positions[index_b], props[index_b].local_center);

        let inv_mass_sum = props[index_a].inv_mass + props[index_b].inv_mass;
        let i_a = inv_inertias[index_a];
        let i_b = inv_inertias[index_b];

        let mut constraint = ContactConstraint {
            island_contact: source.island_contact,
            index_a,
            index_b,
            friction: source.friction,
            restitution: source.restitution,
            radius_a: source.radius_a,
            radius_b: source.radius_b,
            manifolds: Vec::with_capacity(source.manifolds.len()),
        };

        for (manifold_index, manifold) in source.manifolds.iter().enumerate() {
            let world =
                crate::collision::manifold::WorldManifold::initialize(
                    manifold,
                    &xf_a,
                    source.radius_a,
                    &xf_b,
                    source.radius_b,
                );
            if world.points.is_empty() {
                continue;
            }

            let mut block = ManifoldConstraint {
                manifold_index,
                normal: world.normal,
                tangent1: world.tangent1,
                tangent2: world.tangent2,
                local_normal: manifold.local_normal,
                points: ArrayVec::new(),
            };

            for (point, world_point) in manifold.points.iter().zip(world.points.iter()) {
                let r_a = world_point.point - positions[index_a].c;
                let r_b = world_point.point - positions[index_b].c;

                let kn = effective_mass(world.normal, r_a, r_b, inv_mass_sum, &i_a, &i_b);
                let kt1 = effective_mass(world.tangent1, r_a, r_b, inv_mass_sum, &i_a, &i_b);
                let kt2 = effective_mass(world.tangent2, r_a, r_b, inv_mass_sum, &i_a, &i_b);

                // Restitution only above the threshold speed.
                let dv = velocities[index_b].v + velocities[index_b].w.cross(r_b)
                    - velocities[index_a].v
                    - velocities[index_a].w.cross(r_a);
                let vn = dv.dot(world.normal);
                let velocity_bias = if vn < -config::VELOCITY_THRESHOLD {
                    -source.restitution * vn
                } else {
                    0.0
                };

                block.points.push(PointConstraint {
                    r_a,
                    r_b,
                    local_point_a: point.local_point_a,
                    local_point_b: point.local_point_b,
                    normal_mass: kn,
                    tangent_mass: [kt1, kt2],
                    velocity_bias,
                    normal_impulse: point.normal_impulse,
                    tangent_impulse: point.tangent_impulse,
                });
            }

            constraint.manifolds.push(block);
        }

        if !constraint.manifolds.is_empty() {
            self.constraints.push(constraint);
        }
    }

    /// Applies last frame's impulses before the first iteration.
    pub fn warm_start(
        &mut self,
        velocities: &mut [Velocity],
        inv_inertias: &[Mat3],
        props: &[SolverProps],
    ) {
        for constraint in &self.constraints {
            for manifold in &constraint.manifolds {
                for point in manifold.points.iter() {
                    let impulse = point.normal_impulse * manifold.normal
                        + point.tangent_impulse[0] * manifold.tangent1
                        + point.tangent_impulse[1] * manifold.tangent2;
                    apply_impulse(
                        velocities,
                        inv_inertias,
                        props,
                        constraint.index_a,
                        constraint.index_b,
                        point.r_a,
                        point.r_b,
                        impulse,
                    );
                }
            }
        }
    }

    /// One Gauss–Seidel sweep over every contact point.
    pub fn solve_velocity(
        &mut self,
        velocities: &mut [Velocity],
        inv_inertias: &[Mat3],
        props: &[SolverProps],
    ) {
        for constraint in self.constraints.iter_mut() {
            let (ia, ib) = (constraint.index_a, constraint.index_b);

            for manifold in constraint.manifolds.iter_mut() {
                for point in manifold.points.iter_mut() {
                    // Friction rows first, clamped to the cone around the
                    // current normal impulse.
                    let max_friction = constraint.friction * point.normal_impulse;
                    for (axis, tangent) in [manifold.tangent1, manifold.tangent2]
                        .into_iter()
                        .enumerate()
                    {
                        let dv = velocities[ib].v + velocities[ib].w.cross(point.r_b)
                            - velocities[ia].v
                            - velocities[ia].w.cross(point.r_a);
                        let vt = dv.dot(tangent);
                        let lambda = -point.tangent_mass[axis] * vt;

                        let old = point.tangent_impulse[axis];
                        let new = (old + lambda).clamp(-max_friction, max_friction);
                        point.tangent_impulse[axis] = new;

                        apply_impulse(
                            velocities,
                            inv_inertias,
                            props,
                            ia,
                            ib,
                            point.r_a,
                            point.r_b,
                            (new - old) * tangent,
                        );
                    }

                    // Normal row with accumulated clamping.
                    let dv = velocities[ib].v + velocities[ib].w.cross(point.r_b)
                        - velocities[ia].v
                        - velocities[ia].w.cross(point.r_a);
                    let vn = dv.dot(manifold.normal);
                    let lambda = -point.normal_mass * (vn - point.velocity_bias);

                    let old = point.normal_impulse;
                    let new = (old + lambda).max(0.0);
                    point.normal_impulse = new;

                    apply_impulse(
                        velocities,
                        inv_inertias,
                        props,
                        ia,
                        ib,
                        point.r_a,
                        point.r_b,
                        (new - old) * manifold.normal,
                    );
                }
            }
        }
    }

    /// Writes accumulated impulses back into manifold points for next
    /// frame's warm start. Returns `(manifold index, point index, normal,
    /// tangents)` tuples through the callback.
    pub fn store_impulses(
        &self,
        mut store: impl FnMut(usize, usize, usize, f32, [f32; 2]),
    ) {
        for constraint in &self.constraints {
            for manifold in constraint.manifolds.iter() {
                for (p, point) in manifold.points.iter().enumerate() {
                    store(
                        constraint.island_contact,
                        manifold.manifold_index,
                        p,
                        point.normal_impulse,
                        point.tangent_impulse,
                    );
                }
            }
        }
    }

    /// Pseudo-velocity position pass. Returns true when every point's
    /// separation is within the convergence envelope.
    pub fn solve_position(
        &self,
        positions: &mut [Position],
        inv_inertias: &[Mat3],
        props: &[SolverProps],
    ) -> bool {
        let mut min_separation = 0.0_f32;

        for constraint in &self.constraints {
            let (ia, ib) = (constraint.index_a, constraint.index_b);

            for manifold in &constraint.manifolds {
                for point in manifold.points.iter() {
                    let xf_a = body_transform(&positions[ia], props[ia].local_center);
                    let xf_b = body_transform(&positions[ib], props[ib].local_center);

                    let normal = xf_a.transform_vector(manifold.local_normal);
                    let c_a =
                        xf_a.transform_point(point.local_point_a) + constraint.radius_a * normal;
                    let c_b =
                        xf_b.transform_point(point.local_point_b) - constraint.radius_b * normal;
                    let separation = (c_b - c_a).dot(normal);
                    min_separation = min_separation.min(separation);

                    let world_point = 0.5 * (c_a + c_b);
                    let r_a = world_point - positions[ia].c;
                    let r_b = world_point - positions[ib].c;

                    // Clamped Baumgarte correction.
                    let correction = (config::BAUMGARTE * (separation + config::LINEAR_SLOP))
                        .clamp(-config::MAX_LINEAR_CORRECTION, 0.0);

                    let k = effective_mass(
                        normal,
                        r_a,
                        r_b,
                        props[ia].inv_mass + props[ib].inv_mass,
                        &inv_inertias[ia],
                        &inv_inertias[ib],
                    );
                    let impulse = -k * correction * normal;

                    apply_position_impulse(
                        positions,
                        inv_inertias,
                        props,
                        ia,
                        ib,
                        r_a,
                        r_b,
                        impulse,
                    );
                }
            }
        }

        min_separation >= -3.0 * config::LINEAR_SLOP
    }
}

/// Inverse of the scalar effective mass along `axis` at the two lever
/// arms.
fn effective_mass(axis: Vec3, r_a: Vec3, r_b: Vec3, inv_mass: f32, i_a: &Mat3, i_b: &Mat3) -> f32 {
    let rn_a = r_a.cross(axis);
    let rn_b = r_b.cross(axis);
    let k = inv_mass + rn_a.dot(*i_a * rn_a) + rn_b.dot(*i_b * rn_b);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_impulse(
    velocities: &mut [Velocity],
    inv_inertias: &[Mat3],
    props: &[SolverProps],
    ia: usize,
    ib: usize,
    r_a: Vec3,
    r_b: Vec3,
    impulse: Vec3,
) {
    velocities[ia].v -= props[ia].inv_mass * impulse;
    velocities[ia].w -= inv_inertias[ia] * r_a.cross(impulse);
    velocities[ib].v += props[ib].inv_mass * impulse;
    velocities[ib].w += inv_inertias[ib] * r_b.cross(impulse);
}

#[allow(clippy::too_many_arguments)]
fn apply_position_impulse(
    positions: &mut [Position],
    inv_inertias: &[Mat3],
    props: &[SolverProps],
    ia: usize,
    ib: usize,
    r_a: Vec3,
    r_b: Vec3,
    impulse: Vec3,
) {
    positions[ia].c -= props[ia].inv_mass * impulse;
    let w_a = inv_inertias[ia] * r_a.cross(impulse);
    positions[ia].q = integrate_small_rotation(positions[ia].q, -w_a);

    positions[ib].c += props[ib].inv_mass * impulse;
    let w_b = inv_inertias[ib] * r_b.cross(impulse);
    positions[ib].q = integrate_small_rotation(positions[ib].q, w_b);
}

fn integrate_small_rotation(q: Quat, w: Vec3) -> Quat {
    crate::core::transform::integrate_orientation(q, w, 1.0)
}
