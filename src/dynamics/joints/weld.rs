use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::{point_mass_matrix, rotation_error, solve_mat3, JointContext};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeldJointDef {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// World-space weld anchor.
    pub anchor: Vec3,
    pub collide_linked: bool,
}

impl WeldJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            anchor,
            collide_linked: false,
        }
    }
}

/// Rigid weld: pins the anchor and locks all relative rotation.
#[derive(Debug, Clone)]
pub struct WeldJoint {
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    reference_rotation: Quat,

    point_impulse: Vec3,
    angular_impulse: Vec3,

    r_a: Vec3,
    r_b: Vec3,
    point_mass: Mat3,
    angular_mass_matrix: Mat3,
}

impl WeldJoint {
    pub(crate) fn new(def: &WeldJointDef, xf_a: &Transform, xf_b: &Transform) -> Self {
        Self {
            local_anchor_a: xf_a.inverse_transform_point(def.anchor),
            local_anchor_b: xf_b.inverse_transform_point(def.anchor),
            reference_rotation: xf_a.rotation.conjugate() * xf_b.rotation,
            point_impulse: Vec3::ZERO,
            angular_impulse: Vec3::ZERO,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            point_mass: Mat3::ZERO,
            angular_mass_matrix: Mat3::ZERO,
        }
    }

    pub(crate) fn initialize(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        let q_a = ctx.positions[ia].q;
        let q_b = ctx.positions[ib].q;
        self.r_a = q_a * (self.local_anchor_a - ctx.props[ia].local_center);
        self.r_b = q_b * (self.local_anchor_b - ctx.props[ib].local_center);

        self.point_mass = point_mass_matrix(
            ctx.props[ia].inv_mass + ctx.props[ib].inv_mass,
            self.r_a,
            self.r_b,
            &ctx.inv_inertias[ia],
            &ctx.inv_inertias[ib],
        );
        self.angular_mass_matrix = ctx.inv_inertias[ia] + ctx.inv_inertias[ib];
    }

    pub(crate) fn warm_start(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, self.point_impulse);
        ctx.apply_angular_impulse(ia, ib, self.angular_impulse);
    }

    pub(crate) fn solve_velocity(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        let w_rel = ctx.velocities[ib].w - ctx.velocities[ia].w;
        let angular = solve_mat3(&self.angular_mass_matrix, -w_rel);
        self.angular_impulse += angular;
        ctx.apply_angular_impulse(ia, ib, angular);

        let c_dot = ctx.anchor_velocity(ia, ib, self.r_a, self.r_b);
        let impulse = solve_mat3(&self.point_mass, -c_dot);
        self.point_impulse += impulse;
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, impulse);
    }

    pub(crate) fn solve_position(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) -> bool {
        let error = rotation_error(ctx.positions[ia].q, ctx.positions[ib].q, self.reference_rotation);
        let angular_error = error.length();
        if angular_error > config::ANGULAR_SLOP {
            let clamped = if angular_error > config::MAX_ANGULAR_CORRECTION {
                error * (config::MAX_ANGULAR_CORRECTION / angular_error)
            } else {
                error
            };
            let k = ctx.inv_inertias[ia] + ctx.inv_inertias[ib];
            let impulse = solve_mat3(&k, -clamped);
            ctx.apply_angular_position_impulse(ia, ib, impulse);
        }

        let xf_a = ctx.transform(ia);
        let xf_b = ctx.transform(ib);
        let r_a = xf_a.transform_point(self.local_anchor_a) - ctx.positions[ia].c;
        let r_b = xf_b.transform_point(self.local_anchor_b) - ctx.positions[ib].c;
        let c = (ctx.positions[ib].c + r_b) - (ctx.positions[ia].c + r_a);
        let linear_error = c.length();

        if linear_error > config::LINEAR_SLOP {
            let clamped = if linear_error > config::MAX_LINEAR_CORRECTION {
                c * (config::MAX_LINEAR_CORRECTION / linear_error)
            } else {
                c
            };
            let k = point_mass_matrix(
                ctx.props[ia].inv_mass + ctx.props[ib].inv_mass,
                r_a,
                r_b,
                &ctx.inv_inertias[ia],
                &ctx.inv_inertias[ib],
            );
            let impulse = solve_mat3(&k, -clamped);
            ctx.apply_position_impulse(ia, ib, r_a, r_b, impulse);
        }

        linear_error <= config::LINEAR_SLOP && angular_error <= config::ANGULAR_SLOP
    }
}
