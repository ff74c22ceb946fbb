use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::{angular_mass, point_mass_matrix, solve_mat3, JointContext};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConeJointDef {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// World-space socket anchor.
    pub anchor: Vec3,
    /// World-space cone axis at creation.
    pub axis: Vec3,
    /// Full opening angle of the cone.
    pub cone_angle: f32,
    pub enable_limit: bool,
    pub collide_linked: bool,
}

impl ConeJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor: Vec3, axis: Vec3, cone_angle: f32) -> Self {
        Self {
            body_a,
            body_b,
            anchor,
            axis,
            cone_angle,
            enable_limit: true,
            collide_linked: false,
        }
    }
}

/// Ball-and-socket with a swing cone: the anchor is pinned and the angle
/// between the two body axes is kept below half the cone opening.
#[derive(Debug, Clone)]
pub struct ConeJoint {
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    local_axis_a: Vec3,
    local_axis_b: Vec3,
    half_angle: f32,
    pub enable_limit: bool,

    point_impulse: Vec3,
    limit_impulse: f32,

    r_a: Vec3,
    r_b: Vec3,
    point_mass: Mat3,
    swing_axis: Vec3,
    swing_mass: f32,
    limit_active: bool,
}

impl ConeJoint {
    pub(crate) fn new(def: &ConeJointDef, xf_a: &Transform, xf_b: &Transform) -> Self {
        let axis = def.axis.normalize_or_zero();
        Self {
            local_anchor_a: xf_a.inverse_transform_point(def.anchor),
            local_anchor_b: xf_b.inverse_transform_point(def.anchor),
            local_axis_a: xf_a.inverse_transform_vector(axis),
            local_axis_b: xf_b.inverse_transform_vector(axis),
            half_angle: 0.5 * def.cone_angle,
            enable_limit: def.enable_limit,
            point_impulse: Vec3::ZERO,
            limit_impulse: 0.0,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            point_mass: Mat3::ZERO,
            swing_axis: Vec3::ZERO,
            swing_mass: 0.0,
            limit_active: false,
        }
    }

    fn swing_state(&self, ctx: &JointContext, ia: usize, ib: usize) -> (Vec3, f32) {
        let axis_a = (ctx.positions[ia].q * self.local_axis_a).normalize_or_zero();
        let axis_b = (ctx.positions[ib].q * self.local_axis_b).normalize_or_zero();
        let angle = axis_a.dot(axis_b).clamp(-1.0, 1.0).acos();
        let swing = axis_a.cross(axis_b).normalize_or_zero();
        (swing, angle)
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

        let (swing, angle) = self.swing_state(ctx, ia, ib);
        self.limit_active = self.enable_limit && angle >= self.half_angle && swing != Vec3::ZERO;
        if self.limit_active {
            self.swing_axis = swing;
            self.swing_mass = angular_mass(swing, &ctx.inv_inertias[ia], &ctx.inv_inertias[ib]);
        } else {
            self.limit_impulse = 0.0;
        }
    }

    pub(crate) fn warm_start(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, self.point_impulse);
        if self.limit_active {
            ctx.apply_angular_impulse(ia, ib, self.limit_impulse * self.swing_axis);
        }
    }

    pub(crate) fn solve_velocity(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        // Swing limit: block further opening of the cone.
        if self.limit_active && self.swing_mass > 0.0 {
            let w_rel = (ctx.velocities[ib].w - ctx.velocities[ia].w).dot(self.swing_axis);
            let lambda = -self.swing_mass * w_rel;
            let old = self.limit_impulse;
            self.limit_impulse = (old + lambda).min(0.0);
            ctx.apply_angular_impulse(ia, ib, (self.limit_impulse - old) * self.swing_axis);
        }

        let c_dot = ctx.anchor_velocity(ia, ib, self.r_a, self.r_b);
        let impulse = solve_mat3(&self.point_mass, -c_dot);
        self.point_impulse += impulse;
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, impulse);
    }

    pub(crate) fn solve_position(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) -> bool {
        // Swing overflow.
        let (swing, angle) = self.swing_state(ctx, ia, ib);
        let mut angular_error = 0.0;
        if self.enable_limit && angle > self.half_angle && swing != Vec3::ZERO {
            angular_error = angle - self.half_angle;
            let correction = angular_error.min(config::MAX_ANGULAR_CORRECTION);
            let mass = angular_mass(swing, &ctx.inv_inertias[ia], &ctx.inv_inertias[ib]);
            ctx.apply_angular_position_impulse(ia, ib, -mass * correction * swing);
        }

        // Anchor coincidence.
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
