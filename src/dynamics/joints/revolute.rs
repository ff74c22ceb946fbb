use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::{angular_mass, point_mass_matrix, solve_mat3, JointContext};

/// Hinge joint definition, anchored and axised in world space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevoluteJointDef {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// World-space hinge anchor.
    pub anchor: Vec3,
    /// World-space hinge axis.
    pub axis: Vec3,
    pub enable_limit: bool,
    pub lower_angle: f32,
    pub upper_angle: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,
    pub collide_linked: bool,
}

impl RevoluteJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor: Vec3, axis: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            anchor,
            axis,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            collide_linked: false,
        }
    }
}

/// Hinge: locks the anchor point and all rotation except about the hinge
/// axis, with an optional motor and angle limits about that axis.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    local_axis_a: Vec3,
    local_axis_b: Vec3,
    /// Reference directions perpendicular to the axis, for the hinge angle.
    local_basis_a: Vec3,
    local_basis_b: Vec3,

    pub enable_limit: bool,
    pub lower_angle: f32,
    pub upper_angle: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,

    point_impulse: Vec3,
    align_impulse: [f32; 2],
    motor_impulse: f32,
    limit_impulse: f32,

    // Per-step scratch.
    r_a: Vec3,
    r_b: Vec3,
    axis_world: Vec3,
    perp1: Vec3,
    perp2: Vec3,
    point_mass: Mat3,
    align_mass: [f32; 2],
    axis_mass: f32,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef, xf_a: &Transform, xf_b: &Transform) -> Self {
        let axis = def.axis.normalize_or_zero();
        debug_assert!(axis.length_squared() > 0.9);
        let basis_world = axis.any_orthonormal_vector();
        Self {
            local_anchor_a: xf_a.inverse_transform_point(def.anchor),
            local_anchor_b: xf_b.inverse_transform_point(def.anchor),
            local_axis_a: xf_a.inverse_transform_vector(axis),
            local_axis_b: xf_b.inverse_transform_vector(axis),
            local_basis_a: xf_a.inverse_transform_vector(basis_world),
            local_basis_b: xf_b.inverse_transform_vector(basis_world),
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            point_impulse: Vec3::ZERO,
            align_impulse: [0.0; 2],
            motor_impulse: 0.0,
            limit_impulse: 0.0,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            axis_world: axis,
            perp1: Vec3::ZERO,
            perp2: Vec3::ZERO,
            point_mass: Mat3::ZERO,
            align_mass: [0.0; 2],
            axis_mass: 0.0,
        }
    }

    /// Current hinge angle.
    fn hinge_angle(&self, ctx: &JointContext, ia: usize, ib: usize) -> f32 {
        let basis_a = ctx.positions[ia].q * self.local_basis_a;
        let basis_b = ctx.positions[ib].q * self.local_basis_b;
        let axis = ctx.positions[ia].q * self.local_axis_a;
        basis_a.cross(basis_b).dot(axis).atan2(basis_a.dot(basis_b))
    }

    pub(crate) fn initialize(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        let q_a = ctx.positions[ia].q;
        let q_b = ctx.positions[ib].q;
        self.r_a = q_a * (self.local_anchor_a - ctx.props[ia].local_center);
        self.r_b = q_b * (self.local_anchor_b - ctx.props[ib].local_center);

        self.axis_world = (q_a * self.local_axis_a).normalize_or_zero();
        let (p1, p2) = self.axis_world.any_orthonormal_pair();
        self.perp1 = p1;
        self.perp2 = p2;

        let i_a = &ctx.inv_inertias[ia];
        let i_b = &ctx.inv_inertias[ib];
        let inv_mass = ctx.props[ia].inv_mass + ctx.props[ib].inv_mass;

        self.point_mass = point_mass_matrix(inv_mass, self.r_a, self.r_b, i_a, i_b);
        self.align_mass = [
            angular_mass(self.perp1, i_a, i_b),
            angular_mass(self.perp2, i_a, i_b),
        ];
        self.axis_mass = angular_mass(self.axis_world, i_a, i_b);
    }

    pub(crate) fn warm_start(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, self.point_impulse);
        let angular = self.align_impulse[0] * self.perp1
            + self.align_impulse[1] * self.perp2
            + (self.motor_impulse + self.limit_impulse) * self.axis_world;
        ctx.apply_angular_impulse(ia, ib, angular);
    }

    pub(crate) fn solve_velocity(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        // Motor about the hinge axis.
        if self.enable_motor && self.axis_mass > 0.0 {
            let w_rel = (ctx.velocities[ib].w - ctx.velocities[ia].w).dot(self.axis_world);
            let lambda = -self.axis_mass * (w_rel - self.motor_speed);
            let max = self.max_motor_torque * ctx.dt;
            let old = self.motor_impulse;
            self.motor_impulse = (old + lambda).clamp(-max, max);
            ctx.apply_angular_impulse(ia, ib, (self.motor_impulse - old) * self.axis_world);
        }

        // Angle limit about the hinge axis.
        if self.enable_limit && self.axis_mass > 0.0 {
            let angle = self.hinge_angle(ctx, ia, ib);
            let w_rel = (ctx.velocities[ib].w - ctx.velocities[ia].w).dot(self.axis_world);

            if angle <= self.lower_angle {
                let lambda = -self.axis_mass * w_rel;
                let old = self.limit_impulse;
                self.limit_impulse = (old + lambda).max(0.0);
                ctx.apply_angular_impulse(ia, ib, (self.limit_impulse - old) * self.axis_world);
            } else if angle >= self.upper_angle {
                let lambda = -self.axis_mass * w_rel;
                let old = self.limit_impulse;
                self.limit_impulse = (old + lambda).min(0.0);
                ctx.apply_angular_impulse(ia, ib, (self.limit_impulse - old) * self.axis_world);
            } else {
                self.limit_impulse = 0.0;
            }
        }

        // Lock rotation off the hinge axis, one row per perpendicular.
        for (i, perp) in [self.perp1, self.perp2].into_iter().enumerate() {
            let w_rel = (ctx.velocities[ib].w - ctx.velocities[ia].w).dot(perp);
            let lambda = -self.align_mass[i] * w_rel;
            self.align_impulse[i] += lambda;
            ctx.apply_angular_impulse(ia, ib, lambda * perp);
        }

        // Pin the anchor.
        let c_dot = ctx.anchor_velocity(ia, ib, self.r_a, self.r_b);
        let impulse = solve_mat3(&self.point_mass, -c_dot);
        self.point_impulse += impulse;
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, impulse);
    }

    pub(crate) fn solve_position(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) -> bool {
        // Axis alignment.
        let axis_a = (ctx.positions[ia].q * self.local_axis_a).normalize_or_zero();
        let axis_b = (ctx.positions[ib].q * self.local_axis_b).normalize_or_zero();
        let mut error = axis_a.cross(axis_b);
        let angular_error = error.length();
        if angular_error > config::ANGULAR_SLOP {
            if angular_error > config::MAX_ANGULAR_CORRECTION {
                error *= config::MAX_ANGULAR_CORRECTION / angular_error;
            }
            let axis = error.normalize_or_zero();
            let mass = angular_mass(axis, &ctx.inv_inertias[ia], &ctx.inv_inertias[ib]);
            ctx.apply_angular_position_impulse(ia, ib, -mass * error);
        }

        // Anchor coincidence.
        let xf_a = ctx.transform(ia);
        let xf_b = ctx.transform(ib);
        let r_a = xf_a.transform_point(self.local_anchor_a) - ctx.positions[ia].c;
        let r_b = xf_b.transform_point(self.local_anchor_b) - ctx.positions[ib].c;
        let c = (ctx.positions[ib].c + r_b) - (ctx.positions[ia].c + r_a);
        let linear_error = c.length();

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

        linear_error <= config::LINEAR_SLOP && angular_error <= config::ANGULAR_SLOP
    }
}
