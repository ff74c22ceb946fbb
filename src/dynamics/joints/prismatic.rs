use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::{rotation_error, solve_mat3, JointContext};

/// Slider joint definition, anchored and axised in world space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrismaticJointDef {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub anchor: Vec3,
    /// World-space translation axis.
    pub axis: Vec3,
    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_force: f32,
    pub collide_linked: bool,
}

impl PrismaticJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor: Vec3, axis: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            anchor,
            axis,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_force: 0.0,
            collide_linked: false,
        }
    }
}

/// Slider: full rotation lock plus a two-row linear lock perpendicular to
/// the axis, with motor and translation limits along it.
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    local_axis_a: Vec3,
    /// Relative orientation locked at creation.
    reference_rotation: Quat,

    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_force: f32,

    perp_impulse: [f32; 2],
    angular_impulse: Vec3,
    motor_impulse: f32,
    limit_impulse: f32,

    r_a: Vec3,
    r_b: Vec3,
    axis_world: Vec3,
    perp1: Vec3,
    perp2: Vec3,
    perp_mass: [f32; 2],
    angular_mass_matrix: Mat3,
    axis_mass: f32,
}

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef, xf_a: &Transform, xf_b: &Transform) -> Self {
        let axis = def.axis.normalize_or_zero();
        debug_assert!(axis.length_squared() > 0.9);
        Self {
            local_anchor_a: xf_a.inverse_transform_point(def.anchor),
            local_anchor_b: xf_b.inverse_transform_point(def.anchor),
            local_axis_a: xf_a.inverse_transform_vector(axis),
            reference_rotation: xf_a.rotation.conjugate() * xf_b.rotation,
            enable_limit: def.enable_limit,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_force: def.max_motor_force,
            perp_impulse: [0.0; 2],
            angular_impulse: Vec3::ZERO,
            motor_impulse: 0.0,
            limit_impulse: 0.0,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            axis_world: axis,
            perp1: Vec3::ZERO,
            perp2: Vec3::ZERO,
            perp_mass: [0.0; 2],
            angular_mass_matrix: Mat3::ZERO,
            axis_mass: 0.0,
        }
    }

    fn translation(&self, ctx: &JointContext, ia: usize, ib: usize) -> f32 {
        let xf_a = ctx.transform(ia);
        let xf_b = ctx.transform(ib);
        let d = xf_b.transform_point(self.local_anchor_b) - xf_a.transform_point(self.local_anchor_a);
        d.dot(self.axis_world)
    }

    fn linear_mass(&self, ctx: &JointContext, ia: usize, ib: usize, axis: Vec3) -> f32 {
        let rn_a = self.r_a.cross(axis);
        let rn_b = self.r_b.cross(axis);
        let k = ctx.props[ia].inv_mass
            + ctx.props[ib].inv_mass
            + rn_a.dot(ctx.inv_inertias[ia] * rn_a)
            + rn_b.dot(ctx.inv_inertias[ib] * rn_b);
        if k > 0.0 {
            1.0 / k
        } else {
            0.0
        }
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

        self.perp_mass = [
            self.linear_mass(ctx, ia, ib, p1),
            self.linear_mass(ctx, ia, ib, p2),
        ];
        self.angular_mass_matrix = ctx.inv_inertias[ia] + ctx.inv_inertias[ib];
        self.axis_mass = self.linear_mass(ctx, ia, ib, self.axis_world);
    }

    pub(crate) fn warm_start(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        let linear = self.perp_impulse[0] * self.perp1
            + self.perp_impulse[1] * self.perp2
            + (self.motor_impulse + self.limit_impulse) * self.axis_world;
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, linear);
        ctx.apply_angular_impulse(ia, ib, self.angular_impulse);
    }

    pub(crate) fn solve_velocity(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        // Motor along the axis.
        if self.enable_motor && self.axis_mass > 0.0 {
            let v_rel = ctx
                .anchor_velocity(ia, ib, self.r_a, self.r_b)
                .dot(self.axis_world);
            let lambda = -self.axis_mass * (v_rel - self.motor_speed);
            let max = self.max_motor_force * ctx.dt;
            let old = self.motor_impulse;
            self.motor_impulse = (old + lambda).clamp(-max, max);
            ctx.apply_impulse(
                ia,
                ib,
                self.r_a,
                self.r_b,
                (self.motor_impulse - old) * self.axis_world,
            );
        }

        // Translation limits.
        if self.enable_limit && self.axis_mass > 0.0 {
            let translation = self.translation(ctx, ia, ib);
            let v_rel = ctx
                .anchor_velocity(ia, ib, self.r_a, self.r_b)
                .dot(self.axis_world);

            if translation <= self.lower_translation {
                let lambda = -self.axis_mass * v_rel;
                let old = self.limit_impulse;
                self.limit_impulse = (old + lambda).max(0.0);
                ctx.apply_impulse(
                    ia,
                    ib,
                    self.r_a,
                    self.r_b,
                    (self.limit_impulse - old) * self.axis_world,
                );
            } else if translation >= self.upper_translation {
                let lambda = -self.axis_mass * v_rel;
                let old = self.limit_impulse;
                self.limit_impulse = (old + lambda).min(0.0);
                ctx.apply_impulse(
                    ia,
                    ib,
                    self.r_a,
                    self.r_b,
                    (self.limit_impulse - old) * self.axis_world,
                );
            } else {
                self.limit_impulse = 0.0;
            }
        }

        // Full angular lock.
        let w_rel = ctx.velocities[ib].w - ctx.velocities[ia].w;
        let angular = solve_mat3(&self.angular_mass_matrix, -w_rel);
        self.angular_impulse += angular;
        ctx.apply_angular_impulse(ia, ib, angular);

        // Perpendicular linear lock, one row per direction.
        for (i, perp) in [self.perp1, self.perp2].into_iter().enumerate() {
            let v_rel = ctx.anchor_velocity(ia, ib, self.r_a, self.r_b).dot(perp);
            let lambda = -self.perp_mass[i] * v_rel;
            self.perp_impulse[i] += lambda;
            ctx.apply_impulse(ia, ib, self.r_a, self.r_b, lambda * perp);
        }
    }

    pub(crate) fn solve_position(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) -> bool {
        // Rotation lock.
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

        // Perpendicular anchor error.
        let xf_a = ctx.transform(ia);
        let xf_b = ctx.transform(ib);
        let r_a = xf_a.transform_point(self.local_anchor_a) - ctx.positions[ia].c;
        let r_b = xf_b.transform_point(self.local_anchor_b) - ctx.positions[ib].c;
        let d = (ctx.positions[ib].c + r_b) - (ctx.positions[ia].c + r_a);
        let axis = (ctx.positions[ia].q * self.local_axis_a).normalize_or_zero();
        let perp_error = d - axis * d.dot(axis);
        let linear_error = perp_error.length();

        if linear_error > config::LINEAR_SLOP {
            let clamped = if linear_error > config::MAX_LINEAR_CORRECTION {
                perp_error * (config::MAX_LINEAR_CORRECTION / linear_error)
            } else {
                perp_error
            };
            let k = super::point_mass_matrix(
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
