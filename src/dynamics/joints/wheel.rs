use glam::Vec3;
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

use crate::config;
use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::{angular_mass, JointContext};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelJointDef {
    /// Chassis.
    pub body_a: BodyId,
    /// Wheel.
    pub body_b: BodyId,
    /// World-space anchor at the wheel center.
    pub anchor: Vec3,
    /// World-space suspension axis (chassis frame).
    pub suspension_axis: Vec3,
    /// World-space wheel spin axis.
    pub wheel_axis: Vec3,
    pub frequency: f32,
    pub damping_ratio: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,
    pub collide_linked: bool,
}

impl WheelJointDef {
    pub fn new(
        body_a: BodyId,
        body_b: BodyId,
        anchor: Vec3,
        suspension_axis: Vec3,
        wheel_axis: Vec3,
    ) -> Self {
        Self {
            body_a,
            body_b,
            anchor,
            suspension_axis,
            wheel_axis,
            frequency: 4.0,
            damping_ratio: 0.7,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            collide_linked: false,
        }
    }
}

/// Suspension joint: the wheel slides along the suspension axis on a
/// spring, stays pinned perpendicular to it, and optionally spins under a
/// motor about its own axis.
#[derive(Debug, Clone)]
pub struct WheelJoint {
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    local_suspension_a: Vec3,
    local_wheel_b: Vec3,
    pub frequency: f32,
    pub damping_ratio: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,

    perp_impulse: [f32; 2],
    spring_impulse: f32,
    motor_impulse: f32,

    r_a: Vec3,
    r_b: Vec3,
    suspension_world: Vec3,
    perp1: Vec3,
    perp2: Vec3,
    wheel_axis_world: Vec3,
    perp_mass: [f32; 2],
    spring_mass: f32,
    motor_mass: f32,
    gamma: f32,
    bias: f32,
}

impl WheelJoint {
    pub(crate) fn new(def: &WheelJointDef, xf_a: &Transform, xf_b: &Transform) -> Self {
        Self {
            local_anchor_a: xf_a.inverse_transform_point(def.anchor),
            local_anchor_b: xf_b.inverse_transform_point(def.anchor),
            local_suspension_a: xf_a.inverse_transform_vector(def.suspension_axis.normalize_or_zero()),
            local_wheel_b: xf_b.inverse_transform_vector(def.wheel_axis.normalize_or_zero()),
            frequency: def.frequency,
            damping_ratio: def.damping_ratio,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            perp_impulse: [0.0; 2],
            spring_impulse: 0.0,
            motor_impulse: 0.0,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            suspension_world: Vec3::ZERO,
            perp1: Vec3::ZERO,
            perp2: Vec3::ZERO,
            wheel_axis_world: Vec3::ZERO,
            perp_mass: [0.0; 2],
            spring_mass: 0.0,
            motor_mass: 0.0,
            gamma: 0.0,
            bias: 0.0,
        }
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

        self.suspension_world = (q_a * self.local_suspension_a).normalize_or_zero();
        let (p1, p2) = self.suspension_world.any_orthonormal_pair();
        self.perp1 = p1;
        self.perp2 = p2;
        self.wheel_axis_world = (q_b * self.local_wheel_b).normalize_or_zero();

        self.perp_mass = [
            self.linear_mass(ctx, ia, ib, p1),
            self.linear_mass(ctx, ia, ib, p2),
        ];
        self.motor_mass = angular_mass(
            self.wheel_axis_world,
            &ctx.inv_inertias[ia],
            &ctx.inv_inertias[ib],
        );

        // Soft suspension row along the axis.
        let mut k = 0.0;
        let raw = self.linear_mass(ctx, ia, ib, self.suspension_world);
        if raw > 0.0 {
            k = 1.0 / raw;
        }
        if self.frequency > 0.0 && k > 0.0 {
            let d = (ctx.positions[ib].c + self.r_b) - (ctx.positions[ia].c + self.r_a);
            let c = d.dot(self.suspension_world);
            let omega = TAU * self.frequency;
            let mass = 1.0 / k;
            let damping = 2.0 * mass * self.damping_ratio * omega;
            let stiffness = mass * omega * omega;
            let h = ctx.dt;
            self.gamma = h * (damping + h * stiffness);
            self.gamma = if self.gamma > 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * stiffness * self.gamma;
            let k_soft = k + self.gamma;
            self.spring_mass = if k_soft > 0.0 { 1.0 / k_soft } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
            self.spring_mass = raw;
        }
    }

    pub(crate) fn warm_start(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        let linear = self.perp_impulse[0] * self.perp1
            + self.perp_impulse[1] * self.perp2
            + self.spring_impulse * self.suspension_world;
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, linear);
        ctx.apply_angular_impulse(ia, ib, self.motor_impulse * self.wheel_axis_world);
    }

    pub(crate) fn solve_velocity(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        // Suspension spring.
        if self.spring_mass > 0.0 {
            let c_dot = ctx
                .anchor_velocity(ia, ib, self.r_a, self.r_b)
                .dot(self.suspension_world);
            let lambda =
                -self.spring_mass * (c_dot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += lambda;
            ctx.apply_impulse(ia, ib, self.r_a, self.r_b, lambda * self.suspension_world);
        }

        // Wheel motor.
        if self.enable_motor && self.motor_mass > 0.0 {
            let w_rel =
                (ctx.velocities[ib].w - ctx.velocities[ia].w).dot(self.wheel_axis_world);
            let lambda = -self.motor_mass * (w_rel - self.motor_speed);
            let max = self.max_motor_torque * ctx.dt;
            let old = self.motor_impulse;
            self.motor_impulse = (old + lambda).clamp(-max, max);
            ctx.apply_angular_impulse(
                ia,
                ib,
                (self.motor_impulse - old) * self.wheel_axis_world,
            );
        }

        // Hold the wheel on the suspension line.
        for (i, perp) in [self.perp1, self.perp2].into_iter().enumerate() {
            let v_rel = ctx.anchor_velocity(ia, ib, self.r_a, self.r_b).dot(perp);
            let lambda = -self.perp_mass[i] * v_rel;
            self.perp_impulse[i] += lambda;
            ctx.apply_impulse(ia, ib, self.r_a, self.r_b, lambda * perp);
        }
    }

    pub(crate) fn solve_position(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) -> bool {
        let xf_a = ctx.transform(ia);
        let xf_b = ctx.transform(ib);
        let r_a = xf_a.transform_point(self.local_anchor_a) - ctx.positions[ia].c;
        let r_b = xf_b.transform_point(self.local_anchor_b) - ctx.positions[ib].c;
        let d = (ctx.positions[ib].c + r_b) - (ctx.positions[ia].c + r_a);
        let axis = (ctx.positions[ia].q * self.local_suspension_a).normalize_or_zero();
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
            let impulse = super::solve_mat3(&k, -clamped);
            ctx.apply_position_impulse(ia, ib, r_a, r_b, impulse);
        }

        linear_error <= config::LINEAR_SLOP
    }
}
