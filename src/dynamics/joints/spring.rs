use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::JointContext;

use std::f32::consts::TAU;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpringJointDef {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// World-space anchor on body A.
    pub anchor_a: Vec3,
    /// World-space anchor on body B.
    pub anchor_b: Vec3,
    /// Rest length; defaults to the anchor distance at creation when NaN.
    pub rest_length: f32,
    /// Oscillation frequency in Hz. Zero makes the joint a rigid rod.
    pub frequency: f32,
    pub damping_ratio: f32,
    pub collide_linked: bool,
}

impl SpringJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor_a: Vec3, anchor_b: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            rest_length: f32::NAN,
            frequency: 0.0,
            damping_ratio: 0.7,
            collide_linked: true,
        }
    }
}

/// Distance constraint with optional spring softening.
///
/// With a positive frequency the row is softened with the standard
/// gamma/bias formulation; at zero frequency it is a rigid rod whose
/// length error the position solver removes.
#[derive(Debug, Clone)]
pub struct SpringJoint {
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    pub rest_length: f32,
    pub frequency: f32,
    pub damping_ratio: f32,

    impulse: f32,

    r_a: Vec3,
    r_b: Vec3,
    axis: Vec3,
    mass: f32,
    gamma: f32,
    bias: f32,
}

impl SpringJoint {
    pub(crate) fn new(def: &SpringJointDef, xf_a: &Transform, xf_b: &Transform) -> Self {
        let rest_length = if def.rest_length.is_nan() {
            (def.anchor_b - def.anchor_a).length()
        } else {
            def.rest_length
        };
        Self {
            local_anchor_a: xf_a.inverse_transform_point(def.anchor_a),
            local_anchor_b: xf_b.inverse_transform_point(def.anchor_b),
            rest_length,
            frequency: def.frequency,
            damping_ratio: def.damping_ratio,
            impulse: 0.0,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            axis: Vec3::ZERO,
            mass: 0.0,
            gamma: 0.0,
            bias: 0.0,
        }
    }

    pub(crate) fn initialize(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        let q_a = ctx.positions[ia].q;
        let q_b = ctx.positions[ib].q;
        self.r_a = q_a * (self.local_anchor_a - ctx.props[ia].local_center);
        self.r_b = q_b * (self.local_anchor_b - ctx.props[ib].local_center);

        let d = (ctx.positions[ib].c + self.r_b) - (ctx.positions[ia].c + self.r_a);
        let length = d.length();
        self.axis = if length > config::LINEAR_SLOP {
            d / length
        } else {
            Vec3::ZERO
        };

        let rn_a = self.r_a.cross(self.axis);
        let rn_b = self.r_b.cross(self.axis);
        let mut k = ctx.props[ia].inv_mass
            + ctx.props[ib].inv_mass
            + rn_a.dot(ctx.inv_inertias[ia] * rn_a)
            + rn_b.dot(ctx.inv_inertias[ib] * rn_b);

        if self.frequency > 0.0 {
            let c = length - self.rest_length;
            let omega = TAU * self.frequency;
            let mass = if k > 0.0 { 1.0 / k } else { 0.0 };
            let damping = 2.0 * mass * self.damping_ratio * omega;
            let stiffness = mass * omega * omega;
            let h = ctx.dt;

            self.gamma = h * (damping + h * stiffness);
            self.gamma = if self.gamma > 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * stiffness * self.gamma;
            k += self.gamma;
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }
        self.mass = if k > 0.0 { 1.0 / k } else { 0.0 };
    }

    pub(crate) fn warm_start(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, self.impulse * self.axis);
    }

    pub(crate) fn solve_velocity(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        if self.axis == Vec3::ZERO {
            return;
        }
        let c_dot = ctx
            .anchor_velocity(ia, ib, self.r_a, self.r_b)
            .dot(self.axis);
        let lambda = -self.mass * (c_dot + self.bias + self.gamma * self.impulse);
        self.impulse += lambda;
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, lambda * self.axis);
    }

    pub(crate) fn solve_position(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) -> bool {
        if self.frequency > 0.0 {
            // Springs are allowed to stretch.
            return true;
        }

        let xf_a = ctx.transform(ia);
        let xf_b = ctx.transform(ib);
        let r_a = xf_a.transform_point(self.local_anchor_a) - ctx.positions[ia].c;
        let r_b = xf_b.transform_point(self.local_anchor_b) - ctx.positions[ib].c;
        let d = (ctx.positions[ib].c + r_b) - (ctx.positions[ia].c + r_a);
        let length = d.length();
        if length < config::LINEAR_SLOP {
            return true;
        }
        let axis = d / length;
        let c = (length - self.rest_length).clamp(
            -config::MAX_LINEAR_CORRECTION,
            config::MAX_LINEAR_CORRECTION,
        );

        let rn_a = r_a.cross(axis);
        let rn_b = r_b.cross(axis);
        let k = ctx.props[ia].inv_mass
            + ctx.props[ib].inv_mass
            + rn_a.dot(ctx.inv_inertias[ia] * rn_a)
            + rn_b.dot(ctx.inv_inertias[ib] * rn_b);
        if k > 0.0 {
            let impulse = -(c / k) * axis;
            ctx.apply_position_impulse(ia, ib, r_a, r_b, impulse);
        }

        c.abs() <= config::LINEAR_SLOP
    }
}
