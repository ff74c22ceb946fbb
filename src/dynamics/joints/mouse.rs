use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::{point_mass_matrix, solve_mat3, JointContext};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseJointDef {
    /// The grounding body (usually a static body).
    pub body_a: BodyId,
    /// The dragged body.
    pub body_b: BodyId,
    /// World-space grab point on body B.
    pub anchor: Vec3,
    /// World-space drag target.
    pub target: Vec3,
    /// Peak force the drag may exert.
    pub max_force: f32,
    pub frequency: f32,
    pub damping_ratio: f32,
}

impl MouseJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId, anchor: Vec3, max_force: f32) -> Self {
        Self {
            body_a,
            body_b,
            anchor,
            target: anchor,
            max_force,
            frequency: 5.0,
            damping_ratio: 0.7,
        }
    }
}

/// Soft drag constraint pulling an anchor on body B toward a target
/// point. Used by interactive picking; there is no position solver, the
/// spring does all the work.
#[derive(Debug, Clone)]
pub struct MouseJoint {
    local_anchor_b: Vec3,
    pub target: Vec3,
    pub max_force: f32,
    pub frequency: f32,
    pub damping_ratio: f32,

    impulse: Vec3,

    r_b: Vec3,
    mass: Mat3,
    gamma: f32,
    bias: Vec3,
}

impl MouseJoint {
    pub(crate) fn new(def: &MouseJointDef, xf_b: &Transform) -> Self {
        Self {
            local_anchor_b: xf_b.inverse_transform_point(def.anchor),
            target: def.target,
            max_force: def.max_force,
            frequency: def.frequency,
            damping_ratio: def.damping_ratio,
            impulse: Vec3::ZERO,
            r_b: Vec3::ZERO,
            mass: Mat3::ZERO,
            gamma: 0.0,
            bias: Vec3::ZERO,
        }
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    pub(crate) fn initialize(&mut self, _ia: usize, ib: usize, ctx: &mut JointContext) {
        let q_b = ctx.positions[ib].q;
        self.r_b = q_b * (self.local_anchor_b - ctx.props[ib].local_center);

        let mass = if ctx.props[ib].inv_mass > 0.0 {
            1.0 / ctx.props[ib].inv_mass
        } else {
            0.0
        };
        let omega = TAU * self.frequency;
        let damping = 2.0 * mass * self.damping_ratio * omega;
        let stiffness = mass * omega * omega;
        let h = ctx.dt;

        let gamma = h * (damping + h * stiffness);
        self.gamma = if gamma > 0.0 { 1.0 / gamma } else { 0.0 };
        let beta = h * stiffness * self.gamma;

        let c = (ctx.positions[ib].c + self.r_b) - self.target;
        self.bias = beta * c;

        let mut k = point_mass_matrix(
            ctx.props[ib].inv_mass,
            Vec3::ZERO,
            self.r_b,
            &Mat3::ZERO,
            &ctx.inv_inertias[ib],
        );
        k += Mat3::from_diagonal(Vec3::splat(self.gamma));
        self.mass = k;
    }

    pub(crate) fn warm_start(&mut self, _ia: usize, ib: usize, ctx: &mut JointContext) {
        ctx.velocities[ib].v += ctx.props[ib].inv_mass * self.impulse;
        ctx.velocities[ib].w += ctx.inv_inertias[ib] * self.r_b.cross(self.impulse);
    }

    pub(crate) fn solve_velocity(&mut self, _ia: usize, ib: usize, ctx: &mut JointContext) {
        let c_dot = ctx.velocities[ib].v + ctx.velocities[ib].w.cross(self.r_b);
        let lambda = solve_mat3(
            &self.mass,
            -(c_dot + self.bias + self.gamma * self.impulse),
        );

        let old = self.impulse;
        self.impulse += lambda;
        let max = self.max_force * ctx.dt;
        if self.impulse.length_squared() > max * max {
            self.impulse *= max / self.impulse.length();
        }
        let applied = self.impulse - old;

        ctx.velocities[ib].v += ctx.props[ib].inv_mass * applied;
        ctx.velocities[ib].w += ctx.inv_inertias[ib] * self.r_b.cross(applied);
    }
}
