use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::body::BodyId;
use crate::core::transform::Transform;

use super::{point_mass_matrix, solve_mat3, JointContext};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorJointDef {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Desired relative linear velocity of B with respect to A.
    pub linear_velocity: Vec3,
    /// Desired relative angular velocity of B with respect to A.
    pub angular_velocity: Vec3,
    pub max_force: f32,
    pub max_torque: f32,
    pub collide_linked: bool,
}

impl MotorJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self {
            body_a,
            body_b,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            max_force: 1.0,
            max_torque: 1.0,
            collide_linked: false,
        }
    }
}

/// Velocity motor driving the relative linear and angular velocity of two
/// bodies toward targets, bounded by peak force and torque.
#[derive(Debug, Clone)]
pub struct MotorJoint {
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub max_force: f32,
    pub max_torque: f32,

    linear_impulse: Vec3,
    angular_impulse: Vec3,

    r_a: Vec3,
    r_b: Vec3,
    linear_mass: Mat3,
    angular_mass_matrix: Mat3,
}

impl MotorJoint {
    pub(crate) fn new(def: &MotorJointDef, _xf_a: &Transform, _xf_b: &Transform) -> Self {
        Self {
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            max_force: def.max_force,
            max_torque: def.max_torque,
            linear_impulse: Vec3::ZERO,
            angular_impulse: Vec3::ZERO,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            linear_mass: Mat3::ZERO,
            angular_mass_matrix: Mat3::ZERO,
        }
    }

    pub(crate) fn initialize(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        // Drive the centers directly.
        self.r_a = Vec3::ZERO;
        self.r_b = Vec3::ZERO;
        self.linear_mass = point_mass_matrix(
            ctx.props[ia].inv_mass + ctx.props[ib].inv_mass,
            self.r_a,
            self.r_b,
            &ctx.inv_inertias[ia],
            &ctx.inv_inertias[ib],
        );
        self.angular_mass_matrix = ctx.inv_inertias[ia] + ctx.inv_inertias[ib];
    }

    pub(crate) fn warm_start(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        ctx.apply_impulse(ia, ib, self.r_a, self.r_b, self.linear_impulse);
        ctx.apply_angular_impulse(ia, ib, self.angular_impulse);
    }

    pub(crate) fn solve_velocity(&mut self, ia: usize, ib: usize, ctx: &mut JointContext) {
        // Angular drive.
        {
            let c_dot =
                ctx.velocities[ib].w - ctx.velocities[ia].w - self.angular_velocity;
            let lambda = solve_mat3(&self.angular_mass_matrix, -c_dot);

            let old = self.angular_impulse;
            self.angular_impulse += lambda;
            let max = self.max_torque * ctx.dt;
            if self.angular_impulse.length_squared() > max * max {
                self.angular_impulse *= max / self.angular_impulse.length();
            }
            ctx.apply_angular_impulse(ia, ib, self.angular_impulse - old);
        }

        // Linear drive.
        {
            let c_dot = ctx.anchor_velocity(ia, ib, self.r_a, self.r_b) - self.linear_velocity;
            let lambda = solve_mat3(&self.linear_mass, -c_dot);

            let old = self.linear_impulse;
            self.linear_impulse += lambda;
            let max = self.max_force * ctx.dt;
            if self.linear_impulse.length_squared() > max * max {
                self.linear_impulse *= max / self.linear_impulse.length();
            }
            ctx.apply_impulse(ia, ib, self.r_a, self.r_b, self.linear_impulse - old);
        }
    }
}
