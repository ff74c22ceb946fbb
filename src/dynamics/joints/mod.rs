//! Joint library: every joint exposes the same four solver phases
//! (initialize, warm start, velocity solve, position solve) and is
//! dispatched by a match over the closed [`JointData`] enum.

mod cone;
mod motor;
mod mouse;
mod prismatic;
mod revolute;
mod spring;
mod weld;
mod wheel;

pub use cone::{ConeJoint, ConeJointDef};
pub use motor::{MotorJoint, MotorJointDef};
pub use mouse::{MouseJoint, MouseJointDef};
pub use prismatic::{PrismaticJoint, PrismaticJointDef};
pub use revolute::{RevoluteJoint, RevoluteJointDef};
pub use spring::{SpringJoint, SpringJointDef};
pub use weld::{WeldJoint, WeldJointDef};
pub use wheel::{WheelJoint, WheelJointDef};

use glam::{Mat3, Quat, Vec3};

use crate::core::body::BodyId;
use crate::core::transform::{skew, Transform};
use crate::utils::arena::Id;

use super::island::{Position, SolverProps, Velocity};

pub type JointId = Id<Joint>;

/// Solver view of the island state shared by all joints.
pub(crate) struct JointContext<'a> {
    pub positions: &'a mut [Position],
    pub velocities: &'a mut [Velocity],
    pub inv_inertias: &'a [Mat3],
    pub props: &'a [SolverProps],
    pub dt: f32,
}

impl<'a> JointContext<'a> {
    pub fn transform(&self, index: usize) -> Transform {
        let p = &self.positions[index];
        Transform {
            position: p.c - p.q * self.props[index].local_center,
            rotation: p.q,
        }
    }

    pub fn apply_impulse(&mut self, ia: usize, ib: usize, r_a: Vec3, r_b: Vec3, impulse: Vec3) {
        self.velocities[ia].v -= self.props[ia].inv_mass * impulse;
        self.velocities[ia].w -= self.inv_inertias[ia] * r_a.cross(impulse);
        self.velocities[ib].v += self.props[ib].inv_mass * impulse;
        self.velocities[ib].w += self.inv_inertias[ib] * r_b.cross(impulse);
    }

    pub fn apply_angular_impulse(&mut self, ia: usize, ib: usize, impulse: Vec3) {
        self.velocities[ia].w -= self.inv_inertias[ia] * impulse;
        self.velocities[ib].w += self.inv_inertias[ib] * impulse;
    }

    /// Relative velocity of the anchor points.
    pub fn anchor_velocity(&self, ia: usize, ib: usize, r_a: Vec3, r_b: Vec3) -> Vec3 {
        self.velocities[ib].v + self.velocities[ib].w.cross(r_b)
            - self.velocities[ia].v
            - self.velocities[ia].w.cross(r_a)
    }

    pub fn apply_position_impulse(
        &mut self,
        ia: usize,
        ib: usize,
        r_a: Vec3,
        r_b: Vec3,
        impulse: Vec3,
    ) {
        let w_a = self.inv_inertias[ia] * r_a.cross(impulse);
        self.positions[ia].c -= self.props[ia].inv_mass * impulse;
        self.positions[ia].q =
            crate::core::transform::integrate_orientation(self.positions[ia].q, -w_a, 1.0);

        let w_b = self.inv_inertias[ib] * r_b.cross(impulse);
        self.positions[ib].c += self.props[ib].inv_mass * impulse;
        self.positions[ib].q =
            crate::core::transform::integrate_orientation(self.positions[ib].q, w_b, 1.0);
    }

    pub fn apply_angular_position_impulse(&mut self, ia: usize, ib: usize, impulse: Vec3) {
        let w_a = self.inv_inertias[ia] * impulse;
        self.positions[ia].q =
            crate::core::transform::integrate_orientation(self.positions[ia].q, -w_a, 1.0);
        let w_b = self.inv_inertias[ib] * impulse;
        self.positions[ib].q =
            crate::core::transform::integrate_orientation(self.positions[ib].q, w_b, 1.0);
    }
}

/// Effective mass matrix of a point-to-point constraint at the two lever
/// arms.
pub(crate) fn point_mass_matrix(
    inv_mass: f32,
    r_a: Vec3,
    r_b: Vec3,
    i_a: &Mat3,
    i_b: &Mat3,
) -> Mat3 {
    let sa = skew(r_a);
    let sb = skew(r_b);
    Mat3::from_diagonal(Vec3::splat(inv_mass)) - sa * *i_a * sa - sb * *i_b * sb
}

pub(crate) fn solve_mat3(k: &Mat3, rhs: Vec3) -> Vec3 {
    if k.determinant().abs() > f32::EPSILON {
        k.inverse() * rhs
    } else {
        Vec3::ZERO
    }
}

/// Scalar effective mass along `axis` for an angular-only row.
pub(crate) fn angular_mass(axis: Vec3, i_a: &Mat3, i_b: &Mat3) -> f32 {
    let k = axis.dot(*i_a * axis) + axis.dot(*i_b * axis);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Rotation-vector error taking `q_b` into the frame `q_a · reference`.
/// The quaternion is negated first when needed so the vector part always
/// encodes the short-way rotation.
pub(crate) fn rotation_error(q_a: Quat, q_b: Quat, reference: Quat) -> Vec3 {
    let target = q_a * reference;
    let mut q_err = q_b * target.conjugate();
    if q_err.w < 0.0 {
        q_err = -q_err;
    }
    // Small-angle: vector part ≈ half the rotation vector.
    2.0 * Vec3::new(q_err.x, q_err.y, q_err.z)
}

/// Definition record for joint creation. World-space anchors and axes are
/// converted to body-local frames when the joint is created.
#[derive(Debug, Clone)]
pub enum JointDef {
    Revolute(RevoluteJointDef),
    Prismatic(PrismaticJointDef),
    Weld(WeldJointDef),
    Cone(ConeJointDef),
    Wheel(WheelJointDef),
    Spring(SpringJointDef),
    Mouse(MouseJointDef),
    Motor(MotorJointDef),
}

impl JointDef {
    pub fn bodies(&self) -> (BodyId, BodyId) {
        match self {
            JointDef::Revolute(def) => (def.body_a, def.body_b),
            JointDef::Prismatic(def) => (def.body_a, def.body_b),
            JointDef::Weld(def) => (def.body_a, def.body_b),
            JointDef::Cone(def) => (def.body_a, def.body_b),
            JointDef::Wheel(def) => (def.body_a, def.body_b),
            JointDef::Spring(def) => (def.body_a, def.body_b),
            JointDef::Mouse(def) => (def.body_a, def.body_b),
            JointDef::Motor(def) => (def.body_a, def.body_b),
        }
    }

    pub fn collide_linked(&self) -> bool {
        match self {
            JointDef::Revolute(def) => def.collide_linked,
            JointDef::Prismatic(def) => def.collide_linked,
            JointDef::Weld(def) => def.collide_linked,
            JointDef::Cone(def) => def.collide_linked,
            JointDef::Wheel(def) => def.collide_linked,
            JointDef::Spring(def) => def.collide_linked,
            JointDef::Mouse(_) => true,
            JointDef::Motor(def) => def.collide_linked,
        }
    }
}

/// Concrete joint state, dispatched by match.
#[derive(Debug, Clone)]
pub enum JointData {
    Revolute(RevoluteJoint),
    Prismatic(PrismaticJoint),
    Weld(WeldJoint),
    Cone(ConeJoint),
    Wheel(WheelJoint),
    Spring(SpringJoint),
    Mouse(MouseJoint),
    Motor(MotorJoint),
}

/// A constraint between two bodies. At least one body must be dynamic;
/// destroying a body destroys its incident joints.
#[derive(Debug, Clone)]
pub struct Joint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Whether the connected bodies may still collide with each other.
    pub collide_linked: bool,
    pub user_data: u64,
    pub data: JointData,

    pub(crate) island_flag: bool,
    pub(crate) index_a: usize,
    pub(crate) index_b: usize,
}

impl Joint {
    pub(crate) fn from_def(def: &JointDef, xf_a: &Transform, xf_b: &Transform) -> Self {
        let (body_a, body_b) = def.bodies();
        let data = match def {
            JointDef::Revolute(d) => JointData::Revolute(RevoluteJoint::new(d, xf_a, xf_b)),
            JointDef::Prismatic(d) => JointData::Prismatic(PrismaticJoint::new(d, xf_a, xf_b)),
            JointDef::Weld(d) => JointData::Weld(WeldJoint::new(d, xf_a, xf_b)),
            JointDef::Cone(d) => JointData::Cone(ConeJoint::new(d, xf_a, xf_b)),
            JointDef::Wheel(d) => JointData::Wheel(WheelJoint::new(d, xf_a, xf_b)),
            JointDef::Spring(d) => JointData::Spring(SpringJoint::new(d, xf_a, xf_b)),
            JointDef::Mouse(d) => JointData::Mouse(MouseJoint::new(d, xf_b)),
            JointDef::Motor(d) => JointData::Motor(MotorJoint::new(d, xf_a, xf_b)),
        };
        Self {
            body_a,
            body_b,
            collide_linked: def.collide_linked(),
            user_data: 0,
            data,
            island_flag: false,
            index_a: usize::MAX,
            index_b: usize::MAX,
        }
    }

    pub(crate) fn initialize(&mut self, ctx: &mut JointContext) {
        let (ia, ib) = (self.index_a, self.index_b);
        match &mut self.data {
            JointData::Revolute(j) => j.initialize(ia, ib, ctx),
            JointData::Prismatic(j) => j.initialize(ia, ib, ctx),
            JointData::Weld(j) => j.initialize(ia, ib, ctx),
            JointData::Cone(j) => j.initialize(ia, ib, ctx),
            JointData::Wheel(j) => j.initialize(ia, ib, ctx),
            JointData::Spring(j) => j.initialize(ia, ib, ctx),
            JointData::Mouse(j) => j.initialize(ia, ib, ctx),
            JointData::Motor(j) => j.initialize(ia, ib, ctx),
        }
    }

    pub(crate) fn warm_start(&mut self, ctx: &mut JointContext) {
        let (ia, ib) = (self.index_a, self.index_b);
        match &mut self.data {
            JointData::Revolute(j) => j.warm_start(ia, ib, ctx),
            JointData::Prismatic(j) => j.warm_start(ia, ib, ctx),
            JointData::Weld(j) => j.warm_start(ia, ib, ctx),
            JointData::Cone(j) => j.warm_start(ia, ib, ctx),
            JointData::Wheel(j) => j.warm_start(ia, ib, ctx),
            JointData::Spring(j) => j.warm_start(ia, ib, ctx),
            JointData::Mouse(j) => j.warm_start(ia, ib, ctx),
            JointData::Motor(j) => j.warm_start(ia, ib, ctx),
        }
    }

    pub(crate) fn solve_velocity(&mut self, ctx: &mut JointContext) {
        let (ia, ib) = (self.index_a, self.index_b);
        match &mut self.data {
            JointData::Revolute(j) => j.solve_velocity(ia, ib, ctx),
            JointData::Prismatic(j) => j.solve_velocity(ia, ib, ctx),
            JointData::Weld(j) => j.solve_velocity(ia, ib, ctx),
            JointData::Cone(j) => j.solve_velocity(ia, ib, ctx),
            JointData::Wheel(j) => j.solve_velocity(ia, ib, ctx),
            JointData::Spring(j) => j.solve_velocity(ia, ib, ctx),
            JointData::Mouse(j) => j.solve_velocity(ia, ib, ctx),
            JointData::Motor(j) => j.solve_velocity(ia, ib, ctx),
        }
    }

    /// Returns true when the joint's position error is within slop.
    pub(crate) fn solve_position(&mut self, ctx: &mut JointContext) -> bool {
        let (ia, ib) = (self.index_a, self.index_b);
        match &mut self.data {
            JointData::Revolute(j) => j.solve_position(ia, ib, ctx),
            JointData::Prismatic(j) => j.solve_position(ia, ib, ctx),
            JointData::Weld(j) => j.solve_position(ia, ib, ctx),
            JointData::Cone(j) => j.solve_position(ia, ib, ctx),
            JointData::Wheel(j) => j.solve_position(ia, ib, ctx),
            JointData::Spring(j) => j.solve_position(ia, ib, ctx),
            JointData::Mouse(_) => true,
            JointData::Motor(_) => true,
        }
    }
}
