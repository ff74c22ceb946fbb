use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::utils::arena::Id;

use super::fixture::Fixture;
use super::transform::{rotate_to_frame, Sweep, Transform};

pub type BodyId = Id<RigidBody>;
pub type FixtureId = Id<Fixture>;
pub type JointId = Id<crate::dynamics::joints::Joint>;

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BodyType {
    /// Zero mass, zero velocity, moved only by the user.
    Static,
    /// Zero mass, velocity set by the user, unaffected by forces.
    Kinematic,
    /// Positive mass, full dynamics.
    #[default]
    Dynamic,
}

/// Configuration record for body creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Per-axis scale applied to world gravity.
    pub gravity_scale: Vec3,
    /// Per-axis linear damping coefficients.
    pub linear_damping: Vec3,
    /// Per-axis angular damping coefficients.
    pub angular_damping: Vec3,
    pub fixed_rotation_x: bool,
    pub fixed_rotation_y: bool,
    pub fixed_rotation_z: bool,
    pub awake: bool,
    pub allow_sleep: bool,
    pub linear_sleep_tolerance: f32,
    pub angular_sleep_tolerance: f32,
    /// Opaque handle the engine never inspects.
    pub user_data: u64,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            gravity_scale: Vec3::ONE,
            linear_damping: Vec3::ZERO,
            angular_damping: Vec3::ZERO,
            fixed_rotation_x: false,
            fixed_rotation_y: false,
            fixed_rotation_z: false,
            awake: true,
            allow_sleep: true,
            linear_sleep_tolerance: config::LINEAR_SLEEP_TOLERANCE,
            angular_sleep_tolerance: config::ANGULAR_SLEEP_TOLERANCE,
            user_data: 0,
        }
    }
}

impl BodyDef {
    pub fn dynamic_at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn static_at(position: Vec3) -> Self {
        Self {
            body_type: BodyType::Static,
            position,
            ..Self::default()
        }
    }

    pub fn kinematic_at(position: Vec3) -> Self {
        Self {
            body_type: BodyType::Kinematic,
            position,
            ..Self::default()
        }
    }
}

/// A simulated rigid body.
///
/// The transform places the body origin; the sweep tracks the center of
/// mass across the current step. Mass properties are recomputed from the
/// attached fixtures whenever a density-bearing fixture is added or
/// removed.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub body_type: BodyType,
    pub transform: Transform,
    pub sweep: Sweep,

    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Accumulated force (world frame), cleared each step.
    pub force: Vec3,
    /// Accumulated torque (world frame), cleared each step.
    pub torque: Vec3,

    pub mass: f32,
    pub inv_mass: f32,
    /// Inertia about the center of mass, body frame.
    pub local_inertia: Mat3,
    pub inv_local_inertia: Mat3,
    /// Inverse inertia rotated into the world frame; refreshed whenever
    /// the orientation changes.
    pub world_inv_inertia: Mat3,

    pub gravity_scale: Vec3,
    pub linear_damping: Vec3,
    pub angular_damping: Vec3,

    pub awake: bool,
    pub allow_sleep: bool,
    pub fixed_rotation: [bool; 3],
    pub sleep_time: f32,
    pub linear_sleep_tolerance: f32,
    pub angular_sleep_tolerance: f32,

    /// Attached fixtures, owned by the world's fixture arena.
    pub fixtures: Vec<FixtureId>,
    /// Incident joint edges.
    pub joints: Vec<JointId>,

    pub user_data: u64,

    /// Scratch slot: index of this body inside the island being solved.
    pub(crate) island_index: usize,
    /// Scratch flag for the island DFS.
    pub(crate) island_flag: bool,
}

impl RigidBody {
    pub fn new(def: &BodyDef) -> Self {
        let transform = Transform::new(def.position, def.orientation.normalize());
        let mut sweep = Sweep::default();
        sweep.world_center0 = def.position;
        sweep.world_center = def.position;
        sweep.orientation0 = transform.rotation;
        sweep.orientation = transform.rotation;

        let (mass, inv_mass) = match def.body_type {
            BodyType::Dynamic => (1.0, 1.0),
            _ => (0.0, 0.0),
        };

        Self {
            body_type: def.body_type,
            transform,
            sweep,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            mass,
            inv_mass,
            local_inertia: Mat3::ZERO,
            inv_local_inertia: Mat3::ZERO,
            world_inv_inertia: Mat3::ZERO,
            gravity_scale: def.gravity_scale,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            awake: def.awake,
            allow_sleep: def.allow_sleep,
            fixed_rotation: [
                def.fixed_rotation_x,
                def.fixed_rotation_y,
                def.fixed_rotation_z,
            ],
            sleep_time: 0.0,
            linear_sleep_tolerance: def.linear_sleep_tolerance,
            angular_sleep_tolerance: def.angular_sleep_tolerance,
            fixtures: Vec::new(),
            joints: Vec::new(),
            user_data: def.user_data,
            island_index: usize::MAX,
            island_flag: false,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn set_awake(&mut self, awake: bool) {
        if awake {
            if !self.awake {
                self.awake = true;
                self.sleep_time = 0.0;
            }
        } else {
            self.awake = false;
            self.sleep_time = 0.0;
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            self.force = Vec3::ZERO;
            self.torque = Vec3::ZERO;
        }
    }

    /// World center of mass.
    pub fn world_center(&self) -> Vec3 {
        self.sweep.world_center
    }

    pub fn apply_force(&mut self, force: Vec3, point: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.set_awake(true);
        self.force += force;
        self.torque += (point - self.sweep.world_center).cross(force);
    }

    pub fn apply_force_to_center(&mut self, force: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.set_awake(true);
        self.force += force;
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.set_awake(true);
        self.torque += torque;
    }

    pub fn apply_linear_impulse(&mut self, impulse: Vec3, point: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.set_awake(true);
        self.linear_velocity += self.inv_mass * impulse;
        self.angular_velocity +=
            self.world_inv_inertia * (point - self.sweep.world_center).cross(impulse);
    }

    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.set_awake(true);
        self.angular_velocity += self.world_inv_inertia * impulse;
    }

    /// Rebuilds the body-origin transform from the end-of-step sweep.
    pub fn synchronize_transform(&mut self) {
        self.transform = self.sweep.transform(1.0);
    }

    /// Re-rotates the local inverse inertia into the current frame and
    /// re-applies the fixed-rotation mask.
    pub fn update_world_inertia(&mut self) {
        self.world_inv_inertia = rotate_to_frame(self.inv_local_inertia, self.transform.rotation);
        self.mask_fixed_rotation();
    }

    /// Zeroes the inverse-inertia rows/columns of locked axes.
    pub fn mask_fixed_rotation(&mut self) {
        for axis in 0..3 {
            if !self.fixed_rotation[axis] {
                continue;
            }
            for other in 0..3 {
                self.world_inv_inertia.col_mut(other)[axis] = 0.0;
                self.world_inv_inertia.col_mut(axis)[other] = 0.0;
                self.inv_local_inertia.col_mut(other)[axis] = 0.0;
                self.inv_local_inertia.col_mut(axis)[other] = 0.0;
            }
        }
    }

    /// Applies freshly computed mass properties (mass, local center,
    /// inertia about the origin) from the attached fixtures.
    pub(crate) fn set_mass_from_fixtures(&mut self, mass: f32, local_center: Vec3, inertia: Mat3) {
        if self.body_type != BodyType::Dynamic {
            self.mass = 0.0;
            self.inv_mass = 0.0;
            self.local_inertia = Mat3::ZERO;
            self.inv_local_inertia = Mat3::ZERO;
            self.world_inv_inertia = Mat3::ZERO;
            self.sweep.local_center = Vec3::ZERO;
            self.sweep.world_center0 = self.transform.position;
            self.sweep.world_center = self.transform.position;
            self.sweep.orientation0 = self.sweep.orientation;
            return;
        }

        if mass > 0.0 {
            self.mass = mass;
            self.inv_mass = 1.0 / mass;
            // Shift inertia from the body origin to the center of mass.
            let about_com = inertia - mass * super::transform::steiner(local_center);
            self.local_inertia = about_com;
            self.inv_local_inertia = if about_com.determinant().abs() > f32::EPSILON {
                about_com.inverse()
            } else {
                Mat3::ZERO
            };
        } else {
            // Dynamic bodies must have positive mass.
            self.mass = 1.0;
            self.inv_mass = 1.0;
            self.local_inertia = Mat3::ZERO;
            self.inv_local_inertia = Mat3::ZERO;
        }

        // Move the center of mass and fix up its velocity.
        let old_center = self.sweep.world_center;
        self.sweep.local_center = local_center;
        self.sweep.world_center = self.transform.transform_point(local_center);
        self.sweep.world_center0 = self.sweep.world_center;
        self.linear_velocity += self
            .angular_velocity
            .cross(self.sweep.world_center - old_center);

        self.update_world_inertia();
    }
}
