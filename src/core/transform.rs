use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid transform: rotation followed by translation. Shapes are rigid, so
/// there is no scale here; triangle meshes carry their own uniform scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Maps a point from the local frame to the world frame.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Maps a point from the world frame back into the local frame.
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.conjugate() * (point - self.position)
    }

    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation.conjugate() * v
    }

    /// Composition: `self` applied after `other`.
    pub fn mul(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * other.position,
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    /// Relative transform `self⁻¹ · other`, mapping the frame of `other`
    /// into the frame of `self`.
    pub fn mul_transpose(&self, other: &Transform) -> Transform {
        let inv_rotation = self.rotation.conjugate();
        Transform {
            position: inv_rotation * (other.position - self.position),
            rotation: (inv_rotation * other.rotation).normalize(),
        }
    }
}

/// Motion of a body center across one time step, kept for time-of-impact
/// queries and broad-phase displacement prediction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sweep {
    /// Center of mass offset in the body's local frame.
    pub local_center: Vec3,
    /// World center at the start of the current step.
    pub world_center0: Vec3,
    pub orientation0: Quat,
    /// World center at the end of the current step.
    pub world_center: Vec3,
    pub orientation: Quat,
    /// Fraction of the step already consumed by time-of-impact advancement.
    pub alpha0: f32,
}

impl Default for Sweep {
    fn default() -> Self {
        Self {
            local_center: Vec3::ZERO,
            world_center0: Vec3::ZERO,
            orientation0: Quat::IDENTITY,
            world_center: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            alpha0: 0.0,
        }
    }
}

impl Sweep {
    /// Interpolated body-origin transform at fraction `beta` of the step.
    pub fn transform(&self, beta: f32) -> Transform {
        let center = self.world_center0.lerp(self.world_center, beta);
        let rotation = self.orientation0.slerp(self.orientation, beta).normalize();
        Transform {
            position: center - rotation * self.local_center,
            rotation,
        }
    }

    /// Advances the start state to fraction `alpha` of the step.
    pub fn advance(&mut self, alpha: f32) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.world_center0 = self.world_center0.lerp(self.world_center, beta);
        self.orientation0 = self.orientation0.slerp(self.orientation, beta).normalize();
        self.alpha0 = alpha;
    }
}

/// Skew-symmetric cross-product matrix, `skew(v) * u == v × u`.
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Integrates an orientation by an angular velocity over `dt` using the
/// quaternion derivative `q' = q + dt/2 * w * q`, then renormalizes.
pub fn integrate_orientation(q: Quat, w: Vec3, dt: f32) -> Quat {
    let wq = Quat::from_xyzw(w.x, w.y, w.z, 0.0);
    let dq = wq * q;
    let result = Quat::from_xyzw(
        q.x + 0.5 * dt * dq.x,
        q.y + 0.5 * dt * dq.y,
        q.z + 0.5 * dt * dq.z,
        q.w + 0.5 * dt * dq.w,
    );
    result.normalize()
}

/// Rotates a local-frame tensor into the frame of `q`: `R · I · Rᵀ`.
pub fn rotate_to_frame(tensor: Mat3, q: Quat) -> Mat3 {
    let r = Mat3::from_quat(q);
    r * tensor * r.transpose()
}

/// Parallel-axis (Steiner) term to move an inertia tensor by offset `c`.
pub fn steiner(c: Vec3) -> Mat3 {
    Mat3::from_diagonal(Vec3::splat(c.length_squared()))
        - Mat3::from_cols(c * c.x, c * c.y, c * c.z)
}
