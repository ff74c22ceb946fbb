//! Global tuning constants for the Tremor engine.
//!
//! The collision and solver tolerances must match across revisions for
//! bit-for-bit reproducible trajectories, so change them only with a very
//! good reason.

use std::f32::consts::PI;

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.8, 0.0];

/// Default number of sequential-impulse velocity iterations per island.
pub const DEFAULT_VELOCITY_ITERATIONS: u32 = 8;

/// Default number of pseudo-velocity position iterations per island.
pub const DEFAULT_POSITION_ITERATIONS: u32 = 2;

/// Collision and constraint linear tolerance, in meters.
pub const LINEAR_SLOP: f32 = 0.005;

/// Collision and constraint angular tolerance, in radians.
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// The radius of the convex hull shape skin.
pub const HULL_RADIUS: f32 = 0.0 * LINEAR_SLOP;

/// Number of contact points per manifold.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// Maximum number of manifolds a single contact may carry after clustering.
pub const MAX_MANIFOLDS: usize = 3;

/// Maximum translation per step, to keep near-singular mass matrices from
/// blowing the integration up.
pub const MAX_TRANSLATION: f32 = 2.0;
pub const MAX_TRANSLATION_SQUARED: f32 = MAX_TRANSLATION * MAX_TRANSLATION;

/// Maximum rotation per step.
pub const MAX_ROTATION: f32 = 0.5 * PI;
pub const MAX_ROTATION_SQUARED: f32 = MAX_ROTATION * MAX_ROTATION;

/// Maximum position correction applied by one position-solver iteration.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Maximum angular correction applied by one position-solver iteration.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Fraction of the position error resolved per position iteration.
pub const BAUMGARTE: f32 = 0.1;

/// Contacts closing slower than this along the normal get no restitution.
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Seconds a body must stay below its sleep tolerances before it may sleep.
pub const TIME_TO_SLEEP: f32 = 0.2;

/// Default per-body linear sleep tolerance, in m/s.
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.05;

/// Default per-body angular sleep tolerance, in rad/s.
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * PI;

/// Broad-phase fat AABB slack, in meters.
pub const AABB_EXTENSION: f32 = 0.2;

/// Dimensionless multiplier used to predict proxy motion when re-fattening.
pub const AABB_MULTIPLIER: f32 = 2.0;
