//! Tremor – a 3D rigid body dynamics engine.
//!
//! The crate is organised around a [`World`] that owns every simulation
//! object: rigid bodies carry fixtures, fixtures bind shapes, and joints
//! and contacts connect bodies into islands that a sequential-impulse
//! solver advances at a fixed time step.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3};

pub use crate::collision::{BroadPhase, DynamicTree, Manifold, WorldManifold};
pub use crate::core::body::{BodyId, FixtureId};
pub use crate::core::{
    Aabb, BodyDef, BodyType, Fixture, FixtureDef, HalfEdgeHull, MeshBuilder, RigidBody, Shape,
    Sweep, Transform, TriangleMesh,
};
pub use crate::dynamics::{
    ConeJointDef, Contact, ContactId, JointDef, JointId, MotorJointDef, MouseJointDef,
    PrismaticJointDef, RevoluteJointDef, SpringJointDef, WeldJointDef, WheelJointDef,
};
pub use crate::utils::profiling::StepProfile;
pub use crate::world::events::{
    CastHit, ContactFilter, ContactListener, DebugDraw, QueryFilter, QueryListener, RayCastFilter,
    RayCastListener, ShapeCastFilter, ShapeCastListener,
};
pub use crate::world::World;
