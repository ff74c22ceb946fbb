//! Core simulation data: math types, geometry, bodies, and fixtures.

pub mod aabb;
pub mod body;
pub mod fixture;
pub mod hull;
pub mod mesh;
pub mod shape;
pub mod transform;

pub use aabb::Aabb;
pub use body::{BodyDef, BodyType, RigidBody};
pub use fixture::{Fixture, FixtureDef};
pub use hull::{HalfEdgeHull, Plane};
pub use mesh::{MeshBuilder, TriangleMesh};
pub use shape::{MassData, Shape, ShapeKind};
pub use transform::{Sweep, Transform};
