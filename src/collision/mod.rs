//! Collision pipeline: broad-phase tree, convex distance, narrow-phase
//! contact generation, and manifold clustering.

pub mod broadphase;
pub mod clip;
pub mod cluster;
pub mod collide;
pub mod gjk;
pub mod manifold;
pub mod sat;
pub mod toi;

pub use broadphase::{BroadPhase, DynamicTree};
pub use collide::ConvexCache;
pub use gjk::{gjk_distance, GjkOutput, SimplexCache};
pub use manifold::{FeatureKey, Manifold, ManifoldPoint, WorldManifold};
pub use toi::{time_of_impact, ToiOutput, ToiState};
