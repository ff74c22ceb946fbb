//! Utility helpers: generational arenas, logging, and step profiling.

pub mod arena;
pub mod logging;
pub mod profiling;

pub use arena::{Arena, Id};
pub use logging::ScopedTimer;
pub use profiling::StepProfile;
