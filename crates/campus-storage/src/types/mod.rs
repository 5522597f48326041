//! Type definitions for campus storage.

mod groups;
mod ids;
mod roster;
mod students;

// Re-export all types from submodules
pub use groups::*;
pub use ids::*;
pub use roster::*;
pub use students::*;
