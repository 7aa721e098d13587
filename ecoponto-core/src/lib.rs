//! Core types and service wiring for the ecoponto collection point directory.

/// Bundling of storage ports into a backend.
pub mod backend;
/// Domain models and identifiers shared by all backends.
pub mod model;
/// Traits describing the storage interfaces.
pub mod ports;
/// Query and registration engines used by clients.
pub mod service;

pub use backend::*;
pub use model::*;
pub use ports::*;
pub use service::*;
