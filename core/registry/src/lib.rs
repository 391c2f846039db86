//! Agent definitions and the registry that resolves them.
//!
//! An [`AgentDefinition`] declares everything the runtime needs to run an
//! agent: model, prompts, declared tools, spawnable children, and output
//! mode. Definitions are collected into an [`AgentRegistry`] before any run
//! starts; the registry is immutable afterwards and shared across concurrent
//! runs.

pub mod definition;
pub mod error;
pub mod loader;
pub mod registry;

pub use definition::AgentDefinition;
pub use error::RegistryError;
pub use error::Result;
pub use loader::load_definitions_dir;
pub use registry::AgentRegistry;
pub use registry::AgentRegistryBuilder;
