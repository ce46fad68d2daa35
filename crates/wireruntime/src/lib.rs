//! Workflow execution runtime
//!
//! This crate provides the engine that runs workflows: graph
//! linearisation, the executor registry, the retrying orchestrator and
//! in-memory stores.

pub mod graph;
mod loader;
mod memory;
mod orchestrator;
mod registry;
mod runtime;

pub use graph::topological_sort;
pub use loader::{load_workflow, parse_workflow, validate_workflow};
pub use memory::{MemoryStore, Stores};
pub use orchestrator::{ExecutionResult, Orchestrator};
pub use registry::ExecutorRegistry;
pub use runtime::{RuntimeConfig, WireRuntime, WireRuntimeBuilder};
