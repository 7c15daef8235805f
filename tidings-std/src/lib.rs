//! # tidings-std
//!
//! Standard implementations for the Tidings typed event bus.
//!
//! This crate provides:
//! - **Parameter names**: [`ParamNameResolver`] with explicit, metadata and debug image tiers
//! - **Compilation**: [`compile_plan`] from listener lists to dispatch plans
//! - **Materialization**: [`ClosureMaterializer`], the default unit builder
//! - **Environment**: [`StdEnvironment`], resources from an optional directory
//! - **Testing**: counting materializer, in-memory environment, call recorder

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use tidings_core;

// Modules
pub mod compile;
pub mod environment;
pub mod materialize;
pub mod params;
pub mod testing;

pub use compile::compile_plan;
pub use environment::StdEnvironment;
pub use materialize::{ClosureMaterializer, ClosureUnit};
pub use params::{ParamNameResolver, ResolvedNames, Tier};
