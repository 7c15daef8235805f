//! # tidings-core
//!
//! Core types for the Tidings typed event bus.
//!
//! This crate carries the vocabulary shared by every other Tidings crate and
//! has no opinion on how parameter names are found or how dispatch units are
//! built. Extensions that only need to declare events or implement a
//! materializer can depend on it alone.
//!
//! # Building Blocks
//!
//! ## Events ([`Event`], [`Contract`])
//!
//! An event is a structural field set. Its author declares getters, setters
//! and parent contracts; [`fields_of`] derives the field model once per type
//! and caches it for the life of the process.
//!
//! ## Instances ([`EventInstance`])
//!
//! One slot per field, read and written through typed [`FieldKey`]s.
//!
//! ## Listeners ([`ListenerHandle`])
//!
//! - **Full-event consumers** receive `&mut EventInstance<E>` and may mutate it
//! - **Fast-invoke listeners** receive borrowed field values, nothing else
//!
//! ## Firing contracts ([`FiringContract`])
//!
//! The single entry point that raises an event, binding its arguments to
//! fields by name.
//!
//! ## Units ([`DispatchPlan`], [`UnitMaterializer`], [`CompiledUnit`])
//!
//! A plan flattens the priority-ordered listener list into steps; a
//! materializer turns the plan into something callable.
//!
//! # Error Types
//!
//! - [`TidingsError`] - Top-level error type
//! - [`ConfigurationError`] - Malformed event or firing contracts
//! - [`RegistrationError`] - Rejected listeners
//! - [`CompilationError`] - Dispatch units that could not be built

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod contract;
mod environment;
mod error;
mod field;
mod firing;
mod instance;
mod listener;
mod method;
mod priority;
mod unit;
mod value;

// Re-exports
pub use contract::{Accessor, Contract, Event, EventType};
pub use environment::{Environment, ParamMetadata, compiled_metadata};
pub use error::{
    CompilationError, ConfigurationError, FieldAccessError, RegistrationError, ResolutionMiss,
    TidingsError,
};
pub use field::{EventField, FieldMap, fields_of};
pub use firing::{FireOutput, FiringContract, FiringShape};
pub use instance::{AnyInstance, EventInstance, InstanceBuilder};
pub use listener::{
    ConsumerFn, InvokeFn, ListenerContract, ListenerFn, ListenerHandle, ListenerKind, consumer,
};
pub use method::{MethodSig, Modifiers};
pub use priority::{ParsePriorityError, Priority};
pub use unit::{ArgSource, CompiledUnit, DispatchPlan, Step, StepAction, UnitMaterializer};
pub use value::{ArgTuple, FieldKey, FieldType, FieldValue, TypeInfo};

#[doc(hidden)]
pub use inventory;
