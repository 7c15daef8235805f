//! # tidings - Typed In-Process Event Bus
//!
//! `tidings` dispatches events to listeners through compiled units. An event
//! is a set of named, typed fields; listeners either take the whole event
//! instance or just the fields their parameters name, and a firing contract
//! raises the event by handing over the field values.
//!
//! Dispatch is synchronous. Each event's listeners are flattened into one
//! dispatch unit, rebuilt only after a new registration, and the event
//! instance is built only when someone needs it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidings::prelude::*;
//!
//! pub struct PlayerJoin;
//!
//! impl PlayerJoin {
//!     pub const NAME: FieldKey<String> = FieldKey::new("name");
//!     pub const SCORE: FieldKey<i32> = FieldKey::new("score");
//! }
//!
//! impl Event for PlayerJoin {
//!     fn declare(contract: &mut Contract) {
//!         contract.getter(Self::NAME).field(Self::SCORE);
//!     }
//! }
//!
//! struct FirePlayerJoin;
//!
//! impl FiringContract for FirePlayerJoin {
//!     type Event = PlayerJoin;
//!     type Args = (String, i32);
//!     type Output = ();
//!
//!     fn method() -> MethodSig {
//!         MethodSig::of::<Self::Args>("game::FirePlayerJoin", "fire").names(&["name", "score"])
//!     }
//! }
//!
//! struct Scoreboard;
//!
//! #[subscriber]
//! impl Scoreboard {
//!     #[subscribe(PlayerJoin, priority = High)]
//!     pub fn on_join(&self, name: &String, score: &i32) {
//!         println!("{name} joined with {score}");
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.register(&Arc::new(Scoreboard))?;
//! bus.bind::<FirePlayerJoin>()?.fire(("ann".to_string(), 3))?;
//! ```
//!
//! ## Configuration
//!
//! [`BusConfig::from_env`] reads `TIDINGS_DEBUG` (log every dispatch plan) and
//! `TIDINGS_RESOLUTION` (`reject` or `skip` subscriber methods whose parameter
//! names cannot be resolved).

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod bus;
pub mod config;
mod descriptor;
mod fire;
mod subscription;

pub use bus::EventBus;
pub use config::{BusConfig, ResolutionPolicy};
pub use descriptor::EventDescriptor;
pub use fire::Fire;
pub use subscription::{StaticSubscriber, Subscriber, Subscription, SubscriptionKind};

pub use tidings_core::{
    // Units
    ArgSource,
    // Values
    ArgTuple,
    // Errors
    CompilationError,
    CompiledUnit,
    ConfigurationError,
    ConsumerFn,
    // Events
    Contract,
    DispatchPlan,
    // Environment
    Environment,
    Event,
    EventField,
    EventInstance,
    EventType,
    FieldAccessError,
    FieldKey,
    FieldMap,
    FieldType,
    FieldValue,
    // Firing
    FireOutput,
    FiringContract,
    FiringShape,
    InstanceBuilder,
    InvokeFn,
    // Listeners
    ListenerContract,
    ListenerFn,
    ListenerHandle,
    ListenerKind,
    MethodSig,
    Modifiers,
    ParamMetadata,
    ParsePriorityError,
    Priority,
    RegistrationError,
    ResolutionMiss,
    Step,
    StepAction,
    TidingsError,
    TypeInfo,
    UnitMaterializer,
    compiled_metadata,
    fields_of,
};

pub use tidings_std::{
    ClosureMaterializer, ParamNameResolver, ResolvedNames, StdEnvironment, Tier, compile_plan,
};

/// Parameter name resolution tiers and resource formats.
pub mod params {
    pub use tidings_std::params::{
        ParamNameResolver, ResolvedNames, Tier,
        debug_image::{DebugImage, DebugImageError, MethodLocals},
        metadata::{SignatureTable, parse},
    };
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use tidings_std::testing::*;
}

/// Prelude module - common imports for Tidings.
///
/// # Usage
///
/// ```rust,ignore
/// use tidings::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BusConfig, Contract, Event, EventBus, EventInstance, FieldKey, Fire, FiringContract,
        ListenerContract, MethodSig, Priority, StaticSubscriber, Subscriber, TidingsError,
    };
    pub use std::sync::Arc;

    #[cfg(feature = "macros")]
    pub use tidings_macros::subscriber;
}

#[cfg(feature = "macros")]
pub use tidings_macros::subscriber;

#[doc(hidden)]
pub use inventory;
