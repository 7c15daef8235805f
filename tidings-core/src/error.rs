//! Error types for Tidings.
//!
//! Every failure is synchronous and surfaces to the caller that triggered it:
//!
//! - [`ConfigurationError`] - Bad event contracts or firing contract bindings
//! - [`RegistrationError`] - A listener could not be attached to an event
//! - [`ResolutionMiss`] - Parameter names could not be found through any tier
//! - [`CompilationError`] - The dispatch unit for an event could not be built
//! - [`FieldAccessError`] - Reading or writing a field on an event instance failed
//!
//! [`TidingsError`] unifies them for callers that do not care which stage failed.

use thiserror::Error;

/// Top-level error type for all Tidings operations.
#[derive(Error, Debug)]
pub enum TidingsError {
    /// An event or firing contract is malformed.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A listener registration was rejected.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// Parameter names were unavailable.
    #[error(transparent)]
    Resolution(#[from] ResolutionMiss),

    /// The dispatch unit could not be built.
    #[error("compilation error: {0}")]
    Compilation(#[from] CompilationError),

    /// A field could not be read or written.
    #[error("field access error: {0}")]
    FieldAccess(#[from] FieldAccessError),
}

/// Errors raised while building an event descriptor or binding a firing contract.
///
/// These are never retried: the field model of a contract that failed once
/// fails the same way on every later lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two parent contracts expose distinct fields with the same name.
    #[error("found duplicate event field name '{field}'. Declared in '{first}' and '{second}'")]
    DuplicateField {
        /// The clashing field name.
        field: &'static str,
        /// Contract that declared the field first.
        first: &'static str,
        /// Contract that declared the conflicting field.
        second: &'static str,
    },

    /// A contract redeclares a field it already inherits.
    #[error("field '{field}' declared in '{contract}' shadows the field inherited from '{inherited}'")]
    ShadowedField {
        /// The shadowed field name.
        field: &'static str,
        /// Contract redeclaring the field.
        contract: &'static str,
        /// Contract the field was inherited from.
        inherited: &'static str,
    },

    /// A contract declares two getters for one field.
    #[error("already found getter for field '{field}' in '{contract}'")]
    DuplicateGetter {
        /// Field name.
        field: &'static str,
        /// Declaring contract.
        contract: &'static str,
    },

    /// A contract declares two setters for one field.
    #[error("already found setter for field '{field}' in '{contract}'")]
    DuplicateSetter {
        /// Field name.
        field: &'static str,
        /// Declaring contract.
        contract: &'static str,
    },

    /// A setter was declared without a matching getter.
    #[error("getter for event field '{field}' in '{contract}' required")]
    MissingGetter {
        /// Field name.
        field: &'static str,
        /// Declaring contract.
        contract: &'static str,
    },

    /// Getter and setter disagree on the field type.
    #[error("field '{field}' in '{contract}' has getter type `{getter}` but setter type `{setter}`")]
    AccessorTypeMismatch {
        /// Field name.
        field: &'static str,
        /// Declaring contract.
        contract: &'static str,
        /// Type returned by the getter.
        getter: &'static str,
        /// Type accepted by the setter.
        setter: &'static str,
    },

    /// A contract extends itself, directly or through its parents.
    #[error("event contract '{0}' extends itself")]
    CyclicContract(&'static str),

    /// The event already has a different firing contract.
    #[error("event '{event}' is already bound to firing contract '{existing}', cannot bind '{requested}'")]
    FiringAlreadyBound {
        /// Event name.
        event: &'static str,
        /// The contract bound first.
        existing: &'static str,
        /// The contract that was rejected.
        requested: &'static str,
    },

    /// The firing contract's parameter names could not be resolved.
    #[error("unable to resolve parameter names for firing contract '{contract}'")]
    UnresolvedFiringParams {
        /// Firing contract name.
        contract: &'static str,
    },

    /// A firing contract parameter does not name an event field.
    #[error("parameter '{param}' of firing contract '{contract}' does not map to an event field")]
    UnknownFiringParam {
        /// Firing contract name.
        contract: &'static str,
        /// Offending parameter.
        param: String,
    },

    /// A firing contract binds the same field twice.
    #[error("firing contract '{contract}' binds field '{param}' more than once")]
    DuplicateFiringParam {
        /// Firing contract name.
        contract: &'static str,
        /// Repeated parameter.
        param: String,
    },

    /// A firing contract parameter type disagrees with the field type.
    #[error("parameter '{param}' of firing contract '{contract}' has type `{found}`, field is `{expected}`")]
    FiringParamType {
        /// Firing contract name.
        contract: &'static str,
        /// Offending parameter.
        param: String,
        /// Declared field type.
        expected: &'static str,
        /// Parameter type.
        found: &'static str,
    },

    /// A firing contract returns something other than `()` or its own event.
    #[error("expected firing contract '{contract}' to return () or '{event}', found '{found}'")]
    FiringReturn {
        /// Firing contract name.
        contract: &'static str,
        /// Owning event.
        event: &'static str,
        /// Declared return event.
        found: &'static str,
    },
}

/// Errors raised when a listener cannot be registered.
///
/// A failed registration never mutates the listener list, and never rolls back
/// listeners that were registered before it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The declared target event disagrees with the event parameter.
    #[error("method '{method}' declares event '{declared}' but consumes '{inferred}'")]
    EventMismatch {
        /// Listener method.
        method: String,
        /// Event named on the subscription.
        declared: &'static str,
        /// Event taken as the parameter.
        inferred: &'static str,
    },

    /// A full-event consumer was registered on a fast-invoke-only event.
    #[error("event '{event}' is fast-invoke only, register a field-exploded listener instead")]
    FastInvokeOnly {
        /// Event name.
        event: &'static str,
    },

    /// Parameter names could not be resolved.
    #[error(transparent)]
    Unresolved(#[from] ResolutionMiss),

    /// A listener parameter does not name an event field.
    #[error("parameter '{param}' (index {index}) of '{method}' is not a field of '{event}'")]
    NotAField {
        /// Listener method.
        method: String,
        /// Offending parameter.
        param: String,
        /// Parameter position.
        index: usize,
        /// Event name.
        event: &'static str,
    },

    /// Two listener parameters bind the same field.
    #[error("parameter '{param}' of '{method}' binds a field that is already bound")]
    DuplicateParam {
        /// Listener method.
        method: String,
        /// Repeated parameter.
        param: String,
    },

    /// A listener parameter type disagrees with the field type.
    #[error("parameter '{param}' of '{method}' has type `{found}`, field is `{expected}`")]
    ParamType {
        /// Listener method.
        method: String,
        /// Offending parameter.
        param: String,
        /// Declared field type.
        expected: &'static str,
        /// Parameter type.
        found: &'static str,
    },

    /// The resolved names and the callable's parameters disagree in count.
    #[error("'{method}' takes {expected} parameters but {found} names were resolved")]
    Arity {
        /// Listener method.
        method: String,
        /// Parameter count.
        expected: usize,
        /// Resolved name count.
        found: usize,
    },

    /// The target event's contract is malformed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Parameter names were not available through any resolution tier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unable to resolve parameter names for '{method}'")]
pub struct ResolutionMiss {
    /// The callable, as `declaring_type::signature`.
    pub method: String,
}

/// Errors raised while building a dispatch unit.
///
/// The descriptor stays dirty after a failure, so the next dispatch retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilationError {
    /// A listener needs a field the firing contract never supplies.
    #[error("listener '{listener}' requires field '{field}' of '{event}', which the firing contract does not supply")]
    UnsuppliedField {
        /// Event name.
        event: &'static str,
        /// Missing field.
        field: String,
        /// Listener method.
        listener: String,
    },

    /// A listener names a field the event does not have.
    #[error("listener '{listener}' names unknown field '{field}' of '{event}'")]
    UnknownField {
        /// Event name.
        event: &'static str,
        /// Unknown field.
        field: String,
        /// Listener method.
        listener: String,
    },

    /// No firing contract is bound for the event.
    #[error("event '{0}' has no firing contract bound")]
    Unbound(&'static str),

    /// The unit materializer rejected the plan.
    #[error("unable to materialize dispatch unit '{unit}': {reason}")]
    Materialize {
        /// Unit name.
        unit: String,
        /// Materializer diagnostic.
        reason: String,
    },

    /// The unit did not produce the event instance its contract returns.
    #[error("dispatch unit for '{0}' did not produce an event instance")]
    MissingInstance(&'static str),
}

/// Errors raised by event instance getters and setters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldAccessError {
    /// The event has no such field.
    #[error("event '{event}' has no field '{field}'")]
    Unknown {
        /// Event name.
        event: &'static str,
        /// Requested field.
        field: &'static str,
    },

    /// The field has no setter.
    #[error("field '{field}' of event '{event}' is immutable")]
    Immutable {
        /// Event name.
        event: &'static str,
        /// Requested field.
        field: &'static str,
    },

    /// The key's type disagrees with the declared field type.
    #[error("field '{field}' of event '{event}' is `{expected}`, not `{found}`")]
    TypeMismatch {
        /// Event name.
        event: &'static str,
        /// Requested field.
        field: &'static str,
        /// Declared type.
        expected: &'static str,
        /// Requested type.
        found: &'static str,
    },

    /// The field was never given a value.
    #[error("field '{field}' of event '{event}' has no value")]
    Unset {
        /// Event name.
        event: &'static str,
        /// Requested field.
        field: &'static str,
    },
}
