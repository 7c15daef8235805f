//! Firing contracts.
//!
//! A firing contract is the one entry point through which an event is raised.
//! Its parameters bind by name to the event's fields, and its output is either
//! nothing or the event instance the dispatch built.

use crate::{
    contract::{Event, EventType},
    instance::{AnyInstance, EventInstance},
    method::MethodSig,
    value::ArgTuple,
};
use std::any::TypeId;

/// The entry point that raises `Self::Event`.
///
/// ```rust,ignore
/// struct FirePlayerJoin;
///
/// impl FiringContract for FirePlayerJoin {
///     type Event = PlayerJoin;
///     type Args = (String, i32);
///     type Output = EventInstance<PlayerJoin>;
///
///     fn method() -> MethodSig {
///         MethodSig::of::<Self::Args>("game::FirePlayerJoin", "fire").names(&["name", "score"])
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a firing contract",
    label = "missing `FiringContract` implementation",
    note = "A firing contract names its event, its argument tuple and its output."
)]
pub trait FiringContract: 'static {
    /// The event raised.
    type Event: Event;
    /// Arguments, one per bound field.
    type Args: ArgTuple;
    /// `()` or `EventInstance<Self::Event>`.
    type Output: FireOutput;

    /// Signature used for parameter name resolution.
    fn method() -> MethodSig;
}

/// What a firing contract hands back after a dispatch.
pub trait FireOutput: Sized + 'static {
    /// The event instance type returned, if any.
    fn returns() -> Option<EventType>;

    /// Extract the output from the dispatch's event instance.
    fn from_dispatch(instance: Option<Box<dyn AnyInstance>>) -> Option<Self>;
}

impl FireOutput for () {
    fn returns() -> Option<EventType> {
        None
    }

    fn from_dispatch(_: Option<Box<dyn AnyInstance>>) -> Option<Self> {
        Some(())
    }
}

impl<E: Event> FireOutput for EventInstance<E> {
    fn returns() -> Option<EventType> {
        Some(EventType::of::<E>())
    }

    fn from_dispatch(instance: Option<Box<dyn AnyInstance>>) -> Option<Self> {
        instance?.into_any().downcast::<Self>().ok().map(|instance| *instance)
    }
}

/// How a bound firing contract feeds an event's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiringShape {
    /// The contract's `TypeId`.
    pub contract: TypeId,
    /// The contract's type name.
    pub contract_name: &'static str,
    /// For each field slot, the index of the argument supplying it.
    pub field_sources: Vec<Option<usize>>,
    /// Whether the contract returns the event instance.
    pub returns_event: bool,
}

impl FiringShape {
    /// Whether the contract supplies the field in `slot`.
    pub fn supplies(&self, slot: usize) -> bool {
        self.field_sources.get(slot).copied().flatten().is_some()
    }

    /// The argument index supplying `slot`.
    pub fn source(&self, slot: usize) -> Option<usize> {
        self.field_sources.get(slot).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{contract::Contract, value::FieldKey};

    struct Ping;

    impl Ping {
        const SEQ: FieldKey<u32> = FieldKey::new("seq");
    }

    impl Event for Ping {
        fn declare(contract: &mut Contract) {
            contract.getter(Self::SEQ);
        }
    }

    #[test]
    fn unit_output_ignores_instance() {
        assert!(<()>::returns().is_none());
        assert_eq!(<()>::from_dispatch(None), Some(()));
    }

    #[test]
    fn instance_output_downcasts() {
        assert_eq!(
            EventInstance::<Ping>::returns(),
            Some(EventType::of::<Ping>())
        );
        let built = EventInstance::<Ping>::builder()
            .unwrap()
            .set(Ping::SEQ, 4)
            .unwrap()
            .build();
        let out = EventInstance::<Ping>::from_dispatch(Some(Box::new(built))).unwrap();
        assert_eq!(*out.get(Ping::SEQ).unwrap(), 4);
        assert!(EventInstance::<Ping>::from_dispatch(None).is_none());
    }

    #[test]
    fn shape_reports_sources() {
        let shape = FiringShape {
            contract: TypeId::of::<()>(),
            contract_name: "demo",
            field_sources: vec![Some(1), None],
            returns_event: false,
        };
        assert!(shape.supplies(0));
        assert!(!shape.supplies(1));
        assert_eq!(shape.source(0), Some(1));
        assert_eq!(shape.source(5), None);
    }
}
