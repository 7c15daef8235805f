//! Event instances.
//!
//! An [`EventInstance`] stores one slot per field of its event, in the order
//! given by the event's [`FieldMap`]. Slots the firing contract never supplied
//! stay empty and read back as [`FieldAccessError::Unset`].

use crate::{
    contract::{Event, EventType},
    error::{ConfigurationError, FieldAccessError},
    field::{FieldMap, fields_of},
    value::{FieldKey, FieldValue, TypeInfo},
};
use std::{
    any::Any,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

/// A concrete instance of the event `E`.
pub struct EventInstance<E: Event> {
    fields: Arc<FieldMap>,
    slots: Vec<Option<FieldValue>>,
    _event: PhantomData<fn() -> E>,
}

impl<E: Event> EventInstance<E> {
    /// Start building an instance with every slot empty.
    pub fn builder() -> Result<InstanceBuilder<E>, ConfigurationError> {
        let fields = fields_of(EventType::of::<E>())?;
        let slots = std::iter::repeat_with(|| None).take(fields.len()).collect();
        Ok(InstanceBuilder {
            instance: Self::from_parts(fields, slots),
        })
    }

    /// Assemble an instance from its field map and slot values.
    ///
    /// Missing trailing slots are treated as empty.
    pub fn from_parts(fields: Arc<FieldMap>, mut slots: Vec<Option<FieldValue>>) -> Self {
        slots.resize_with(fields.len(), || None);
        Self {
            fields,
            slots,
            _event: PhantomData,
        }
    }

    /// The event's field map.
    pub fn fields(&self) -> &Arc<FieldMap> {
        &self.fields
    }

    /// Read a field.
    pub fn get<T: 'static>(&self, key: FieldKey<T>) -> Result<&T, FieldAccessError> {
        let slot = self.slot_for::<T>(key.name())?;
        self.slots[slot]
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or(FieldAccessError::Unset {
                event: self.fields.event(),
                field: key.name(),
            })
    }

    /// Replace a mutable field's value.
    pub fn set<T: Send + Sync + 'static>(
        &mut self,
        key: FieldKey<T>,
        value: T,
    ) -> Result<(), FieldAccessError> {
        let slot = self.slot_for::<T>(key.name())?;
        if self.fields.at(slot).is_some_and(|f| f.is_immutable()) {
            return Err(FieldAccessError::Immutable {
                event: self.fields.event(),
                field: key.name(),
            });
        }
        self.slots[slot] = Some(Box::new(value));
        Ok(())
    }

    /// Whether a field has a value.
    pub fn is_set(&self, name: &str) -> bool {
        self.fields
            .slot(name)
            .is_some_and(|slot| self.slots[slot].is_some())
    }

    fn slot_for<T: 'static>(&self, name: &'static str) -> Result<usize, FieldAccessError> {
        let slot = self.fields.slot(name).ok_or(FieldAccessError::Unknown {
            event: self.fields.event(),
            field: name,
        })?;
        let declared = self.fields.at(slot).map(|f| f.ty().info());
        let requested = TypeInfo::of::<T>();
        match declared {
            Some(declared) if declared == requested => Ok(slot),
            Some(declared) => Err(FieldAccessError::TypeMismatch {
                event: self.fields.event(),
                field: name,
                expected: declared.name(),
                found: requested.name(),
            }),
            None => Err(FieldAccessError::Unknown {
                event: self.fields.event(),
                field: name,
            }),
        }
    }
}

impl<E: Event> fmt::Debug for EventInstance<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = self
            .fields
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_some())
            .map(|(field, _)| field.name())
            .collect();
        f.debug_struct("EventInstance")
            .field("event", &self.fields.event())
            .field("set", &set)
            .finish()
    }
}

/// Builds an [`EventInstance`] field by field.
///
/// Unlike [`EventInstance::set`], the builder may populate immutable fields.
pub struct InstanceBuilder<E: Event> {
    instance: EventInstance<E>,
}

impl<E: Event> InstanceBuilder<E> {
    /// Supply a field value.
    pub fn set<T: Send + Sync + 'static>(
        mut self,
        key: FieldKey<T>,
        value: T,
    ) -> Result<Self, FieldAccessError> {
        let slot = self.instance.slot_for::<T>(key.name())?;
        self.instance.slots[slot] = Some(Box::new(value));
        Ok(self)
    }

    /// Finish building.
    pub fn build(self) -> EventInstance<E> {
        self.instance
    }
}

/// Object-safe view of an event instance used by compiled dispatch units.
pub trait AnyInstance: Send + Sync {
    /// The event's field map.
    fn field_map(&self) -> &Arc<FieldMap>;

    /// The current value in `slot`, if set.
    fn slot(&self, slot: usize) -> Option<&(dyn Any + Send + Sync)>;

    /// Mutable access for downcasting to the concrete instance.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert into the concrete instance.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<E: Event> AnyInstance for EventInstance<E> {
    fn field_map(&self) -> &Arc<FieldMap> {
        &self.fields
    }

    fn slot(&self, slot: usize) -> Option<&(dyn Any + Send + Sync)> {
        self.slots.get(slot)?.as_deref()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Contract;

    struct Chat;

    impl Chat {
        const SENDER: FieldKey<String> = FieldKey::new("sender");
        const MESSAGE: FieldKey<String> = FieldKey::new("message");
        const SEQ: FieldKey<u64> = FieldKey::new("seq");
    }

    impl Event for Chat {
        fn declare(contract: &mut Contract) {
            contract
                .getter(Self::SENDER)
                .field(Self::MESSAGE)
                .getter(Self::SEQ);
        }
    }

    fn chat() -> EventInstance<Chat> {
        EventInstance::<Chat>::builder()
            .unwrap()
            .set(Chat::SENDER, "ann".to_string())
            .unwrap()
            .set(Chat::MESSAGE, "hi".to_string())
            .unwrap()
            .set(Chat::SEQ, 3)
            .unwrap()
            .build()
    }

    #[test]
    fn construct_then_read_returns_supplied_values() {
        let event = chat();
        assert_eq!(event.get(Chat::SENDER).unwrap(), "ann");
        assert_eq!(event.get(Chat::MESSAGE).unwrap(), "hi");
        assert_eq!(*event.get(Chat::SEQ).unwrap(), 3);
    }

    #[test]
    fn setter_replaces_mutable_field() {
        let mut event = chat();
        event.set(Chat::MESSAGE, "bye".to_string()).unwrap();
        assert_eq!(event.get(Chat::MESSAGE).unwrap(), "bye");
    }

    #[test]
    fn setter_rejects_immutable_field() {
        let mut event = chat();
        let err = event.set(Chat::SENDER, "bob".to_string()).unwrap_err();
        assert!(matches!(err, FieldAccessError::Immutable { field: "sender", .. }));
        assert_eq!(event.get(Chat::SENDER).unwrap(), "ann");
    }

    #[test]
    fn wrong_key_type_is_rejected() {
        let event = chat();
        let err = event.get(FieldKey::<i32>::new("seq")).unwrap_err();
        assert!(matches!(err, FieldAccessError::TypeMismatch { field: "seq", .. }));
    }

    #[test]
    fn unknown_and_unset_fields() {
        let event = EventInstance::<Chat>::builder()
            .unwrap()
            .set(Chat::SEQ, 1)
            .unwrap()
            .build();
        assert!(matches!(
            event.get(FieldKey::<String>::new("topic")),
            Err(FieldAccessError::Unknown { .. })
        ));
        assert!(matches!(
            event.get(Chat::SENDER),
            Err(FieldAccessError::Unset { .. })
        ));
        assert!(event.is_set("seq"));
        assert!(!event.is_set("message"));
    }

    #[test]
    fn erased_slots_follow_field_order() {
        let event: Box<dyn AnyInstance> = Box::new(chat());
        let message = event.slot(1).unwrap().downcast_ref::<String>().unwrap();
        assert_eq!(message, "hi");
        assert!(event.slot(9).is_none());

        let concrete = event.into_any().downcast::<EventInstance<Chat>>().unwrap();
        assert_eq!(*concrete.get(Chat::SEQ).unwrap(), 3);
    }
}
