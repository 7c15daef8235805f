//! # Event Contracts
//!
//! An event is a structural field set. Its author states the shape directly:
//! which fields can be read, which can also be written, and which parent
//! contracts it extends. The field model is derived from this declaration by
//! [`fields_of`](crate::fields_of).
//!
//! ```rust,ignore
//! pub struct PlayerJoin;
//!
//! impl PlayerJoin {
//!     pub const NAME: FieldKey<String> = FieldKey::new("name");
//!     pub const SCORE: FieldKey<i32> = FieldKey::new("score");
//! }
//!
//! impl Event for PlayerJoin {
//!     fn declare(contract: &mut Contract) {
//!         contract.extends::<Named>();
//!         contract.getter(Self::NAME);
//!         contract.field(Self::SCORE);
//!     }
//! }
//! ```

use crate::{
    field::FieldMap,
    instance::{AnyInstance, EventInstance},
    value::{FieldKey, FieldType, FieldValue},
};
use std::{any::TypeId, fmt, hash::Hash, sync::Arc};

/// A structural event contract.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an event contract",
    label = "missing `Event` implementation",
    note = "Events declare their fields through `Event::declare`."
)]
pub trait Event: Send + Sync + 'static {
    /// Events that only accept field-exploded listeners.
    ///
    /// Full-event consumers are rejected at registration time.
    const FAST_INVOKE_ONLY: bool = false;

    /// Declare the accessors and parent contracts of this event.
    fn declare(contract: &mut Contract);
}

/// A type-erased reference to an [`Event`] implementation.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    fast_invoke_only: bool,
    declare: fn(&mut Contract),
    new_instance: fn(Arc<FieldMap>, Vec<Option<FieldValue>>) -> Box<dyn AnyInstance>,
}

impl EventType {
    /// Describe the event `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
            fast_invoke_only: E::FAST_INVOKE_ONLY,
            declare: E::declare,
            new_instance: new_instance::<E>,
        }
    }

    /// The event's `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The event's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether full-event consumers are rejected.
    pub fn is_fast_invoke_only(&self) -> bool {
        self.fast_invoke_only
    }

    /// Run the event's declaration against a fresh contract.
    pub fn contract(&self) -> Contract {
        let mut contract = Contract::new(self.name);
        (self.declare)(&mut contract);
        contract
    }

    /// Construct an instance of this event from per-field slots.
    pub fn new_instance(
        &self,
        fields: Arc<FieldMap>,
        slots: Vec<Option<FieldValue>>,
    ) -> Box<dyn AnyInstance> {
        (self.new_instance)(fields, slots)
    }
}

fn new_instance<E: Event>(
    fields: Arc<FieldMap>,
    slots: Vec<Option<FieldValue>>,
) -> Box<dyn AnyInstance> {
    Box::new(EventInstance::<E>::from_parts(fields, slots))
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

/// One declared accessor.
#[derive(Clone, Copy, Debug)]
pub enum Accessor {
    /// A zero-argument read (`getX` / `isX`).
    Getter {
        /// Field name.
        field: &'static str,
        /// Returned type.
        ty: FieldType,
    },
    /// A one-argument write (`setX`).
    Setter {
        /// Field name.
        field: &'static str,
        /// Accepted type.
        ty: FieldType,
    },
}

impl Accessor {
    /// The field this accessor belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Accessor::Getter { field, .. } | Accessor::Setter { field, .. } => *field,
        }
    }
}

/// The declared shape of one event contract.
#[derive(Debug)]
pub struct Contract {
    owner: &'static str,
    parents: Vec<EventType>,
    accessors: Vec<Accessor>,
}

impl Contract {
    /// Create an empty contract for `owner`.
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            parents: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Inherit every field of the parent contract `P`.
    pub fn extends<P: Event>(&mut self) -> &mut Self {
        self.parents.push(EventType::of::<P>());
        self
    }

    /// Declare a read accessor for `key`.
    pub fn getter<T: Clone + Send + Sync + 'static>(&mut self, key: FieldKey<T>) -> &mut Self {
        self.accessors.push(Accessor::Getter {
            field: key.name(),
            ty: FieldType::of::<T>(),
        });
        self
    }

    /// Declare a write accessor for `key`.
    pub fn setter<T: Clone + Send + Sync + 'static>(&mut self, key: FieldKey<T>) -> &mut Self {
        self.accessors.push(Accessor::Setter {
            field: key.name(),
            ty: FieldType::of::<T>(),
        });
        self
    }

    /// Declare a mutable field: a getter and a setter for `key`.
    pub fn field<T: Clone + Send + Sync + 'static>(&mut self, key: FieldKey<T>) -> &mut Self {
        self.getter(key).setter(key)
    }

    /// The contract owner's name.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Parent contracts, in declaration order.
    pub fn parents(&self) -> &[EventType] {
        &self.parents
    }

    /// Declared accessors, in declaration order.
    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }
}
