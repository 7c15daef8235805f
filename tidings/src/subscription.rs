//! Subscriber types.
//!
//! A subscriber is a type whose methods listen to events. The `#[subscriber]`
//! attribute implements [`Subscriber`] and [`StaticSubscriber`] by listing
//! each marked method as a [`Subscription`]; the bus decides which of those
//! it registers from their [`Modifiers`].

use std::sync::Arc;
use tidings_core::{
    ConsumerFn, Event, EventInstance, EventType, InvokeFn, ListenerFn, MethodSig, Modifiers,
    Priority, TypeInfo, consumer,
};

/// A type whose methods listen to events through an instance.
///
/// Usually implemented by `#[subscriber]`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a subscriber",
    label = "missing `Subscriber` implementation",
    note = "Add `#[subscriber]` to an impl block of `{Self}` with `#[subscribe]` methods."
)]
pub trait Subscriber: Send + Sync + 'static {
    /// Every marked method, bound to `this`.
    fn subscriptions(this: &Arc<Self>) -> Vec<Subscription>;
}

/// A type with receiver-less listener methods.
///
/// Usually implemented by `#[subscriber]`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a static subscriber",
    label = "missing `StaticSubscriber` implementation",
    note = "Add `#[subscriber]` to an impl block of `{Self}` with `#[subscribe]` methods."
)]
pub trait StaticSubscriber: 'static {
    /// Every marked method without a receiver.
    fn static_subscriptions() -> Vec<Subscription>;
}

/// How a subscribed method is called.
pub enum SubscriptionKind {
    /// The method takes `&mut EventInstance<E>`.
    Consumer {
        /// The event taken as the parameter.
        event: EventType,
        /// The erased method.
        listener: ConsumerFn,
    },
    /// The method takes borrowed field values.
    Exploded {
        /// Borrowed parameter types, in order.
        params: Vec<TypeInfo>,
        /// The erased method.
        invoke: InvokeFn,
    },
}

/// One marked method of a subscriber.
pub struct Subscription {
    method: MethodSig,
    modifiers: Modifiers,
    priority: Priority,
    declared_event: Option<EventType>,
    kind: SubscriptionKind,
}

impl Subscription {
    /// A method consuming the whole event `E`.
    pub fn consumer<E, F>(
        method: MethodSig,
        modifiers: Modifiers,
        priority: Priority,
        declared_event: Option<EventType>,
        f: F,
    ) -> Self
    where
        E: Event,
        F: Fn(&mut EventInstance<E>) + Send + Sync + 'static,
    {
        Self {
            method,
            modifiers,
            priority,
            declared_event,
            kind: SubscriptionKind::Consumer {
                event: EventType::of::<E>(),
                listener: consumer::<E, F>(f),
            },
        }
    }

    /// A method taking borrowed field values.
    pub fn exploded<Args, F>(
        method: MethodSig,
        modifiers: Modifiers,
        priority: Priority,
        declared_event: Option<EventType>,
        f: F,
    ) -> Self
    where
        F: ListenerFn<Args>,
    {
        Self {
            method,
            modifiers,
            priority,
            declared_event,
            kind: SubscriptionKind::Exploded {
                params: F::param_types(),
                invoke: f.into_invoke(),
            },
        }
    }

    /// The method's signature.
    pub fn method(&self) -> &MethodSig {
        &self.method
    }

    /// Visibility and binding of the method.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Dispatch priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The event named on the marker, if any.
    pub fn declared_event(&self) -> Option<EventType> {
        self.declared_event
    }

    /// How the method is called.
    pub fn kind(&self) -> &SubscriptionKind {
        &self.kind
    }

    /// The event this method listens to: the consumed event, or the one
    /// named on the marker.
    pub fn event(&self) -> Option<EventType> {
        match &self.kind {
            SubscriptionKind::Consumer { event, .. } => Some(*event),
            SubscriptionKind::Exploded { .. } => self.declared_event,
        }
    }

    pub(crate) fn into_parts(self) -> (MethodSig, Priority, Option<EventType>, SubscriptionKind) {
        (self.method, self.priority, self.declared_event, self.kind)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("method", &self.method)
            .field("modifiers", &self.modifiers)
            .field("priority", &self.priority)
            .field("event", &self.event())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_core::{Contract, FieldKey};

    struct Tick;

    impl Tick {
        const N: FieldKey<u64> = FieldKey::new("n");
    }

    impl Event for Tick {
        fn declare(contract: &mut Contract) {
            contract.getter(Self::N);
        }
    }

    #[test]
    fn consumer_reports_its_event() {
        let sub = Subscription::consumer::<Tick, _>(
            MethodSig::new("demo::Clock", "on_tick").param::<EventInstance<Tick>>(),
            Modifiers::PUBLIC,
            Priority::Low,
            None,
            |_| {},
        );
        assert_eq!(sub.event(), Some(EventType::of::<Tick>()));
        assert!(sub.declared_event().is_none());
        assert_eq!(sub.priority(), Priority::Low);
        assert!(matches!(sub.kind(), SubscriptionKind::Consumer { .. }));
    }

    #[test]
    fn exploded_needs_a_declared_event() {
        let sub = Subscription::exploded(
            MethodSig::of::<(u64,)>("demo::Clock", "on_n"),
            Modifiers::PUBLIC | Modifiers::STATIC,
            Priority::Normal,
            None,
            |_: &u64| {},
        );
        assert!(sub.event().is_none());
        match sub.kind() {
            SubscriptionKind::Exploded { params, .. } => {
                assert_eq!(params, &vec![TypeInfo::of::<u64>()]);
            }
            SubscriptionKind::Consumer { .. } => panic!("expected exploded"),
        }
    }
}
