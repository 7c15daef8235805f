//! Listener handles.
//!
//! A listener is either a **full-event consumer**, which receives the whole
//! event instance and may mutate it, or a **fast-invoke** listener, which is
//! called with just the fields its parameters name.
//!
//! Both kinds are stored type-erased: consumers as a [`ConsumerFn`] that
//! downcasts the instance, fast-invoke listeners as an [`InvokeFn`] that
//! downcasts each argument. The argument types are checked against the event's
//! fields when the listener is registered, so the downcasts inside cannot fail
//! for a validated handle.

use crate::{
    contract::Event,
    instance::EventInstance,
    method::MethodSig,
    priority::Priority,
    value::{ArgTuple, TypeInfo},
};
use std::{any::Any, fmt, sync::Arc};

/// A type-erased fast-invoke callable.
pub type InvokeFn = Arc<dyn Fn(&[&(dyn Any + Send + Sync)]) + Send + Sync>;

/// A type-erased full-event consumer.
pub type ConsumerFn = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

/// A closure usable as a fast-invoke listener taking borrowed `Args`.
///
/// Implemented for `Fn(&A, &B, ...)` closures of up to eight parameters.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot listen with arguments `{Args}`",
    label = "expected `Fn(&A, &B, ...)` matching the listener's argument tuple",
    note = "Fast-invoke listeners borrow each field: `|name: &String, score: &i32| ...`"
)]
pub trait ListenerFn<Args>: Send + Sync + 'static {
    /// The borrowed parameter types, in order.
    fn param_types() -> Vec<TypeInfo>;

    /// Erase the closure.
    ///
    /// # Panics
    ///
    /// The returned callable panics if handed fewer arguments than the
    /// closure takes, or one of another type. The bus only calls it after
    /// checking [`param_types`](Self::param_types) against the event's fields.
    fn into_invoke(self) -> InvokeFn;
}

macro_rules! impl_listener_fn {
    ($($ty:ident),*) => {
        impl<Func, $($ty,)*> ListenerFn<($($ty,)*)> for Func
        where
            Func: Fn($(&$ty),*) + Send + Sync + 'static,
            $($ty: Send + Sync + 'static,)*
        {
            fn param_types() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$ty>()),*]
            }

            #[allow(non_snake_case, unused_variables, unused_mut)]
            fn into_invoke(self) -> InvokeFn {
                Arc::new(move |args: &[&(dyn Any + Send + Sync)]| {
                    let mut args = args.iter();
                    $(
                        let $ty = args
                            .next()
                            .and_then(|arg| arg.downcast_ref::<$ty>())
                            .expect("argument type validated at registration");
                    )*
                    (self)($($ty),*)
                })
            }
        }
    };
}

impl_listener_fn!();
impl_listener_fn!(A);
impl_listener_fn!(A, B);
impl_listener_fn!(A, B, C);
impl_listener_fn!(A, B, C, D);
impl_listener_fn!(A, B, C, D, E);
impl_listener_fn!(A, B, C, D, E, F);
impl_listener_fn!(A, B, C, D, E, F, G);
impl_listener_fn!(A, B, C, D, E, F, G, H);

/// Erase a full-event consumer of `E`.
///
/// # Panics
///
/// The returned callable panics when given anything but an
/// `EventInstance<E>`. Descriptors of `E` only ever hold instances of `E`.
pub fn consumer<E, F>(f: F) -> ConsumerFn
where
    E: Event,
    F: Fn(&mut EventInstance<E>) + Send + Sync + 'static,
{
    Arc::new(move |event: &mut dyn Any| {
        let event = event
            .downcast_mut::<EventInstance<E>>()
            .expect("consumer event type validated at registration");
        f(event)
    })
}

/// How a listener is called.
#[derive(Clone)]
pub enum ListenerKind {
    /// Receives the whole event instance.
    Consumer(ConsumerFn),
    /// Receives the named fields, in order.
    FastInvoke {
        /// Field names, one per parameter.
        params: Arc<[String]>,
        /// The erased callable.
        invoke: InvokeFn,
    },
}

/// One registered listener.
#[derive(Clone)]
pub struct ListenerHandle {
    method: MethodSig,
    priority: Priority,
    kind: ListenerKind,
}

impl ListenerHandle {
    /// A full-event consumer.
    pub fn consumer(method: MethodSig, priority: Priority, consumer: ConsumerFn) -> Self {
        Self {
            method,
            priority,
            kind: ListenerKind::Consumer(consumer),
        }
    }

    /// A fast-invoke listener bound to the fields `params`.
    pub fn fast_invoke(
        method: MethodSig,
        priority: Priority,
        params: impl Into<Arc<[String]>>,
        invoke: InvokeFn,
    ) -> Self {
        Self {
            method,
            priority,
            kind: ListenerKind::FastInvoke {
                params: params.into(),
                invoke,
            },
        }
    }

    /// The listener's signature.
    pub fn method(&self) -> &MethodSig {
        &self.method
    }

    /// Dispatch priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// How the listener is called.
    pub fn kind(&self) -> &ListenerKind {
        &self.kind
    }

    /// Whether the listener takes named fields rather than the whole event.
    pub fn is_fast_invoke(&self) -> bool {
        matches!(self.kind, ListenerKind::FastInvoke { .. })
    }

    /// Bound field names, for fast-invoke listeners.
    pub fn params(&self) -> Option<&[String]> {
        match &self.kind {
            ListenerKind::FastInvoke { params, .. } => Some(params),
            ListenerKind::Consumer(_) => None,
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("method", &self.method)
            .field("priority", &self.priority)
            .field("params", &self.params())
            .finish()
    }
}

/// A declared listener shape for closures registered without a subscriber.
///
/// The contract's method carries the parameter names the closure's arguments
/// bind to, either inline or through the resolver's metadata tiers.
///
/// ```rust,ignore
/// struct OnScore;
///
/// impl ListenerContract for OnScore {
///     type Event = PlayerJoin;
///     type Args = (String, i32);
///
///     fn method() -> MethodSig {
///         MethodSig::of::<Self::Args>("game::OnScore", "on_score").names(&["name", "score"])
///     }
/// }
/// ```
pub trait ListenerContract: 'static {
    /// The event listened to.
    type Event: Event;
    /// Owned parameter types; the closure borrows each.
    type Args: ArgTuple;

    /// Signature used for parameter name resolution.
    fn method() -> MethodSig;
}
