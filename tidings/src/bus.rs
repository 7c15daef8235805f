//! The event bus.
//!
//! [`EventBus`] keeps one [`EventDescriptor`] per event type, created on first
//! reference. Listeners are registered against descriptors and firing
//! contracts bound to them; dispatch itself goes through [`Fire`] handles.

use crate::{
    config::{BusConfig, ResolutionPolicy},
    descriptor::EventDescriptor,
    fire::Fire,
    subscription::{StaticSubscriber, Subscriber, Subscription, SubscriptionKind},
};
use dashmap::DashMap;
use std::{
    any::{TypeId, type_name},
    collections::HashSet,
    fmt,
    sync::Arc,
};
use tidings_core::{
    ArgTuple, ConfigurationError, Environment, Event, EventInstance, EventType, FieldMap,
    FireOutput, FiringContract, FiringShape, ListenerContract, ListenerFn, ListenerHandle,
    MethodSig, Modifiers, Priority, RegistrationError, TypeInfo, UnitMaterializer, consumer,
    fields_of,
};
use tidings_std::{ParamNameResolver, StdEnvironment};

struct BusInner {
    materializer: Arc<dyn UnitMaterializer>,
    resolver: ParamNameResolver,
    config: BusConfig,
    descriptors: DashMap<TypeId, Arc<EventDescriptor>>,
}

/// A typed, in-process event bus.
///
/// Cloning is cheap; clones share descriptors, caches and configuration.
///
/// # Example
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// let fire = bus.bind::<FirePlayerJoin>()?;
///
/// bus.register_listener::<OnScore, _>(Priority::High, |name: &String, score: &i32| {
///     println!("{name}: {score}");
/// })?;
///
/// let event = fire.fire(("ann".to_string(), 3))?;
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// A bus over the [`StdEnvironment`], configured from the process
    /// environment.
    pub fn new() -> Self {
        Self::with_environment(StdEnvironment::new())
    }

    /// A bus over `env`, configured from the process environment.
    pub fn with_environment(env: impl Environment) -> Self {
        Self::with_config(env, BusConfig::from_env())
    }

    /// A bus over `env` with explicit settings.
    pub fn with_config(env: impl Environment, config: BusConfig) -> Self {
        let env: Arc<dyn Environment> = Arc::new(env);
        Self {
            inner: Arc::new(BusInner {
                materializer: env.materializer(),
                resolver: ParamNameResolver::new(env),
                config,
                descriptors: DashMap::new(),
            }),
        }
    }

    /// The bus settings.
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// The bus's parameter name resolver.
    pub fn resolver(&self) -> &ParamNameResolver {
        &self.inner.resolver
    }

    /// The descriptor of `event`, created on first reference.
    pub fn descriptor(&self, event: EventType) -> Result<Arc<EventDescriptor>, ConfigurationError> {
        if let Some(descriptor) = self.inner.descriptors.get(&event.id()) {
            return Ok(Arc::clone(descriptor.value()));
        }

        let fields = fields_of(event)?;
        let descriptor = self
            .inner
            .descriptors
            .entry(event.id())
            .or_insert_with(|| Arc::new(EventDescriptor::new(event, fields)));
        Ok(Arc::clone(descriptor.value()))
    }

    /// The field model of `E`.
    pub fn fields<E: Event>(&self) -> Result<Arc<FieldMap>, ConfigurationError> {
        Ok(Arc::clone(self.descriptor(EventType::of::<E>())?.fields()))
    }

    /// Number of listeners registered for `E`.
    pub fn listener_count<E: Event>(&self) -> usize {
        self.inner
            .descriptors
            .get(&TypeId::of::<E>())
            .map(|descriptor| descriptor.listener_count())
            .unwrap_or(0)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a closure receiving the whole event.
    pub fn register_consumer<E, F>(&self, priority: Priority, f: F) -> Result<(), RegistrationError>
    where
        E: Event,
        F: Fn(&mut EventInstance<E>) + Send + Sync + 'static,
    {
        let method = MethodSig::new(type_name::<F>(), "consume").param::<EventInstance<E>>();
        let descriptor = self.descriptor(EventType::of::<E>())?;
        let handle = ListenerHandle::consumer(method, priority, consumer::<E, F>(f));
        self.attach(&descriptor, handle)
    }

    /// Register a closure taking the fields named by the contract `L`.
    ///
    /// Unresolved parameter names always fail the registration.
    pub fn register_listener<L, F>(&self, priority: Priority, f: F) -> Result<(), RegistrationError>
    where
        L: ListenerContract,
        F: ListenerFn<L::Args>,
    {
        let method = L::method();
        let descriptor = self.descriptor(EventType::of::<L::Event>())?;
        let names = self.inner.resolver.resolve(&method)?;
        check_fields(&descriptor, &method, &names, &L::Args::types())?;

        let handle = ListenerHandle::fast_invoke(method, priority, names, f.into_invoke());
        self.attach(&descriptor, handle)
    }

    /// Register the public instance methods of `subscriber`.
    ///
    /// Returns how many listeners were added. A failure leaves the listeners
    /// added before it in place.
    pub fn register<T: Subscriber>(&self, subscriber: &Arc<T>) -> Result<usize, RegistrationError> {
        self.register_subscriptions(
            type_name::<T>(),
            T::subscriptions(subscriber),
            Modifiers::PUBLIC,
        )
    }

    /// Register the public receiver-less methods of `T`.
    pub fn register_static<T: StaticSubscriber>(&self) -> Result<usize, RegistrationError> {
        self.register_subscriptions(
            type_name::<T>(),
            T::static_subscriptions(),
            Modifiers::PUBLIC | Modifiers::STATIC,
        )
    }

    fn register_subscriptions(
        &self,
        subscriber: &'static str,
        subscriptions: Vec<Subscription>,
        required: Modifiers,
    ) -> Result<usize, RegistrationError> {
        let mut registered = 0;
        for subscription in subscriptions {
            if subscription.modifiers() != required {
                continue;
            }
            if self.register_subscription(subscription)? {
                registered += 1;
            }
        }
        tracing::debug!(subscriber, registered, "Scanned subscriber");
        Ok(registered)
    }

    /// Register one subscription, returning whether it was kept.
    fn register_subscription(&self, subscription: Subscription) -> Result<bool, RegistrationError> {
        let (method, priority, declared, kind) = subscription.into_parts();

        let (descriptor, handle) = match kind {
            SubscriptionKind::Consumer { event, listener } => {
                if let Some(declared) = declared {
                    if declared != event {
                        return Err(RegistrationError::EventMismatch {
                            method: method.key(),
                            declared: declared.name(),
                            inferred: event.name(),
                        });
                    }
                }
                (
                    self.descriptor(event)?,
                    ListenerHandle::consumer(method, priority, listener),
                )
            }
            SubscriptionKind::Exploded { params, invoke } => {
                let Some(event) = declared else {
                    tracing::debug!(method = %method, "No event to listen to, skipped");
                    return Ok(false);
                };
                let descriptor = self.descriptor(event)?;
                let names = match self.inner.resolver.resolve(&method) {
                    Ok(names) => names,
                    Err(miss) => match self.inner.config.resolution {
                        ResolutionPolicy::Reject => return Err(miss.into()),
                        ResolutionPolicy::Skip => {
                            tracing::warn!(error = %miss, "Skipping listener");
                            return Ok(false);
                        }
                    },
                };
                check_fields(&descriptor, &method, &names, &params)?;
                (
                    descriptor,
                    ListenerHandle::fast_invoke(method, priority, names, invoke),
                )
            }
        };

        self.attach(&descriptor, handle)?;
        Ok(true)
    }

    fn attach(
        &self,
        descriptor: &EventDescriptor,
        handle: ListenerHandle,
    ) -> Result<(), RegistrationError> {
        let method = handle.method().key();
        let priority = handle.priority();
        let fast_invoke = handle.is_fast_invoke();
        descriptor.add_listener(handle)?;
        tracing::info!(
            event = descriptor.event().name(),
            listener = %method,
            %priority,
            fast_invoke,
            "Registered listener"
        );
        Ok(())
    }

    // ========================================================================
    // Firing
    // ========================================================================

    /// Bind the firing contract `C` to its event.
    ///
    /// Binding the same contract again returns a handle to the existing
    /// binding. An event accepts one contract only.
    pub fn bind<C: FiringContract>(&self) -> Result<Fire<C>, ConfigurationError> {
        let event = EventType::of::<C::Event>();
        let descriptor = self.descriptor(event)?;
        let contract = type_name::<C>();

        if let Some(existing) = descriptor.firing() {
            if existing.contract != TypeId::of::<C>() {
                return Err(ConfigurationError::FiringAlreadyBound {
                    event: event.name(),
                    existing: existing.contract_name,
                    requested: contract,
                });
            }
            return Ok(self.fire_handle(descriptor));
        }

        let shape = firing_shape::<C>(descriptor.fields(), self.resolver())?;
        descriptor.bind(shape)?;
        tracing::info!(event = event.name(), contract, "Bound firing contract");
        Ok(self.fire_handle(descriptor))
    }

    fn fire_handle<C: FiringContract>(&self, descriptor: Arc<EventDescriptor>) -> Fire<C> {
        Fire::new(
            descriptor,
            Arc::clone(&self.inner.materializer),
            self.inner.config.debug,
        )
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .field("events", &self.inner.descriptors.len())
            .finish()
    }
}

/// Check that every name is a distinct field of the event with the same type
/// as its parameter.
fn check_fields(
    descriptor: &EventDescriptor,
    method: &MethodSig,
    names: &[String],
    types: &[TypeInfo],
) -> Result<(), RegistrationError> {
    if names.len() != types.len() {
        return Err(RegistrationError::Arity {
            method: method.key(),
            expected: types.len(),
            found: names.len(),
        });
    }

    let fields = descriptor.fields();
    let mut seen = HashSet::with_capacity(names.len());
    for (index, (name, ty)) in names.iter().zip(types).enumerate() {
        let Some(field) = fields.get(name) else {
            return Err(RegistrationError::NotAField {
                method: method.key(),
                param: name.clone(),
                index,
                event: descriptor.event().name(),
            });
        };
        if !seen.insert(name.as_str()) {
            return Err(RegistrationError::DuplicateParam {
                method: method.key(),
                param: name.clone(),
            });
        }
        if field.ty().info() != *ty {
            return Err(RegistrationError::ParamType {
                method: method.key(),
                param: name.clone(),
                expected: field.ty().name(),
                found: ty.name(),
            });
        }
    }
    Ok(())
}

/// Map the parameters of `C` onto the event's field slots.
fn firing_shape<C: FiringContract>(
    fields: &FieldMap,
    resolver: &ParamNameResolver,
) -> Result<FiringShape, ConfigurationError> {
    let event = EventType::of::<C::Event>();
    let contract = type_name::<C>();

    if let Some(returned) = C::Output::returns() {
        if returned != event {
            return Err(ConfigurationError::FiringReturn {
                contract,
                event: event.name(),
                found: returned.name(),
            });
        }
    }

    let unresolved = ConfigurationError::UnresolvedFiringParams { contract };
    let names = resolver.resolve(&C::method()).map_err(|_| unresolved.clone())?;
    let types = C::Args::types();
    if names.len() != types.len() {
        return Err(unresolved);
    }

    let mut field_sources = vec![None; fields.len()];
    for (index, (name, ty)) in names.iter().zip(&types).enumerate() {
        let (Some(slot), Some(field)) = (fields.slot(name), fields.get(name)) else {
            return Err(ConfigurationError::UnknownFiringParam {
                contract,
                param: name.clone(),
            });
        };
        if field_sources[slot].is_some() {
            return Err(ConfigurationError::DuplicateFiringParam {
                contract,
                param: name.clone(),
            });
        }
        if field.ty().info() != *ty {
            return Err(ConfigurationError::FiringParamType {
                contract,
                param: name.clone(),
                expected: field.ty().name(),
                found: ty.name(),
            });
        }
        field_sources[slot] = Some(index);
    }

    Ok(FiringShape {
        contract: TypeId::of::<C>(),
        contract_name: contract,
        field_sources,
        returns_event: C::Output::returns().is_some(),
    })
}
