//! Per-event descriptors.
//!
//! An [`EventDescriptor`] owns everything the bus knows about one event type:
//! its field model, its listeners, the bound firing contract and the current
//! dispatch unit. The unit slot is empty while the descriptor is dirty.
//!
//! Registration takes the descriptor's mutex, appends, and clears the unit
//! slot. Dispatch loads the slot without locking; only when it finds the slot
//! empty does it take the mutex, re-check, sort and compile.

use arc_swap::ArcSwapOption;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tidings_core::{
    CompilationError, CompiledUnit, ConfigurationError, EventType, FieldMap, FiringShape,
    ListenerHandle, RegistrationError, UnitMaterializer,
};
use tidings_std::compile_plan;

/// A materialized unit, stored in the descriptor's swap slot.
pub(crate) struct Compiled {
    pub(crate) unit: Arc<dyn CompiledUnit>,
}

struct ListenerState {
    listeners: Vec<ListenerHandle>,
    sorted: bool,
}

/// Listeners, firing contract and dispatch unit of one event type.
pub struct EventDescriptor {
    event: EventType,
    fields: Arc<FieldMap>,
    state: Mutex<ListenerState>,
    unit: ArcSwapOption<Compiled>,
    firing: OnceLock<FiringShape>,
}

impl EventDescriptor {
    pub(crate) fn new(event: EventType, fields: Arc<FieldMap>) -> Self {
        Self {
            event,
            fields,
            state: Mutex::new(ListenerState {
                listeners: Vec::new(),
                sorted: true,
            }),
            unit: ArcSwapOption::empty(),
            firing: OnceLock::new(),
        }
    }

    /// The described event.
    pub fn event(&self) -> EventType {
        self.event
    }

    /// The event's field model.
    pub fn fields(&self) -> &Arc<FieldMap> {
        &self.fields
    }

    /// The bound firing contract, if any.
    pub fn firing(&self) -> Option<&FiringShape> {
        self.firing.get()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Whether the next dispatch recompiles.
    pub fn is_dirty(&self) -> bool {
        self.unit.load().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, ListenerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add_listener(&self, listener: ListenerHandle) -> Result<(), RegistrationError> {
        if self.event.is_fast_invoke_only() && !listener.is_fast_invoke() {
            return Err(RegistrationError::FastInvokeOnly {
                event: self.event.name(),
            });
        }

        let mut state = self.lock();
        state.listeners.push(listener);
        state.sorted = false;
        self.unit.store(None);
        Ok(())
    }

    /// Record `shape` as the firing contract, unless another is bound.
    pub(crate) fn bind(&self, shape: FiringShape) -> Result<&FiringShape, ConfigurationError> {
        let requested = shape.contract;
        let requested_name = shape.contract_name;
        let bound = self.firing.get_or_init(|| shape);
        if bound.contract != requested {
            return Err(ConfigurationError::FiringAlreadyBound {
                event: self.event.name(),
                existing: bound.contract_name,
                requested: requested_name,
            });
        }
        Ok(bound)
    }

    /// The current unit, compiling one first if the descriptor is dirty.
    pub(crate) fn unit(
        &self,
        materializer: &dyn UnitMaterializer,
        debug: bool,
    ) -> Result<Arc<Compiled>, CompilationError> {
        if let Some(unit) = self.unit.load_full() {
            return Ok(unit);
        }

        let mut state = self.lock();
        // Another dispatch may have compiled while we waited.
        if let Some(unit) = self.unit.load_full() {
            return Ok(unit);
        }

        let firing = self
            .firing
            .get()
            .ok_or(CompilationError::Unbound(self.event.name()))?;

        if !state.sorted {
            state.listeners.sort_by_key(|listener| listener.priority());
            state.sorted = true;
        }

        let plan = compile_plan(self.event, &self.fields, firing, &state.listeners)?;
        let name = plan.unit_name();
        if debug {
            tracing::debug!(unit = %name, plan = %plan.describe(), "Dispatch plan");
        }

        let unit = Arc::new(Compiled {
            unit: materializer.define(&name, &plan)?,
        });
        self.unit.store(Some(Arc::clone(&unit)));
        tracing::debug!(unit = %name, listeners = state.listeners.len(), "Compiled dispatch unit");
        Ok(unit)
    }
}

impl std::fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("event", &self.event)
            .field("listeners", &self.listener_count())
            .field("dirty", &self.is_dirty())
            .field("firing", &self.firing().map(|shape| shape.contract_name))
            .finish()
    }
}
