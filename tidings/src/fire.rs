//! Bound firing contracts.

use crate::descriptor::EventDescriptor;
use std::{fmt, marker::PhantomData, sync::Arc};
use tidings_core::{ArgTuple, CompilationError, FireOutput, FiringContract, UnitMaterializer};

/// A handle that raises `C::Event` through the firing contract `C`.
///
/// Obtained from [`EventBus::bind`](crate::EventBus::bind). Every call runs
/// the event's current dispatch unit, recompiling it first if listeners were
/// registered since the last dispatch.
pub struct Fire<C: FiringContract> {
    descriptor: Arc<EventDescriptor>,
    materializer: Arc<dyn UnitMaterializer>,
    debug: bool,
    _contract: PhantomData<fn() -> C>,
}

impl<C: FiringContract> Fire<C> {
    pub(crate) fn new(
        descriptor: Arc<EventDescriptor>,
        materializer: Arc<dyn UnitMaterializer>,
        debug: bool,
    ) -> Self {
        Self {
            descriptor,
            materializer,
            debug,
            _contract: PhantomData,
        }
    }

    /// Dispatch the event built from `args` to every listener, in priority
    /// order.
    ///
    /// Returns `()` or the dispatched event instance, as `C::Output` says.
    pub fn fire(&self, args: C::Args) -> Result<C::Output, CompilationError> {
        let compiled = self.descriptor.unit(&*self.materializer, self.debug)?;
        let instance = compiled.unit.invoke(args.into_values());
        C::Output::from_dispatch(instance)
            .ok_or(CompilationError::MissingInstance(self.descriptor.event().name()))
    }

    /// The descriptor of the raised event.
    pub fn descriptor(&self) -> &Arc<EventDescriptor> {
        &self.descriptor
    }
}

impl<C: FiringContract> Clone for Fire<C> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            materializer: Arc::clone(&self.materializer),
            debug: self.debug,
            _contract: PhantomData,
        }
    }
}

impl<C: FiringContract> fmt::Debug for Fire<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fire")
            .field("contract", &std::any::type_name::<C>())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
