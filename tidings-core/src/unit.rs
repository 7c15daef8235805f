//! Dispatch plans and compiled units.
//!
//! A [`DispatchPlan`] is a flat description of one dispatch: which fields the
//! firing contract supplies, whether an event instance has to be built, and
//! the ordered listener calls with the source of every argument. A
//! [`UnitMaterializer`] turns the plan into something callable.

use crate::{
    contract::EventType,
    error::CompilationError,
    field::FieldMap,
    instance::AnyInstance,
    listener::{ConsumerFn, InvokeFn},
    priority::Priority,
    value::FieldValue,
};
use std::{
    fmt::{self, Write},
    sync::Arc,
};

/// Where a fast-invoke argument comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSource {
    /// The raw firing argument at this index.
    Raw(usize),
    /// The event instance's current value for `slot`, or the raw argument
    /// `raw` when the dispatch has no instance.
    Instance {
        /// Field slot.
        slot: usize,
        /// Raw argument index.
        raw: usize,
    },
}

/// What a step does.
#[derive(Clone)]
pub enum StepAction {
    /// Hand the shared instance to a full-event consumer.
    Consume(ConsumerFn),
    /// Call a fast-invoke listener.
    Invoke {
        /// The erased callable.
        invoke: InvokeFn,
        /// One source per parameter.
        args: Vec<ArgSource>,
    },
}

/// One listener call.
#[derive(Clone)]
pub struct Step {
    /// Listener signature, for diagnostics.
    pub listener: String,
    /// Listener priority.
    pub priority: Priority,
    /// The call.
    pub action: StepAction,
}

/// A complete description of one event's dispatch.
#[derive(Clone)]
pub struct DispatchPlan {
    /// The event dispatched.
    pub event: EventType,
    /// The event's fields.
    pub fields: Arc<FieldMap>,
    /// For each field slot, the raw argument supplying it.
    pub field_sources: Vec<Option<usize>>,
    /// Whether one event instance is built per dispatch.
    pub construct_instance: bool,
    /// Whether the instance is returned to the caller.
    pub returns_event: bool,
    /// Listener calls, in dispatch order.
    pub steps: Vec<Step>,
}

impl DispatchPlan {
    /// A stable name for the unit built from this plan.
    pub fn unit_name(&self) -> String {
        format!("{}$dispatch", self.event.name())
    }

    /// A readable listing of the plan.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "unit {} (instance: {}, returns: {})",
            self.unit_name(),
            self.construct_instance,
            self.returns_event
        );
        for (field, source) in self.fields.iter().zip(&self.field_sources) {
            match source {
                Some(raw) => {
                    let _ = writeln!(out, "  field {} <- arg {}", field.name(), raw);
                }
                None => {
                    let _ = writeln!(out, "  field {} <- unset", field.name());
                }
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            match &step.action {
                StepAction::Consume(_) => {
                    let _ = writeln!(
                        out,
                        "  {index}: [{}] consume {}",
                        step.priority, step.listener
                    );
                }
                StepAction::Invoke { args, .. } => {
                    let args: Vec<String> = args
                        .iter()
                        .map(|arg| match arg {
                            ArgSource::Raw(raw) => format!("arg {raw}"),
                            ArgSource::Instance { slot, .. } => {
                                let name = self.fields.at(*slot).map_or("?", |f| f.name());
                                format!("instance.{name}")
                            }
                        })
                        .collect();
                    let _ = writeln!(
                        out,
                        "  {index}: [{}] invoke {}({})",
                        step.priority,
                        step.listener,
                        args.join(", ")
                    );
                }
            }
        }
        out
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = match &self.action {
            StepAction::Consume(_) => None,
            StepAction::Invoke { args, .. } => Some(args),
        };
        f.debug_struct("Step")
            .field("listener", &self.listener)
            .field("priority", &self.priority)
            .field("args", &args)
            .finish()
    }
}

impl fmt::Debug for DispatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPlan")
            .field("event", &self.event)
            .field("field_sources", &self.field_sources)
            .field("construct_instance", &self.construct_instance)
            .field("returns_event", &self.returns_event)
            .field("steps", &self.steps)
            .finish()
    }
}

/// A callable dispatch unit.
pub trait CompiledUnit: Send + Sync {
    /// The unit's name.
    fn name(&self) -> &str;

    /// Run every listener with the firing arguments.
    ///
    /// Returns the event instance when the plan built one.
    fn invoke(&self, args: Vec<FieldValue>) -> Option<Box<dyn AnyInstance>>;
}

/// Turns dispatch plans into compiled units.
///
/// Defining the same plan twice must yield equivalent units.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot materialize dispatch units",
    label = "missing `UnitMaterializer` implementation"
)]
pub trait UnitMaterializer: Send + Sync {
    /// Build a unit for `plan` named `name`.
    fn define(
        &self,
        name: &str,
        plan: &DispatchPlan,
    ) -> Result<Arc<dyn CompiledUnit>, CompilationError>;
}
