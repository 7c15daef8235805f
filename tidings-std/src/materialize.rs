//! The default unit materializer.
//!
//! [`ClosureMaterializer`] turns a [`DispatchPlan`] into a [`ClosureUnit`]: a
//! flat vector of calls executed in order against the firing arguments and,
//! when the plan asks for one, a single event instance built per dispatch.

use std::{any::Any, sync::Arc};
use tidings_core::{
    AnyInstance, ArgSource, CompilationError, CompiledUnit, ConsumerFn, DispatchPlan, EventType,
    FieldMap, FieldType, FieldValue, InvokeFn, StepAction, UnitMaterializer,
};

/// Builds [`ClosureUnit`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosureMaterializer;

impl ClosureMaterializer {
    /// Create a new materializer.
    pub fn new() -> Self {
        Self
    }
}

impl UnitMaterializer for ClosureMaterializer {
    fn define(
        &self,
        name: &str,
        plan: &DispatchPlan,
    ) -> Result<Arc<dyn CompiledUnit>, CompilationError> {
        Ok(Arc::new(ClosureUnit::new(name, plan)?))
    }
}

enum Call {
    Consume(ConsumerFn),
    Invoke {
        invoke: InvokeFn,
        args: Vec<ArgSource>,
        listener: String,
    },
}

/// A dispatch unit backed by a vector of closures.
pub struct ClosureUnit {
    name: String,
    event: EventType,
    fields: Arc<FieldMap>,
    slots: Vec<(Option<usize>, FieldType)>,
    construct_instance: bool,
    returns_event: bool,
    calls: Vec<Call>,
}

impl ClosureUnit {
    /// Check `plan` for consistency and build its unit.
    pub fn new(name: &str, plan: &DispatchPlan) -> Result<Self, CompilationError> {
        let invalid = |reason: String| CompilationError::Materialize {
            unit: name.to_string(),
            reason,
        };

        if plan.field_sources.len() != plan.fields.len() {
            return Err(invalid(format!(
                "{} field sources for {} fields",
                plan.field_sources.len(),
                plan.fields.len()
            )));
        }
        let supplied = |raw: usize| plan.field_sources.contains(&Some(raw));

        let mut calls = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            match &step.action {
                StepAction::Consume(consumer) => {
                    if !plan.construct_instance {
                        return Err(invalid(format!(
                            "consumer '{}' without an event instance",
                            step.listener
                        )));
                    }
                    calls.push(Call::Consume(consumer.clone()));
                }
                StepAction::Invoke { invoke, args } => {
                    for arg in args {
                        let raw = match *arg {
                            ArgSource::Raw(raw) => raw,
                            ArgSource::Instance { slot, raw } => {
                                if !plan.construct_instance || slot >= plan.fields.len() {
                                    return Err(invalid(format!(
                                        "listener '{}' reads slot {slot} of a missing instance",
                                        step.listener
                                    )));
                                }
                                raw
                            }
                        };
                        if !supplied(raw) {
                            return Err(invalid(format!(
                                "listener '{}' reads argument {raw}, which is not supplied",
                                step.listener
                            )));
                        }
                    }
                    calls.push(Call::Invoke {
                        invoke: invoke.clone(),
                        args: args.clone(),
                        listener: step.listener.clone(),
                    });
                }
            }
        }

        let slots = plan
            .fields
            .iter()
            .zip(&plan.field_sources)
            .map(|(field, source)| (*source, field.ty()))
            .collect();

        Ok(Self {
            name: name.to_string(),
            event: plan.event,
            fields: Arc::clone(&plan.fields),
            slots,
            construct_instance: plan.construct_instance,
            returns_event: plan.returns_event,
            calls,
        })
    }

    fn build_instance(&self, args: &[FieldValue]) -> Box<dyn AnyInstance> {
        let slots = self
            .slots
            .iter()
            .map(|(source, ty)| {
                let value = args.get((*source)?)?;
                ty.clone_value(&**value)
            })
            .collect();
        self.event.new_instance(Arc::clone(&self.fields), slots)
    }
}

impl CompiledUnit for ClosureUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: Vec<FieldValue>) -> Option<Box<dyn AnyInstance>> {
        let mut instance = self
            .construct_instance
            .then(|| self.build_instance(&args));

        for call in &self.calls {
            match call {
                Call::Consume(consumer) => {
                    if let Some(instance) = instance.as_mut() {
                        consumer(instance.as_any_mut());
                    }
                }
                Call::Invoke {
                    invoke,
                    args: sources,
                    listener,
                } => {
                    let current = instance.as_deref();
                    let values: Option<Vec<&(dyn Any + Send + Sync)>> = sources
                        .iter()
                        .map(|source| match *source {
                            ArgSource::Raw(raw) => args.get(raw).map(|v| &**v),
                            ArgSource::Instance { slot, raw } => current
                                .and_then(|i| i.slot(slot))
                                .or_else(|| args.get(raw).map(|v| &**v)),
                        })
                        .collect();
                    // `new` proved every source supplied; only a caller
                    // passing fewer arguments than the plan's firing shape
                    // gets here.
                    debug_assert!(
                        values.is_some(),
                        "missing dispatch argument for '{listener}' in unit '{}'",
                        self.name
                    );
                    match values {
                        Some(values) => invoke(&values),
                        None => tracing::error!(
                            unit = %self.name,
                            listener = %listener,
                            supplied = args.len(),
                            "Missing dispatch argument, listener skipped"
                        ),
                    }
                }
            }
        }

        if self.returns_event { instance } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{any::TypeId, sync::Mutex};
    use tidings_core::{
        Contract, Event, EventInstance, FieldKey, FiringShape, ListenerFn, ListenerHandle,
        MethodSig, Priority, consumer, fields_of,
    };

    use crate::compile::compile_plan;

    struct Counter;

    impl Counter {
        const LABEL: FieldKey<String> = FieldKey::new("label");
        const COUNT: FieldKey<u32> = FieldKey::new("count");
    }

    impl Event for Counter {
        fn declare(contract: &mut Contract) {
            contract.getter(Self::LABEL).field(Self::COUNT);
        }
    }

    fn shape(returns_event: bool) -> FiringShape {
        FiringShape {
            contract: TypeId::of::<()>(),
            contract_name: "demo::FireCounter",
            field_sources: vec![Some(0), Some(1)],
            returns_event,
        }
    }

    fn args(label: &str, count: u32) -> Vec<FieldValue> {
        vec![Box::new(label.to_string()), Box::new(count)]
    }

    fn unit(listeners: &[ListenerHandle], returns_event: bool) -> Arc<dyn CompiledUnit> {
        let fields = fields_of(EventType::of::<Counter>()).unwrap();
        let plan =
            compile_plan(EventType::of::<Counter>(), &fields, &shape(returns_event), listeners)
                .unwrap();
        ClosureMaterializer.define(&plan.unit_name(), &plan).unwrap()
    }

    fn fast<Args, F: ListenerFn<Args>>(names: &[&str], f: F) -> ListenerHandle {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        ListenerHandle::fast_invoke(
            MethodSig::new("demo", "fast"),
            Priority::Normal,
            names,
            f.into_invoke(),
        )
    }

    #[test]
    fn fast_listener_sees_mutation_of_mutable_field() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let bump = ListenerHandle::consumer(
            MethodSig::new("demo", "bump"),
            Priority::High,
            consumer::<Counter, _>(|event| {
                let next = event.get(Counter::COUNT).copied().unwrap_or_default() + 10;
                event.set(Counter::COUNT, next).unwrap();
            }),
        );
        let watch = fast(&["count", "label"], move |count: &u32, label: &String| {
            sink.lock().unwrap().push(format!("{label}:{count}"));
        });

        let unit = unit(&[bump, watch], false);
        assert!(unit.invoke(args("a", 1)).is_none());
        assert_eq!(*seen.lock().unwrap(), vec!["a:11"]);
    }

    #[test]
    fn returns_built_instance() {
        let unit = unit(&[], true);
        let out = unit.invoke(args("b", 2)).unwrap();
        let event = out.into_any().downcast::<EventInstance<Counter>>().unwrap();
        assert_eq!(event.get(Counter::LABEL).unwrap(), "b");
        assert_eq!(*event.get(Counter::COUNT).unwrap(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "missing dispatch argument")]
    fn short_argument_list_is_a_broken_invariant() {
        let watch = fast(&["label"], |_: &String| {});
        let unit = unit(&[watch], false);
        unit.invoke(Vec::new());
    }

    #[test]
    fn inconsistent_plan_is_rejected() {
        let fields = fields_of(EventType::of::<Counter>()).unwrap();
        let mut plan = compile_plan(EventType::of::<Counter>(), &fields, &shape(false), &[]).unwrap();
        plan.field_sources.pop();
        let err = ClosureMaterializer.define("broken", &plan).err().unwrap();
        assert!(matches!(err, CompilationError::Materialize { .. }));
    }
}
