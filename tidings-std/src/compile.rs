//! Dispatch plan compilation.
//!
//! [`compile_plan`] flattens a priority-ordered listener list into a
//! [`DispatchPlan`]. The plan is a pure function of its inputs: the same
//! listeners against the same firing contract always produce the same steps.

use std::sync::Arc;
use tidings_core::{
    ArgSource, CompilationError, DispatchPlan, EventType, FieldMap, FiringShape, ListenerHandle,
    ListenerKind, Step, StepAction,
};

/// Build the dispatch plan for `listeners`, which must already be in
/// dispatch order.
///
/// An event instance is built only when a full-event consumer needs one or
/// the firing contract returns it. With an instance, fast-invoke listeners
/// read mutable fields through it so they observe earlier mutations;
/// immutable fields always come straight from the firing arguments.
pub fn compile_plan(
    event: EventType,
    fields: &Arc<FieldMap>,
    firing: &FiringShape,
    listeners: &[ListenerHandle],
) -> Result<DispatchPlan, CompilationError> {
    let construct_instance = firing.returns_event
        || listeners
            .iter()
            .any(|listener| !listener.is_fast_invoke());

    let steps = listeners
        .iter()
        .map(|listener| -> Result<Step, CompilationError> {
            let action = match listener.kind() {
                ListenerKind::Consumer(consumer) => StepAction::Consume(consumer.clone()),
                ListenerKind::FastInvoke { params, invoke } => StepAction::Invoke {
                    invoke: invoke.clone(),
                    args: params
                        .iter()
                        .map(|param| {
                            arg_source(event, fields, firing, listener, param, construct_instance)
                        })
                        .collect::<Result<_, _>>()?,
                },
            };
            Ok(Step {
                listener: listener.method().key(),
                priority: listener.priority(),
                action,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DispatchPlan {
        event,
        fields: Arc::clone(fields),
        field_sources: firing.field_sources.clone(),
        construct_instance,
        returns_event: firing.returns_event,
        steps,
    })
}

fn arg_source(
    event: EventType,
    fields: &FieldMap,
    firing: &FiringShape,
    listener: &ListenerHandle,
    param: &str,
    construct_instance: bool,
) -> Result<ArgSource, CompilationError> {
    let (slot, field) = fields
        .slot(param)
        .and_then(|slot| Some((slot, fields.at(slot)?)))
        .ok_or_else(|| CompilationError::UnknownField {
            event: event.name(),
            field: param.to_string(),
            listener: listener.method().key(),
        })?;
    let raw = firing
        .source(slot)
        .ok_or_else(|| CompilationError::UnsuppliedField {
            event: event.name(),
            field: param.to_string(),
            listener: listener.method().key(),
        })?;

    if construct_instance && field.is_mutable() {
        Ok(ArgSource::Instance { slot, raw })
    } else {
        Ok(ArgSource::Raw(raw))
    }
}
