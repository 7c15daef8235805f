//! Field model extraction.
//!
//! [`fields_of`] derives the named, typed fields of an event from its
//! [`Contract`]: parent contracts first, then the accessors declared directly
//! on the event. The result is computed at most once per event type and shared
//! for the life of the process.

use crate::{
    contract::{Accessor, Contract, EventType},
    error::ConfigurationError,
    value::FieldType,
};
use dashmap::DashMap;
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, LazyLock, OnceLock},
};

/// One named field of an event.
#[derive(Debug, Clone)]
pub struct EventField {
    name: &'static str,
    ty: FieldType,
    declared_in: &'static str,
    mutable: bool,
}

impl EventField {
    /// Field name, unique within its event.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type.
    pub fn ty(&self) -> FieldType {
        self.ty
    }

    /// The contract that declared the field.
    pub fn declared_in(&self) -> &'static str {
        self.declared_in
    }

    /// Whether the field has a setter.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Whether the field has no setter.
    pub fn is_immutable(&self) -> bool {
        !self.mutable
    }
}

/// The ordered fields of one event, indexed by name.
///
/// Field objects are shared with the parent contracts they were inherited
/// from, so the same inherited field reached through two paths compares equal
/// by pointer.
#[derive(Debug)]
pub struct FieldMap {
    event: &'static str,
    fields: Vec<Arc<EventField>>,
    index: HashMap<&'static str, usize>,
}

impl FieldMap {
    /// The owning event's name.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Arc<EventField>> {
        self.index.get(name).map(|&slot| &self.fields[slot])
    }

    /// The slot index of a field.
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// The field stored in `slot`.
    pub fn at(&self, slot: usize) -> Option<&Arc<EventField>> {
        self.fields.get(slot)
    }

    /// Whether the event has a field called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate fields in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EventField>> {
        self.fields.iter()
    }

    /// Field names in slot order.
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the event declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

type FieldCell = Arc<OnceLock<Result<Arc<FieldMap>, ConfigurationError>>>;

static FIELD_CACHE: LazyLock<DashMap<TypeId, FieldCell>> = LazyLock::new(DashMap::new);

/// Get the fields of `event` and all of its parent contracts.
///
/// Concurrent first lookups of the same event block on one computation.
/// Errors are memoized like successes.
pub fn fields_of(event: EventType) -> Result<Arc<FieldMap>, ConfigurationError> {
    resolve(event, &mut Vec::new())
}

fn resolve(
    event: EventType,
    chain: &mut Vec<TypeId>,
) -> Result<Arc<FieldMap>, ConfigurationError> {
    if chain.contains(&event.id()) {
        return Err(ConfigurationError::CyclicContract(event.name()));
    }

    // Clone the cell out so the shard lock is released before computing;
    // parents are resolved recursively from inside the initializer.
    let cell: FieldCell = FIELD_CACHE.entry(event.id()).or_default().value().clone();
    if let Some(fields) = cell.get() {
        return fields.clone();
    }

    chain.push(event.id());
    let fields = cell.get_or_init(|| compute(event, chain)).clone();
    chain.pop();
    fields
}

fn compute(
    event: EventType,
    chain: &mut Vec<TypeId>,
) -> Result<Arc<FieldMap>, ConfigurationError> {
    let contract = event.contract();

    let mut fields: Vec<Arc<EventField>> = Vec::new();
    let mut index: HashMap<&'static str, usize> = HashMap::new();

    for parent in contract.parents() {
        let inherited = resolve(*parent, chain)?;
        for field in inherited.iter() {
            match index.get(field.name) {
                // Same field reached through another path.
                Some(&slot) if Arc::ptr_eq(&fields[slot], field) => continue,
                Some(&slot) => {
                    return Err(ConfigurationError::DuplicateField {
                        field: field.name,
                        first: fields[slot].declared_in,
                        second: field.declared_in,
                    });
                }
                None => {
                    index.insert(field.name, fields.len());
                    fields.push(Arc::clone(field));
                }
            }
        }
    }

    for field in declared(&contract)? {
        if let Some(&slot) = index.get(field.name) {
            return Err(ConfigurationError::ShadowedField {
                field: field.name,
                contract: contract.owner(),
                inherited: fields[slot].declared_in,
            });
        }
        index.insert(field.name, fields.len());
        fields.push(Arc::new(field));
    }

    Ok(Arc::new(FieldMap {
        event: event.name(),
        fields,
        index,
    }))
}

struct FieldBuilder {
    name: &'static str,
    getter: Option<FieldType>,
    setter: Option<FieldType>,
}

impl FieldBuilder {
    fn check_types(&self, contract: &'static str) -> Result<(), ConfigurationError> {
        match (self.getter, self.setter) {
            (Some(getter), Some(setter)) if getter != setter => {
                Err(ConfigurationError::AccessorTypeMismatch {
                    field: self.name,
                    contract,
                    getter: getter.name(),
                    setter: setter.name(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Fields declared directly on `contract`, grouped from its accessors.
fn declared(contract: &Contract) -> Result<Vec<EventField>, ConfigurationError> {
    let owner = contract.owner();
    let mut builders: Vec<FieldBuilder> = Vec::new();
    let mut by_name: HashMap<&'static str, usize> = HashMap::new();

    for accessor in contract.accessors() {
        let name = accessor.field();
        let slot = *by_name.entry(name).or_insert_with(|| {
            builders.push(FieldBuilder {
                name,
                getter: None,
                setter: None,
            });
            builders.len() - 1
        });
        let builder = &mut builders[slot];

        match *accessor {
            Accessor::Getter { ty, .. } => {
                if builder.getter.is_some() {
                    return Err(ConfigurationError::DuplicateGetter {
                        field: name,
                        contract: owner,
                    });
                }
                builder.getter = Some(ty);
            }
            Accessor::Setter { ty, .. } => {
                if builder.setter.is_some() {
                    return Err(ConfigurationError::DuplicateSetter {
                        field: name,
                        contract: owner,
                    });
                }
                builder.setter = Some(ty);
            }
        }
        builder.check_types(owner)?;
    }

    builders
        .into_iter()
        .map(|builder| {
            let ty = builder.getter.ok_or(ConfigurationError::MissingGetter {
                field: builder.name,
                contract: owner,
            })?;
            Ok(EventField {
                name: builder.name,
                ty,
                declared_in: owner,
                mutable: builder.setter.is_some(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{contract::Event, value::FieldKey};

    const X: FieldKey<i32> = FieldKey::new("x");
    const NAME: FieldKey<String> = FieldKey::new("name");

    struct Mutable;
    impl Event for Mutable {
        fn declare(contract: &mut Contract) {
            contract.getter(X).setter(X);
        }
    }

    struct Immutable;
    impl Event for Immutable {
        fn declare(contract: &mut Contract) {
            contract.getter(X);
        }
    }

    #[test]
    fn getter_and_setter_make_mutable_field() {
        let fields = fields_of(EventType::of::<Mutable>()).unwrap();
        assert_eq!(fields.names(), vec!["x"]);
        let x = fields.get("x").unwrap();
        assert!(x.is_mutable());
        assert_eq!(x.ty(), FieldType::of::<i32>());
    }

    #[test]
    fn getter_only_is_immutable() {
        let fields = fields_of(EventType::of::<Immutable>()).unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields.get("x").unwrap().is_immutable());
    }

    #[test]
    fn lookups_are_memoized() {
        let first = fields_of(EventType::of::<Mutable>()).unwrap();
        let second = fields_of(EventType::of::<Mutable>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    struct SetterOnly;
    impl Event for SetterOnly {
        fn declare(contract: &mut Contract) {
            contract.setter(X);
        }
    }

    #[test]
    fn setter_requires_getter() {
        let err = fields_of(EventType::of::<SetterOnly>()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingGetter { field: "x", .. }));
    }

    struct Mismatched;
    impl Event for Mismatched {
        fn declare(contract: &mut Contract) {
            contract
                .getter(X)
                .setter(FieldKey::<i64>::new("x"));
        }
    }

    #[test]
    fn getter_and_setter_types_must_agree() {
        let err = fields_of(EventType::of::<Mismatched>()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::AccessorTypeMismatch { field: "x", .. }
        ));
    }

    struct DoubleGetter;
    impl Event for DoubleGetter {
        fn declare(contract: &mut Contract) {
            contract.getter(X).getter(X);
        }
    }

    #[test]
    fn duplicate_getter_is_rejected() {
        let err = fields_of(EventType::of::<DoubleGetter>()).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateGetter { .. }));
    }

    struct Named;
    impl Event for Named {
        fn declare(contract: &mut Contract) {
            contract.getter(NAME);
        }
    }

    struct Labelled;
    impl Event for Labelled {
        fn declare(contract: &mut Contract) {
            contract.getter(NAME);
        }
    }

    struct Both;
    impl Event for Both {
        fn declare(contract: &mut Contract) {
            contract.extends::<Named>().extends::<Labelled>();
        }
    }

    #[test]
    fn distinct_parent_fields_with_same_name_conflict() {
        let err = fields_of(EventType::of::<Both>()).unwrap_err();
        match err {
            ConfigurationError::DuplicateField {
                field,
                first,
                second,
            } => {
                assert_eq!(field, "name");
                assert!(first.ends_with("Named"));
                assert!(second.ends_with("Labelled"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct Left;
    impl Event for Left {
        fn declare(contract: &mut Contract) {
            contract.extends::<Named>().field(X);
        }
    }

    struct Right;
    impl Event for Right {
        fn declare(contract: &mut Contract) {
            contract.extends::<Named>();
        }
    }

    struct Diamond;
    impl Event for Diamond {
        fn declare(contract: &mut Contract) {
            contract
                .extends::<Left>()
                .extends::<Right>()
                .getter(FieldKey::<bool>::new("cancelled"));
        }
    }

    #[test]
    fn shared_ancestor_field_is_not_a_conflict() {
        let fields = fields_of(EventType::of::<Diamond>()).unwrap();
        assert_eq!(fields.names(), vec!["name", "x", "cancelled"]);
        assert!(fields.get("name").unwrap().declared_in().ends_with("Named"));
        assert!(fields.get("x").unwrap().is_mutable());
    }

    struct Shadowing;
    impl Event for Shadowing {
        fn declare(contract: &mut Contract) {
            contract.extends::<Named>().getter(NAME);
        }
    }

    #[test]
    fn redeclaring_inherited_field_is_rejected() {
        let err = fields_of(EventType::of::<Shadowing>()).unwrap_err();
        assert!(matches!(err, ConfigurationError::ShadowedField { field: "name", .. }));
    }

    struct Ouroboros;
    impl Event for Ouroboros {
        fn declare(contract: &mut Contract) {
            contract.extends::<Ouroboros>();
        }
    }

    #[test]
    fn cyclic_contract_is_rejected() {
        let err = fields_of(EventType::of::<Ouroboros>()).unwrap_err();
        assert!(matches!(err, ConfigurationError::CyclicContract(_)));
    }

    struct Contended;
    impl Event for Contended {
        fn declare(contract: &mut Contract) {
            contract.field(X).getter(NAME);
        }
    }

    #[test]
    fn concurrent_first_use_yields_one_model() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| fields_of(EventType::of::<Contended>()).unwrap()))
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for model in &models[1..] {
            assert!(Arc::ptr_eq(&models[0], model));
        }
    }
}
