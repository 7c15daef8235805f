//! Field models of composed events, seen through the bus.

mod common;

use common::bus;
use tidings::{
    ConfigurationError, Contract, Event, EventType, FieldKey, FiringContract, ListenerContract,
    MethodSig, Priority, RegistrationError, testing::CallRecorder,
};

pub struct Located;

impl Located {
    pub const WORLD: FieldKey<String> = FieldKey::new("world");
}

impl Event for Located {
    fn declare(contract: &mut Contract) {
        contract.getter(Self::WORLD);
    }
}

pub struct Cancellable;

impl Cancellable {
    pub const CANCELLED: FieldKey<bool> = FieldKey::new("cancelled");
}

impl Event for Cancellable {
    fn declare(contract: &mut Contract) {
        contract.field(Self::CANCELLED);
    }
}

pub struct BlockBreak;

impl BlockBreak {
    pub const BLOCK: FieldKey<u16> = FieldKey::new("block");
}

impl Event for BlockBreak {
    fn declare(contract: &mut Contract) {
        contract
            .extends::<Located>()
            .extends::<Cancellable>()
            .getter(Self::BLOCK);
    }
}

/// Declares its own `world`, unrelated to [`Located`]'s.
pub struct Portal;

impl Event for Portal {
    fn declare(contract: &mut Contract) {
        contract.getter(FieldKey::<u64>::new("world"));
    }
}

pub struct Teleport;

impl Event for Teleport {
    fn declare(contract: &mut Contract) {
        contract.extends::<Located>().extends::<Portal>();
    }
}

pub struct FireBlockBreak;

impl FiringContract for FireBlockBreak {
    type Event = BlockBreak;
    type Args = (String, bool, u16);
    type Output = ();

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("world::FireBlockBreak", "fire")
            .names(&["world", "cancelled", "block"])
    }
}

pub struct OnBreak;

impl ListenerContract for OnBreak {
    type Event = BlockBreak;
    type Args = (u16, String, bool);

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("world::OnBreak", "on_break")
            .names(&["block", "world", "cancelled"])
    }
}

#[test]
fn inherited_fields_come_first() {
    let bus = bus();
    let fields = bus.fields::<BlockBreak>().unwrap();
    assert_eq!(fields.names(), vec!["world", "cancelled", "block"]);
    assert!(fields.get("world").unwrap().is_immutable());
    assert!(fields.get("cancelled").unwrap().is_mutable());
    assert_eq!(
        fields.get("cancelled").unwrap().declared_in(),
        EventType::of::<Cancellable>().name()
    );
}

#[test]
fn listeners_bind_inherited_fields() {
    let bus = bus();
    let recorder = CallRecorder::new();
    let fire = bus.bind::<FireBlockBreak>().unwrap();

    bus.register_consumer::<BlockBreak, _>(Priority::High, |event| {
        event.set(Cancellable::CANCELLED, true).unwrap();
    })
    .unwrap();
    let log = recorder.clone();
    bus.register_listener::<OnBreak, _>(
        Priority::Normal,
        move |block: &u16, world: &String, cancelled: &bool| {
            log.record(format!("{world}/{block}/{cancelled}"));
        },
    )
    .unwrap();

    fire.fire(("overworld".to_string(), false, 7)).unwrap();
    assert_eq!(recorder.calls(), vec!["overworld/7/true"]);
}

#[test]
fn conflicting_parents_name_both_declarers() {
    let bus = bus();
    let err = bus
        .register_consumer::<Teleport, _>(Priority::Normal, |_| {})
        .unwrap_err();
    assert_eq!(
        err,
        RegistrationError::Configuration(ConfigurationError::DuplicateField {
            field: "world",
            first: EventType::of::<Located>().name(),
            second: EventType::of::<Portal>().name(),
        })
    );

    // Never retried into success.
    assert!(matches!(
        bus.fields::<Teleport>().unwrap_err(),
        ConfigurationError::DuplicateField { .. }
    ));
}
