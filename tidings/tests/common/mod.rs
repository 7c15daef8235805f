//! Shared events and contracts for integration tests.

#![allow(dead_code)]

use tidings::{
    BusConfig, Contract, Event, EventBus, EventInstance, FieldKey, FiringContract,
    ListenerContract, MethodSig, testing::TestEnvironment,
};

// ============================================================================
// Events
// ============================================================================

/// `name` is read-only, `score` can be changed by listeners.
pub struct PlayerJoin;

impl PlayerJoin {
    pub const NAME: FieldKey<String> = FieldKey::new("name");
    pub const SCORE: FieldKey<i32> = FieldKey::new("score");
}

impl Event for PlayerJoin {
    fn declare(contract: &mut Contract) {
        contract.getter(Self::NAME).field(Self::SCORE);
    }
}

/// Only field-exploded listeners are accepted.
pub struct Ping;

impl Ping {
    pub const SEQ: FieldKey<u32> = FieldKey::new("seq");
}

impl Event for Ping {
    const FAST_INVOKE_ONLY: bool = true;

    fn declare(contract: &mut Contract) {
        contract.getter(Self::SEQ);
    }
}

/// `note` is never supplied by [`FireTrade`].
pub struct Trade;

impl Trade {
    pub const ITEM: FieldKey<String> = FieldKey::new("item");
    pub const QTY: FieldKey<u32> = FieldKey::new("qty");
    pub const NOTE: FieldKey<String> = FieldKey::new("note");
}

impl Event for Trade {
    fn declare(contract: &mut Contract) {
        contract
            .getter(Self::ITEM)
            .getter(Self::QTY)
            .field(Self::NOTE);
    }
}

// ============================================================================
// Firing contracts
// ============================================================================

pub struct FirePlayerJoin;

impl FiringContract for FirePlayerJoin {
    type Event = PlayerJoin;
    type Args = (String, i32);
    type Output = EventInstance<PlayerJoin>;

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("game::FirePlayerJoin", "fire").names(&["name", "score"])
    }
}

pub struct FirePing;

impl FiringContract for FirePing {
    type Event = Ping;
    type Args = (u32,);
    type Output = ();

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("net::FirePing", "fire").names(&["seq"])
    }
}

pub struct FireTrade;

impl FiringContract for FireTrade {
    type Event = Trade;
    type Args = (String, u32);
    type Output = ();

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("market::FireTrade", "fire").names(&["item", "qty"])
    }
}

// ============================================================================
// Listener contracts
// ============================================================================

pub struct OnScore;

impl ListenerContract for OnScore {
    type Event = PlayerJoin;
    type Args = (i32,);

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("game::OnScore", "on_score").names(&["score"])
    }
}

pub struct OnName;

impl ListenerContract for OnName {
    type Event = PlayerJoin;
    type Args = (String,);

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("game::OnName", "on_name").names(&["name"])
    }
}

pub struct OnSeq;

impl ListenerContract for OnSeq {
    type Event = Ping;
    type Args = (u32,);

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("net::OnSeq", "on_seq").names(&["seq"])
    }
}

pub struct OnNote;

impl ListenerContract for OnNote {
    type Event = Trade;
    type Args = (String,);

    fn method() -> MethodSig {
        MethodSig::of::<Self::Args>("market::OnNote", "on_note").names(&["note"])
    }
}

/// A bus over an empty in-memory environment.
pub fn bus() -> EventBus {
    EventBus::with_config(TestEnvironment::new(), BusConfig::default())
}

/// A bus over `env`.
pub fn bus_with(env: TestEnvironment) -> EventBus {
    EventBus::with_config(env, BusConfig::default())
}
