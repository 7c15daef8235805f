//! `#[subscriber]` types registered through the bus.

mod common;

use common::{FirePlayerJoin, Ping, PlayerJoin, bus};
use lazy_static::lazy_static;
use std::sync::Arc;
use tidings::{
    BusConfig, EventBus, EventInstance, Modifiers, RegistrationError, ResolutionPolicy,
    StaticSubscriber, Subscriber, Tier, compiled_metadata, subscriber,
    testing::{CallRecorder, TestEnvironment},
};

lazy_static! {
    static ref RESETS: CallRecorder = CallRecorder::new();
}

pub struct Scoreboard {
    recorder: CallRecorder,
}

#[subscriber]
impl Scoreboard {
    #[subscribe(PlayerJoin, priority = High)]
    pub fn on_join(&self, name: &String, score: &i32) {
        self.recorder.record(format!("join {name} {score}"));
    }

    #[subscribe(priority = Highest)]
    pub fn audit(&self, event: &mut EventInstance<PlayerJoin>) {
        let score = *event.get(PlayerJoin::SCORE).unwrap();
        event.set(PlayerJoin::SCORE, score + 1).unwrap();
        self.recorder.record("audit");
    }

    #[subscribe(PlayerJoin, priority = Low, names = ["score"])]
    pub fn renamed(&self, points: &i32) {
        self.recorder.record(format!("points {points}"));
    }

    #[subscribe(PlayerJoin)]
    fn hidden(&self, score: &i32) {
        self.recorder.record(format!("hidden {score}"));
    }

    #[subscribe(priority = Lowest)]
    pub fn reset(event: &mut EventInstance<PlayerJoin>) {
        event.set(PlayerJoin::SCORE, 0).unwrap();
        RESETS.record("reset");
    }

    #[allow(dead_code)]
    pub fn unmarked(&self, _score: &i32) {}
}

pub struct Confused;

#[subscriber]
impl Confused {
    #[subscribe(Ping)]
    pub fn on_join(&self, _event: &mut EventInstance<PlayerJoin>) {}
}

pub struct Undecided;

#[subscriber]
impl Undecided {
    #[subscribe]
    pub fn on_score(&self, _score: &i32) {}
}

pub struct Anonymous;

#[subscriber]
impl Anonymous {
    #[subscribe(PlayerJoin)]
    pub fn on_score(&self, _: &i32) {}
}

fn scoreboard() -> (Arc<Scoreboard>, CallRecorder) {
    let recorder = CallRecorder::new();
    let scoreboard = Arc::new(Scoreboard {
        recorder: recorder.clone(),
    });
    (scoreboard, recorder)
}

#[test]
fn register_keeps_public_instance_methods() {
    let bus = bus();
    let (scoreboard, recorder) = scoreboard();
    let fire = bus.bind::<FirePlayerJoin>().unwrap();

    assert_eq!(bus.register(&scoreboard).unwrap(), 3);
    assert_eq!(bus.listener_count::<PlayerJoin>(), 3);

    let event = fire.fire(("ann".to_string(), 1)).unwrap();
    assert_eq!(recorder.calls(), vec!["audit", "join ann 2", "points 2"]);
    assert_eq!(*event.get(PlayerJoin::SCORE).unwrap(), 2);
}

#[test]
fn register_static_keeps_public_static_methods() {
    let bus = bus();
    let fire = bus.bind::<FirePlayerJoin>().unwrap();

    assert_eq!(bus.register_static::<Scoreboard>().unwrap(), 1);
    let event = fire.fire(("ann".to_string(), 7)).unwrap();
    assert_eq!(*event.get(PlayerJoin::SCORE).unwrap(), 0);
    assert!(RESETS.count() >= 1);
}

#[test]
fn generated_subscriptions_carry_modifiers() {
    let (scoreboard, _) = scoreboard();
    let all = Scoreboard::subscriptions(&scoreboard);
    assert_eq!(all.len(), 5);

    let modifiers = |name: &str| {
        all.iter()
            .find(|sub| sub.method().name() == name)
            .map(|sub| sub.modifiers())
            .unwrap()
    };
    assert_eq!(modifiers("on_join"), Modifiers::PUBLIC);
    assert_eq!(modifiers("hidden"), Modifiers::empty());
    assert_eq!(modifiers("reset"), Modifiers::PUBLIC | Modifiers::STATIC);

    let statics = Scoreboard::static_subscriptions();
    assert_eq!(statics.len(), 1);
    assert!(statics[0].method().is_static());
}

#[test]
fn parameter_names_come_from_compiled_metadata() {
    let bus = bus();
    let (scoreboard, _) = scoreboard();
    let all = Scoreboard::subscriptions(&scoreboard);

    let on_join = all
        .iter()
        .find(|sub| sub.method().name() == "on_join")
        .unwrap();
    let resolved = bus.resolver().resolve_with_tier(on_join.method()).unwrap();
    assert_eq!(resolved.tier, Tier::Metadata);
    assert_eq!(resolved.names.to_vec(), vec!["name", "score"]);

    let renamed = all
        .iter()
        .find(|sub| sub.method().name() == "renamed")
        .unwrap();
    let resolved = bus.resolver().resolve_with_tier(renamed.method()).unwrap();
    assert_eq!(resolved.tier, Tier::Explicit);
    assert_eq!(resolved.names.to_vec(), vec!["score"]);

    let declaring_type = on_join.method().declaring_type();
    let signatures: Vec<&str> = compiled_metadata(declaring_type)
        .map(|meta| meta.signature)
        .collect();
    assert!(signatures.contains(&"on_join(String,i32)"));
}

#[test]
fn declared_event_must_match_consumed_event() {
    let bus = bus();
    let err = bus.register(&Arc::new(Confused)).unwrap_err();
    assert!(matches!(err, RegistrationError::EventMismatch { .. }));
    assert_eq!(bus.listener_count::<PlayerJoin>(), 0);
    assert_eq!(bus.listener_count::<Ping>(), 0);
}

#[test]
fn methods_without_an_event_are_skipped() {
    let bus = bus();
    assert_eq!(bus.register(&Arc::new(Undecided)).unwrap(), 0);
}

#[test]
fn unresolved_names_follow_the_policy() {
    let bus = bus();
    let err = bus.register(&Arc::new(Anonymous)).unwrap_err();
    assert!(matches!(err, RegistrationError::Unresolved(_)));

    let lenient = EventBus::with_config(
        TestEnvironment::new(),
        BusConfig::default().with_resolution(ResolutionPolicy::Skip),
    );
    assert_eq!(lenient.register(&Arc::new(Anonymous)).unwrap(), 0);
    assert_eq!(lenient.listener_count::<PlayerJoin>(), 0);
}

#[test]
fn debug_image_names_unnamed_parameters() {
    use tidings::params::{DebugImage, MethodLocals};

    let subs = Anonymous::subscriptions(&Arc::new(Anonymous));
    let method = subs[0].method().clone();
    let image = DebugImage::new().method(
        MethodLocals::new(method.signature(), 1)
            .local(0, "self")
            .local(1, "score")
            .local(2, "tmp"),
    );
    let bus = EventBus::with_config(
        TestEnvironment::new().with_debug_image(method.declaring_type(), &image),
        BusConfig::default(),
    );

    let resolved = bus.resolver().resolve_with_tier(&method).unwrap();
    assert_eq!(resolved.tier, Tier::DebugImage);
    assert_eq!(bus.register(&Arc::new(Anonymous)).unwrap(), 1);
}
