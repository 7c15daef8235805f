//! Procedural macros for Tidings.

use proc_macro::TokenStream;

mod subscriber;

/// Turn an inherent impl block into a subscriber.
///
/// Methods marked `#[subscribe]` become listeners. A method taking a single
/// `&mut EventInstance<E>` consumes the whole event; any other method takes
/// `&FieldType` parameters whose names bind to the event's fields.
///
/// Marker arguments, all optional:
/// - a leading event type, required for field-exploded methods
/// - `priority = High`, a [`Priority`] variant, `Normal` by default
/// - `names = ["name", "score"]`, explicit parameter names
///
/// Public methods taking `&self` are picked up by `EventBus::register`; public
/// methods without a receiver by `EventBus::register_static`.
///
/// # Example
///
/// ```rust,ignore
/// use tidings::{EventInstance, subscriber};
///
/// struct Scoreboard;
///
/// #[subscriber]
/// impl Scoreboard {
///     #[subscribe(PlayerJoin, priority = High)]
///     pub fn on_join(&self, name: &String, score: &i32) {
///         println!("{name} joined with {score}");
///     }
///
///     #[subscribe]
///     pub fn audit(event: &mut EventInstance<PlayerJoin>) {
///         event.set(PlayerJoin::SCORE, 0).ok();
///     }
/// }
/// ```
///
/// [`Priority`]: ../tidings/enum.Priority.html
#[proc_macro_attribute]
pub fn subscriber(attr: TokenStream, item: TokenStream) -> TokenStream {
    subscriber::subscriber_impl(attr, item)
}
