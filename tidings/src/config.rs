//! Bus configuration.

use std::{env, str::FromStr};
use thiserror::Error;

/// Environment variable enabling plan logging.
pub const DEBUG_VAR: &str = "TIDINGS_DEBUG";

/// Environment variable selecting the [`ResolutionPolicy`].
pub const RESOLUTION_VAR: &str = "TIDINGS_RESOLUTION";

/// What subscriber scanning does when a method's parameter names cannot be
/// resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Fail the registration.
    #[default]
    Reject,
    /// Log a warning and leave the method out.
    Skip,
}

/// Error returned when parsing an unknown [`ResolutionPolicy`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown resolution policy '{0}', expected 'reject' or 'skip'")]
pub struct ParsePolicyError(pub String);

impl FromStr for ResolutionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "skip" => Ok(Self::Skip),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Settings for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusConfig {
    /// Log every compiled dispatch plan at debug level.
    pub debug: bool,
    /// How subscriber scanning treats unresolved parameter names.
    pub resolution: ResolutionPolicy,
}

impl BusConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from `TIDINGS_DEBUG` and `TIDINGS_RESOLUTION`.
    ///
    /// Unset variables keep their defaults. Unparseable values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(DEBUG_VAR) {
            config.debug = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(value) = lookup(RESOLUTION_VAR) {
            match value.parse() {
                Ok(policy) => config.resolution = policy,
                Err(err) => tracing::warn!(error = %err, "Ignoring {}", RESOLUTION_VAR),
            }
        }
        config
    }

    /// Set plan logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the resolution policy.
    pub fn with_resolution(mut self, resolution: ResolutionPolicy) -> Self {
        self.resolution = resolution;
        self
    }
}
