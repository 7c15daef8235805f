//! Testing utilities for Tidings.
//!
//! This module provides utilities to make testing buses and listeners easier.
//!
//! # Features
//!
//! - [`CountingMaterializer`]: A materializer that counts unit definitions and can be made to fail
//! - [`TestEnvironment`]: An in-memory environment with parameter metadata and debug images
//! - [`CallRecorder`]: A shared log that listeners append to

use crate::{materialize::ClosureMaterializer, params::debug_image::DebugImage};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tidings_core::{CompilationError, CompiledUnit, DispatchPlan, Environment, UnitMaterializer};

// ============================================================================
// Counting Materializer
// ============================================================================

/// A materializer that counts how many units it defined.
///
/// # Example
///
/// ```rust,ignore
/// let materializer = CountingMaterializer::new();
/// let env = TestEnvironment::new().with_materializer(materializer.clone());
/// let bus = EventBus::with_environment(env);
///
/// fire.fire(("a".into(),))?;
/// fire.fire(("b".into(),))?;
/// assert_eq!(materializer.count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct CountingMaterializer {
    count: Arc<AtomicUsize>,
    fail_next: Arc<AtomicBool>,
    inner: ClosureMaterializer,
}

impl CountingMaterializer {
    /// Create a new counting materializer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units defined so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Make the next definition fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl UnitMaterializer for CountingMaterializer {
    fn define(
        &self,
        name: &str,
        plan: &DispatchPlan,
    ) -> Result<Arc<dyn CompiledUnit>, CompilationError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CompilationError::Materialize {
                unit: name.to_string(),
                reason: "failure requested by test".to_string(),
            });
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.define(name, plan)
    }
}

// ============================================================================
// Test Environment
// ============================================================================

/// An in-memory [`Environment`].
///
/// # Example
///
/// ```rust,ignore
/// let env = TestEnvironment::new()
///     .with_params("game::Scores", "on_score(String,i32) name,score");
/// ```
#[derive(Clone)]
pub struct TestEnvironment {
    params: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
    materializer: Arc<dyn UnitMaterializer>,
}

impl TestEnvironment {
    /// An environment with no resources and the closure materializer.
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            images: HashMap::new(),
            materializer: Arc::new(ClosureMaterializer),
        }
    }

    /// Provide a `.params` resource for `declaring_type`.
    pub fn with_params(mut self, declaring_type: &str, text: &str) -> Self {
        self.params
            .insert(declaring_type.to_string(), text.to_string());
        self
    }

    /// Provide a debug image for `declaring_type`.
    pub fn with_debug_image(mut self, declaring_type: &str, image: &DebugImage) -> Self {
        let bytes = image.encode().expect("debug image fits the format");
        self.images.insert(declaring_type.to_string(), bytes);
        self
    }

    /// Provide raw debug image bytes for `declaring_type`.
    pub fn with_debug_bytes(mut self, declaring_type: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(declaring_type.to_string(), bytes);
        self
    }

    /// Use `materializer` for dispatch units.
    pub fn with_materializer(mut self, materializer: impl UnitMaterializer + 'static) -> Self {
        self.materializer = Arc::new(materializer);
        self
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for TestEnvironment {
    fn param_metadata(&self, declaring_type: &str) -> Option<String> {
        self.params.get(declaring_type).cloned()
    }

    fn debug_image(&self, declaring_type: &str) -> Option<Vec<u8>> {
        self.images.get(declaring_type).cloned()
    }

    fn materializer(&self) -> Arc<dyn UnitMaterializer> {
        Arc::clone(&self.materializer)
    }
}

// ============================================================================
// Call Recorder
// ============================================================================

/// A shared, ordered log of listener calls.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = CallRecorder::new();
/// let log = recorder.clone();
/// bus.register_consumer::<Chat, _>(Priority::Normal, move |_| log.record("chat"))?;
///
/// fire.fire(args)?;
/// assert_eq!(recorder.calls(), vec!["chat"]);
/// ```
#[derive(Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// A copy of the recorded calls.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of recorded calls.
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Clear all recorded calls.
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}
