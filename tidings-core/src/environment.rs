//! The host environment.
//!
//! [`Environment`] is how the bus reaches the outside world: text resources
//! with build-time parameter names, debug images with local-variable tables,
//! and the materializer that turns plans into units.

use crate::unit::UnitMaterializer;
use std::sync::Arc;

/// Sources of metadata and code generation consumed by the bus.
pub trait Environment: Send + Sync + 'static {
    /// The `.params` resource for `declaring_type`, if one exists.
    ///
    /// One `signature name1,name2` entry per line.
    fn param_metadata(&self, _declaring_type: &str) -> Option<String> {
        None
    }

    /// The debug image for `declaring_type`, if one exists.
    fn debug_image(&self, _declaring_type: &str) -> Option<Vec<u8>> {
        None
    }

    /// The materializer for dispatch units.
    fn materializer(&self) -> Arc<dyn UnitMaterializer>;
}

/// Parameter names recorded at build time.
///
/// Submitted to `inventory` by the `#[subscriber]` macro, one entry per
/// subscribed method.
#[derive(Debug)]
pub struct ParamMetadata {
    /// The declaring type's path.
    pub declaring_type: &'static str,
    /// The erased signature, `name(T0,T1)`.
    pub signature: &'static str,
    /// Parameter names, in order.
    pub names: &'static [&'static str],
}

inventory::collect!(ParamMetadata);

/// All parameter metadata compiled into the binary for `declaring_type`.
pub fn compiled_metadata(declaring_type: &str) -> impl Iterator<Item = &'static ParamMetadata> {
    inventory::iter::<ParamMetadata>
        .into_iter()
        .filter(move |meta| meta.declaring_type == declaring_type)
}
