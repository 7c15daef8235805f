//! The default environment.

use crate::materialize::ClosureMaterializer;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tidings_core::{Environment, UnitMaterializer};

/// The environment used when none is given.
///
/// Units are built by the [`ClosureMaterializer`]. Resources are read from an
/// optional directory: `<dir>/<type>.params` for parameter metadata and
/// `<dir>/<type>.tdbg` for debug images, where `<type>` is the declaring
/// type's path with `::` replaced by `.`.
#[derive(Debug, Clone, Default)]
pub struct StdEnvironment {
    resource_dir: Option<PathBuf>,
}

impl StdEnvironment {
    /// An environment without resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read resources from `dir`.
    pub fn with_resource_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: Some(dir.into()),
        }
    }

    /// The resource directory, if any.
    pub fn resource_dir(&self) -> Option<&Path> {
        self.resource_dir.as_deref()
    }

    fn resource(&self, declaring_type: &str, extension: &str) -> Option<Vec<u8>> {
        let dir = self.resource_dir.as_ref()?;
        let path = dir.join(format!("{}.{extension}", declaring_type.replace("::", ".")));
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read resource");
                None
            }
        }
    }
}

impl Environment for StdEnvironment {
    fn param_metadata(&self, declaring_type: &str) -> Option<String> {
        let bytes = self.resource(declaring_type, "params")?;
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::error!(declaring_type, error = %err, "Parameter metadata is not UTF-8");
                None
            }
        }
    }

    fn debug_image(&self, declaring_type: &str) -> Option<Vec<u8>> {
        self.resource(declaring_type, "tdbg")
    }

    fn materializer(&self) -> Arc<dyn UnitMaterializer> {
        Arc::new(ClosureMaterializer)
    }
}
