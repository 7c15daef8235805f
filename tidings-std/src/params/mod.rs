//! Parameter name resolution.
//!
//! Listener and firing contract parameters bind to event fields by name, so
//! every callable needs its parameter names. They are looked up through three
//! tiers, first success wins:
//!
//! 1. **Explicit** - names written on the declaration ([`MethodSig::names`])
//! 2. **Metadata** - build-time tables, compiled in by `#[subscriber]` or
//!    provided as `.params` resources by the [`Environment`]
//! 3. **Debug image** - the declaring type's local-variable table
//!
//! Explicit names belong to the declaration itself and are read every time.
//! Successful tier 2 and 3 lookups are cached per callable, and their tables
//! are cached per declaring type. Neither cache is ever evicted. Misses are
//! not cached, so a callable that failed once is looked up again next time.

pub mod debug_image;
pub mod metadata;

use dashmap::DashMap;
use debug_image::DebugImage;
use metadata::SignatureTable;
use std::{fmt, sync::Arc};
use tidings_core::{Environment, MethodSig, ResolutionMiss};

/// The tier that produced a callable's names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Names written on the declaration.
    Explicit,
    /// Build-time metadata.
    Metadata,
    /// The declaring type's debug image.
    DebugImage,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Explicit => "explicit",
            Tier::Metadata => "metadata",
            Tier::DebugImage => "debug image",
        })
    }
}

/// Resolved names of one callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    /// Parameter names, in order.
    pub names: Arc<[String]>,
    /// Where they came from.
    pub tier: Tier,
}

/// Tiered, cached parameter name lookup.
pub struct ParamNameResolver {
    env: Arc<dyn Environment>,
    metadata: DashMap<String, Arc<SignatureTable>>,
    debug: DashMap<String, Arc<SignatureTable>>,
    resolved: DashMap<String, ResolvedNames>,
}

impl ParamNameResolver {
    /// Create a resolver reading resources from `env`.
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            metadata: DashMap::new(),
            debug: DashMap::new(),
            resolved: DashMap::new(),
        }
    }

    /// Parameter names of `method`, in order.
    pub fn resolve(&self, method: &MethodSig) -> Result<Arc<[String]>, ResolutionMiss> {
        self.resolve_with_tier(method).map(|resolved| resolved.names)
    }

    /// Parameter names of `method` and the tier that found them.
    pub fn resolve_with_tier(&self, method: &MethodSig) -> Result<ResolvedNames, ResolutionMiss> {
        // Two declarations may share a key and still name their parameters
        // differently.
        if let Some(resolved) = declared(method) {
            return Ok(resolved);
        }

        let key = method.key();
        if let Some(hit) = self.resolved.get(&key) {
            return Ok(hit.clone());
        }

        let resolved = self.compute(method).ok_or_else(|| ResolutionMiss {
            method: key.clone(),
        })?;
        tracing::debug!(method = %key, tier = %resolved.tier, "Resolved parameter names");
        self.resolved.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Number of callables with cached names.
    pub fn cached(&self) -> usize {
        self.resolved.len()
    }

    fn compute(&self, method: &MethodSig) -> Option<ResolvedNames> {
        let signature = method.signature();
        let declaring_type = method.declaring_type();

        let metadata = self.metadata_table(declaring_type);
        if let Some(names) = fitting(method, metadata.get(&signature), Tier::Metadata) {
            return Some(ResolvedNames {
                names,
                tier: Tier::Metadata,
            });
        }

        let debug = self.debug_table(declaring_type);
        fitting(method, debug.get(&signature), Tier::DebugImage).map(|names| ResolvedNames {
            names,
            tier: Tier::DebugImage,
        })
    }

    fn metadata_table(&self, declaring_type: &str) -> Arc<SignatureTable> {
        if let Some(table) = self.metadata.get(declaring_type) {
            return table.clone();
        }
        self.metadata
            .entry(declaring_type.to_string())
            .or_insert_with(|| {
                let mut table = metadata::compiled(declaring_type);
                if let Some(text) = self.env.param_metadata(declaring_type) {
                    let resource = format!("{declaring_type}.params");
                    for (signature, names) in metadata::parse(&resource, &text) {
                        table.entry(signature).or_insert(names);
                    }
                }
                Arc::new(table)
            })
            .clone()
    }

    fn debug_table(&self, declaring_type: &str) -> Arc<SignatureTable> {
        if let Some(table) = self.debug.get(declaring_type) {
            return table.clone();
        }
        self.debug
            .entry(declaring_type.to_string())
            .or_insert_with(|| {
                let table = match self.env.debug_image(declaring_type) {
                    Some(bytes) => match DebugImage::parse(&bytes) {
                        Ok(image) => image.param_table(),
                        Err(err) => {
                            tracing::debug!(declaring_type, error = %err, "Failed to read debug image");
                            SignatureTable::new()
                        }
                    },
                    None => SignatureTable::new(),
                };
                Arc::new(table)
            })
            .clone()
    }
}

impl fmt::Debug for ParamNameResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamNameResolver")
            .field("cached", &self.resolved.len())
            .finish_non_exhaustive()
    }
}

fn declared(method: &MethodSig) -> Option<ResolvedNames> {
    // Nothing to name.
    if method.arity() == 0 {
        return Some(ResolvedNames {
            names: Vec::<String>::new().into(),
            tier: Tier::Explicit,
        });
    }
    explicit(method).map(|names| ResolvedNames {
        names,
        tier: Tier::Explicit,
    })
}

/// Tier 1. All parameters must be named, or none of the names are used.
fn explicit(method: &MethodSig) -> Option<Arc<[String]>> {
    let overrides = method.overrides();
    if overrides.iter().all(Option::is_none) {
        return None;
    }
    let names: Option<Vec<String>> = overrides
        .iter()
        .map(|name| name.map(str::to_string))
        .collect();
    match names {
        Some(names) if names.len() == method.arity() => Some(names.into()),
        _ => {
            tracing::error!(
                method = %method,
                "Method must name all of its parameters, ignoring explicit names"
            );
            None
        }
    }
}

fn fitting(method: &MethodSig, names: Option<&Arc<[String]>>, tier: Tier) -> Option<Arc<[String]>> {
    let names = names?;
    if names.len() != method.arity() {
        tracing::warn!(
            method = %method,
            %tier,
            expected = method.arity(),
            found = names.len(),
            "Parameter name count does not match"
        );
        return None;
    }
    Some(names.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnvironment;
    use debug_image::MethodLocals;

    fn resolver(env: TestEnvironment) -> ParamNameResolver {
        ParamNameResolver::new(Arc::new(env))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn on_event() -> MethodSig {
        MethodSig::of::<(String, String, Vec<u8>)>("demo::Listener", "on_event")
    }

    #[test]
    fn explicit_names_win() {
        let env = TestEnvironment::new().with_params("demo::Listener", "on_event(String,String,Vec<u8>) x,y,z");
        let method = on_event()
            .names(&["one", "two", "three"])
            .with_signature("on_event(String,String,Vec<u8>)");
        let resolved = resolver(env).resolve_with_tier(&method).unwrap();
        assert_eq!(resolved.tier, Tier::Explicit);
        assert_eq!(resolved.names.to_vec(), names(&["one", "two", "three"]));
    }

    #[test]
    fn partial_explicit_names_fall_through() {
        let env = TestEnvironment::new().with_params("demo::Listener", "on_event(String,String,Vec<u8>) a,b,c");
        let method = on_event()
            .names(&["one", "two"])
            .with_signature("on_event(String,String,Vec<u8>)");
        let resolved = resolver(env).resolve_with_tier(&method).unwrap();
        assert_eq!(resolved.tier, Tier::Metadata);
        assert_eq!(resolved.names.to_vec(), names(&["a", "b", "c"]));
    }

    #[test]
    fn debug_image_is_last_resort() {
        let image = DebugImage::new().method(
            MethodLocals::new("on_event(String,String,Vec<u8>)", 3)
                .local(0, "self")
                .local(1, "a")
                .local(2, "b")
                .local(3, "c")
                .local(4, "scratch"),
        );
        let env = TestEnvironment::new().with_debug_image("demo::Listener", &image);
        let method = on_event().with_signature("on_event(String,String,Vec<u8>)");
        let resolved = resolver(env).resolve_with_tier(&method).unwrap();
        assert_eq!(resolved.tier, Tier::DebugImage);
        assert_eq!(resolved.names.to_vec(), names(&["a", "b", "c"]));
    }

    #[test]
    fn miss_without_any_source() {
        let resolver = resolver(TestEnvironment::new());
        let err = resolver.resolve(&on_event()).unwrap_err();
        assert!(err.method.starts_with("demo::Listener::on_event("));
        assert_eq!(resolver.cached(), 0);
    }

    #[test]
    fn wrong_length_is_a_miss() {
        let env = TestEnvironment::new().with_params("demo::Listener", "on_event(String,String,Vec<u8>) a,b");
        let method = on_event().with_signature("on_event(String,String,Vec<u8>)");
        assert!(resolver(env).resolve(&method).is_err());
    }

    #[test]
    fn nullary_methods_resolve_to_nothing() {
        let resolver = resolver(TestEnvironment::new());
        let names = resolver.resolve(&MethodSig::new("demo", "tick")).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn successes_are_cached() {
        let env = TestEnvironment::new().with_params("demo::Listener", "on_event(String,String,Vec<u8>) a,b,c");
        let resolver = resolver(env);
        let method = on_event().with_signature("on_event(String,String,Vec<u8>)");
        let first = resolver.resolve(&method).unwrap();
        let second = resolver.resolve(&method).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached(), 1);
    }

    #[test]
    fn explicit_names_are_never_shared_through_the_cache() {
        let env = TestEnvironment::new().with_params("demo::Listener", "on_event(String,String,Vec<u8>) a,b,c");
        let resolver = resolver(env);
        let method = on_event().with_signature("on_event(String,String,Vec<u8>)");
        assert_eq!(resolver.resolve(&method).unwrap().to_vec(), names(&["a", "b", "c"]));

        // Same key, different declaration.
        let renamed = method.clone().names(&["x", "y", "z"]);
        let resolved = resolver.resolve_with_tier(&renamed).unwrap();
        assert_eq!(resolved.tier, Tier::Explicit);
        assert_eq!(resolved.names.to_vec(), names(&["x", "y", "z"]));

        let other = on_event().names(&["p", "q", "r"]);
        assert_eq!(resolver.resolve(&other).unwrap().to_vec(), names(&["p", "q", "r"]));
        assert_eq!(resolver.cached(), 1);
    }
}
