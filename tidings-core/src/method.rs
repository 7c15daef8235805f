//! Callable signatures.
//!
//! A [`MethodSig`] describes a listener or firing contract method the way the
//! parameter name resolver sees it: where it is declared, what it is called,
//! the types it takes, and any names spelled out at the declaration site.

use crate::value::{ArgTuple, TypeInfo};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Visibility and binding of a subscriber method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Visible outside the declaring type.
        const PUBLIC = 1 << 0;
        /// Takes no receiver.
        const STATIC = 1 << 1;
    }
}

/// The signature of one callable.
#[derive(Clone, PartialEq, Eq)]
pub struct MethodSig {
    declaring_type: &'static str,
    name: &'static str,
    signature: Option<String>,
    params: Vec<TypeInfo>,
    overrides: Vec<Option<&'static str>>,
    is_static: bool,
}

impl MethodSig {
    /// A method with no parameters.
    pub fn new(declaring_type: &'static str, name: &'static str) -> Self {
        Self {
            declaring_type,
            name,
            signature: None,
            params: Vec::new(),
            overrides: Vec::new(),
            is_static: false,
        }
    }

    /// A method taking the element types of `A`, in order.
    pub fn of<A: ArgTuple>(declaring_type: &'static str, name: &'static str) -> Self {
        let params = A::types();
        Self {
            overrides: vec![None; params.len()],
            params,
            ..Self::new(declaring_type, name)
        }
    }

    /// Append a parameter of type `T`.
    pub fn param<T: ?Sized + 'static>(mut self) -> Self {
        self.params.push(TypeInfo::of::<T>());
        self.overrides.push(None);
        self
    }

    /// Append a parameter of type `T` with an explicit name.
    pub fn named_param<T: ?Sized + 'static>(mut self, name: &'static str) -> Self {
        self.params.push(TypeInfo::of::<T>());
        self.overrides.push(Some(name));
        self
    }

    /// Give explicit names to the leading parameters.
    ///
    /// Names beyond the parameter count are ignored. Parameters left without a
    /// name make the explicit names unusable as a whole.
    pub fn names(mut self, names: &[&'static str]) -> Self {
        for (slot, name) in self.overrides.iter_mut().zip(names) {
            *slot = Some(*name);
        }
        self
    }

    /// Use `signature` instead of the one derived from the parameter types.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Mark the method as taking no receiver.
    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// The type that declares the method.
    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    /// The method name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parameter types, in order.
    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    /// Number of parameters, receiver excluded.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Per-parameter names given at the declaration site.
    pub fn overrides(&self) -> &[Option<&'static str>] {
        &self.overrides
    }

    /// Whether the method takes no receiver.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// The erased signature, `name(T0,T1)`, without whitespace.
    pub fn signature(&self) -> String {
        match &self.signature {
            Some(signature) => signature.clone(),
            None => {
                let types: Vec<String> = self
                    .params
                    .iter()
                    .map(|p| p.name().replace(' ', ""))
                    .collect();
                format!("{}({})", self.name, types.join(","))
            }
        }
    }

    /// Cache key unique to this callable: `declaring_type::signature`.
    pub fn key(&self) -> String {
        format!("{}::{}", self.declaring_type, self.signature())
    }
}

impl fmt::Debug for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
