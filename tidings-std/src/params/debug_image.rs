//! Debug images: local-variable tables for a declaring type.
//!
//! The binary layout, all integers big-endian:
//!
//! ```text
//! magic      b"TDBG"
//! version    u8 (1)
//! methods    u16
//! per method:
//!   sig_len  u16, signature bytes (UTF-8)
//!   flags    u8 (bit 0: static)
//!   width    u8, parameter slots excluding the receiver
//!   locals   u16
//!   per local:
//!     slot     u8
//!     name_len u16, name bytes (UTF-8)
//! ```
//!
//! Slot 0 of a non-static method holds the receiver. Only slots inside the
//! parameter window name parameters; later slots are ordinary locals.

use super::metadata::SignatureTable;
use std::sync::Arc;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"TDBG";
const VERSION: u8 = 1;
const FLAG_STATIC: u8 = 1;

/// Errors raised while decoding a debug image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugImageError {
    /// The image does not start with the expected magic.
    #[error("not a debug image")]
    BadMagic,

    /// The image was written by a newer format.
    #[error("unsupported debug image version {0}")]
    UnsupportedVersion(u8),

    /// The image ended early.
    #[error("debug image truncated at offset {0}")]
    Truncated(usize),

    /// A string is not UTF-8.
    #[error("invalid UTF-8 in debug image at offset {0}")]
    InvalidUtf8(usize),

    /// A string or table is too long to encode.
    #[error("debug image entry too long: {0}")]
    TooLong(String),
}

/// The local-variable table of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLocals {
    signature: String,
    is_static: bool,
    param_width: u8,
    locals: Vec<(u8, String)>,
}

impl MethodLocals {
    /// An instance method with no locals.
    pub fn new(signature: impl Into<String>, param_width: u8) -> Self {
        Self {
            signature: signature.into(),
            is_static: false,
            param_width,
            locals: Vec::new(),
        }
    }

    /// Mark the method as having no receiver slot.
    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Add a local variable.
    pub fn local(mut self, slot: u8, name: impl Into<String>) -> Self {
        self.locals.push((slot, name.into()));
        self
    }

    /// The erased signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Parameter names, in slot order.
    ///
    /// The receiver slot and locals outside the parameter window are dropped.
    pub fn param_names(&self) -> Vec<String> {
        let end = if self.is_static {
            u16::from(self.param_width)
        } else {
            u16::from(self.param_width) + 1
        };
        let mut params: Vec<&(u8, String)> = self
            .locals
            .iter()
            .filter(|(slot, _)| (*slot != 0 || self.is_static) && u16::from(*slot) < end)
            .collect();
        params.sort_by_key(|(slot, _)| *slot);
        params.into_iter().map(|(_, name)| name.clone()).collect()
    }
}

/// A decoded debug image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugImage {
    methods: Vec<MethodLocals>,
}

impl DebugImage {
    /// An empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method table.
    pub fn method(mut self, method: MethodLocals) -> Self {
        self.methods.push(method);
        self
    }

    /// Method tables, in image order.
    pub fn methods(&self) -> &[MethodLocals] {
        &self.methods
    }

    /// Parameter names of every method that has any.
    pub fn param_table(&self) -> SignatureTable {
        self.methods
            .iter()
            .filter_map(|method| {
                let names = method.param_names();
                (!names.is_empty()).then(|| (method.signature.clone(), Arc::<[String]>::from(names)))
            })
            .collect()
    }

    /// Decode an image.
    pub fn parse(bytes: &[u8]) -> Result<Self, DebugImageError> {
        let mut reader = Reader { bytes, offset: 0 };

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(DebugImageError::BadMagic);
        }
        let version = reader.u8()?;
        if version != VERSION {
            return Err(DebugImageError::UnsupportedVersion(version));
        }

        let count = reader.u16()?;
        let mut methods = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let signature = reader.string()?;
            let flags = reader.u8()?;
            let param_width = reader.u8()?;
            let local_count = reader.u16()?;
            let mut locals = Vec::with_capacity(usize::from(local_count));
            for _ in 0..local_count {
                let slot = reader.u8()?;
                locals.push((slot, reader.string()?));
            }
            methods.push(MethodLocals {
                signature,
                is_static: flags & FLAG_STATIC != 0,
                param_width,
                locals,
            });
        }
        Ok(Self { methods })
    }

    /// Encode the image.
    pub fn encode(&self) -> Result<Vec<u8>, DebugImageError> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        put_u16(&mut out, self.methods.len(), "method table")?;
        for method in &self.methods {
            put_string(&mut out, &method.signature)?;
            out.push(if method.is_static { FLAG_STATIC } else { 0 });
            out.push(method.param_width);
            put_u16(&mut out, method.locals.len(), &method.signature)?;
            for (slot, name) in &method.locals {
                out.push(*slot);
                put_string(&mut out, name)?;
            }
        }
        Ok(out)
    }
}

fn put_u16(out: &mut Vec<u8>, value: usize, what: &str) -> Result<(), DebugImageError> {
    let value = u16::try_from(value).map_err(|_| DebugImageError::TooLong(what.to_string()))?;
    out.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

fn put_string(out: &mut Vec<u8>, value: &str) -> Result<(), DebugImageError> {
    put_u16(out, value.len(), value)?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], DebugImageError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DebugImageError::Truncated(self.offset))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DebugImageError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DebugImageError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn string(&mut self) -> Result<String, DebugImageError> {
        let len = self.u16()?;
        let start = self.offset;
        let bytes = self.take(usize::from(len))?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| DebugImageError::InvalidUtf8(start))
    }
}
