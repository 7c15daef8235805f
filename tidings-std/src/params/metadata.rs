//! Build-time parameter metadata.
//!
//! Two sources feed this tier: entries compiled into the binary by the
//! `#[subscriber]` macro, and `.params` text resources provided by the
//! environment. A resource holds one entry per line:
//!
//! ```text
//! on_join(String,i32) name,score
//! fire(String) name
//! ```

use std::{collections::HashMap, sync::Arc};
use tidings_core::compiled_metadata;

/// Parameter names by erased signature, for one declaring type.
pub type SignatureTable = HashMap<String, Arc<[String]>>;

/// Parse a `.params` resource.
///
/// Blank lines are skipped. Lines without exactly one signature and one
/// comma-separated name list are logged and skipped.
pub fn parse(resource: &str, text: &str) -> SignatureTable {
    let mut table = SignatureTable::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some((signature, names)) => {
                table.insert(signature, names);
            }
            None => {
                tracing::error!(
                    resource,
                    line = number + 1,
                    content = line,
                    "Invalid line in parameter metadata"
                );
            }
        }
    }
    table
}

fn parse_line(line: &str) -> Option<(String, Arc<[String]>)> {
    let mut parts = line.split_whitespace();
    let signature = parts.next()?;
    let names = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let names: Vec<String> = names.split(',').map(str::to_string).collect();
    if names.iter().any(String::is_empty) {
        return None;
    }
    Some((signature.to_string(), names.into()))
}

/// Entries the `#[subscriber]` macro compiled in for `declaring_type`.
pub fn compiled(declaring_type: &str) -> SignatureTable {
    compiled_metadata(declaring_type)
        .map(|meta| {
            let names: Vec<String> = meta.names.iter().map(|n| n.to_string()).collect();
            (meta.signature.to_string(), names.into())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_blank_lines() {
        let table = parse(
            "demo.params",
            "on_join(String,i32) name,score\n\n  fire(String) name  \n",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(
            table["on_join(String,i32)"].to_vec(),
            vec!["name".to_string(), "score".to_string()]
        );
        assert_eq!(table["fire(String)"].to_vec(), vec!["name".to_string()]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let table = parse(
            "demo.params",
            "no_names()\non_a(u8) a\ntoo(u8) many parts\non_b(u8,u8) b,\n",
        );
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("on_a(u8)"));
    }

    #[test]
    fn nothing_compiled_for_unknown_type() {
        assert!(compiled("demo::Nobody").is_empty());
    }
}
