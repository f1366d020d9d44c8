//! On-disk k5login format: one principal per line, `\n` after every entry.
//!
//! There is no header, no comment syntax and no escaping. An empty principal
//! list is a zero-byte file.

use crate::error::{Error, Result};
use std::io::Write;

/// Render principals in file order.
pub fn render(principals: &[String]) -> String {
    let mut out = String::with_capacity(principals.iter().map(|p| p.len() + 1).sum());
    for principal in principals {
        out.push_str(principal);
        out.push('\n');
    }
    out
}

/// Write rendered principals to `w`.
pub fn write_to<W: Write>(w: &mut W, principals: &[String]) -> std::io::Result<()> {
    w.write_all(render(principals).as_bytes())
}

/// Split file content into principals.
///
/// Each line loses its terminator (`\n` or `\r\n`); blank lines are kept so
/// that the observed state is never silently tidied. A final line without a
/// terminator still counts.
pub fn parse(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// Reject principals the line format cannot carry.
pub fn validate(principals: &[String]) -> Result<()> {
    match principals.iter().find(|p| p.contains(['\n', '\r'])) {
        Some(bad) => Err(Error::UnrepresentablePrincipal(bad.clone())),
        None => Ok(()),
    }
}
