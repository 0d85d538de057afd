//! `###TOKEN###` snippet templates.
//!
//! Rendering is a single left-to-right pass: substituted values are copied
//! verbatim and never rescanned, so a value that happens to contain token
//! syntax cannot corrupt the surrounding template.

use crate::{Error, Result};

const MARKER: &str = "###";

/// Render `template`, replacing each `###NAME###` with the matching value.
///
/// A token without a value is an error. Text that merely contains `###`
/// without a closing marker is copied unchanged.
pub fn render(template: &str, values: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(MARKER) {
        let after_open = &rest[start + MARKER.len()..];
        let Some(end) = after_open.find(MARKER) else {
            break;
        };
        let token = &after_open[..end];
        if !is_token(token) {
            // Not a token; emit the opening marker and keep scanning after it.
            out.push_str(&rest[..start + MARKER.len()]);
            rest = after_open;
            continue;
        }
        let value = values
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, value)| *value)
            .ok_or_else(|| Error::Template(token.to_string()))?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &after_open[end + MARKER.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_uppercase() || b == b'_')
}
