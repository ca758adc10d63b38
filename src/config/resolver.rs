//! Resolution of templated configuration documents.
//!
//! A document may contain `${NAME}` placeholders, substituted from the
//! process environment before JSON parsing. A placeholder naming an unset
//! variable is a hard error; the document must resolve completely before
//! the orchestrator looks at it.

use std::path::Path;

use tracing::debug;

use super::ConfigDocument;
use crate::error::ConfigError;

/// Resolve the configuration document at `path`.
pub fn resolve(path: impl AsRef<Path>) -> Result<ConfigDocument, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let rendered = render_placeholders(&raw, path)?;
    let document: ConfigDocument = serde_json::from_str(&rendered)?;

    debug!(path = %path.display(), "configuration resolved");
    Ok(document)
}

/// Substitute every `${NAME}` occurrence from the environment.
///
/// An opening `${` without a closing brace is left as-is; JSON parsing
/// will reject it if it lands somewhere structural.
fn render_placeholders(raw: &str, path: &Path) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    loop {
        let Some(start) = rest.find("${") else {
            out.push_str(rest);
            return Ok(out);
        };

        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let name = &after[..end];
        let value =
            std::env::var(name).map_err(|_| ConfigError::UnresolvedPlaceholder {
                name: name.to_string(),
                path: path.to_path_buf(),
            })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
}
