//! JSON rendering for agent configuration documents
//!
//! Keys are always emitted in sorted order so the same mapping renders to
//! the same bytes, which is what change detection compares.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::{ConfigError, Result};

/// Default indentation width for pretty output
pub const DEFAULT_PRETTY_INDENT: usize = 4;

/// Widest accepted indentation for pretty output
pub const MAX_PRETTY_INDENT: usize = 16;

/// Output layout of rendered JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonStyle {
    /// Single line, no insignificant whitespace
    Compact,
    /// One key per line, indented by `indent` spaces
    Pretty { indent: usize },
}

impl Default for JsonStyle {
    fn default() -> Self {
        JsonStyle::Compact
    }
}

impl JsonStyle {
    /// Pretty style with the default indentation
    pub fn pretty() -> Self {
        JsonStyle::Pretty {
            indent: DEFAULT_PRETTY_INDENT,
        }
    }
}

/// Serialize `value` with sorted keys, terminated by a newline
pub fn render_json(value: &Value, style: JsonStyle) -> Result<String> {
    let value = &sorted(value);
    let mut buf = Vec::new();

    match style {
        JsonStyle::Compact => {
            serde_json::to_writer(&mut buf, value)
                .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        }
        JsonStyle::Pretty { indent } => {
            if indent > MAX_PRETTY_INDENT {
                return Err(ConfigError::invalid_input(format!(
                    "pretty indent must be at most {}, got {}",
                    MAX_PRETTY_INDENT, indent
                )));
            }
            let indent = " ".repeat(indent);
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut buf, formatter);
            value
                .serialize(&mut serializer)
                .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        }
    }

    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| ConfigError::SerializationError(e.to_string()))
}

// Rebuilds objects in key order so output does not depend on how the
// underlying map type iterates.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// File name for a named resource: path separators become `_`
pub fn file_name_for(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}.json", sanitized)
}

/// Rendered document text, possibly secret
///
/// Sensitive contents never show up in `Debug` or `Display` output.
pub enum Contents {
    Plain(String),
    Sensitive(SecretString),
}

impl Contents {
    /// Wrap rendered text, marking it secret when `sensitive`
    pub fn new(text: String, sensitive: bool) -> Self {
        if sensitive {
            Contents::Sensitive(SecretString::new(text))
        } else {
            Contents::Plain(text)
        }
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, Contents::Sensitive(_))
    }

    /// The actual text. Callers must not log it for sensitive contents.
    pub fn expose(&self) -> &str {
        match self {
            Contents::Plain(text) => text,
            Contents::Sensitive(secret) => secret.expose_secret(),
        }
    }

    pub fn len(&self) -> usize {
        self.expose().len()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Plain(text) => f.debug_tuple("Plain").field(text).finish(),
            Contents::Sensitive(_) => f.write_str("Sensitive([REDACTED])"),
        }
    }
}

impl fmt::Display for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Plain(text) => f.write_str(text),
            Contents::Sensitive(_) => f.write_str("[REDACTED]"),
        }
    }
}
