//! Distinguished name parsing and construction.
//!
//! Entry DNs are built from inventory values (`uid=<login>`, `cn=<hostname>`), so values must be
//! escaped on the way in. Configured base DNs are parsed strictly so a typo in the configuration
//! fails before the first directory write.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use provision_core::Error as CoreError;

/// Errors that can occur when parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component had nothing to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component had nothing to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with a dangling backslash.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

/// Single attribute/value pair of a DN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeDistinguishedName {
    attribute: String,
    value: String,
}

impl RelativeDistinguishedName {
    /// Create a new relative distinguished name. The value is stored unescaped.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute portion of the RDN (e.g. `uid`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Unescaped value portion of the RDN.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }
}

/// Parsed distinguished name with a canonical, escaped string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<Vec<RelativeDistinguishedName>>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the input is empty or malformed.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DistinguishedNameError> {
        let raw = input.as_ref().trim_start();
        if raw.trim_end().is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let rdns = split_escaped(raw, ',')?
            .iter()
            .map(|component| {
                split_escaped(component, '+')?
                    .iter()
                    .map(|part| {
                        split_attribute_value(part)
                            .map(|(attribute, value)| RelativeDistinguishedName::new(attribute, value))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterates over every attribute/value pair, leftmost first.
    pub fn components(&self) -> impl Iterator<Item = &RelativeDistinguishedName> + '_ {
        self.rdns.iter().flatten()
    }

    /// Value of the first component whose attribute matches (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.components()
            .find(|rdn| rdn.matches_attribute(attribute))
            .map(RelativeDistinguishedName::value)
    }

    /// Returns a new DN naming `attribute=value` directly below this one.
    #[must_use]
    pub fn child(&self, attribute: &str, value: &str) -> Self {
        self.clone()
            .with_prefix(RelativeDistinguishedName::new(attribute, value))
    }

    /// Prefixes the provided RDN.
    #[must_use]
    pub fn with_prefix(mut self, rdn: RelativeDistinguishedName) -> Self {
        self.rdns.insert(0, vec![rdn]);
        self.raw = rdns_to_string(&self.rdns);
        self
    }

}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn split_escaped(
    input: &str,
    delimiter: char,
) -> std::result::Result<Vec<String>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    // Byte length of `current` up to the end of its last escape pair.
    let mut protected = 0;
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push('\\');
            current.push(ch);
            protected = current.len();
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == delimiter {
            parts.push(trim_unescaped(&current, protected));
            current.clear();
            protected = 0;
        } else {
            current.push(ch);
        }
    }

    if escape {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }

    parts.push(trim_unescaped(&current, protected));
    if parts.iter().any(String::is_empty) {
        return Err(DistinguishedNameError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

/// Trims surrounding whitespace, keeping an escaped trailing space.
fn trim_unescaped(part: &str, protected: usize) -> String {
    let end = protected + part[protected..].trim_end().len();
    part[..end].trim_start().to_string()
}

fn split_attribute_value(
    component: &str,
) -> std::result::Result<(String, String), DistinguishedNameError> {
    let mut escape = false;
    let mut index = None;

    for (i, ch) in component.char_indices() {
        if escape {
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == '=' {
            index = Some(i);
            break;
        }
    }

    let idx =
        index.ok_or_else(|| DistinguishedNameError::InvalidComponent(component.to_string()))?;
    let attribute = component[..idx].trim();
    let value_part = component[idx + 1..].trim_start();

    if attribute.is_empty() {
        return Err(DistinguishedNameError::MissingAttribute(
            component.to_string(),
        ));
    }
    if value_part.is_empty() {
        return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
    }

    Ok((attribute.to_string(), unescape(value_part)?))
}

fn unescape(value: &str) -> std::result::Result<String, DistinguishedNameError> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let next = chars
            .next()
            .ok_or(DistinguishedNameError::UnterminatedEscape)?;
        match next.to_digit(16) {
            // RFC 4514 hex pair, one byte of the UTF-8 value.
            Some(high) => {
                let low = chars
                    .next()
                    .and_then(|c| c.to_digit(16))
                    .ok_or_else(|| DistinguishedNameError::InvalidComponent(value.to_string()))?;
                bytes.push((high * 16 + low) as u8);
            }
            None => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    String::from_utf8(bytes).map_err(|_| DistinguishedNameError::InvalidComponent(value.to_string()))
}

fn escape(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in value.chars().enumerate() {
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (idx == 0 && (ch == ' ' || ch == '#'))
            || (idx == last && ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn rdns_to_string(rdns: &[Vec<RelativeDistinguishedName>]) -> String {
    rdns.iter()
        .map(|rdn| {
            rdn.iter()
                .map(|component| format!("{}={}", component.attribute(), escape(component.value())))
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>()
        .join(",")
}
