//! Rules and scopes
//!
//! A [`Rule`] is the structured half of the synchronized state: an id plus the
//! key whose value lives in the flattened string. Stored records are decoded
//! leniently so that hand-edited or foreign data still loads; anything that
//! does not describe a valid rule decodes to a value that
//! [`repair`](crate::repair::repair) will fix or drop.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Configuration partition a rule list lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// User-wide settings
    Global,
    /// Settings of the currently open workspace
    Workspace,
}

impl Scope {
    /// Both scopes, global first
    pub const ALL: [Scope; 2] = [Scope::Global, Scope::Workspace];

    /// Lowercase name used in messages and on the command line
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Workspace => "workspace",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "user" => Ok(Scope::Global),
            "workspace" | "project" => Ok(Scope::Workspace),
            other => Err(format!("unknown scope '{other}' (expected global or workspace)")),
        }
    }
}

/// A single rule of a scope's ordered rule list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Positive identifier, unique within the scope
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,
    /// Key of the entry in the flattened string, unique within the scope
    #[serde(default, deserialize_with = "lenient_key")]
    pub key: String,
}

impl Rule {
    /// Create a rule
    #[inline]
    #[must_use]
    pub fn new(id: i64, key: impl Into<String>) -> Self {
        Self {
            id,
            key: key.into(),
        }
    }

    /// Whether the id is usable as-is (positive)
    #[inline]
    #[must_use]
    pub fn has_valid_id(&self) -> bool {
        self.id > 0
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.key)
    }
}

/// Next free id: one past the largest positive id, starting at 1
///
/// `None` when the largest id is `i64::MAX` and nothing fits above it.
#[must_use]
pub fn next_id(rules: &[Rule]) -> Option<i64> {
    rules
        .iter()
        .map(|r| r.id)
        .filter(|id| *id > 0)
        .max()
        .unwrap_or(0)
        .checked_add(1)
}

// Largest integer a JSON number written by a JavaScript host can carry exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Decode an id, mapping anything that is not an integral number to `0`
fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(id_from_value(&value))
}

#[allow(clippy::cast_possible_truncation)]
fn id_from_value(value: &Value) -> i64 {
    let Value::Number(number) = value else {
        return 0;
    };
    if let Some(id) = number.as_i64() {
        return id;
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => f as i64,
        _ => 0,
    }
}

/// Decode a key, keeping strings and the text of scalars, anything else as `""`
fn lenient_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}
