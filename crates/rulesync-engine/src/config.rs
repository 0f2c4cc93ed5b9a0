//! Engine configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default settings key holding the rule list
pub const DEFAULT_RULES_KEY: &str = "rulesync.rules";

/// Default settings key holding the flattened string
pub const DEFAULT_VALUES_KEY: &str = "rulesync.instructions";

/// Which side wins when the flattened string and the rule list disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Take the external string as truth and rebuild the rule list from it
    Pull,
    /// Take the rule list as truth and overwrite the external string
    Push,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Pull => f.write_str("pull"),
            Resolution::Push => f.write_str("push"),
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pull" => Ok(Resolution::Pull),
            "push" => Ok(Resolution::Push),
            other => Err(format!("unknown resolution '{other}' (expected pull or push)")),
        }
    }
}

/// Which stored item a settings key refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Watched {
    /// The structured rule list
    Rules,
    /// The flattened string
    Flattened,
}

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Settings key of the rule list
    pub rules_key: String,
    /// Settings key of the flattened string
    pub values_key: String,
    /// Offer to import an existing flattened string when a scope has no rules
    pub offer_import_on_activate: bool,
    /// Resolve divergence without asking
    pub default_resolution: Option<Resolution>,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With settings key names
    #[inline]
    #[must_use]
    pub fn with_keys(
        mut self,
        rules_key: impl Into<String>,
        values_key: impl Into<String>,
    ) -> Self {
        self.rules_key = rules_key.into();
        self.values_key = values_key.into();
        self
    }

    /// With a fixed resolution for divergence
    #[inline]
    #[must_use]
    pub fn with_default_resolution(mut self, resolution: Option<Resolution>) -> Self {
        self.default_resolution = resolution;
        self
    }

    /// With the activation import offer switched on or off
    #[inline]
    #[must_use]
    pub fn with_import_offer(mut self, enabled: bool) -> Self {
        self.offer_import_on_activate = enabled;
        self
    }

    /// Map a settings key to the item it holds
    #[must_use]
    pub fn watched(&self, key: &str) -> Option<Watched> {
        if key == self.rules_key {
            Some(Watched::Rules)
        } else if key == self.values_key {
            Some(Watched::Flattened)
        } else {
            None
        }
    }

    /// Settings key of a watched item
    #[must_use]
    pub fn key_of(&self, item: Watched) -> &str {
        match item {
            Watched::Rules => &self.rules_key,
            Watched::Flattened => &self.values_key,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rules_key: DEFAULT_RULES_KEY.to_string(),
            values_key: DEFAULT_VALUES_KEY.to_string(),
            offer_import_on_activate: true,
            default_resolution: None,
        }
    }
}
