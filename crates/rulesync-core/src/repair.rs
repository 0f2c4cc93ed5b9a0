//! Integrity repair for rule lists
//!
//! Stored rule lists can be edited by hand, by other tools or by a sync of the
//! flattened string, so ids and keys are not trusted. [`repair`] guarantees:
//!
//! - every key is non-empty (records without one are dropped)
//! - every key reads back unchanged from the flattened string
//! - ids are positive and pairwise distinct
//! - keys are pairwise distinct
//!
//! Keys are first brought to the form the flattened string reads back: trimmed
//! and cut at the first colon. Ids are renumbered all-or-nothing: one bad id
//! renumbers the whole list in its current order, since nothing tells which of
//! two colliding ids is right.
//! Duplicate keys keep their first occurrence and rename later ones to
//! `{root}_duplicate_{n}`, recording each rename so the caller can carry the
//! old value over to the new key.

use crate::rule::{next_id, Rule};
use std::collections::HashSet;

const DUPLICATE_MARKER: &str = "_duplicate_";

/// A key renamed during repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRename {
    /// Key before any repair ever touched it (`x` for `x_duplicate_1`)
    pub original: String,
    /// Key as it was found in the input
    pub from: String,
    /// Key assigned by the repair
    pub to: String,
}

/// Ordered renames performed by one repair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRenames(Vec<KeyRename>);

impl KeyRenames {
    /// Whether no key was renamed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of renames
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Renames in list order
    pub fn iter(&self) -> std::slice::Iter<'_, KeyRename> {
        self.0.iter()
    }

    /// Input key a renamed key was produced from
    #[must_use]
    pub fn source_of(&self, renamed: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|r| r.to == renamed)
            .map(|r| r.from.as_str())
    }

    fn push(&mut self, rename: KeyRename) {
        self.0.push(rename);
    }
}

impl<'a> IntoIterator for &'a KeyRenames {
    type Item = &'a KeyRename;
    type IntoIter = std::slice::Iter<'a, KeyRename>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of [`repair`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repaired {
    /// Corrected rules, in input order
    pub rules: Vec<Rule>,
    /// Keys renamed to make them unique
    pub renames: KeyRenames,
    /// Whether ids were reassigned
    pub renumbered: bool,
    /// Records dropped for lacking a key
    pub dropped: usize,
    /// Keys trimmed or cut at a colon
    pub normalized: usize,
    /// Whether the output differs from the input
    pub changed: bool,
}

impl Repaired {
    /// One-line description of what was fixed, for user-facing warnings
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.dropped > 0 {
            parts.push(format!("dropped {} rule(s) without a key", self.dropped));
        }
        if self.normalized > 0 {
            parts.push(format!("normalized {} key(s)", self.normalized));
        }
        if self.renumbered {
            parts.push("reassigned rule ids".to_string());
        }
        for rename in &self.renames {
            parts.push(format!("renamed duplicate key '{}' to '{}'", rename.from, rename.to));
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Repair a rule list so ids and keys are unique
#[must_use]
pub fn repair(rules: &[Rule]) -> Repaired {
    let mut normalized = 0;
    let mut kept = Vec::with_capacity(rules.len());
    for rule in rules {
        let key = readable_key(&rule.key);
        if key.is_empty() {
            continue;
        }
        if key != rule.key {
            normalized += 1;
        }
        kept.push(Rule::new(rule.id, key));
    }
    let dropped = rules.len() - kept.len();

    let renumbered = needs_renumbering(&kept);
    if renumbered {
        renumber(&mut kept);
    }

    let renames = dedupe_keys(&mut kept);
    let changed = dropped > 0 || normalized > 0 || renumbered || !renames.is_empty();

    Repaired {
        rules: kept,
        renames,
        renumbered,
        dropped,
        normalized,
        changed,
    }
}

/// Assign ids `1..=n` in list order
pub fn renumber(rules: &mut [Rule]) {
    for (rule, id) in rules.iter_mut().zip(1_i64..) {
        rule.id = id;
    }
}

/// Id for a rule about to be appended to `rules`
///
/// When the largest id leaves no room above it, the list is renumbered first.
#[must_use]
pub fn allocate_id(rules: &mut [Rule]) -> i64 {
    if let Some(id) = next_id(rules) {
        return id;
    }
    renumber(rules);
    i64::try_from(rules.len()).unwrap_or(i64::MAX).saturating_add(1)
}

/// Key as [`crate::codec::parse`] would read it back after a build
fn readable_key(key: &str) -> &str {
    let key = key.trim();
    match key.find(':') {
        Some(idx) => key[..idx].trim_end(),
        None => key,
    }
}

fn needs_renumbering(rules: &[Rule]) -> bool {
    let mut seen = HashSet::with_capacity(rules.len());
    rules.iter().any(|r| !r.has_valid_id() || !seen.insert(r.id))
}

fn dedupe_keys(rules: &mut [Rule]) -> KeyRenames {
    let present: HashSet<String> = rules.iter().map(|r| r.key.clone()).collect();
    let mut finalized: HashSet<String> = HashSet::with_capacity(rules.len());
    let mut renames = KeyRenames::default();

    for rule in rules.iter_mut() {
        if finalized.insert(rule.key.clone()) {
            continue;
        }

        let root = root_key(&rule.key).to_string();
        let renamed = (1_u64..)
            .map(|n| format!("{root}{DUPLICATE_MARKER}{n}"))
            .find(|candidate| !present.contains(candidate) && !finalized.contains(candidate))
            .unwrap_or_else(|| unreachable!("duplicate suffixes are unbounded"));

        finalized.insert(renamed.clone());
        renames.push(KeyRename {
            original: root,
            from: std::mem::replace(&mut rule.key, renamed.clone()),
            to: renamed,
        });
    }

    renames
}

/// Strip every trailing `_duplicate_{n}` produced by earlier repairs
fn root_key(key: &str) -> &str {
    let mut root = key;
    while let Some((head, suffix)) = root.rsplit_once(DUPLICATE_MARKER) {
        if head.is_empty() || suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        root = head;
    }
    root
}
