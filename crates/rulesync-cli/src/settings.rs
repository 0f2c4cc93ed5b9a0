//! JSON settings files as a [`ScopeStore`]
//!
//! Each scope is one JSON object on disk:
//!
//! - global: `<config_dir>/rulesync/settings.json`
//! - workspace: `<workspace>/.rulesync/settings.json`
//!
//! The rule list and the flattened string sit under the configured key names
//! next to whatever else the file holds. Unrelated keys are written back
//! untouched. Every write replaces the file through a temp file and a rename
//! so a watcher never sees a half-written file.

use async_trait::async_trait;
use rulesync_core::{Rule, Scope};
use rulesync_engine::{ScopeStore, StoreError, SyncConfig};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of a settings file
pub const SETTINGS_FILE: &str = "settings.json";

/// Directory below a workspace root holding its settings file
pub const WORKSPACE_DIR: &str = ".rulesync";

/// Locations of the settings files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPaths {
    /// Global settings file
    pub global: PathBuf,
    /// Workspace settings file; `None` when no workspace is open
    pub workspace: Option<PathBuf>,
}

impl SettingsPaths {
    /// Explicit file locations
    #[inline]
    #[must_use]
    pub fn new(global: impl Into<PathBuf>, workspace: Option<PathBuf>) -> Self {
        Self {
            global: global.into(),
            workspace,
        }
    }

    /// Default global location plus the settings file of `workspace_root`
    #[must_use]
    pub fn resolve(workspace_root: Option<&Path>) -> Self {
        let global = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rulesync")
            .join(SETTINGS_FILE);
        Self::new(global, workspace_root.map(workspace_settings))
    }

    /// Settings file of a scope, if addressable
    #[must_use]
    pub fn of(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::Global => Some(&self.global),
            Scope::Workspace => self.workspace.as_deref(),
        }
    }

    /// Scope whose settings file is `path`
    #[must_use]
    pub fn scope_of(&self, path: &Path) -> Option<Scope> {
        Scope::ALL
            .into_iter()
            .find(|scope| self.of(*scope).is_some_and(|p| p == path))
    }
}

/// Settings file below a workspace root
#[must_use]
pub fn workspace_settings(root: &Path) -> PathBuf {
    root.join(WORKSPACE_DIR).join(SETTINGS_FILE)
}

/// Raw stored values of the two watched keys of one scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Value under the rule list key
    pub rules: Option<Value>,
    /// Value under the flattened string key
    pub flattened: Option<Value>,
}

/// [`ScopeStore`] over JSON settings files
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: SettingsPaths,
    rules_key: String,
    values_key: String,
}

impl FileStore {
    /// Create a store using the key names of `config`
    #[must_use]
    pub fn new(paths: SettingsPaths, config: &SyncConfig) -> Self {
        Self {
            paths,
            rules_key: config.rules_key.clone(),
            values_key: config.values_key.clone(),
        }
    }

    /// File locations
    #[inline]
    #[must_use]
    pub fn paths(&self) -> &SettingsPaths {
        &self.paths
    }

    /// Current raw values of the watched keys of `scope`
    ///
    /// # Errors
    /// `StoreError::Io` or `StoreError::Malformed` if the file cannot be read
    pub async fn snapshot(&self, scope: Scope) -> Result<Snapshot, StoreError> {
        let Some(path) = self.paths.of(scope) else {
            return Ok(Snapshot::default());
        };
        let mut object = read_object(path).await?;
        Ok(Snapshot {
            rules: object.remove(&self.rules_key),
            flattened: object.remove(&self.values_key),
        })
    }

    async fn read_key(&self, scope: Scope, key: &str) -> Result<Option<Value>, StoreError> {
        let Some(path) = self.paths.of(scope) else {
            return Ok(None);
        };
        Ok(read_object(path).await?.remove(key))
    }

    async fn write_key(&self, scope: Scope, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.paths.of(scope).ok_or(StoreError::WorkspaceUnavailable)?;
        let mut object = read_object(path).await?;
        object.insert(key.to_string(), value);
        write_object(path, &object).await
    }
}

#[async_trait]
impl ScopeStore for FileStore {
    fn workspace_open(&self) -> bool {
        self.paths.workspace.is_some()
    }

    async fn read_rules(&self, scope: Scope) -> Result<Vec<Rule>, StoreError> {
        match self.read_key(scope, &self.rules_key).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(decode_rules(items)),
            Some(other) => {
                tracing::warn!(
                    %scope,
                    key = %self.rules_key,
                    found = %kind_of(&other),
                    "rule list is not an array; reading it as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn write_rules(&self, scope: Scope, rules: &[Rule]) -> Result<(), StoreError> {
        let value = serde_json::to_value(rules).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.write_key(scope, &self.rules_key, value).await
    }

    async fn read_flattened(&self, scope: Scope) -> Result<String, StoreError> {
        match self.read_key(scope, &self.values_key).await? {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(text)) => Ok(text),
            Some(other) => {
                tracing::warn!(
                    %scope,
                    key = %self.values_key,
                    found = %kind_of(&other),
                    "flattened string is not a string; reading it as empty"
                );
                Ok(String::new())
            }
        }
    }

    async fn write_flattened(&self, scope: Scope, text: &str) -> Result<(), StoreError> {
        self.write_key(scope, &self.values_key, Value::String(text.to_string()))
            .await
    }
}

/// Decode stored rule records, skipping entries that are not records at all
fn decode_rules(items: Vec<Value>) -> Vec<Rule> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Rule>(item) {
            Ok(rule) => Some(rule),
            Err(error) => {
                tracing::warn!(index, %error, "skipping stored rule record");
                None
            }
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read a settings object; a missing or blank file is an empty object
async fn read_object(path: &Path) -> Result<Map<String, Value>, StoreError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(StoreError::io_error(path, e)),
    };
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(&text).map_err(|e| StoreError::malformed(path, e))
}

/// Replace a settings file atomically (temp file + rename)
async fn write_object(path: &Path, object: &Map<String, Value>) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StoreError::io_error(dir, e))?;

    let mut text =
        serde_json::to_string_pretty(object).map_err(|e| StoreError::malformed(path, e))?;
    text.push('\n');

    let file_name = path
        .file_name()
        .map_or_else(|| SETTINGS_FILE.into(), |n| n.to_string_lossy());
    let tmp = dir.join(format!(".{file_name}.tmp"));
    tokio::fs::write(&tmp, text)
        .await
        .map_err(|e| StoreError::io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io_error(path, e))?;

    tracing::debug!(path = %path.display(), "settings file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_of_matches_exact_files() {
        let workspace = workspace_settings(Path::new("/ws"));
        let paths = SettingsPaths::new("/cfg/settings.json", Some(workspace));
        assert_eq!(paths.scope_of(Path::new("/cfg/settings.json")), Some(Scope::Global));
        assert_eq!(
            paths.scope_of(Path::new("/ws/.rulesync/settings.json")),
            Some(Scope::Workspace)
        );
        assert_eq!(paths.scope_of(Path::new("/ws/.rulesync/.settings.json.tmp")), None);
    }

    #[test]
    fn closed_workspace_has_no_file() {
        let paths = SettingsPaths::new("/cfg/settings.json", None);
        assert_eq!(paths.of(Scope::Workspace), None);
        assert_eq!(paths.scope_of(Path::new("/ws/.rulesync/settings.json")), None);
    }

    #[test]
    fn decode_skips_non_records() {
        let items = vec![
            serde_json::json!({"id": 1, "key": "a"}),
            serde_json::json!("loose"),
            serde_json::json!({"id": "x", "key": 5}),
        ];
        assert_eq!(decode_rules(items), vec![Rule::new(1, "a"), Rule::new(0, "5")]);
    }
}
