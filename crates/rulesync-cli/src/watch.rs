//! Settings file watcher
//!
//! Turns edits of the settings files into [`ChangeEvent`]s. The directory of
//! each file is watched rather than the file itself, since atomic writes
//! replace the file. A file event only yields change events for the watched
//! keys whose stored value actually differs from the last snapshot, so the
//! engine's own writes settle once they reproduce what is already stored.

use crate::settings::{FileStore, Snapshot};
use notify::{recommended_watcher, EventKind, RecursiveMode, Watcher};
use rulesync_core::Scope;
use rulesync_engine::{ChangeEvent, Severity, SyncEngine, Watched};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Watcher setup error
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// File system notifications unavailable
    #[error("file watcher: {0}")]
    Notify(#[from] notify::Error),

    /// Settings directory could not be created
    #[error("cannot prepare {path}: {source}")]
    Prepare {
        /// Directory path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Watched items whose stored value differs between two snapshots
///
/// The flattened string is listed before the rule list, so an external edit
/// is reconciled before anything regenerates it.
#[must_use]
pub fn changed_items(before: &Snapshot, after: &Snapshot) -> Vec<Watched> {
    let mut items = Vec::new();
    if before.flattened != after.flattened {
        items.push(Watched::Flattened);
    }
    if before.rules != after.rules {
        items.push(Watched::Rules);
    }
    items
}

/// Watch the settings files until `shutdown` resolves
///
/// If the watcher cannot be set up, the failure is reported once and every
/// available scope is synced a single time instead.
pub async fn run(
    engine: Arc<SyncEngine>,
    store: Arc<FileStore>,
    shutdown: impl Future<Output = ()>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = match start(&store, tx) {
        Ok(watcher) => watcher,
        Err(error) => {
            tracing::error!(%error, "watcher setup failed; running a single pass");
            engine
                .prompter()
                .notify(Severity::Error, &format!("Watching is unavailable: {error}"));
            single_pass(&engine).await;
            return;
        }
    };

    single_pass(&engine).await;
    watch_loop(&engine, &store, rx, shutdown).await;
    drop(watcher);
    tracing::info!("watcher stopped");
}

/// Sync every available scope once: reconcile, then regenerate
pub async fn single_pass(engine: &SyncEngine) {
    for scope in engine.available_scopes() {
        for item in [Watched::Flattened, Watched::Rules] {
            let event = ChangeEvent::new(scope, engine.config().key_of(item));
            if let Err(error) = engine.handle(&event).await {
                tracing::error!(%scope, %error, "sync pass failed");
            }
        }
    }
}

fn start(
    store: &FileStore,
    tx: mpsc::UnboundedSender<PathBuf>,
) -> Result<notify::RecommendedWatcher, WatchError> {
    let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else { return };
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }
        for path in event.paths {
            let _ = tx.send(path);
        }
    })?;

    for scope in Scope::ALL {
        let Some(dir) = store.paths().of(scope).and_then(|file| file.parent()) else {
            continue;
        };
        std::fs::create_dir_all(dir).map_err(|source| WatchError::Prepare {
            path: dir.to_path_buf(),
            source,
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::info!(%scope, dir = %dir.display(), "watching settings");
    }
    Ok(watcher)
}

async fn watch_loop(
    engine: &SyncEngine,
    store: &FileStore,
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    shutdown: impl Future<Output = ()>,
) {
    let mut snapshots: HashMap<Scope, Snapshot> = HashMap::new();
    for scope in engine.available_scopes() {
        snapshots.insert(scope, store.snapshot(scope).await.unwrap_or_default());
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            received = rx.recv() => {
                let Some(path) = received else { break };
                let Some(scope) = store.paths().scope_of(&path) else { continue };
                let after = match store.snapshot(scope).await {
                    Ok(snapshot) => snapshot,
                    Err(error) => {
                        tracing::warn!(
                            %scope,
                            %error,
                            "settings unreadable; waiting for the next change"
                        );
                        continue;
                    }
                };
                let before = snapshots.insert(scope, after.clone()).unwrap_or_default();

                for item in changed_items(&before, &after) {
                    let event = ChangeEvent::new(scope, engine.config().key_of(item));
                    tracing::debug!(%scope, key = %event.key, "settings key changed");
                    if let Err(error) = engine.handle(&event).await {
                        tracing::error!(%scope, %error, "change handling failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_differing_items_change() {
        let before = Snapshot {
            rules: Some(json!([{"id": 1, "key": "a"}])),
            flattened: Some(json!("a: 1")),
        };
        let mut after = before.clone();
        assert!(changed_items(&before, &after).is_empty());

        after.flattened = Some(json!("a: 2"));
        assert_eq!(changed_items(&before, &after), vec![Watched::Flattened]);

        after.rules = None;
        assert_eq!(
            changed_items(&before, &after),
            vec![Watched::Flattened, Watched::Rules]
        );
    }
}
