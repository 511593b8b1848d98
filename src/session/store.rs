// File-backed session state store
//
// One JSON file per session in the state directory. Writes go to a uniquely
// named temp file in the same directory and are renamed over the target, so
// readers only ever see a complete record. There is no cross-process lock:
// the last writer wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::constants::STATE_FILE_PREFIX;

use super::marker::{OWNERSHIP_KIND, RECENT_KIND};
use super::paths::state_file;
use super::state::SessionState;

/// Failure to persist a session record
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize session state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("refusing to persist non-finite {field}")]
    NonFiniteValue { field: &'static str },
}

/// Shared per-session record, keyed by session id
pub trait SessionStore: Send + Sync {
    /// Stored record, or a fresh one when absent or unreadable. Never fails.
    fn load(&self, session_id: &str) -> SessionState;

    fn save(&self, state: &SessionState) -> Result<(), StoreError>;

    /// Best-effort delete; a missing record is not an error.
    fn clear(&self, session_id: &str);
}

/// [`SessionStore`] writing `planman-<id>.json` files into one directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        state_file(&self.dir, "", session_id)
    }

    /// Every `planman-*.json` file in the state directory.
    fn all_files(&self) -> Vec<PathBuf> {
        let pattern = format!(
            "{}/{STATE_FILE_PREFIX}*.json",
            glob::Pattern::escape(&self.dir.to_string_lossy())
        );
        match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(e) => {
                warn!("Invalid state directory pattern {}: {}", pattern, e);
                Vec::new()
            }
        }
    }

    /// Remove every planman file in the state directory.
    ///
    /// Returns `(removed, total)`.
    pub fn clear_all(&self) -> (usize, usize) {
        remove_files(self.all_files())
    }

    /// Remove one session's record together with its markers.
    ///
    /// Returns `(removed, total)` where `total` counts the files that existed.
    pub fn clear_session(&self, session_id: &str) -> (usize, usize) {
        let files = [
            self.path_for(session_id),
            state_file(&self.dir, OWNERSHIP_KIND, session_id),
            state_file(&self.dir, RECENT_KIND, session_id),
        ]
        .into_iter()
        .filter(|p| p.exists())
        .collect();
        remove_files(files)
    }

    /// Readable session records, most recently evaluated first.
    pub fn list_sessions(&self) -> Vec<(PathBuf, SessionState)> {
        let marker_prefixes = [
            format!("{STATE_FILE_PREFIX}{OWNERSHIP_KIND}"),
            format!("{STATE_FILE_PREFIX}{RECENT_KIND}"),
        ];
        let mut sessions: Vec<_> = self
            .all_files()
            .into_iter()
            .filter(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                !marker_prefixes.iter().any(|p| name.starts_with(p.as_str()))
            })
            .filter_map(|path| {
                let raw = fs::read_to_string(&path).ok()?;
                let state = serde_json::from_str::<SessionState>(&raw).ok()?;
                Some((path, state))
            })
            .collect();

        sessions.sort_by(|(_, a), (_, b)| {
            let a = a.last_eval_time.unwrap_or(0.0);
            let b = b.last_eval_time.unwrap_or(0.0);
            b.total_cmp(&a)
        });
        sessions
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, session_id: &str) -> SessionState {
        let path = self.path_for(session_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return SessionState::new(session_id);
            }
            Err(e) => {
                warn!("Failed to read session state {}: {}", path.display(), e);
                return SessionState::new(session_id);
            }
        };

        match serde_json::from_str::<SessionState>(&raw) {
            Ok(state) if state.session_id == session_id => state,
            Ok(state) => {
                warn!(
                    "Session id mismatch in {} (found {:?}), starting fresh",
                    path.display(),
                    state.session_id
                );
                SessionState::new(session_id)
            }
            Err(e) => {
                warn!("Corrupt session state {}: {}", path.display(), e);
                SessionState::new(session_id)
            }
        }
    }

    fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        if state.last_eval_time.is_some_and(|t| !t.is_finite()) {
            return Err(StoreError::NonFiniteValue {
                field: "last_eval_time",
            });
        }
        let json = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path_for(&state.session_id), &json)?;
        debug!(
            "Saved session {} at round {}",
            state.session_id, state.round_count
        );
        Ok(())
    }

    fn clear(&self, session_id: &str) {
        let path = self.path_for(session_id);
        match fs::remove_file(&path) {
            Ok(()) => debug!("Cleared session state {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear {}: {}", path.display(), e),
        }
    }
}

/// Write `bytes` to `target` through a synced temp file in the same directory.
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".planman-tmp-")
        .suffix(".json")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn remove_files(files: Vec<PathBuf>) -> (usize, usize) {
    let total = files.len();
    let removed = files
        .iter()
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove {}: {}", path.display(), e);
                false
            }
        })
        .count();
    (removed, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileSessionStore) {
        let tmp = TempDir::new().unwrap();
        let store = FileSessionStore::new(tmp.path());
        (tmp, store)
    }

    #[test]
    fn test_load_missing_returns_fresh_record() {
        let (_tmp, store) = store();
        let state = store.load("abc");
        assert_eq!(state, SessionState::new("abc"));
        assert!(!store.path_for("abc").exists());
    }

    #[test]
    fn test_save_then_load() {
        let (_tmp, store) = store();
        let mut state = SessionState::new("abc");
        state.round_count = 2;
        state.last_score = Some(6);
        state.last_eval_time = Some(1_700_000_000.5);
        store.save(&state).unwrap();

        assert_eq!(store.load("abc"), state);
        let raw = fs::read_to_string(store.path_for("abc")).unwrap();
        assert!(raw.contains("\"round_count\": 2"));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (tmp, store) = store();
        store.save(&SessionState::new("abc")).unwrap();
        store.save(&SessionState::new("abc")).unwrap();
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["planman-abc.json".to_string()]);
    }

    #[test]
    fn test_corrupt_file_loads_fresh() {
        let (_tmp, store) = store();
        fs::write(store.path_for("abc"), "{ not json").unwrap();
        assert_eq!(store.load("abc"), SessionState::new("abc"));
    }

    #[test]
    fn test_session_id_mismatch_loads_fresh() {
        let (_tmp, store) = store();
        let mut other = SessionState::new("other");
        other.round_count = 3;
        let json = serde_json::to_string(&other).unwrap();
        fs::write(store.path_for("abc"), json).unwrap();
        assert_eq!(store.load("abc").round_count, 0);
    }

    #[test]
    fn test_non_finite_time_is_refused() {
        let (_tmp, store) = store();
        let mut state = SessionState::new("abc");
        state.last_eval_time = Some(f64::INFINITY);
        let err = store.save(&state).unwrap_err();
        assert!(matches!(err, StoreError::NonFiniteValue { .. }));
        assert!(!store.path_for("abc").exists());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (_tmp, store) = store();
        store.save(&SessionState::new("abc")).unwrap();
        store.clear("abc");
        store.clear("abc");
        assert!(!store.path_for("abc").exists());
    }

    #[test]
    fn test_clear_all_counts_files() {
        let (tmp, store) = store();
        store.save(&SessionState::new("a")).unwrap();
        store.save(&SessionState::new("b")).unwrap();
        fs::write(tmp.path().join("unrelated.json"), "{}").unwrap();
        assert_eq!(store.clear_all(), (2, 2));
        assert!(tmp.path().join("unrelated.json").exists());
    }

    #[test]
    fn test_clear_session_removes_markers() {
        let (tmp, store) = store();
        store.save(&SessionState::new("a")).unwrap();
        store.save(&SessionState::new("b")).unwrap();
        fs::write(tmp.path().join("planman-plan-a.json"), "{}").unwrap();
        assert_eq!(store.clear_session("a"), (2, 2));
        assert!(store.path_for("b").exists());
    }

    #[test]
    fn test_list_sessions_skips_markers_and_orders_by_time() {
        let (tmp, store) = store();
        let mut old = SessionState::new("old");
        old.last_eval_time = Some(1.0);
        let mut new = SessionState::new("new");
        new.last_eval_time = Some(2.0);
        store.save(&old).unwrap();
        store.save(&new).unwrap();
        fs::write(
            tmp.path().join("planman-recent-new.json"),
            r#"{"session_id":"new","timestamp":2.0}"#,
        )
        .unwrap();

        let ids: Vec<_> = store
            .list_sessions()
            .into_iter()
            .map(|(_, s)| s.session_id)
            .collect();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    }
}
