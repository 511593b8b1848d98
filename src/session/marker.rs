// Short-lived marker files shared between the hook processes
//
// The ownership marker records which plan file the agent last wrote; the
// recent-evaluation marker tells the inline hook that the file-based hook
// already handled this turn.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::constants::{
    CLOCK_SKEW_TOLERANCE_SECS, OWNERSHIP_MARKER_TTL_SECS, RECENT_EVALUATION_TTL_SECS,
};

use super::paths::{normalize_path, state_file};
use super::store::{write_atomic, StoreError};

pub(crate) const OWNERSHIP_KIND: &str = "plan-";
pub(crate) const RECENT_KIND: &str = "recent-";

/// Which plan file the agent wrote last in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipMarker {
    pub plan_file_path: PathBuf,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEvaluationMarker {
    pub session_id: String,
    pub timestamp: f64,
}

/// Reads and writes marker files in the state directory
#[derive(Debug, Clone)]
pub struct MarkerStore {
    dir: PathBuf,
}

impl MarkerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Record `plan_file` as the current plan for the session.
    pub fn write_ownership(
        &self,
        session_id: &str,
        plan_file: &Path,
        now: f64,
    ) -> Result<(), StoreError> {
        let marker = OwnershipMarker {
            plan_file_path: normalize_path(plan_file),
            timestamp: now,
        };
        self.write(OWNERSHIP_KIND, session_id, &marker)
    }

    /// Plan file from a fresh ownership marker, if any.
    pub fn ownership(&self, session_id: &str, now: f64) -> Option<PathBuf> {
        let marker: OwnershipMarker = self.read(OWNERSHIP_KIND, session_id)?;
        if is_fresh(marker.timestamp, now, OWNERSHIP_MARKER_TTL_SECS) {
            Some(marker.plan_file_path)
        } else {
            debug!(
                "Ignoring expired ownership marker for {}",
                marker.plan_file_path.display()
            );
            None
        }
    }

    /// Note that the file-based hook evaluated a plan for this session just now.
    pub fn mark_recent(&self, session_id: &str, now: f64) -> Result<(), StoreError> {
        let marker = RecentEvaluationMarker {
            session_id: session_id.to_string(),
            timestamp: now,
        };
        self.write(RECENT_KIND, session_id, &marker)
    }

    pub fn recently_evaluated(&self, session_id: &str, now: f64) -> bool {
        self.read::<RecentEvaluationMarker>(RECENT_KIND, session_id)
            .is_some_and(|m| {
                m.session_id == session_id
                    && is_fresh(m.timestamp, now, RECENT_EVALUATION_TTL_SECS)
            })
    }

    fn write<T: Serialize>(&self, kind: &str, session_id: &str, marker: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec(marker)?;
        write_atomic(&state_file(&self.dir, kind, session_id), &json)?;
        Ok(())
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, kind: &str, session_id: &str) -> Option<T> {
        let path = state_file(&self.dir, kind, session_id);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(marker) => Some(marker),
            Err(e) => {
                debug!("Unreadable marker {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Not older than `ttl` and not further in the future than the skew tolerance.
fn is_fresh(timestamp: f64, now: f64, ttl: f64) -> bool {
    if !timestamp.is_finite() {
        return false;
    }
    let age = now - timestamp;
    age >= -CLOCK_SKEW_TOLERANCE_SECS && age <= ttl
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NOW: f64 = 1_700_000_000.0;

    #[test]
    fn test_ownership_round_trip_and_expiry() {
        let tmp = TempDir::new().unwrap();
        let plan = tmp.path().join("plan.md");
        fs::write(&plan, "# Plan").unwrap();
        let markers = MarkerStore::new(tmp.path());

        markers.write_ownership("s1", &plan, NOW).unwrap();
        assert_eq!(markers.ownership("s1", NOW + 60.0), Some(normalize_path(&plan)));
        assert_eq!(markers.ownership("s1", NOW + 7201.0), None);
        assert_eq!(markers.ownership("s2", NOW), None);
    }

    #[test]
    fn test_future_timestamps_within_skew_only() {
        assert!(is_fresh(NOW + 30.0, NOW, 60.0));
        assert!(!is_fresh(NOW + 120.0, NOW, 60.0));
        assert!(!is_fresh(f64::NAN, NOW, 60.0));
    }

    #[test]
    fn test_recent_marker_window() {
        let tmp = TempDir::new().unwrap();
        let markers = MarkerStore::new(tmp.path());
        assert!(!markers.recently_evaluated("s1", NOW));

        markers.mark_recent("s1", NOW).unwrap();
        assert!(markers.recently_evaluated("s1", NOW + 59.0));
        assert!(!markers.recently_evaluated("s1", NOW + 61.0));
        assert!(!markers.recently_evaluated("s2", NOW));
    }

    #[test]
    fn test_garbage_marker_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("planman-plan-s1.json"), "nope").unwrap();
        let markers = MarkerStore::new(tmp.path());
        assert_eq!(markers.ownership("s1", NOW), None);
    }
}
