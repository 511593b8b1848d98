// Per-session evaluation record and the round-transition rules

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::constants::STALE_SESSION_SECS;
use crate::planning::identity::{
    content_hash, round_transition, Fingerprint, PlanIdentity, RoundTransition,
};
use crate::planning::types::Breakdown;

use super::paths::normalize_path;

/// Current time as fractional seconds since the UNIX epoch.
pub fn unix_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// One record per session, shared by every hook process through the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,

    /// Rounds evaluated for the current plan identity
    #[serde(default)]
    pub round_count: u32,

    #[serde(default)]
    pub last_score: Option<u8>,

    /// Formatted feedback from the previous round, sent back to the evaluator
    #[serde(default)]
    pub last_feedback: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_breakdown: Option<Breakdown>,

    /// Content hash of the most recently evaluated text
    #[serde(default)]
    pub plan_hash: Option<String>,

    /// `title|prefix-hash` identity of the current inline plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_fingerprint: Option<String>,

    /// Set when the plan lives in a tracked file; marks the session file-owned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_file_path: Option<PathBuf>,

    /// Seconds since the UNIX epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_eval_time: Option<f64>,

    /// Hash of the last inline text the evaluator said was not a plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_nonplan_hash: Option<String>,
}

impl SessionState {
    /// Fresh record with zeroed counters.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            round_count: 0,
            last_score: None,
            last_feedback: None,
            last_breakdown: None,
            plan_hash: None,
            plan_fingerprint: None,
            plan_file_path: None,
            last_eval_time: None,
            last_nonplan_hash: None,
        }
    }

    /// Idle for longer than the staleness window.
    ///
    /// A record that was never evaluated is not stale.
    pub fn is_stale(&self, now: f64) -> bool {
        match self.last_eval_time {
            Some(last) if last.is_finite() => now - last > STALE_SESSION_SECS,
            _ => false,
        }
    }

    /// The file-based hook owns this session and is still active.
    pub fn is_file_owned(&self, now: f64) -> bool {
        self.plan_file_path.is_some() && !self.is_stale(now)
    }

    /// Advance or reset the round counter for a new evaluation of `text`.
    ///
    /// With `plan_path` the (normalized) file is the identity; without it the
    /// text's fingerprint is. Returns `false` without touching anything when an
    /// inline evaluation arrives while the session is file-owned.
    pub fn identity_update(&mut self, text: &str, plan_path: Option<&Path>, now: f64) -> bool {
        let stale = self.is_stale(now);

        let (next, previous) = match plan_path {
            Some(path) => (
                PlanIdentity::File(normalize_path(path)),
                self.plan_file_path
                    .as_deref()
                    .map(|p| PlanIdentity::File(normalize_path(p))),
            ),
            None => {
                if self.is_file_owned(now) {
                    return false;
                }
                (
                    PlanIdentity::Fingerprint(Fingerprint::of(text)),
                    self.plan_fingerprint
                        .as_deref()
                        .and_then(Fingerprint::parse)
                        .map(PlanIdentity::Fingerprint),
                )
            }
        };

        self.round_count = match round_transition(previous.as_ref(), &next, stale) {
            RoundTransition::Reset => 1,
            RoundTransition::Increment => self.round_count.saturating_add(1),
        };

        match next {
            PlanIdentity::File(path) => {
                self.plan_file_path = Some(path);
                self.plan_fingerprint = Some(Fingerprint::of(text).to_string());
            }
            PlanIdentity::Fingerprint(fp) => {
                self.plan_fingerprint = Some(fp.to_string());
            }
        }

        self.plan_hash = Some(content_hash(text));
        self.last_eval_time = Some(now);
        true
    }

    /// Record the outcome of an evaluation round.
    pub fn record_feedback(
        &mut self,
        score: Option<u8>,
        feedback: Option<String>,
        breakdown: Option<Breakdown>,
    ) {
        self.last_score = score;
        self.last_feedback = feedback;
        if breakdown.is_some() {
            self.last_breakdown = breakdown;
        }
    }
}
