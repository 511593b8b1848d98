// Evaluation gate: turns plan text plus session state into pass / block / skip
//
// Two callers share one session record. The file-based hook owns the round
// counter; the inline hook only classifies and scores, and backs off while a
// file-based plan is active.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::evaluator::{CodexEvaluator, EvaluationRequest, Evaluator, EvaluatorError};
use crate::session::{unix_now, FileSessionStore, MarkerStore, SessionState, SessionStore};

use super::feedback::{format_approval, format_feedback};
use super::identity::content_hash;
use super::types::{GateOutcome, Verdict};

/// Decides what happens to one piece of plan text
pub struct EvaluationGate {
    config: Config,
    store: Arc<dyn SessionStore>,
    evaluator: Arc<dyn Evaluator>,
    markers: MarkerStore,
    clock: fn() -> f64,
}

impl EvaluationGate {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        evaluator: Arc<dyn Evaluator>,
        markers: MarkerStore,
    ) -> Self {
        Self {
            config,
            store,
            evaluator,
            markers,
            clock: unix_now,
        }
    }

    /// Production wiring: file store and markers in the state dir, codex evaluator.
    pub fn from_config(config: Config) -> Self {
        let dir = config.state_dir();
        let evaluator = Arc::new(CodexEvaluator::from_config(&config));
        Self::new(
            config,
            Arc::new(FileSessionStore::new(&dir)),
            evaluator,
            MarkerStore::new(dir),
        )
    }

    /// Replace the wall clock (seconds since the UNIX epoch).
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    /// Evaluate `text` for `session_id`.
    ///
    /// With `plan_path` this is the file-based, multi-round flow; without it
    /// the inline, classify-and-score flow.
    pub async fn evaluate(
        &self,
        text: &str,
        session_id: &str,
        plan_path: Option<&Path>,
        cwd: Option<&Path>,
    ) -> GateOutcome {
        if text.trim().is_empty() {
            return GateOutcome::Skip;
        }

        let state = self.store.load(session_id);
        match plan_path {
            Some(path) => self.evaluate_file(state, text, path, cwd).await,
            None => self.evaluate_inline(state, text, cwd).await,
        }
    }

    async fn evaluate_inline(
        &self,
        mut state: SessionState,
        text: &str,
        cwd: Option<&Path>,
    ) -> GateOutcome {
        let now = (self.clock)();
        let hash = content_hash(text);

        if state.last_nonplan_hash.as_deref() == Some(hash.as_str()) {
            debug!("Text already classified as non-plan, skipping evaluation");
            return GateOutcome::pass();
        }

        if state.is_file_owned(now) {
            debug!("Plan-file session active, inline evaluation skipped");
            return GateOutcome::pass();
        }

        let request = EvaluationRequest {
            plan_text: text,
            rubric: &self.config.rubric,
            previous_feedback: None,
            round: 1,
            cwd,
        };
        let verdict = match self.evaluator.evaluate(request).await {
            Ok(verdict) => verdict,
            Err(e) => return self.on_evaluator_error(e),
        };

        if !verdict.is_plan {
            info!("Evaluator classified inline text as non-plan");
            state.last_nonplan_hash = Some(hash);
            self.persist(&state);
            return GateOutcome::pass();
        }

        if state.last_nonplan_hash.take().is_some() {
            self.persist(&state);
        }

        let threshold = self.config.threshold;
        if verdict.score >= threshold {
            info!("Inline plan accepted ({}/10)", verdict.score);
            return GateOutcome::pass_with(format!("Planman: {}", format_approval(&verdict)));
        }

        info!("Inline plan rejected ({}/{})", verdict.score, threshold);
        GateOutcome::block(
            format_feedback(&verdict, threshold, 1, self.config.max_rounds, false),
            Some(format!(
                "Planman: Inline plan rejected ({}/10, threshold {}).",
                verdict.score, threshold
            )),
        )
    }

    async fn evaluate_file(
        &self,
        mut state: SessionState,
        text: &str,
        plan_path: &Path,
        cwd: Option<&Path>,
    ) -> GateOutcome {
        let now = (self.clock)();
        let session_id = state.session_id.clone();
        let max_rounds = self.config.max_rounds;

        state.identity_update(text, Some(plan_path), now);
        let round = state.round_count;
        info!("Round {}/{} for {}", round, max_rounds, plan_path.display());

        if round > max_rounds {
            warn!("Max rounds exceeded, handing over to the user");
            self.store.clear(&session_id);
            let last = state
                .last_score
                .map_or_else(|| "?".to_string(), |s| s.to_string());
            return GateOutcome::block(
                format!(
                    "Planman: Max evaluation rounds ({max_rounds}) reached. Last score was {last}/10. \
                     The plan has not met the quality threshold after multiple revisions. \
                     Please review and decide whether to proceed."
                ),
                None,
            );
        }

        if self.config.stress_test && round == 1 {
            self.mark_recent(&session_id, now);
            let prompt = self.config.stress_test_prompt.clone();
            state.record_feedback(None, Some(prompt.clone()), None);
            self.persist(&state);
            info!("Stress-test mode: first plan rejected without evaluation");
            return GateOutcome::block(
                prompt,
                Some(format!(
                    "Planman: Stress-test mode: first plan rejected for deep revision. Round 1/{max_rounds}."
                )),
            );
        }

        let previous_feedback = if round > 1 {
            state.last_feedback.as_deref()
        } else {
            None
        };
        let request = EvaluationRequest {
            plan_text: text,
            rubric: &self.config.rubric,
            previous_feedback,
            round,
            cwd,
        };
        let verdict = match self.evaluator.evaluate(request).await {
            Ok(verdict) => verdict,
            Err(e) => return self.on_evaluator_error(e),
        };

        if !verdict.is_plan {
            info!("Evaluator classified plan file as non-plan");
            return GateOutcome::pass();
        }

        self.mark_recent(&session_id, now);
        let threshold = self.config.threshold;

        if round == 1 {
            info!("First round: mandatory review ({}/10)", verdict.score);
            return self.reject(
                &mut state,
                &verdict,
                true,
                format!(
                    "Planman: First-round review ({}/10). Revision required. Round 1/{max_rounds}.",
                    verdict.score
                ),
            );
        }

        if verdict.score >= threshold {
            info!("Plan accepted: {}/10", verdict.score);
            self.store.clear(&session_id);
            return GateOutcome::pass_with(format!("Planman: {}", format_approval(&verdict)));
        }

        info!("Plan rejected: {}/{}", verdict.score, threshold);
        self.reject(
            &mut state,
            &verdict,
            false,
            format!(
                "Planman: Plan rejected ({}/10, threshold {threshold}). Round {round}/{max_rounds}.",
                verdict.score
            ),
        )
    }

    /// Record the feedback for the next round and block.
    fn reject(
        &self,
        state: &mut SessionState,
        verdict: &Verdict,
        first_round: bool,
        message: String,
    ) -> GateOutcome {
        let feedback = format_feedback(
            verdict,
            self.config.threshold,
            state.round_count,
            self.config.max_rounds,
            first_round,
        );
        state.record_feedback(
            Some(verdict.score),
            Some(feedback.clone()),
            Some(verdict.breakdown),
        );
        self.persist(state);
        GateOutcome::block(feedback, Some(message))
    }

    fn on_evaluator_error(&self, error: EvaluatorError) -> GateOutcome {
        warn!("Evaluation error: {}", error);
        match error {
            EvaluatorError::Unavailable { .. } => {
                GateOutcome::pass_with(format!("Planman: {error}. Plan review skipped."))
            }
            _ if self.config.fail_open => GateOutcome::pass_with(format!(
                "Planman: Evaluation failed ({error}). Passing through (fail-open)."
            )),
            _ => GateOutcome::block(
                format!(
                    "Planman evaluation failed: {error}. Set PLANMAN_FAIL_OPEN=true to pass through on errors."
                ),
                None,
            ),
        }
    }

    fn persist(&self, state: &SessionState) {
        if let Err(e) = self.store.save(state) {
            warn!("Failed to save session state: {}", e);
        }
    }

    fn mark_recent(&self, session_id: &str, now: f64) {
        if let Err(e) = self.markers.mark_recent(session_id, now) {
            warn!("Failed to write recent-evaluation marker: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Failing(fn() -> EvaluatorError);

    #[async_trait]
    impl Evaluator for Failing {
        async fn evaluate(&self, _: EvaluationRequest<'_>) -> Result<Verdict, EvaluatorError> {
            Err((self.0)())
        }
    }

    fn gate(tmp: &TempDir, config: Config, error: fn() -> EvaluatorError) -> EvaluationGate {
        EvaluationGate::new(
            config,
            Arc::new(FileSessionStore::new(tmp.path())),
            Arc::new(Failing(error)),
            MarkerStore::new(tmp.path()),
        )
    }

    #[tokio::test]
    async fn test_blank_text_skips() {
        let tmp = TempDir::new().unwrap();
        let gate = gate(&tmp, Config::default(), || EvaluatorError::Timeout { secs: 1 });
        assert_eq!(gate.evaluate("  \n\t", "s1", None, None).await, GateOutcome::Skip);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_passes_even_when_fail_closed() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            fail_open: false,
            ..Config::default()
        };
        let gate = gate(&tmp, config, || EvaluatorError::Unavailable {
            path: "codex".into(),
        });
        let outcome = gate.evaluate("# Plan", "s1", None, None).await;
        assert!(outcome.is_pass());
        assert!(outcome.message().unwrap().contains("Plan review skipped"));
    }

    #[tokio::test]
    async fn test_fail_closed_names_the_override() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            fail_open: false,
            ..Config::default()
        };
        let gate = gate(&tmp, config, || EvaluatorError::Timeout { secs: 90 });
        let outcome = gate.evaluate("# Plan", "s1", None, None).await;
        assert!(outcome.is_block());
        assert!(outcome.reason().unwrap().contains("PLANMAN_FAIL_OPEN=true"));
    }

    #[tokio::test]
    async fn test_fail_open_reports_the_error() {
        let tmp = TempDir::new().unwrap();
        let gate = gate(&tmp, Config::default(), || {
            EvaluatorError::Output("codex returned empty output".into())
        });
        let outcome = gate.evaluate("# Plan", "s1", None, None).await;
        assert_eq!(
            outcome.message(),
            Some("Planman: Evaluation failed (codex returned empty output). Passing through (fail-open).")
        );
    }
}
