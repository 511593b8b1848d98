// External plan evaluator
//
// The gate only sees the `Evaluator` trait. `CodexEvaluator` is the production
// implementation that shells out to `codex exec` with a JSON output schema.

mod availability;
mod codex;
mod parse;
mod prompt;

pub use availability::CommandAvailability;
pub use codex::{effective_timeout, CodexEvaluator, EVALUATION_SCHEMA};
pub use parse::parse_verdict;
pub use prompt::{build_prompt, PromptOptions};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::planning::types::Verdict;

/// One evaluation round
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub plan_text: &'a str,
    pub rubric: &'a str,
    /// Feedback from the previous round, when this is a revision
    pub previous_feedback: Option<&'a str>,
    pub round: u32,
    /// Working directory of the agent session
    pub cwd: Option<&'a Path>,
}

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("codex CLI not found at '{path}'. Install: npm install -g @openai/codex, or set PLANMAN_CODEX_PATH")]
    Unavailable { path: String },

    #[error("codex timed out ({secs}s). Increase: PLANMAN_TIMEOUT={}", .secs + 30)]
    Timeout { secs: u64 },

    #[error("codex exec failed (exit {code}): {stderr}")]
    Process { code: i32, stderr: String },

    #[error("{0}")]
    Output(String),

    #[error("{what} is {size} bytes (limit {limit}). Split the plan into smaller parts or trim it")]
    OversizedInput {
        what: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("failed to run codex: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Judges plan text against a rubric
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Run exactly one evaluation. No retries.
    async fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<Verdict, EvaluatorError>;

    /// Cheap check that the evaluator can run at all.
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let timeout = EvaluatorError::Timeout { secs: 90 };
        assert_eq!(
            timeout.to_string(),
            "codex timed out (90s). Increase: PLANMAN_TIMEOUT=120"
        );

        let process = EvaluatorError::Process {
            code: 2,
            stderr: "bad flag".into(),
        };
        assert_eq!(process.to_string(), "codex exec failed (exit 2): bad flag");

        let oversized = EvaluatorError::OversizedInput {
            what: "plan text",
            size: 200_000,
            limit: 100_000,
        };
        assert!(oversized.to_string().contains("Split the plan"));
    }
}
