// `codex exec` subprocess evaluator

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::constants::{
    MAX_PLAN_TEXT_BYTES, MAX_PROJECT_CONTEXT_BYTES, MAX_PROMPT_BYTES, MAX_TIMEOUT_SECS,
};
use crate::config::Config;
use crate::context::collect_project_context;
use crate::planning::types::Verdict;
use crate::session::write_atomic;

use super::availability::CommandAvailability;
use super::parse::parse_verdict;
use super::prompt::{build_prompt, PromptOptions};
use super::{EvaluationRequest, Evaluator, EvaluatorError};

/// JSON schema handed to `codex exec --output-schema`.
pub const EVALUATION_SCHEMA: &str = include_str!("evaluation_schema.json");

const SCHEMA_FILE_NAME: &str = "planman-evaluation-schema.json";

/// Extra seconds granted per started block of prompt bytes.
const TIMEOUT_STEP_BYTES: usize = 20_000;
const TIMEOUT_STEP_SECS: u64 = 15;

/// Stderr is cut to this many characters in error messages.
const MAX_STDERR_CHARS: usize = 1000;

/// Base timeout scaled up for large prompts, capped at the global ceiling.
pub fn effective_timeout(base_secs: u64, prompt_bytes: usize) -> u64 {
    let steps = (prompt_bytes / TIMEOUT_STEP_BYTES) as u64;
    base_secs
        .saturating_add(steps.saturating_mul(TIMEOUT_STEP_SECS))
        .clamp(1, MAX_TIMEOUT_SECS)
}

/// Runs `codex exec` with a read-only sandbox and structured output
#[derive(Debug)]
pub struct CodexEvaluator {
    codex_path: String,
    model: String,
    timeout_secs: u64,
    verify_sources: bool,
    project_context: bool,
    verbose: bool,
    schema_dir: PathBuf,
    availability: CommandAvailability,
}

impl CodexEvaluator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            codex_path: config.codex_path.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            verify_sources: config.verify_sources,
            project_context: config.project_context,
            verbose: config.verbose,
            schema_dir: config.state_dir(),
            availability: CommandAvailability::new(config.codex_path.clone()),
        }
    }

    pub fn availability(&self) -> &CommandAvailability {
        &self.availability
    }

    /// Write the embedded schema next to the session state, once per content.
    fn schema_path(&self) -> Result<PathBuf, EvaluatorError> {
        let path = self.schema_dir.join(SCHEMA_FILE_NAME);
        let current = std::fs::read_to_string(&path).ok();
        if current.as_deref() != Some(EVALUATION_SCHEMA) {
            write_atomic(&path, EVALUATION_SCHEMA.as_bytes()).map_err(EvaluatorError::Spawn)?;
            debug!("Wrote evaluation schema to {}", path.display());
        }
        Ok(path)
    }

    fn command(&self, prompt: &str, schema: &Path, cwd: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.codex_path);
        cmd.arg("exec")
            .arg(prompt)
            .arg("--output-schema")
            .arg(schema)
            .args(["--sandbox", "read-only", "--skip-git-repo-check"]);
        if !self.model.is_empty() {
            cmd.args(["-m", self.model.as_str()]);
        }
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Evaluator for CodexEvaluator {
    async fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<Verdict, EvaluatorError> {
        if request.plan_text.len() > MAX_PLAN_TEXT_BYTES {
            return Err(EvaluatorError::OversizedInput {
                what: "plan text",
                size: request.plan_text.len(),
                limit: MAX_PLAN_TEXT_BYTES,
            });
        }

        if !self.availability.is_available() {
            return Err(EvaluatorError::Unavailable {
                path: self.codex_path.clone(),
            });
        }

        let context = match (self.project_context, request.cwd) {
            (true, Some(cwd)) => collect_project_context(cwd, MAX_PROJECT_CONTEXT_BYTES),
            _ => None,
        };
        let options = PromptOptions {
            verify_sources: self.verify_sources,
            project_context: context.as_deref(),
        };
        let prompt = build_prompt(&request, &options);
        if prompt.len() > MAX_PROMPT_BYTES {
            return Err(EvaluatorError::OversizedInput {
                what: "evaluation prompt",
                size: prompt.len(),
                limit: MAX_PROMPT_BYTES,
            });
        }

        let schema = self.schema_path()?;
        let timeout_secs = effective_timeout(self.timeout_secs, prompt.len());

        info!(
            "Running {} (round {}, {} prompt bytes, timeout {}s)",
            self.codex_path,
            request.round,
            prompt.len(),
            timeout_secs
        );

        let child = self
            .command(&prompt, &schema, request.cwd)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.availability.reset();
                    EvaluatorError::Unavailable {
                        path: self.codex_path.clone(),
                    }
                } else {
                    EvaluatorError::Spawn(e)
                }
            })?;

        // Dropping the wait future on timeout kills the child (kill_on_drop).
        let output = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| EvaluatorError::Timeout { secs: timeout_secs })?
        .map_err(EvaluatorError::Spawn)?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if self.verbose {
            debug!("codex exit status: {}", output.status);
            if !stderr.trim().is_empty() {
                debug!("codex stderr: {}", truncate_chars(&stderr, 2 * MAX_STDERR_CHARS));
            }
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!("codex exited with {}", code);
            return Err(EvaluatorError::Process {
                code,
                stderr: truncate_chars(stderr.trim(), MAX_STDERR_CHARS),
            });
        }

        parse_verdict(&String::from_utf8_lossy(&output.stdout))
    }

    fn is_available(&self) -> bool {
        self.availability.is_available()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
