// Project-wide constants
//
// Centralised here so limits, file names and default prompts have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Built-in scoring rubric sent to the evaluator when no custom rubric is set.
pub const DEFAULT_RUBRIC: &str = include_str!("default_rubric.md");

/// Feedback returned on round 1 when stress-test mode is enabled.
pub const DEFAULT_STRESS_TEST_PROMPT: &str = include_str!("stress_test_prompt.md");

/// Default evaluator binary (resolved through PATH).
pub const DEFAULT_CODEX_PATH: &str = "codex";

/// Default minimum score a plan needs once past the first round.
pub const DEFAULT_THRESHOLD: u8 = 7;

/// Default number of evaluation rounds before a human has to step in.
pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Default evaluator timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Hard ceiling for the evaluator timeout, including prompt-size scaling.
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// A session idle for longer than this is a new planning context.
pub const STALE_SESSION_SECS: f64 = 1800.0;

/// Ownership markers older than this no longer identify the current plan file.
pub const OWNERSHIP_MARKER_TTL_SECS: f64 = 2.0 * 60.0 * 60.0;

/// How far in the future a marker timestamp may be before it is rejected.
pub const CLOCK_SKEW_TOLERANCE_SECS: f64 = 60.0;

/// Window in which the inline hook defers to a file-based evaluation.
pub const RECENT_EVALUATION_TTL_SECS: f64 = 60.0;

/// Plan files larger than this are ignored by the file-based hook.
pub const MAX_PLAN_FILE_BYTES: u64 = 1_000_000;

/// Plan text larger than this is rejected before the evaluator is spawned.
pub const MAX_PLAN_TEXT_BYTES: usize = 100_000;

/// Composed prompts larger than this are rejected before the evaluator is spawned.
///
/// The prompt travels as a single argv entry; Linux caps one argument at 128 KiB.
pub const MAX_PROMPT_BYTES: usize = 120_000;

/// Transcripts larger than this are not scanned for the last assistant message.
pub const MAX_TRANSCRIPT_BYTES: u64 = 50 * 1024 * 1024;

/// Upper bound on project context (CLAUDE.md / README.md) attached to the prompt.
pub const MAX_PROJECT_CONTEXT_BYTES: usize = 8_000;

/// Prefix shared by every file planman writes into the state directory.
pub const STATE_FILE_PREFIX: &str = "planman-";
