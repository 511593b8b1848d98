// Configuration structs

use serde_json::{Map, Value};
use std::path::PathBuf;

use super::constants::{
    DEFAULT_CODEX_PATH, DEFAULT_MAX_ROUNDS, DEFAULT_RUBRIC, DEFAULT_STRESS_TEST_PROMPT,
    DEFAULT_THRESHOLD, DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Minimum score (0-10) a plan needs from round 2 onwards
    pub threshold: u8,

    /// Rounds allowed before the cycle stops and a human has to decide (1-100)
    pub max_rounds: u32,

    /// Model passed to the evaluator with `-m` (empty = evaluator default)
    pub model: String,

    /// Pass plans through when the evaluator fails instead of blocking them
    pub fail_open: bool,

    /// Master switch for every hook
    pub enabled: bool,

    /// Scoring rubric sent to the evaluator
    pub rubric: String,

    /// Evaluator binary, bare name or absolute path
    pub codex_path: String,

    /// Debug logging to stderr and `.claude/planman.log`
    pub verbose: bool,

    /// Base evaluator timeout in seconds (1-600)
    pub timeout_secs: u64,

    /// Reject every new plan on round 1 with `stress_test_prompt`, without evaluating it
    pub stress_test: bool,

    /// Feedback returned on round 1 in stress-test mode
    pub stress_test_prompt: String,

    /// Ask the evaluator to open the files a plan references and check its claims
    pub verify_sources: bool,

    /// Attach CLAUDE.md / README.md context from the project to the prompt
    pub project_context: bool,

    /// Let the local plan classifier veto inline evaluations of obvious chatter
    pub heuristic_prefilter: bool,

    /// Directory holding session state and markers (default: system temp dir)
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_rounds: DEFAULT_MAX_ROUNDS,
            model: String::new(),
            fail_open: true,
            enabled: true,
            rubric: DEFAULT_RUBRIC.trim().to_string(),
            codex_path: DEFAULT_CODEX_PATH.to_string(),
            verbose: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            stress_test: false,
            stress_test_prompt: DEFAULT_STRESS_TEST_PROMPT.trim().to_string(),
            verify_sources: false,
            project_context: false,
            heuristic_prefilter: false,
            state_dir: None,
        }
    }
}

impl Config {
    /// Directory where session state and markers live.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Merge one configuration layer on top of this one.
    ///
    /// Unknown keys are ignored. Malformed values fall back to the built-in
    /// default for that key, out-of-range numbers are clamped.
    pub fn apply_layer(&mut self, layer: &Map<String, Value>) {
        let defaults = Config::default();

        for (key, value) in layer {
            match key.as_str() {
                "threshold" => {
                    let v = coerce_int(value, i64::from(defaults.threshold));
                    self.threshold = v.clamp(0, 10) as u8;
                }
                "max_rounds" => {
                    let v = coerce_int(value, i64::from(defaults.max_rounds));
                    self.max_rounds = v.clamp(1, 100) as u32;
                }
                "timeout" | "timeout_secs" => {
                    let v = coerce_int(value, defaults.timeout_secs as i64);
                    self.timeout_secs = v.clamp(1, MAX_TIMEOUT_SECS as i64) as u64;
                }
                "model" => self.model = coerce_string(value),
                "fail_open" => self.fail_open = coerce_bool(value, defaults.fail_open),
                "enabled" => self.enabled = coerce_bool(value, defaults.enabled),
                "verbose" => self.verbose = coerce_bool(value, defaults.verbose),
                "stress_test" => self.stress_test = coerce_bool(value, defaults.stress_test),
                "verify_sources" => {
                    self.verify_sources = coerce_bool(value, defaults.verify_sources)
                }
                "project_context" => {
                    self.project_context = coerce_bool(value, defaults.project_context)
                }
                "heuristic_prefilter" => {
                    self.heuristic_prefilter = coerce_bool(value, defaults.heuristic_prefilter)
                }
                "rubric" | "custom_rubric" => {
                    let rubric = coerce_string(value);
                    self.rubric = if rubric.trim().is_empty() {
                        defaults.rubric.clone()
                    } else {
                        rubric
                    };
                }
                "stress_test_prompt" => {
                    let prompt = coerce_string(value);
                    self.stress_test_prompt = if prompt.trim().is_empty() {
                        defaults.stress_test_prompt.clone()
                    } else {
                        prompt
                    };
                }
                "codex_path" => self.codex_path = validate_codex_path(&coerce_string(value)),
                "state_dir" => {
                    let dir = coerce_string(value);
                    self.state_dir = if dir.trim().is_empty() {
                        None
                    } else {
                        Some(PathBuf::from(dir))
                    };
                }
                _ => {}
            }
        }
    }
}

/// Coerce a config value to bool; unrecognised input yields `default`.
pub(crate) fn coerce_bool(value: &Value, default: bool) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64() {
            Some(1) => true,
            Some(0) => false,
            _ => default,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => default,
        },
        _ => default,
    }
}

/// Coerce a config value to an integer; unparseable input yields `default`.
pub(crate) fn coerce_int(value: &Value, default: i64) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(default),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(default),
        _ => default,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Paths containing `..` fall back to the default binary.
fn validate_codex_path(path: &str) -> String {
    if path.contains("..") || path.trim().is_empty() {
        DEFAULT_CODEX_PATH.to_string()
    } else {
        path.to_string()
    }
}
