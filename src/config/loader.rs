// Configuration loader
// Layers: defaults < ~/.planman/config.toml < <cwd>/.claude/planman.json < PLANMAN_* env vars

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::settings::Config;

/// Environment variables and the config keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("PLANMAN_THRESHOLD", "threshold"),
    ("PLANMAN_MAX_ROUNDS", "max_rounds"),
    ("PLANMAN_MODEL", "model"),
    ("PLANMAN_FAIL_OPEN", "fail_open"),
    ("PLANMAN_ENABLED", "enabled"),
    ("PLANMAN_RUBRIC", "custom_rubric"),
    ("PLANMAN_CODEX_PATH", "codex_path"),
    ("PLANMAN_VERBOSE", "verbose"),
    ("PLANMAN_TIMEOUT", "timeout"),
    ("PLANMAN_STRESS_TEST", "stress_test"),
    ("PLANMAN_STRESS_TEST_PROMPT", "stress_test_prompt"),
    ("PLANMAN_VERIFY_SOURCES", "verify_sources"),
    ("PLANMAN_PROJECT_CONTEXT", "project_context"),
    ("PLANMAN_HEURISTIC_PREFILTER", "heuristic_prefilter"),
    ("PLANMAN_STATE_DIR", "state_dir"),
];

/// Load configuration for a hook running against the project at `cwd`.
///
/// Never fails: unreadable or malformed layers are skipped.
pub fn load_config(cwd: Option<&Path>) -> Config {
    let user_file = user_config_path();
    load_config_with(cwd, user_file.as_deref(), |key| std::env::var(key).ok())
}

/// Load configuration with an explicit user file and environment lookup.
pub fn load_config_with<F>(cwd: Option<&Path>, user_file: Option<&Path>, env: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::default();

    if let Some(layer) = user_file.and_then(read_toml_layer) {
        config.apply_layer(&layer);
    }

    let project_file = match cwd {
        Some(dir) => dir.join(".claude").join("planman.json"),
        None => PathBuf::from(".claude").join("planman.json"),
    };
    if let Some(layer) = read_json_layer(&project_file) {
        config.apply_layer(&layer);
    }

    config.apply_layer(&env_layer(env));
    config
}

/// `~/.planman/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".planman").join("config.toml"))
}

fn read_toml_layer(path: &Path) -> Option<Map<String, Value>> {
    let contents = fs::read_to_string(path).ok()?;
    let parsed: toml::Value = match toml::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            debug!("Ignoring malformed {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::to_value(parsed) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn read_json_layer(path: &Path) -> Option<Map<String, Value>> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            debug!("Ignoring {}: not a JSON object", path.display());
            None
        }
        Err(e) => {
            debug!("Ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}

fn env_layer<F>(env: F) -> Map<String, Value>
where
    F: Fn(&str) -> Option<String>,
{
    ENV_OVERRIDES
        .iter()
        .filter_map(|(var, key)| env(var).map(|v| (key.to_string(), Value::String(v))))
        .collect()
}
