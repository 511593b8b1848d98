// PreToolUse(ExitPlanMode): evaluate the plan file before plan mode ends

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::config::constants::MAX_PLAN_FILE_BYTES;
use crate::planning::EvaluationGate;
use crate::session::{unix_now, MarkerStore};

use super::{HookInput, HookOutput};

pub async fn handle(input: &HookInput, gate: &EvaluationGate) -> HookOutput {
    if !gate.config().enabled {
        debug!("Disabled via config");
        return HookOutput::Allow;
    }
    if !gate.evaluator().is_available() {
        info!("Evaluator not installed, passing through");
        return HookOutput::Allow;
    }

    let session_id = input.session_id();
    let cwd = input.cwd();
    let Some((path, text)) = find_plan_file(gate.markers(), session_id, cwd, unix_now()) else {
        debug!("No plan file found for session {}", session_id);
        return HookOutput::Allow;
    };

    info!("Evaluating plan file {}", path.display());
    gate.evaluate(&text, session_id, Some(&path), cwd).await.into()
}

/// Locate the plan to evaluate and read it.
///
/// A fresh ownership marker wins; otherwise the newest `*.md` under
/// `<cwd>/.claude/plans`. Oversized or blank files are skipped.
pub fn find_plan_file(
    markers: &MarkerStore,
    session_id: &str,
    cwd: Option<&Path>,
    now: f64,
) -> Option<(PathBuf, String)> {
    if let Some(path) = markers.ownership(session_id, now) {
        if let Some(text) = read_plan(&path) {
            return Some((path, text));
        }
    }

    let plans_dir = cwd?.join(".claude").join("plans");
    let latest = newest_markdown(&plans_dir)?;
    let text = read_plan(&latest)?;
    Some((latest, text))
}

fn newest_markdown(dir: &Path) -> Option<PathBuf> {
    let pattern = format!("{}/*.md", glob::Pattern::escape(&dir.to_string_lossy()));
    glob::glob(&pattern)
        .ok()?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .max_by_key(|p| {
            std::fs::metadata(p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH)
        })
}

fn read_plan(path: &Path) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    if meta.len() > MAX_PLAN_FILE_BYTES {
        info!(
            "Plan file {} is {} bytes, skipping",
            path.display(),
            meta.len()
        );
        return None;
    }
    let text = std::fs::read_to_string(path).ok()?;
    (!text.trim().is_empty()).then_some(text)
}
