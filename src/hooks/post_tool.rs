// PostToolUse: remember which plan file the agent just wrote

use std::path::Path;
use tracing::{debug, warn};

use crate::session::MarkerStore;

use super::{HookInput, HookOutput};

/// Writes the ownership marker for plan files. Never blocks.
pub fn handle(input: &HookInput, markers: &MarkerStore, now: f64) -> HookOutput {
    if input.tool_name.as_deref() != Some("Write") {
        return HookOutput::Allow;
    }
    let Some(file_path) = input.tool_file_path() else {
        return HookOutput::Allow;
    };
    if !is_plan_file_path(file_path) {
        return HookOutput::Allow;
    }

    match markers.write_ownership(input.session_id(), Path::new(file_path), now) {
        Ok(()) => debug!("Tracking plan file {}", file_path),
        Err(e) => warn!("Failed to write plan marker: {}", e),
    }
    HookOutput::Allow
}

/// A file somewhere below a `.claude` segment immediately followed by `plans`.
///
/// Case-insensitive; accepts `/` and `\` separators.
pub fn is_plan_file_path(path: &str) -> bool {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();
    segments.windows(3).any(|w| {
        w[0].eq_ignore_ascii_case(".claude") && w[1].eq_ignore_ascii_case("plans")
    })
}
