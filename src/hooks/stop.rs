// Stop: catch plans presented inline, outside plan mode

use tracing::debug;

use crate::planning::{detector, EvaluationGate};
use crate::session::unix_now;

use super::transcript::last_assistant_text;
use super::{HookInput, HookOutput};

pub async fn handle(input: &HookInput, gate: &EvaluationGate) -> HookOutput {
    if input.stop_hook_active() {
        return HookOutput::Allow;
    }
    let config = gate.config();
    if !config.enabled {
        debug!("Disabled via config");
        return HookOutput::Allow;
    }
    if !gate.evaluator().is_available() {
        debug!("Evaluator not installed, passing through");
        return HookOutput::Allow;
    }

    let session_id = input.session_id();
    if gate.markers().recently_evaluated(session_id, unix_now()) {
        debug!("Plan file evaluated moments ago, skipping");
        return HookOutput::Allow;
    }

    let Some(text) = assistant_text(input) else {
        debug!("No assistant text found");
        return HookOutput::Allow;
    };

    if config.heuristic_prefilter {
        let score = detector::score(&text, input.plan_mode());
        if !score.is_plan() {
            debug!("Classifier score {} below threshold, not evaluating", score.total);
            return HookOutput::Allow;
        }
    }

    gate.evaluate(&text, session_id, None, input.cwd()).await.into()
}

/// `last_assistant_message`, falling back to the transcript.
fn assistant_text(input: &HookInput) -> Option<String> {
    if let Some(text) = input
        .last_assistant_message
        .as_ref()
        .filter(|t| !t.trim().is_empty())
    {
        return Some(text.clone());
    }
    let path = input.transcript_path.as_deref()?;
    debug!("Reading assistant text from transcript {}", path.display());
    last_assistant_text(path).filter(|t| !t.trim().is_empty())
}
