// Hook protocol: JSON on stdin, an optional JSON decision on stdout
//
// Every adapter degrades to "allow" on any failure. The host must never be
// blocked because planman itself broke.

pub mod post_tool;
pub mod pre_exit_plan;
pub mod stop;
pub mod transcript;

use futures::FutureExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::config::load_config;
use crate::planning::{EvaluationGate, GateOutcome};
use crate::session::unix_now;

/// Which interception point invoked the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// A tool finished; records which plan file was written
    PostToolUse,
    /// The agent is about to leave plan mode; evaluates the plan file
    PreExitPlan,
    /// The agent's turn ended; evaluates an inline plan
    Stop,
}

/// Hook payload. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
    #[serde(default)]
    pub last_assistant_message: Option<String>,
    #[serde(default)]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub stop_hook_active: Option<Value>,
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
}

impl HookInput {
    /// Parse stdin. Blank or malformed input is treated as an empty payload.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(input) => input,
            Err(e) => {
                warn!("Malformed hook input: {}", e);
                Self::default()
            }
        }
    }

    pub fn session_id(&self) -> &str {
        self.session_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("default")
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref().filter(|p| !p.as_os_str().is_empty())
    }

    /// Another stop hook already blocked this turn.
    pub fn stop_hook_active(&self) -> bool {
        match &self.stop_hook_active {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn plan_mode(&self) -> bool {
        self.permission_mode.as_deref() == Some("plan")
    }

    /// `tool_input.file_path`, when present and a string.
    pub fn tool_file_path(&self) -> Option<&str> {
        self.tool_input
            .as_ref()?
            .get("file_path")?
            .as_str()
            .filter(|s| !s.is_empty())
    }
}

/// Decision written back to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutput {
    /// Proceed, print nothing
    Allow,
    /// Proceed and show a note to the user
    AllowWithMessage(String),
    Block {
        reason: String,
        system_message: Option<String>,
    },
}

impl HookOutput {
    /// ASCII-only JSON for stdout, or `None` when nothing should be printed.
    pub fn to_json(&self) -> Option<String> {
        let value = match self {
            HookOutput::Allow => return None,
            HookOutput::AllowWithMessage(message) => json!({ "systemMessage": message }),
            HookOutput::Block {
                reason,
                system_message,
            } => {
                let mut value = json!({ "decision": "block", "reason": reason });
                if let Some(message) = system_message {
                    value["systemMessage"] = json!(message);
                }
                value
            }
        };
        Some(escape_non_ascii(&value.to_string()))
    }

    pub fn is_block(&self) -> bool {
        matches!(self, HookOutput::Block { .. })
    }
}

impl From<GateOutcome> for HookOutput {
    fn from(outcome: GateOutcome) -> Self {
        match outcome {
            GateOutcome::Skip | GateOutcome::Pass { message: None } => HookOutput::Allow,
            GateOutcome::Pass {
                message: Some(message),
            } => HookOutput::AllowWithMessage(message),
            GateOutcome::Block { reason, message } => HookOutput::Block {
                reason,
                system_message: message,
            },
        }
    }
}

/// Replace every non-ASCII character with its `\uXXXX` escape.
///
/// Only valid on serialized JSON, where such characters can only occur inside
/// string literals.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Run a hook future, turning a panic into [`HookOutput::Allow`].
pub async fn run_guarded<F>(hook: F) -> HookOutput
where
    F: Future<Output = HookOutput>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(output) => output,
        Err(_) => {
            error!("Hook panicked, allowing");
            HookOutput::Allow
        }
    }
}

/// Entry point for `planman hook <event>`: parse stdin, load config, dispatch.
pub async fn run_hook(event: HookEvent, raw: &str) -> HookOutput {
    let input = HookInput::parse(raw);
    let config = load_config(input.cwd());
    crate::logging::init(&config, input.cwd());
    debug!(
        "{:?} hook for session {} ({:?})",
        event,
        input.session_id(),
        input.hook_event_name
    );

    let gate = EvaluationGate::from_config(config);
    match event {
        HookEvent::PostToolUse => post_tool::handle(&input, gate.markers(), unix_now()),
        HookEvent::PreExitPlan => pre_exit_plan::handle(&input, &gate).await,
        HookEvent::Stop => stop::handle(&input, &gate).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(HookInput::parse("").session_id(), "default");
        assert_eq!(HookInput::parse("{oops").session_id(), "default");
        let input = HookInput::parse(
            r#"{"session_id":"abc","cwd":"/tmp/p","stop_hook_active":true,
               "tool_input":{"file_path":"/x/.claude/plans/a.md"},"extra":1}"#,
        );
        assert_eq!(input.session_id(), "abc");
        assert_eq!(input.cwd(), Some(Path::new("/tmp/p")));
        assert!(input.stop_hook_active());
        assert_eq!(input.tool_file_path(), Some("/x/.claude/plans/a.md"));
    }

    #[test]
    fn test_odd_field_types_do_not_break_parsing() {
        let input = HookInput::parse(r#"{"tool_input":"text","stop_hook_active":"yes"}"#);
        assert_eq!(input.tool_file_path(), None);
        assert!(!input.stop_hook_active());
    }

    #[test]
    fn test_output_json() {
        assert_eq!(HookOutput::Allow.to_json(), None);
        assert_eq!(
            HookOutput::AllowWithMessage("ok".into()).to_json().unwrap(),
            r#"{"systemMessage":"ok"}"#
        );
        let block = HookOutput::Block {
            reason: "fix".into(),
            system_message: None,
        };
        let value: Value = serde_json::from_str(&block.to_json().unwrap()).unwrap();
        assert_eq!(value["decision"], "block");
        assert_eq!(value["reason"], "fix");
        assert!(value.get("systemMessage").is_none());
    }

    #[test]
    fn test_output_is_ascii() {
        let out = HookOutput::AllowWithMessage("scored — 7/10 🎉".into())
            .to_json()
            .unwrap();
        assert!(out.is_ascii());
        assert!(out.contains("\\u2014"));
        assert!(out.contains("\\ud83c\\udf89"));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["systemMessage"], "scored — 7/10 🎉");
    }

    #[test]
    fn test_gate_outcome_conversion() {
        assert_eq!(HookOutput::from(GateOutcome::Skip), HookOutput::Allow);
        assert_eq!(HookOutput::from(GateOutcome::pass()), HookOutput::Allow);
        assert!(HookOutput::from(GateOutcome::block("r", None)).is_block());
    }

    #[tokio::test]
    async fn test_run_guarded_catches_panics() {
        let output = run_guarded(async {
            if true {
                panic!("boom");
            }
            HookOutput::Block {
                reason: String::new(),
                system_message: None,
            }
        })
        .await;
        assert_eq!(output, HookOutput::Allow);
    }
}
