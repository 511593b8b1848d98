// Last assistant message from a JSONL session transcript

use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::constants::MAX_TRANSCRIPT_BYTES;

/// Text of the last assistant entry in the transcript, if any.
///
/// Entries carry `role`/`content` either at the top level or nested under
/// `message`. Content is a string or a list of blocks, of which only text
/// blocks count. Oversized or unreadable transcripts yield `None`.
pub fn last_assistant_text(path: &Path) -> Option<String> {
    let size = std::fs::metadata(path).ok()?.len();
    if size > MAX_TRANSCRIPT_BYTES {
        warn!(
            "Transcript {} is {} bytes, not scanning",
            path.display(),
            size
        );
        return None;
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open transcript {}: {}", path.display(), e);
            return None;
        }
    };

    let mut last = None;
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if let Some(text) = assistant_text(&entry) {
            last = Some(text);
        }
    }
    last
}

fn assistant_text(entry: &Value) -> Option<String> {
    let message = if entry.get("role").is_some() {
        entry
    } else {
        entry.get("message")?
    };
    if message.get("role")?.as_str()? != "assistant" {
        return None;
    }

    match message.get("content")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(text) => Some(text.as_str()),
                    Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("text") => {
                        obj.get("text").and_then(Value::as_str)
                    }
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        _ => None,
    }
}
