// Validation of the evaluator's JSON verdict

use serde_json::{Map, Value};
use tracing::debug;

use super::EvaluatorError;
use crate::planning::types::{Breakdown, Verdict};

const REQUIRED_FIELDS: [&str; 6] = [
    "score",
    "breakdown",
    "weaknesses",
    "suggestions",
    "strengths",
    "is_plan",
];

/// Parse and validate the evaluator's stdout into a [`Verdict`].
///
/// Every range and consistency rule is enforced here; a verdict that gets
/// through is safe to act on.
pub fn parse_verdict(stdout: &str) -> Result<Verdict, EvaluatorError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(invalid("codex returned empty output"));
    }

    let value = serde_json::from_str::<Value>(trimmed)
        .or_else(|e| embedded_object(trimmed).ok_or(e))
        .map_err(|e| {
            debug!("Unparseable codex output ({}): {}", e, trimmed);
            invalid("codex returned malformed output. Set PLANMAN_VERBOSE=true for details.")
        })?;

    let Value::Object(data) = value else {
        return Err(invalid("codex output is not a JSON object"));
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|key| !data.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(format!(
            "codex output missing fields: {}",
            missing.join(", ")
        )));
    }

    let score = bounded_int(&data["score"], 1, 10).ok_or_else(|| {
        invalid(format!(
            "invalid score: {} (must be integer 1-10)",
            data["score"]
        ))
    })?;

    let breakdown = parse_breakdown(&data["breakdown"])?;

    let is_plan = data["is_plan"].as_bool().ok_or_else(|| {
        invalid(format!(
            "invalid is_plan: {} (must be boolean)",
            data["is_plan"]
        ))
    })?;

    let weaknesses = string_list(&data, "weaknesses")?;
    let suggestions = string_list(&data, "suggestions")?;
    let strengths = string_list(&data, "strengths")?;

    // Non-plan verdicts only carry the classification.
    if is_plan {
        let total = breakdown.total();
        if u32::from(score) != total {
            return Err(invalid(format!(
                "inconsistent score: {score} but breakdown sums to {total}"
            )));
        }
        if strengths.is_empty() {
            return Err(invalid("codex output has no strengths"));
        }
        if weaknesses.is_empty() && score < 10 {
            return Err(invalid(format!(
                "codex output lists no weaknesses for a score of {score}/10"
            )));
        }
    }

    Ok(Verdict {
        score,
        breakdown,
        weaknesses,
        suggestions,
        strengths,
        is_plan,
    })
}

fn invalid(message: impl Into<String>) -> EvaluatorError {
    EvaluatorError::Output(message.into())
}

/// Some codex versions wrap the final message in prose or a code fence.
fn embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn bounded_int(value: &Value, min: u64, max: u64) -> Option<u8> {
    let n = value.as_u64()?;
    if (min..=max).contains(&n) {
        u8::try_from(n).ok()
    } else {
        None
    }
}

fn parse_breakdown(value: &Value) -> Result<Breakdown, EvaluatorError> {
    let Some(map) = value.as_object() else {
        return Err(invalid("invalid breakdown: must be an object"));
    };

    let mut scores = [0u8; 5];
    for (slot, key) in scores.iter_mut().zip(Breakdown::KEYS) {
        let raw = map.get(key).unwrap_or(&Value::Null);
        *slot = bounded_int(raw, 0, 2).ok_or_else(|| {
            invalid(format!(
                "invalid breakdown.{key}: {raw} (must be integer 0-2)"
            ))
        })?;
    }

    let [completeness, correctness, sequencing, risk_awareness, clarity] = scores;
    Ok(Breakdown {
        completeness,
        correctness,
        sequencing,
        risk_awareness,
        clarity,
    })
}

fn string_list(data: &Map<String, Value>, field: &str) -> Result<Vec<String>, EvaluatorError> {
    let err = || invalid(format!("invalid {field}: must be a list of strings"));
    data[field]
        .as_array()
        .ok_or_else(err)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(err))
        .collect()
}
