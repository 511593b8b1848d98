// Feedback text the agent sees when a plan is blocked or approved

use super::types::Verdict;

/// Format a verdict into revision feedback for the agent.
pub fn format_feedback(
    verdict: &Verdict,
    threshold: u8,
    round: u32,
    max_rounds: u32,
    first_round: bool,
) -> String {
    let mut lines = Vec::new();

    if first_round {
        lines.push(format!(
            "**First-round review** — your plan scored **{}/10**. Round 1/{}.",
            verdict.score, max_rounds
        ));
    } else {
        lines.push(format!(
            "Your plan scored **{}/10** (needs {}). Round {}/{}.",
            verdict.score, threshold, round, max_rounds
        ));
    }

    lines.push(String::new());
    let breakdown = verdict
        .breakdown
        .entries()
        .iter()
        .map(|(name, value)| format!("{name}={value}/2"))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("**Breakdown**: {breakdown}"));

    push_section(&mut lines, "**Strengths:**", &verdict.strengths);
    push_section(&mut lines, "**Issues:**", &verdict.weaknesses);
    push_section(&mut lines, "**Suggestions:**", &verdict.suggestions);

    lines.push(String::new());
    if first_round {
        lines.push("Revise your plan and resubmit.".to_string());
    } else {
        lines.push("Revise your plan addressing these issues.".to_string());
    }

    lines.join("\n")
}

/// Format the approval note shown once a plan passes.
pub fn format_approval(verdict: &Verdict) -> String {
    let mut lines = vec![format!("Plan approved (score: {}/10).", verdict.score)];
    push_section(
        &mut lines,
        "**Strengths:**",
        &verdict.strengths[..verdict.strengths.len().min(3)],
    );
    lines.join("\n")
}

fn push_section(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(heading.to_string());
    lines.extend(items.iter().map(|item| format!("- {item}")));
}
