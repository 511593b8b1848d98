// Evaluation prompt assembly

use super::EvaluationRequest;

const REVIEWER_PREAMBLE: &str = "You are a senior software architect reviewing an implementation plan.\n\n\
    Evaluate the following implementation plan using the rubric.";

const FEEDBACK_GUIDELINES: &str = "## Feedback Guidelines\n\n\
    - Prioritize issues: list critical problems first, minor improvements last\n\
    - Be specific: reference exact steps by number\n\
    - Be actionable: say what to change, not just what's wrong";

const CLASSIFICATION_NOTE: &str = "If the text below is not an implementation plan at all \
    (for example a status report, a question or a summary of finished work), set `is_plan` \
    to false and score it leniently.";

const VERIFY_SOURCES: &str = "## Source Verification\n\n\
    You are running inside the project repository with read-only access. Open the files \
    the plan references and check that its claims about existing code (names, signatures, \
    file locations, current behavior) are accurate. Count every claim that does not hold \
    against correctness and list it under weaknesses.";

const REVISION_ASSESSMENT: &str = "Assess: Which feedback items were addressed? Which were ignored? \
    Focus new feedback on remaining and newly discovered issues.";

/// Optional prompt sections
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptOptions<'a> {
    pub verify_sources: bool,
    /// Project instructions (CLAUDE.md / README.md) to ground the review
    pub project_context: Option<&'a str>,
}

/// Compose the prompt sent to the evaluator for one round.
pub fn build_prompt(request: &EvaluationRequest<'_>, options: &PromptOptions<'_>) -> String {
    let mut sections = vec![
        REVIEWER_PREAMBLE.to_string(),
        request.rubric.trim_end().to_string(),
        CLASSIFICATION_NOTE.to_string(),
    ];

    if let Some(context) = options.project_context.filter(|c| !c.trim().is_empty()) {
        sections.push(format!("## Project Context\n\n{}", context.trim_end()));
    }

    sections.push(FEEDBACK_GUIDELINES.to_string());

    if options.verify_sources {
        sections.push(VERIFY_SOURCES.to_string());
    }

    sections.push(format!(
        "## Plan to Evaluate (Round {})\n\n{}",
        request.round,
        request.plan_text.trim_end()
    ));

    if let Some(previous) = request.previous_feedback.filter(|f| !f.trim().is_empty()) {
        sections.push(format!(
            "## Previous Feedback (Round {})\n\n{}\n\n{}",
            request.round.saturating_sub(1),
            previous.trim_end(),
            REVISION_ASSESSMENT
        ));
    }

    let mut prompt = sections.join("\n\n");
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(previous: Option<&'a str>, round: u32) -> EvaluationRequest<'a> {
        EvaluationRequest {
            plan_text: "# Plan\n1. Do it",
            rubric: "RUBRIC TEXT",
            previous_feedback: previous,
            round,
            cwd: None,
        }
    }

    #[test]
    fn test_basic_prompt_layout() {
        let prompt = build_prompt(&request(None, 1), &PromptOptions::default());
        assert!(prompt.starts_with("You are a senior software architect"));
        let rubric = prompt.find("RUBRIC TEXT").unwrap();
        let guidelines = prompt.find("## Feedback Guidelines").unwrap();
        let plan = prompt.find("## Plan to Evaluate (Round 1)").unwrap();
        assert!(rubric < guidelines && guidelines < plan);
        assert!(!prompt.contains("Previous Feedback"));
        assert!(!prompt.contains("Source Verification"));
        assert!(!prompt.contains("Project Context"));
    }

    #[test]
    fn test_previous_feedback_section() {
        let prompt = build_prompt(&request(Some("Fix step 2"), 3), &PromptOptions::default());
        assert!(prompt.contains("## Previous Feedback (Round 2)\n\nFix step 2"));
        assert!(prompt.contains("Which feedback items were addressed?"));
    }

    #[test]
    fn test_optional_sections() {
        let options = PromptOptions {
            verify_sources: true,
            project_context: Some("Use anyhow at the edges."),
        };
        let prompt = build_prompt(&request(None, 1), &options);
        assert!(prompt.contains("## Source Verification"));
        assert!(prompt.contains("## Project Context\n\nUse anyhow at the edges."));
    }
}
