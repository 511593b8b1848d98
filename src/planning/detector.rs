// Plan likelihood classifier: deterministic weighted signals, no external calls
//
// Signals and weights:
//   host reports plan mode          +5
//   plan-like heading               +3
//   numbered steps (>= 3)           +3
//   plan preamble phrase            +2
//   section headings (>= 3)         +2
//   action-verb bullets (>= 3)      +2
//   distinct file paths (>= 3)      +1
//
// Text scoring 6 or more is treated as a plan.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Score at which text counts as a plan.
pub const DETECTION_THRESHOLD: u32 = 6;

/// Count-based signals fire at this many matches.
const MIN_SIGNAL_COUNT: usize = 3;

static PLAN_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^#{1,3}\s+(?:(?:implementation\s+)?plan|approach|strategy|proposed\s+(?:solution|changes)|steps|action\s+items|implementation\s+steps|execution\s+plan|migration\s+plan|rollout\s+plan)",
    )
    .expect("plan heading regex")
});

static NUMBERED_STEP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:\d+[.)]\s|step\s+\d+[:.]\s)").expect("numbered step regex")
});

static PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)here(?:'s| is) (?:my |the )?(?:plan|approach)|i(?:'ll| will) (?:proceed|start) (?:by|with)|the approach (?:is|will be)|let me outline|i propose (?:the following|to)|my plan is to",
    )
    .expect("preamble regex")
});

static SECTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{2,3}\s+\S").expect("section heading regex"));

static ACTION_BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^\s*[-*]\s+(?:create|add|implement|update|modify|remove|delete|refactor|extract|move|rename|configure|set up|install|deploy|test|write|build|fix|migrate|replace|extend|integrate)\b",
    )
    .expect("action bullet regex")
});

static FILE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`([a-zA-Z0-9_./-]+\.[a-zA-Z]{1,5})`|\b([a-zA-Z0-9_.-]+/[a-zA-Z0-9_./-]+\.[a-zA-Z]{1,5})\b")
        .expect("file path regex")
});

/// One contributing signal and the points it added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    PlanMode,
    PlanHeading,
    NumberedSteps,
    Preamble,
    SectionHeadings,
    ActionVerbs,
    FilePaths,
}

impl Signal {
    pub fn weight(self) -> u32 {
        match self {
            Signal::PlanMode => 5,
            Signal::PlanHeading | Signal::NumberedSteps => 3,
            Signal::Preamble | Signal::SectionHeadings | Signal::ActionVerbs => 2,
            Signal::FilePaths => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::PlanMode => "permission_mode",
            Signal::PlanHeading => "plan_header",
            Signal::NumberedSteps => "numbered_steps",
            Signal::Preamble => "preamble_phrase",
            Signal::SectionHeadings => "section_headers",
            Signal::ActionVerbs => "action_verbs",
            Signal::FilePaths => "file_paths",
        }
    }
}

/// Result of classifying one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanScore {
    pub total: u32,
    pub signals: Vec<Signal>,
}

impl PlanScore {
    pub fn is_plan(&self) -> bool {
        self.total >= DETECTION_THRESHOLD
    }
}

/// Score `text`; `plan_mode` is the host's own claim that the agent is planning.
pub fn score(text: &str, plan_mode: bool) -> PlanScore {
    let mut signals = Vec::new();

    if plan_mode {
        signals.push(Signal::PlanMode);
    }
    if PLAN_HEADING.is_match(text) {
        signals.push(Signal::PlanHeading);
    }
    if NUMBERED_STEP.find_iter(text).count() >= MIN_SIGNAL_COUNT {
        signals.push(Signal::NumberedSteps);
    }
    if PREAMBLE.is_match(text) {
        signals.push(Signal::Preamble);
    }
    if SECTION_HEADING.find_iter(text).count() >= MIN_SIGNAL_COUNT {
        signals.push(Signal::SectionHeadings);
    }
    if ACTION_BULLET.find_iter(text).count() >= MIN_SIGNAL_COUNT {
        signals.push(Signal::ActionVerbs);
    }
    if distinct_file_paths(text) >= MIN_SIGNAL_COUNT {
        signals.push(Signal::FilePaths);
    }

    let total = signals.iter().map(|s| s.weight()).sum();
    PlanScore { total, signals }
}

/// Convenience wrapper: does `text` look like a plan?
pub fn is_plan(text: &str, plan_mode: bool) -> bool {
    score(text, plan_mode).is_plan()
}

fn distinct_file_paths(text: &str) -> usize {
    FILE_PATH
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        .collect::<HashSet<_>>()
        .len()
}
