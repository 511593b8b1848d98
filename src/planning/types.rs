// Verdict, breakdown and gate outcome types

use serde::{Deserialize, Serialize};

/// Five rubric dimensions, each scored 0–2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub completeness: u8,
    pub correctness: u8,
    pub sequencing: u8,
    pub risk_awareness: u8,
    pub clarity: u8,
}

impl Breakdown {
    /// Dimension names in rubric order.
    pub const KEYS: [&'static str; 5] = [
        "completeness",
        "correctness",
        "sequencing",
        "risk_awareness",
        "clarity",
    ];

    /// (name, score) pairs in rubric order.
    pub fn entries(&self) -> [(&'static str, u8); 5] {
        [
            ("completeness", self.completeness),
            ("correctness", self.correctness),
            ("sequencing", self.sequencing),
            ("risk_awareness", self.risk_awareness),
            ("clarity", self.clarity),
        ]
    }

    pub fn total(&self) -> u32 {
        self.entries().iter().map(|(_, v)| u32::from(*v)).sum()
    }
}

/// A validated verdict from the external evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Overall score 1–10 (always equal to the breakdown total)
    pub score: u8,
    pub breakdown: Breakdown,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub strengths: Vec<String>,
    /// The evaluator's own judgement of whether the text is a plan at all
    pub is_plan: bool,
}

/// What the gate decided for one piece of plan text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Nothing to evaluate (blank text); no state was touched
    Skip,
    /// Let the agent proceed, optionally with a note for the user
    Pass { message: Option<String> },
    /// Send the agent back to revise; `reason` is fed to the agent
    Block {
        reason: String,
        message: Option<String>,
    },
}

impl GateOutcome {
    pub fn pass() -> Self {
        GateOutcome::Pass { message: None }
    }

    pub fn pass_with(message: impl Into<String>) -> Self {
        GateOutcome::Pass {
            message: Some(message.into()),
        }
    }

    pub fn block(reason: impl Into<String>, message: Option<String>) -> Self {
        GateOutcome::Block {
            reason: reason.into(),
            message,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, GateOutcome::Block { .. })
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass { .. })
    }

    /// Text shown to the agent when blocked.
    pub fn reason(&self) -> Option<&str> {
        match self {
            GateOutcome::Block { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Informational note for the user, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            GateOutcome::Pass { message } | GateOutcome::Block { message, .. } => {
                message.as_deref()
            }
            GateOutcome::Skip => None,
        }
    }
}
