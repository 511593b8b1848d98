// Plan quality gate
//
// Identity of a plan across revisions, a local plan-likelihood classifier,
// verdict types and formatting, and the gate that combines them with session
// state and the external evaluator.

pub mod detector;
pub mod feedback;
pub mod gate;
pub mod identity;
pub mod types;

pub use detector::{is_plan, score, PlanScore, Signal, DETECTION_THRESHOLD};
pub use feedback::{format_approval, format_feedback};
pub use gate::EvaluationGate;
pub use identity::{content_hash, round_transition, Fingerprint, PlanIdentity, RoundTransition};
pub use types::{Breakdown, GateOutcome, Verdict};
