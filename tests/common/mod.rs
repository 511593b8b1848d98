// Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use planman::config::Config;
use planman::evaluator::{EvaluationRequest, Evaluator, EvaluatorError};
use planman::planning::{Breakdown, EvaluationGate, Verdict};
use planman::session::{FileSessionStore, MarkerStore};

/// What the gate sent to the evaluator
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub plan_text: String,
    pub previous_feedback: Option<String>,
    pub round: u32,
}

/// Evaluator that replays canned responses and records every call
pub struct ScriptedEvaluator {
    responses: Mutex<VecDeque<Result<Verdict, EvaluatorError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    available: bool,
}

impl ScriptedEvaluator {
    pub fn new(responses: Vec<Result<Verdict, EvaluatorError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<Verdict, EvaluatorError> {
        self.calls.lock().unwrap().push(RecordedCall {
            plan_text: request.plan_text.to_string(),
            previous_feedback: request.previous_feedback.map(str::to_string),
            round: request.round,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("evaluator called more often than scripted")
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Verdict for a plan with a breakdown that sums to `score`.
pub fn verdict(score: u8) -> Verdict {
    let mut remaining = score;
    let mut next = || {
        let part = remaining.min(2);
        remaining -= part;
        part
    };
    let breakdown = Breakdown {
        completeness: next(),
        correctness: next(),
        sequencing: next(),
        risk_awareness: next(),
        clarity: next(),
    };
    Verdict {
        score,
        breakdown,
        weaknesses: if score < 10 {
            vec!["Missing rollback plan".to_string()]
        } else {
            Vec::new()
        },
        suggestions: vec!["Add a migration dry run".to_string()],
        strengths: vec!["Clear ordering".to_string(), "Good test coverage".to_string()],
        is_plan: true,
    }
}

/// Verdict for text the evaluator judged not to be a plan.
pub fn non_plan() -> Verdict {
    Verdict {
        is_plan: false,
        ..verdict(1)
    }
}

/// Gate wired to a temp state dir and a scripted evaluator
pub struct Harness {
    pub dir: TempDir,
    pub evaluator: Arc<ScriptedEvaluator>,
    pub store: FileSessionStore,
    pub gate: EvaluationGate,
}

impl Harness {
    pub fn new(config: Config, responses: Vec<Result<Verdict, EvaluatorError>>) -> Self {
        Self::with_evaluator(config, ScriptedEvaluator::new(responses))
    }

    pub fn with_evaluator(config: Config, evaluator: ScriptedEvaluator) -> Self {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&state_dir).unwrap();
        let config = Config {
            state_dir: Some(state_dir.clone()),
            ..config
        };
        let evaluator = Arc::new(evaluator);
        let store = FileSessionStore::new(&state_dir);
        let gate = EvaluationGate::new(
            config,
            Arc::new(store.clone()),
            evaluator.clone(),
            MarkerStore::new(&state_dir),
        );
        Self {
            dir,
            evaluator,
            store,
            gate,
        }
    }

    /// Project directory the agent works in.
    pub fn project(&self) -> PathBuf {
        let project = self.dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        project
    }

    pub fn state_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Write `<project>/.claude/plans/<name>`.
    pub fn plan_file(&self, name: &str, content: &str) -> PathBuf {
        let plans = self.project().join(".claude").join("plans");
        std::fs::create_dir_all(&plans).unwrap();
        let path = plans.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

pub const PLAN: &str = "# Implementation Plan\n\n\
    1. Add the cache module in `src/cache.rs`\n\
    2. Wire it into src/store/mod.rs\n\
    3. Extend tests/cache_test.rs\n";
