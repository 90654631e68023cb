use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::error::KgError;

/// Pipeline states, in the order a run moves through them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Discovering { hop: usize },
    NodeSetFinalized,
    Materializing,
    Projecting { name: String },
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Discovering { hop } => write!(f, "discovery hop {}", hop),
            Stage::NodeSetFinalized => write!(f, "node set finalization"),
            Stage::Materializing => write!(f, "edge materialization"),
            Stage::Projecting { name } => write!(f, "projection {}", name),
            Stage::Complete => write!(f, "complete"),
        }
    }
}

/// A failed run: where it stopped, the last stage that finished, and why.
#[derive(Debug, Error)]
#[error("failed during {failed_at} (last completed: {}): {source}", describe(.last_completed))]
pub struct PipelineFailure {
    pub failed_at: Stage,
    pub last_completed: Option<Stage>,
    #[source]
    pub source: KgError,
}

fn describe(stage: &Option<Stage>) -> String {
    stage
        .as_ref()
        .map(Stage::to_string)
        .unwrap_or_else(|| "nothing".to_string())
}

/// Current and last completed stage of one run.
#[derive(Debug)]
pub(crate) struct StageTracker {
    current: Stage,
    last_completed: Option<Stage>,
    finalized: bool,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Idle,
            last_completed: None,
            finalized: false,
        }
    }

    pub fn enter(&mut self, stage: Stage) {
        debug_assert!(
            !(self.finalized && matches!(stage, Stage::Discovering { .. })),
            "discovery cannot resume after the node set is finalized"
        );
        if stage == Stage::NodeSetFinalized {
            self.finalized = true;
        }
        log::debug!("stage: {} -> {}", self.current, stage);
        self.current = stage;
    }

    pub fn complete(&mut self) {
        self.last_completed = Some(self.current.clone());
    }

    pub fn fail(&self, source: KgError) -> PipelineFailure {
        log::error!(
            "failed during {} (last completed: {}): {}",
            self.current,
            describe(&self.last_completed),
            source
        );
        PipelineFailure {
            failed_at: self.current.clone(),
            last_completed: self.last_completed.clone(),
            source,
        }
    }
}
