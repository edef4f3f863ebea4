//! The rollout protocol: how a trajectory is seeded, extended turn by turn,
//! and terminated.
//!
//! Each variant is a self-contained strategy behind the one shared
//! [`Environment`] interface, selected at construction time. Environments
//! hold no per-rollout mutable state — all of it lives in the trajectory
//! being built — so one instance is safe to reuse across many concurrent
//! rollouts.

use crate::models::{Dataset, Message, Trajectory};
use crate::rubric::Rubric;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub mod code;
pub mod doublecheck;
pub mod math;
pub mod simple;

pub use code::CodeEnv;
pub use doublecheck::DoubleCheckEnv;
pub use math::MathEnv;
pub use simple::SimpleEnv;

/// Messages to append after one model turn, and whether the episode is over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    pub messages: Vec<Message>,
    pub done: bool,
}

impl TurnOutcome {
    pub fn done(messages: Vec<Message>) -> Self {
        Self {
            messages,
            done: true,
        }
    }

    pub fn cont(messages: Vec<Message>) -> Self {
        Self {
            messages,
            done: false,
        }
    }
}

/// Backing source for an environment's dataset. Loading is deterministic
/// given the source, so repeated `dataset()` calls yield equal sequences.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    /// Dataset already in memory.
    Inline(Dataset),
    /// JSON-lines file with one example per line.
    JsonlFile(PathBuf),
}

impl DatasetSource {
    #[tracing::instrument(skip_all)]
    pub fn load(&self) -> Result<Dataset> {
        match self {
            DatasetSource::Inline(ds) => Ok(ds.clone()),
            DatasetSource::JsonlFile(path) => Dataset::from_jsonl_path(path),
        }
    }
}

/// The contract between an environment and the external trainer.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Snapshot of the dataset this environment was constructed over.
    /// Fails with `DataUnavailable` when the backing source cannot be
    /// loaded.
    fn dataset(&self) -> Result<Dataset>;

    /// The reward specs this environment requires the trainer to use,
    /// paired with the same answer schema as [`Environment::dataset`].
    fn rubric(&self) -> Rubric;

    /// Given the trajectory built so far and the latest model output,
    /// return the messages to append (the assistant turn plus any injected
    /// environment messages) and whether the episode is complete.
    async fn generate_turn(&self, trajectory: &Trajectory, model_output: &str) -> TurnOutcome;
}
