use crate::envs::{DatasetSource, Environment, TurnOutcome};
use crate::models::{Dataset, Message, Trajectory};
use crate::rewards::ExactMatchReward;
use crate::rubric::{RewardSpec, Rubric};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Single-turn environment: the episode ends with the assistant's first
/// reply and no messages are injected.
pub struct SimpleEnv {
    source: DatasetSource,
    rubric: Rubric,
}

impl SimpleEnv {
    #[tracing::instrument(skip_all)]
    pub fn new(source: DatasetSource) -> Result<Self> {
        let rubric = Rubric::new(vec![RewardSpec::new(
            "exact_match",
            1.0,
            Arc::new(ExactMatchReward),
        )?])?;
        Ok(Self { source, rubric })
    }

    /// Replace the default exact-match rubric, e.g. with a judge-backed one.
    pub fn with_rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }
}

#[async_trait]
impl Environment for SimpleEnv {
    fn dataset(&self) -> Result<Dataset> {
        self.source.load()
    }

    fn rubric(&self) -> Rubric {
        self.rubric.clone()
    }

    #[tracing::instrument(skip_all)]
    async fn generate_turn(&self, _trajectory: &Trajectory, model_output: &str) -> TurnOutcome {
        TurnOutcome::done(vec![Message::assistant(model_output)])
    }
}
