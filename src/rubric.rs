use crate::models::{RewardBreakdown, SpecScore, Trajectory};
use crate::{Result, RolloutError};
use async_trait::async_trait;
use futures_util::future;
use std::sync::Arc;

/// Extension data handed to every reward function alongside the trajectory
/// and reference answer.
#[derive(Debug, Clone, Default)]
pub struct ScoreContext {
    pub metadata: serde_json::Value,
}

/// One scoring strategy. Implementations document their own range ([0,1]
/// unless stated otherwise) and resolve internal failures to a numeric
/// fallback instead of raising; the rubric never sees an error from a
/// reward function.
#[async_trait]
pub trait RewardFn: Send + Sync {
    async fn score(&self, trajectory: &Trajectory, answer: &str, ctx: &ScoreContext) -> f32;
    fn name(&self) -> &'static str;
}

/// A named, weighted reward function owned by a [`Rubric`].
#[derive(Clone)]
pub struct RewardSpec {
    pub name: String,
    pub weight: f32,
    pub reward: Arc<dyn RewardFn>,
}

impl RewardSpec {
    #[tracing::instrument(skip(reward))]
    pub fn new(name: impl Into<String> + std::fmt::Debug, weight: f32, reward: Arc<dyn RewardFn>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RolloutError::InvalidArgument(
                "reward spec name must be non-empty".to_string(),
            ));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(RolloutError::InvalidArgument(
                "reward spec weight must be finite and >= 0".to_string(),
            ));
        }
        Ok(Self {
            name,
            weight,
            reward,
        })
    }
}

/// How per-spec scores combine into the scalar handed to the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Sum of `weight * score` over all specs. The default.
    WeightedSum,
    /// Product of raw scores, ignoring weights. Lets a format-compliance
    /// spec gate a correctness spec instead of adding to it.
    Product,
}

/// Ordered set of reward specs. Registration order is the positional
/// contract with the trainer, which indexes rewards by position.
#[derive(Clone)]
pub struct Rubric {
    specs: Vec<RewardSpec>,
    aggregation: Aggregation,
}

impl Rubric {
    #[tracing::instrument(skip_all)]
    pub fn new(specs: Vec<RewardSpec>) -> Result<Self> {
        let rubric = Self {
            specs,
            aggregation: Aggregation::WeightedSum,
        };
        rubric.validate()?;
        Ok(rubric)
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn specs(&self) -> &[RewardSpec] {
        &self.specs
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    #[tracing::instrument(skip_all)]
    pub fn validate(&self) -> Result<()> {
        if self.specs.is_empty() {
            return Err(RolloutError::InvalidArgument(
                "rubric must contain at least one reward spec".to_string(),
            ));
        }
        let mut sum = 0.0f32;
        for s in &self.specs {
            if s.name.trim().is_empty() {
                return Err(RolloutError::InvalidArgument(
                    "reward spec name must be non-empty".to_string(),
                ));
            }
            if !s.weight.is_finite() || s.weight < 0.0 {
                return Err(RolloutError::InvalidArgument(
                    "reward spec weight must be finite and >= 0".to_string(),
                ));
            }
            sum += s.weight;
        }
        if sum == 0.0 && self.aggregation == Aggregation::WeightedSum {
            return Err(RolloutError::InvalidArgument(
                "at least one reward spec must have non-zero weight".to_string(),
            ));
        }
        Ok(())
    }

    /// Score one trajectory. Every spec is invoked in registration order
    /// with the same `(trajectory, answer, ctx)`, zero-weight specs
    /// included — the breakdown always carries exactly one score per
    /// registered spec.
    #[tracing::instrument(skip_all)]
    pub async fn score(
        &self,
        trajectory: &Trajectory,
        answer: &str,
        ctx: &ScoreContext,
    ) -> RewardBreakdown {
        let mut scores = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let score = spec.reward.score(trajectory, answer, ctx).await;
            scores.push(SpecScore {
                name: spec.name.clone(),
                weight: spec.weight,
                score,
            });
        }
        RewardBreakdown { scores }
    }

    /// Score a batch. Each trajectory is independent; the futures are
    /// awaited concurrently and the output preserves input order.
    #[tracing::instrument(skip_all)]
    pub async fn score_batch(
        &self,
        completions: &[Trajectory],
        answers: &[String],
        ctx: &ScoreContext,
    ) -> Result<Vec<RewardBreakdown>> {
        if completions.len() != answers.len() {
            return Err(RolloutError::InvalidArgument(format!(
                "{} completions but {} answers",
                completions.len(),
                answers.len()
            )));
        }
        let futures = completions
            .iter()
            .zip(answers.iter())
            .map(|(t, a)| self.score(t, a, ctx));
        Ok(future::join_all(futures).await)
    }

    #[tracing::instrument(skip_all)]
    pub fn aggregate(&self, breakdown: &RewardBreakdown) -> f32 {
        match self.aggregation {
            Aggregation::WeightedSum => breakdown
                .scores
                .iter()
                .map(|s| s.weight * s.score)
                .sum(),
            Aggregation::Product => breakdown.scores.iter().map(|s| s.score).product(),
        }
    }

    /// Scalar rewards for a batch, positionally aligned with the input.
    #[tracing::instrument(skip_all)]
    pub async fn reward_batch(
        &self,
        completions: &[Trajectory],
        answers: &[String],
        ctx: &ScoreContext,
    ) -> Result<Vec<f32>> {
        let breakdowns = self.score_batch(completions, answers, ctx).await?;
        Ok(breakdowns.iter().map(|b| self.aggregate(b)).collect())
    }
}
