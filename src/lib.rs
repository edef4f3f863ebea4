//! rollouts: multi-turn rollout and reward pipeline for RL training of
//! language models.
//!
//! An [`Environment`] owns a dataset and a [`Rubric`] and decides how each
//! trajectory unfolds turn by turn; the rubric turns finished trajectories
//! into scalar rewards for an external trainer.

#![forbid(unsafe_code)]

pub mod config;
pub mod envs;
pub mod extract;
pub mod judge;
pub mod logging;
pub mod models;
pub mod report;
pub mod rewards;
pub mod rollout;
pub mod rubric;
pub mod sandbox;

pub type Result<T> = std::result::Result<T, RolloutError>;

#[derive(thiserror::Error, Debug)]
pub enum RolloutError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("judge error: {0}")]
    Judge(String),

    #[error("policy error: {0}")]
    Policy(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Narrow seam around the external judge model, so reward functions can be
/// exercised against a fake without network access. Implementations return
/// `Err` for transport-level failures; the reward boundary maps those to the
/// 0.0 fallback.
#[async_trait::async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, prompt: &str, response: &str) -> Result<f32>;
    fn name(&self) -> &'static str;
}

/// The policy model being trained, as seen by the rollout driver.
#[async_trait::async_trait]
pub trait Policy: Send + Sync {
    async fn complete(&self, messages: &[models::Message]) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub use config::{CodeEnvConfig, JudgeConfig, LoggingConfig, SandboxConfig};
pub use envs::{
    CodeEnv, DatasetSource, DoubleCheckEnv, Environment, MathEnv, SimpleEnv, TurnOutcome,
};
pub use judge::{HttpJudge, DEFAULT_JUDGE_TEMPLATE, JUDGE_SYSTEM_PROMPT};
pub use logging::init_logging;
pub use models::{
    Dataset, Example, ExecutionResult, Message, RewardBreakdown, Role, RolloutReport,
    ScoredRollout, SpecScore, Trajectory,
};
pub use report::{render_markdown_report, render_report, ReportFormat};
pub use rewards::{
    AnswerChangedReward, AnswerMatchReward, ExactMatchReward, ExecutionMatchReward,
    IntFormatReward, JudgeReward, RevisionReward,
};
pub use rollout::RolloutRunner;
pub use rubric::{Aggregation, RewardFn, RewardSpec, Rubric, ScoreContext};
pub use sandbox::SandboxExecutor;
