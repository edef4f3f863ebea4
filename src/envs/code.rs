use crate::config::CodeEnvConfig;
use crate::envs::{DatasetSource, Environment, TurnOutcome};
use crate::extract::extract_code_block;
use crate::models::{Dataset, Message, Trajectory};
use crate::rewards::ExecutionMatchReward;
use crate::rubric::{RewardSpec, Rubric};
use crate::sandbox::SandboxExecutor;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Multi-turn coding environment.
///
/// After an assistant turn containing a fenced code block, the block is run
/// in the sandbox and the captured result appended as a tool message before
/// the model gets another turn. The episode ends when the model stops
/// emitting code, or at `max_turns` — a clean cutoff, not an error.
pub struct CodeEnv {
    source: DatasetSource,
    rubric: Rubric,
    config: CodeEnvConfig,
    sandbox: SandboxExecutor,
}

impl CodeEnv {
    #[tracing::instrument(skip_all)]
    pub fn new(source: DatasetSource, config: CodeEnvConfig) -> Result<Self> {
        config.validate()?;
        let sandbox = SandboxExecutor::new(config.sandbox.clone())?;
        let rubric = Rubric::new(vec![RewardSpec::new(
            "execution_match",
            1.0,
            Arc::new(ExecutionMatchReward),
        )?])?;
        Ok(Self {
            source,
            rubric,
            config,
            sandbox,
        })
    }

    pub fn with_rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn config(&self) -> &CodeEnvConfig {
        &self.config
    }
}

#[async_trait]
impl Environment for CodeEnv {
    fn dataset(&self) -> Result<Dataset> {
        self.source.load()
    }

    fn rubric(&self) -> Rubric {
        self.rubric.clone()
    }

    #[tracing::instrument(skip_all)]
    async fn generate_turn(&self, trajectory: &Trajectory, model_output: &str) -> TurnOutcome {
        let mut messages = vec![Message::assistant(model_output)];

        // No code block (or a malformed one) means the model is done talking.
        let Some(code) = extract_code_block(model_output) else {
            return TurnOutcome::done(messages);
        };

        let result = self.sandbox.execute(&code).await;
        messages.push(Message::tool(result.render()));

        let assistant_turns = trajectory.assistant_count() + 1;
        if assistant_turns >= self.config.max_turns {
            tracing::debug!(turns = assistant_turns, "turn cap reached, ending episode");
            TurnOutcome::done(messages)
        } else {
            TurnOutcome::cont(messages)
        }
    }
}
