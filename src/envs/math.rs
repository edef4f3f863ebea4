use crate::envs::{DatasetSource, Environment, TurnOutcome};
use crate::models::{Dataset, Message, Trajectory};
use crate::rewards::{AnswerMatchReward, IntFormatReward};
use crate::rubric::{RewardSpec, Rubric};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Single-turn question answering over a math benchmark.
///
/// Gold answers come in two formats — `\boxed{...}` notation and the
/// `#### value` trailer — and the default rubric compares the extracted
/// completion answer against the gold one with numeric-tolerant equality
/// first, normalized string equality as the fallback. An
/// integer-format spec adds a small weight for emitting a clean integer.
pub struct MathEnv {
    source: DatasetSource,
    rubric: Rubric,
}

impl MathEnv {
    #[tracing::instrument(skip_all)]
    pub fn new(source: DatasetSource) -> Result<Self> {
        let rubric = Rubric::new(vec![
            RewardSpec::new("answer_match", 1.0, Arc::new(AnswerMatchReward))?,
            RewardSpec::new("int_format", 0.2, Arc::new(IntFormatReward))?,
        ])?;
        Ok(Self { source, rubric })
    }

    pub fn with_rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }
}

#[async_trait]
impl Environment for MathEnv {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Example;
    use crate::rubric::ScoreContext;

    fn env() -> MathEnv {
        let ds = Dataset::new(
            "gsm8k-mini",
            vec![Example::new(
                vec![Message::user("Natalia sold clips...")],
                "reasoning\n#### 42",
            )],
        )
        .unwrap();
        MathEnv::new(DatasetSource::Inline(ds)).unwrap()
    }

    async fn reward_for(completion: &str) -> f32 {
        let e = env();
        let gold = e.dataset().unwrap().examples[0].answer.clone();
        let trajectory = Trajectory::new(vec![
            Message::user("Natalia sold clips..."),
            Message::assistant(completion),
        ]);
        let rubric = e.rubric();
        let breakdown = rubric.score(&trajectory, &gold, &ScoreContext::default()).await;
        breakdown.get("answer_match").unwrap()
    }

    #[tokio::test]
    async fn boxed_completion_against_hash_gold() {
        assert_eq!(reward_for("step by step... \\boxed{42}").await, 1.0);
        assert_eq!(reward_for("step by step... \\boxed{41}").await, 0.0);
        assert_eq!(reward_for("no recognizable answer").await, 0.0);
    }

    #[tokio::test]
    async fn single_turn_policy() {
        let outcome = env().generate_turn(&Trajectory::default(), "\\boxed{42}").await;
        assert!(outcome.done);
        assert_eq!(outcome.messages.len(), 1);
    }

    #[test]
    fn rubric_registers_specs_in_order() {
        let rubric = env().rubric();
        let names: Vec<&str> = rubric.specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["answer_match", "int_format"]);
    }
}
