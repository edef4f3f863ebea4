use crate::envs::{DatasetSource, Environment, TurnOutcome};
use crate::models::{Dataset, Message, Trajectory};
use crate::rewards::{AnswerChangedReward, AnswerMatchReward, RevisionReward};
use crate::rubric::{RewardSpec, Rubric};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Fixed prompt injected after the first answer.
pub const VERIFICATION_PROMPT: &str = "Are you sure? Re-examine your answer and respond again.";

/// Exactly two assistant turns: answer, verification prompt, revised answer.
///
/// The scalar reward is computed solely from the second answer; the
/// `answer_changed` and `revision` specs are registered at weight 0.0 so
/// the breakdown still reports whether the model revised and whether the
/// revision helped.
pub struct DoubleCheckEnv {
    source: DatasetSource,
    rubric: Rubric,
}

impl DoubleCheckEnv {
    #[tracing::instrument(skip_all)]
    pub fn new(source: DatasetSource) -> Result<Self> {
        let rubric = Rubric::new(vec![
            RewardSpec::new("answer_match", 1.0, Arc::new(AnswerMatchReward))?,
            RewardSpec::new("answer_changed", 0.0, Arc::new(AnswerChangedReward))?,
            RewardSpec::new("revision", 0.0, Arc::new(RevisionReward))?,
        ])?;
        Ok(Self { source, rubric })
    }

    pub fn with_rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }
}

#[async_trait]
impl Environment for DoubleCheckEnv {
    fn dataset(&self) -> Result<Dataset> {
        self.source.load()
    }

    fn rubric(&self) -> Rubric {
        self.rubric.clone()
    }

    #[tracing::instrument(skip_all)]
    async fn generate_turn(&self, trajectory: &Trajectory, model_output: &str) -> TurnOutcome {
        if trajectory.assistant_count() == 0 {
            TurnOutcome::cont(vec![
                Message::assistant(model_output),
                Message::user(VERIFICATION_PROMPT),
            ])
        } else {
            TurnOutcome::done(vec![Message::assistant(model_output)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Example;
    use crate::rubric::ScoreContext;

    fn env() -> DoubleCheckEnv {
        let ds = Dataset::new(
            "dc-mini",
            vec![Example::new(vec![Message::user("what is 6*7?")], "#### 42")],
        )
        .unwrap();
        DoubleCheckEnv::new(DatasetSource::Inline(ds)).unwrap()
    }

    #[tokio::test]
    async fn first_turn_injects_verification_prompt() {
        let e = env();
        let trajectory = Trajectory::new(vec![Message::user("what is 6*7?")]);
        let outcome = e.generate_turn(&trajectory, "\\boxed{41}").await;
        assert!(!outcome.done);
        assert_eq!(outcome.messages[1], Message::user(VERIFICATION_PROMPT));
    }

    #[tokio::test]
    async fn second_turn_terminates_with_two_assistant_messages() {
        let e = env();
        let mut trajectory = Trajectory::new(vec![Message::user("what is 6*7?")]);

        let first = e.generate_turn(&trajectory, "\\boxed{41}").await;
        trajectory.extend(first.messages);
        let second = e.generate_turn(&trajectory, "\\boxed{42}").await;
        assert!(second.done);
        trajectory.extend(second.messages);

        assert_eq!(trajectory.assistant_count(), 2);
    }

    async fn scalar_reward(e: &DoubleCheckEnv, first: &str, second: &str) -> f32 {
        let trajectory = Trajectory::new(vec![
            Message::user("what is 6*7?"),
            Message::assistant(first),
            Message::user(VERIFICATION_PROMPT),
            Message::assistant(second),
        ]);
        let rubric = e.rubric();
        let breakdown = rubric
            .score(&trajectory, "#### 42", &ScoreContext::default())
            .await;
        rubric.aggregate(&breakdown)
    }

    #[tokio::test]
    async fn reward_comes_solely_from_second_answer() {
        let e = env();
        // Wrong then right scores; right then wrong does not.
        assert_eq!(scalar_reward(&e, "\\boxed{41}", "\\boxed{42}").await, 1.0);
        assert_eq!(scalar_reward(&e, "\\boxed{42}", "\\boxed{41}").await, 0.0);
    }

    #[tokio::test]
    async fn diagnostics_report_revision_direction() {
        let e = env();
        let trajectory = Trajectory::new(vec![
            Message::user("what is 6*7?"),
            Message::assistant("\\boxed{41}"),
            Message::user(VERIFICATION_PROMPT),
            Message::assistant("\\boxed{42}"),
        ]);
        let breakdown = e
            .rubric()
            .score(&trajectory, "#### 42", &ScoreContext::default())
            .await;
        assert_eq!(breakdown.get("answer_changed"), Some(1.0));
        assert_eq!(breakdown.get("revision"), Some(1.0));
    }
}
