//! Drives a policy against an environment to produce complete, scored
//! trajectories.
//!
//! The external trainer owns generation at scale; this driver is the
//! in-crate loop for evaluation runs and tests: seed a trajectory from an
//! example, alternate policy and environment turns until the environment
//! reports completion, then hand the trajectory to the rubric.

use crate::envs::Environment;
use crate::models::{Example, RolloutReport, ScoredRollout, Trajectory};
use crate::rubric::ScoreContext;
use crate::{Policy, Result};
use futures_util::future;

pub struct RolloutRunner {
    /// Hard stop on policy turns, independent of the environment's own turn
    /// policy, so a misbehaving environment cannot loop forever.
    max_turns: usize,
}

impl Default for RolloutRunner {
    fn default() -> Self {
        Self { max_turns: 8 }
    }
}

impl RolloutRunner {
    #[tracing::instrument]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// One rollout: seed from the example's prompt, then alternate policy
    /// and environment turns until the environment reports `done` or the
    /// turn bound is hit.
    #[tracing::instrument(skip_all)]
    pub async fn collect(
        &self,
        env: &dyn Environment,
        policy: &dyn Policy,
        example: &Example,
    ) -> Result<Trajectory> {
        let mut trajectory = Trajectory::new(example.prompt.clone());
        for _ in 0..self.max_turns {
            let output = policy.complete(&trajectory.messages).await?;
            let outcome = env.generate_turn(&trajectory, &output).await;
            trajectory.extend(outcome.messages);
            if outcome.done {
                break;
            }
        }
        Ok(trajectory)
    }

    /// Rollouts for a batch of examples, order-preserving.
    #[tracing::instrument(skip_all)]
    pub async fn collect_batch(
        &self,
        env: &dyn Environment,
        policy: &dyn Policy,
        examples: &[Example],
    ) -> Result<Vec<Trajectory>> {
        let futures = examples.iter().map(|ex| self.collect(env, policy, ex));
        future::join_all(futures).await.into_iter().collect()
    }

    /// Rollouts plus rubric scores, using the environment's own rubric.
    #[tracing::instrument(skip_all)]
    pub async fn collect_scored(
        &self,
        env: &dyn Environment,
        policy: &dyn Policy,
        examples: &[Example],
    ) -> Result<Vec<ScoredRollout>> {
        let trajectories = self.collect_batch(env, policy, examples).await?;
        let rubric = env.rubric();
        let ctx = ScoreContext::default();

        let mut out = Vec::with_capacity(examples.len());
        for (example, trajectory) in examples.iter().zip(trajectories) {
            let breakdown = rubric.score(&trajectory, &example.answer, &ctx).await;
            let reward = rubric.aggregate(&breakdown);
            out.push(ScoredRollout {
                example: example.clone(),
                trajectory,
                breakdown,
                reward,
            });
        }
        Ok(out)
    }

    /// Convenience: score every example in the environment's dataset and
    /// wrap the results in a report.
    #[tracing::instrument(skip_all)]
    pub async fn evaluate(
        &self,
        env: &dyn Environment,
        policy: &dyn Policy,
        env_name: &str,
    ) -> Result<RolloutReport> {
        let dataset = env.dataset()?;
        let rollouts = self.collect_scored(env, policy, &dataset.examples).await?;
        Ok(RolloutReport::new(env_name, rollouts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::{DatasetSource, DoubleCheckEnv, SimpleEnv};
    use crate::models::{Dataset, Message, Role};
    use crate::RolloutError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed list of outputs, one per call.
    struct ScriptedPolicy {
        outputs: Vec<String>,
        cursor: AtomicUsize,
    }

    impl ScriptedPolicy {
        fn new(outputs: &[&str]) -> Self {
            Self {
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                cursor: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Policy for ScriptedPolicy {
        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            self.outputs
                .get(i)
                .cloned()
                .ok_or_else(|| RolloutError::Policy("script exhausted".to_string()))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn simple_env(answer: &str) -> SimpleEnv {
        let ds = Dataset::new(
            "t",
            vec![Example::new(vec![Message::user("q")], answer)],
        )
        .unwrap();
        SimpleEnv::new(DatasetSource::Inline(ds)).unwrap()
    }

    #[tokio::test]
    async fn single_turn_rollout_ends_on_assistant_message() {
        let env = simple_env("paris");
        let policy = ScriptedPolicy::new(&["paris"]);
        let example = env.dataset().unwrap().examples[0].clone();

        let t = RolloutRunner::new().collect(&env, &policy, &example).await.unwrap();
        assert_eq!(t.messages.last().unwrap().role, Role::Assistant);
        assert_eq!(t.assistant_count(), 1);
    }

    #[tokio::test]
    async fn doublecheck_rollout_runs_two_policy_turns() {
        let ds = Dataset::new(
            "t",
            vec![Example::new(vec![Message::user("6*7?")], "#### 42")],
        )
        .unwrap();
        let env = DoubleCheckEnv::new(DatasetSource::Inline(ds)).unwrap();
        let policy = ScriptedPolicy::new(&["\\boxed{41}", "\\boxed{42}"]);
        let example = env.dataset().unwrap().examples[0].clone();

        let rollouts = RolloutRunner::new()
            .collect_scored(&env, &policy, &[example])
            .await
            .unwrap();
        assert_eq!(rollouts.len(), 1);
        assert_eq!(rollouts[0].trajectory.assistant_count(), 2);
        assert_eq!(rollouts[0].reward, 1.0);
    }

    #[tokio::test]
    async fn scored_batch_preserves_example_order() {
        let ds = Dataset::new(
            "t",
            vec![
                Example::new(vec![Message::user("q0")], "right"),
                Example::new(vec![Message::user("q1")], "other"),
            ],
        )
        .unwrap();
        let env = SimpleEnv::new(DatasetSource::Inline(ds)).unwrap();
        // Both rollouts answer "right": only the first example matches.
        let policy = ScriptedPolicy::new(&["right", "right"]);
        let examples = env.dataset().unwrap().examples;

        let rollouts = RolloutRunner::new()
            .collect_scored(&env, &policy, &examples)
            .await
            .unwrap();
        let rewards: Vec<f32> = rollouts.iter().map(|r| r.reward).collect();
        assert_eq!(rewards, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn evaluate_reports_mean_reward() {
        let env = simple_env("paris");
        let policy = ScriptedPolicy::new(&["paris"]);
        let report = RolloutRunner::new().evaluate(&env, &policy, "simple").await.unwrap();
        assert_eq!(report.env, "simple");
        assert_eq!(report.mean_reward(), 1.0);
    }

    #[tokio::test]
    async fn policy_errors_propagate() {
        let env = simple_env("paris");
        let policy = ScriptedPolicy::new(&[]);
        let example = env.dataset().unwrap().examples[0].clone();
        let err = RolloutRunner::new().collect(&env, &policy, &example).await.unwrap_err();
        assert!(matches!(err, RolloutError::Policy(_)));
    }
}
