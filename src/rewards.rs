//! Built-in reward functions.
//!
//! All scores are in [0,1] unless documented otherwise. Per-trajectory
//! failures (missing messages, unparsable answers, an unreachable judge)
//! degrade to the documented fallback instead of raising, so a batch of
//! rewards always comes back with the same length and order it went in.

use crate::extract::{answers_match, extract_boxed_answer, extract_hash_answer};
use crate::models::Trajectory;
use crate::rubric::{RewardFn, ScoreContext};
use crate::Judge;
use async_trait::async_trait;
use std::sync::Arc;

/// Completion-side answer: boxed notation first, hash trailer as fallback.
fn extract_completion_answer(text: &str) -> Option<String> {
    extract_boxed_answer(text).or_else(|| extract_hash_answer(text))
}

/// Gold-side answer: hash trailer first (the raw benchmark form), boxed as
/// fallback, otherwise the answer text as-is.
fn extract_gold_answer(answer: &str) -> String {
    extract_hash_answer(answer)
        .or_else(|| extract_boxed_answer(answer))
        .unwrap_or_else(|| answer.trim().to_string())
}

/// 1.0 when the whole final assistant message equals the reference answer
/// after trimming, else 0.0.
#[derive(Debug, Default)]
pub struct ExactMatchReward;

#[async_trait]
impl RewardFn for ExactMatchReward {
    async fn score(&self, trajectory: &Trajectory, answer: &str, _ctx: &ScoreContext) -> f32 {
        let Some(last) = trajectory.last_assistant() else {
            return 0.0;
        };
        if last.content.trim() == answer.trim() {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "exact_match"
    }
}

/// Math correctness: the answer extracted from the final assistant message
/// against the gold answer, numeric-tolerant equality first, normalized
/// string equality as fallback. No extractable answer scores 0.0.
#[derive(Debug, Default)]
pub struct AnswerMatchReward;

#[async_trait]
impl RewardFn for AnswerMatchReward {
    async fn score(&self, trajectory: &Trajectory, answer: &str, _ctx: &ScoreContext) -> f32 {
        let Some(last) = trajectory.last_assistant() else {
            return 0.0;
        };
        let Some(got) = extract_completion_answer(&last.content) else {
            return 0.0;
        };
        if answers_match(&got, &extract_gold_answer(answer)) {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "answer_match"
    }
}

/// Format compliance: 1.0 when the extracted completion answer parses as an
/// integer, else 0.0.
#[derive(Debug, Default)]
pub struct IntFormatReward;

#[async_trait]
impl RewardFn for IntFormatReward {
    async fn score(&self, trajectory: &Trajectory, _answer: &str, _ctx: &ScoreContext) -> f32 {
        let parsed = trajectory
            .last_assistant()
            .and_then(|m| extract_completion_answer(&m.content))
            .map(|a| a.trim().parse::<i64>().is_ok());
        if parsed == Some(true) {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "int_format"
    }
}

/// Execution match: the last tool message (the captured execution output)
/// against the gold output. A trajectory whose code raised carries the
/// error text there and scores 0.0.
#[derive(Debug, Default)]
pub struct ExecutionMatchReward;

#[async_trait]
impl RewardFn for ExecutionMatchReward {
    async fn score(&self, trajectory: &Trajectory, answer: &str, _ctx: &ScoreContext) -> f32 {
        let Some(tool) = trajectory.last_tool() else {
            return 0.0;
        };
        if tool.content.trim() == answer.trim() {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "execution_match"
    }
}

/// 1.0 when the second answer differs from the first (after extraction and
/// normalization), else 0.0. Diagnostic for the double-check flow.
#[derive(Debug, Default)]
pub struct AnswerChangedReward;

#[async_trait]
impl RewardFn for AnswerChangedReward {
    async fn score(&self, trajectory: &Trajectory, _answer: &str, _ctx: &ScoreContext) -> f32 {
        let (Some(first), Some(last)) = (trajectory.first_assistant(), trajectory.last_assistant())
        else {
            return 0.0;
        };
        if std::ptr::eq(first, last) {
            return 0.0;
        }
        let a = extract_completion_answer(&first.content).unwrap_or_else(|| first.content.clone());
        let b = extract_completion_answer(&last.content).unwrap_or_else(|| last.content.clone());
        if answers_match(&a, &b) {
            0.0
        } else {
            1.0
        }
    }

    fn name(&self) -> &'static str {
        "answer_changed"
    }
}

/// Range [-1,1]: +1.0 when revising fixed a wrong first answer, -1.0 when
/// it broke a correct one, 0.0 otherwise.
#[derive(Debug, Default)]
pub struct RevisionReward;

#[async_trait]
impl RewardFn for RevisionReward {
    async fn score(&self, trajectory: &Trajectory, answer: &str, _ctx: &ScoreContext) -> f32 {
        let (Some(first), Some(last)) = (trajectory.first_assistant(), trajectory.last_assistant())
        else {
            return 0.0;
        };
        if std::ptr::eq(first, last) {
            return 0.0;
        }
        let gold = extract_gold_answer(answer);
        let correct = |content: &str| {
            extract_completion_answer(content)
                .map(|got| answers_match(&got, &gold))
                .unwrap_or(false)
        };
        match (correct(&first.content), correct(&last.content)) {
            (false, true) => 1.0,
            (true, false) => -1.0,
            _ => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "revision"
    }
}

/// LLM-as-judge reward. Locates the most recent user and assistant
/// messages; if either is absent the score is 0.0 without a judge call.
/// Judge transport failures degrade to 0.0 — a single unreachable judge
/// response costs that one reward, not the training step.
pub struct JudgeReward {
    judge: Arc<dyn Judge>,
}

impl JudgeReward {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl RewardFn for JudgeReward {
    async fn score(&self, trajectory: &Trajectory, _answer: &str, _ctx: &ScoreContext) -> f32 {
        let (Some(prompt), Some(response)) = (trajectory.last_user(), trajectory.last_assistant())
        else {
            return 0.0;
        };
        match self.judge.judge(&prompt.content, &response.content).await {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!(judge = self.judge.name(), %e, "judge call degraded to 0.0");
                0.0
            }
        }
    }

    fn name(&self) -> &'static str {
        "judge"
    }
}
