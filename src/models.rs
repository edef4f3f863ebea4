use crate::{Result, RolloutError};
use chrono::{DateTime, Utc};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// Ordered message history of one rollout episode. Ordering is
/// caller-preserved; scoring never mutates a trajectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub messages: Vec<Message>,
}

impl Trajectory {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: Vec<Message>) {
        self.messages.extend(messages);
    }

    pub fn last_of(&self, role: Role) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == role)
    }

    pub fn last_user(&self) -> Option<&Message> {
        self.last_of(Role::User)
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.last_of(Role::Assistant)
    }

    pub fn last_tool(&self) -> Option<&Message> {
        self.last_of(Role::Tool)
    }

    pub fn first_assistant(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::Assistant)
    }

    pub fn assistant_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }
}

/// One dataset record: a seed prompt plus the ground-truth answer. The
/// answer's shape depends on the environment (boxed/hash-delimited value,
/// gold program output, free text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub prompt: Vec<Message>,
    pub answer: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Example {
    pub fn new(prompt: Vec<Message>, answer: impl Into<String>) -> Self {
        Self {
            prompt,
            answer: answer.into(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub id: String,
    pub examples: Vec<Example>,
}

impl Dataset {
    #[tracing::instrument(skip_all)]
    pub fn new(id: impl Into<String>, examples: Vec<Example>) -> Result<Self> {
        if examples.is_empty() {
            return Err(RolloutError::InvalidArgument(
                "dataset must contain at least one example".to_string(),
            ));
        }
        Ok(Self {
            id: id.into(),
            examples,
        })
    }

    #[tracing::instrument(skip_all)]
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ds: Dataset = serde_json::from_str(s)?;
        if ds.examples.is_empty() {
            return Err(RolloutError::InvalidArgument(
                "dataset must contain at least one example".to_string(),
            ));
        }
        Ok(ds)
    }

    /// Load a JSON-lines file with one [`Example`] per line. Any I/O failure
    /// is a `DataUnavailable` configuration error.
    #[tracing::instrument]
    pub fn from_jsonl_path(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RolloutError::DataUnavailable(format!("read {}: {e}", path.display()))
        })?;
        let mut examples = Vec::new();
        for (i, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let ex: Example = serde_json::from_str(line).map_err(|e| {
                RolloutError::DataUnavailable(format!(
                    "parse {} line {}: {e}",
                    path.display(),
                    i + 1
                ))
            })?;
            examples.push(ex);
        }
        if examples.is_empty() {
            return Err(RolloutError::DataUnavailable(format!(
                "{} contains no examples",
                path.display()
            )));
        }
        Ok(Self {
            id: path.display().to_string(),
            examples,
        })
    }

    #[tracing::instrument(skip_all)]
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[tracing::instrument(skip(self))]
    pub fn split_train_holdout(&self, holdout_ratio: f32, seed: u64) -> Result<(Dataset, Dataset)> {
        if !(0.0 < holdout_ratio && holdout_ratio < 1.0) {
            return Err(RolloutError::InvalidArgument(
                "holdout_ratio must be in (0,1)".to_string(),
            ));
        }

        let n = self.examples.len();
        if n < 2 {
            return Err(RolloutError::InvalidArgument(
                "dataset must contain at least two examples to split".to_string(),
            ));
        }

        let holdout_n = ((n as f32) * holdout_ratio)
            .round()
            .clamp(1.0, (n - 1) as f32) as usize;

        let mut idxs: Vec<usize> = (0..n).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        idxs.shuffle(&mut rng);

        let (holdout_idxs, train_idxs) = idxs.split_at(holdout_n);
        let holdout = Dataset {
            id: format!("{}:holdout", self.id),
            examples: holdout_idxs
                .iter()
                .map(|&i| self.examples[i].clone())
                .collect(),
        };
        let train = Dataset {
            id: format!("{}:train", self.id),
            examples: train_idxs
                .iter()
                .map(|&i| self.examples[i].clone())
                .collect(),
        };
        Ok((train, holdout))
    }
}

/// Structured outcome of one sandboxed execution. Every failure mode of the
/// code under test is represented here rather than raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Body of the tool message appended to the trajectory after execution.
    pub fn render(&self) -> String {
        if self.timed_out {
            return "execution timed out".to_string();
        }
        if let Some(err) = &self.error {
            return err.clone();
        }
        self.stdout.trim_end().to_string()
    }
}

/// Score produced by one reward spec for one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecScore {
    pub name: String,
    pub weight: f32,
    pub score: f32,
}

/// Per-spec scores for one trajectory, in rubric registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub scores: Vec<SpecScore>,
}

impl RewardBreakdown {
    pub fn get(&self, name: &str) -> Option<f32> {
        self.scores.iter().find(|s| s.name == name).map(|s| s.score)
    }
}

/// One finished rollout paired with its scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRollout {
    pub example: Example,
    pub trajectory: Trajectory,
    pub breakdown: RewardBreakdown,
    pub reward: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutReport {
    pub id: Ulid,
    pub created_at: DateTime<Utc>,
    pub env: String,
    pub rollouts: Vec<ScoredRollout>,
}

impl RolloutReport {
    #[tracing::instrument(skip_all)]
    pub fn new(env: impl Into<String>, rollouts: Vec<ScoredRollout>) -> Self {
        Self {
            id: Ulid::new(),
            created_at: Utc::now(),
            env: env.into(),
            rollouts,
        }
    }

    pub fn mean_reward(&self) -> f32 {
        if self.rollouts.is_empty() {
            return 0.0;
        }
        self.rollouts.iter().map(|r| r.reward).sum::<f32>() / (self.rollouts.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> Dataset {
        let examples = (0..n)
            .map(|i| Example::new(vec![Message::user(format!("q{i}"))], format!("a{i}")))
            .collect();
        Dataset::new("test", examples).unwrap()
    }

    #[test]
    fn trajectory_helpers_find_latest_messages() {
        let t = Trajectory::new(vec![
            Message::system("sys"),
            Message::user("first question"),
            Message::assistant("first answer"),
            Message::user("second question"),
            Message::assistant("second answer"),
        ]);
        assert_eq!(t.last_user().unwrap().content, "second question");
        assert_eq!(t.last_assistant().unwrap().content, "second answer");
        assert_eq!(t.first_assistant().unwrap().content, "first answer");
        assert_eq!(t.assistant_count(), 2);
        assert!(t.last_tool().is_none());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert!(matches!(
            Dataset::new("x", vec![]),
            Err(RolloutError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_jsonl_file_is_data_unavailable() {
        let err = Dataset::from_jsonl_path(std::path::Path::new("/nonexistent/ds.jsonl"))
            .unwrap_err();
        assert!(matches!(err, RolloutError::DataUnavailable(_)));
    }

    #[test]
    fn jsonl_roundtrip() {
        let dir = std::env::temp_dir().join(format!("rollouts-test-{}", Ulid::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ds.jsonl");
        let ds = dataset(3);
        let lines: Vec<String> = ds
            .examples
            .iter()
            .map(|e| serde_json::to_string(e).unwrap())
            .collect();
        std::fs::write(&path, lines.join("\n")).unwrap();

        let loaded = Dataset::from_jsonl_path(&path).unwrap();
        assert_eq!(loaded.examples, ds.examples);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn split_is_deterministic_and_partitions() {
        let ds = dataset(10);
        let (train_a, holdout_a) = ds.split_train_holdout(0.2, 7).unwrap();
        let (train_b, holdout_b) = ds.split_train_holdout(0.2, 7).unwrap();
        assert_eq!(train_a.examples, train_b.examples);
        assert_eq!(holdout_a.examples, holdout_b.examples);
        assert_eq!(holdout_a.examples.len(), 2);
        assert_eq!(train_a.examples.len() + holdout_a.examples.len(), 10);
    }

    #[test]
    fn message_roles_serialize_lowercase() {
        let m = Message::tool("out");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["role"], "tool");
    }

    #[test]
    fn execution_result_renders_error_over_stdout() {
        let r = ExecutionResult {
            stdout: "partial".to_string(),
            stderr: "Traceback".to_string(),
            error: Some("ZeroDivisionError: division by zero".to_string()),
            timed_out: false,
        };
        assert_eq!(r.render(), "ZeroDivisionError: division by zero");

        let t = ExecutionResult {
            timed_out: true,
            ..Default::default()
        };
        assert_eq!(t.render(), "execution timed out");
    }
}
