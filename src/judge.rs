//! HTTP client for the external judge model.
//!
//! One synchronous-per-trajectory call to a chat-completions endpoint; the
//! reply is treated as unstructured text and the score recovered by pattern
//! search. Transport failures surface as `Err` and are mapped to the 0.0
//! fallback at the reward boundary, never out of the pipeline.

use crate::config::JudgeConfig;
use crate::extract::extract_judge_score;
use crate::{Judge, Result, RolloutError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Fixed system instruction constraining the judge to a bare float.
pub const JUDGE_SYSTEM_PROMPT: &str = "You are an objective judge. Follow the instructions carefully, and output only a single float number between 0.0 and 1.0 representing your judgment score.";

/// Default template rendered with `{prompt}` and `{response}`.
pub const DEFAULT_JUDGE_TEMPLATE: &str = "Judge the following response for quality.\n\
Prompt: {prompt}\n\
Response: {response}\n\
\n\
Evaluation criteria:\n\
- Correctness and accuracy of the response\n\
- Clarity and coherence\n\
- Completeness in addressing the prompt\n\
- Appropriate level of detail\n\
\n\
Provide your judgment as a single float between 0.0 and 1.0 where:\n\
0.0 = completely incorrect or irrelevant\n\
0.3 = major issues or gaps\n\
0.5 = partially correct with significant room for improvement\n\
0.7 = mostly correct with minor issues\n\
1.0 = excellent, complete and accurate\n\
\n\
Output only the float number, nothing else.";

/// Judge backed by a chat-completions API. Holds no per-call mutable state;
/// safe to share across concurrent scoring tasks.
#[derive(Debug)]
pub struct HttpJudge {
    config: JudgeConfig,
    api_key: String,
    http: reqwest::Client,
}

impl HttpJudge {
    /// Resolve the API key from the configured environment variable. A
    /// missing or empty credential is a fatal configuration error raised
    /// here, before any request is sent.
    #[tracing::instrument(skip_all)]
    pub fn from_env(config: JudgeConfig) -> Result<Self> {
        config.validate()?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RolloutError::MissingCredential(format!("{} must be set", config.api_key_env))
            })?;
        Self::with_api_key(config, api_key)
    }

    #[tracing::instrument(skip_all)]
    pub fn with_api_key(config: JudgeConfig, api_key: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RolloutError::Unexpected(format!("build http client: {e}")))?;
        Ok(Self {
            config,
            api_key: api_key.into(),
            http,
        })
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    fn render_prompt(&self, prompt: &str, response: &str) -> String {
        self.config
            .prompt_template
            .replace("{prompt}", prompt)
            .replace("{response}", response)
    }
}

#[async_trait]
impl Judge for HttpJudge {
    #[tracing::instrument(skip_all)]
    async fn judge(&self, prompt: &str, response: &str) -> Result<f32> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": JUDGE_SYSTEM_PROMPT},
                {"role": "user", "content": self.render_prompt(prompt, response)},
            ],
        });

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RolloutError::Judge(format!("judge request failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(RolloutError::Judge(format!(
                "judge request failed ({status}): {body}"
            )));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| RolloutError::Judge(format!("judge response parse failed: {e}")))?;
        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();

        // An unparsable reply is not a transport failure: it collapses to
        // the same 0.0 the caller would apply anyway.
        Ok(extract_judge_score(content).unwrap_or(0.0).clamp(0.0, 1.0))
    }

    fn name(&self) -> &'static str {
        "http_judge"
    }
}
