use crate::{Result, RolloutError};

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Base URL of the chat-completions API (e.g. https://openrouter.ai/api/v1).
    pub api_base: String,
    /// Judge model identifier sent in the request body.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Prompt template with `{prompt}` and `{response}` placeholders.
    pub prompt_template: String,
    /// Per-call timeout.
    pub timeout_ms: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-3.5-sonnet".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            prompt_template: crate::judge::DEFAULT_JUDGE_TEMPLATE.to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl JudgeConfig {
    #[tracing::instrument(skip_all)]
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(RolloutError::InvalidConfig(
                "judge.api_base is required".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(RolloutError::InvalidConfig(
                "judge.model is required".to_string(),
            ));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(RolloutError::InvalidConfig(
                "judge.api_key_env is required".to_string(),
            ));
        }
        if !self.prompt_template.contains("{prompt}")
            || !self.prompt_template.contains("{response}")
        {
            return Err(RolloutError::InvalidConfig(
                "judge.prompt_template must contain {prompt} and {response}".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(RolloutError::InvalidConfig(
                "judge.timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Interpreter binary run for each snippet.
    pub interpreter: String,
    /// Arguments passed before the program is fed on stdin.
    pub args: Vec<String>,
    /// Wall-clock limit for one execution.
    pub timeout_ms: u64,
    /// Cap applied separately to captured stdout and stderr.
    pub max_output_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            // -I: isolated mode, ignores PYTHON* env vars and user site-packages.
            // -: read the program from stdin.
            args: vec!["-I".to_string(), "-".to_string()],
            timeout_ms: 10_000,
            max_output_bytes: 16 * 1024,
        }
    }
}

impl SandboxConfig {
    #[tracing::instrument(skip_all)]
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.trim().is_empty() {
            return Err(RolloutError::InvalidConfig(
                "sandbox.interpreter is required".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(RolloutError::InvalidConfig(
                "sandbox.timeout_ms must be > 0".to_string(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(RolloutError::InvalidConfig(
                "sandbox.max_output_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CodeEnvConfig {
    /// Maximum number of assistant turns before the episode is cut off.
    pub max_turns: usize,
    pub sandbox: SandboxConfig,
}

impl Default for CodeEnvConfig {
    fn default() -> Self {
        Self {
            max_turns: 4,
            sandbox: SandboxConfig::default(),
        }
    }
}

impl CodeEnvConfig {
    #[tracing::instrument(skip_all)]
    pub fn validate(&self) -> Result<()> {
        if self.max_turns == 0 {
            return Err(RolloutError::InvalidConfig(
                "code_env.max_turns must be > 0".to_string(),
            ));
        }
        self.sandbox.validate()
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset.
    pub filter: String,
    /// Emit JSON-formatted events instead of human-readable ones.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    #[tracing::instrument(skip_all)]
    pub fn validate(&self) -> Result<()> {
        if self.filter.trim().is_empty() {
            return Err(RolloutError::InvalidConfig(
                "logging.filter is required".to_string(),
            ));
        }
        Ok(())
    }
}
