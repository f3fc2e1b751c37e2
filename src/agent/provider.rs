//! Model invocation boundary.
//!
//! [`ChatProvider`] is the seam at which any tool-calling-capable LLM can be
//! substituted; tests script it with a mock. The shipped implementation
//! speaks the OpenAI chat-completions protocol, which all supported vendors
//! expose. Provider choice is resolved once at startup from a prioritized
//! candidate list — never from ambient env lookups at call time.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AgentConfig;
use crate::error::{InsightError, Result};

/// One tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// Provider-assigned call id, echoed back in the tool result message.
    pub id: String,
    pub name: String,
    /// Parsed arguments. If the model emitted unparseable JSON this holds
    /// the raw string, which the tool dispatcher rejects as a validation
    /// failure rather than a crash.
    pub arguments: Value,
}

/// One completion step returned by the model.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: String,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A chat-completion backend with tool calling.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Request one completion step. `messages` is the full conversation so
    /// far; `tools` are OpenAI-style function declarations.
    async fn chat(&self, messages: &[Value], tools: &[Value]) -> Result<ChatResponse>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// A known provider the auto-selection scan can pick.
struct ProviderCandidate {
    name: &'static str,
    api_key_env: &'static str,
    base_url: &'static str,
    default_model: &'static str,
}

/// Evaluated in order; the first candidate whose API key env var is set wins.
const PROVIDER_CANDIDATES: &[ProviderCandidate] = &[
    ProviderCandidate {
        name: "openai",
        api_key_env: "OPENAI_API_KEY",
        base_url: "https://api.openai.com/v1",
        default_model: "gpt-4o-mini",
    },
    ProviderCandidate {
        name: "gemini",
        api_key_env: "GEMINI_API_KEY",
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
        default_model: "gemini-2.5-flash",
    },
    ProviderCandidate {
        name: "openrouter",
        api_key_env: "OPENROUTER_API_KEY",
        base_url: "https://openrouter.ai/api/v1",
        default_model: "openai/gpt-4o-mini",
    },
];

/// Create a provider from config.
///
/// `agent.provider = "auto"` scans [`PROVIDER_CANDIDATES`] in priority
/// order; a concrete name selects that candidate directly. Fails hard when
/// no candidate has its API key set.
pub fn create_provider(config: &AgentConfig) -> anyhow::Result<Box<dyn ChatProvider>> {
    let candidate = if config.provider == "auto" {
        PROVIDER_CANDIDATES
            .iter()
            .find(|c| std::env::var(c.api_key_env).is_ok())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no model provider available — set one of: {}",
                    PROVIDER_CANDIDATES
                        .iter()
                        .map(|c| c.api_key_env)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })?
    } else {
        PROVIDER_CANDIDATES
            .iter()
            .find(|c| c.name == config.provider)
            .ok_or_else(|| anyhow::anyhow!("unknown provider: {}", config.provider))?
    };

    let api_key = std::env::var(candidate.api_key_env)
        .map_err(|_| anyhow::anyhow!("{} is not set", candidate.api_key_env))?;

    let base_url = if config.base_url.is_empty() {
        candidate.base_url.to_string()
    } else {
        config.base_url.clone()
    };
    let model = if config.model.is_empty() {
        candidate.default_model.to_string()
    } else {
        config.model.clone()
    };

    tracing::info!(provider = candidate.name, model = %model, "model provider ready");

    Ok(Box::new(OpenAiCompatProvider::new(
        base_url,
        api_key,
        model,
        config.temperature,
    )))
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: String, api_key: String, model: String, temperature: f64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            temperature,
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    /// The wire protocol carries arguments as a JSON-encoded string.
    arguments: String,
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn chat(&self, messages: &[Value], tools: &[Value]) -> Result<ChatResponse> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "tools": tools,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InsightError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InsightError::Transport(format!(
                "provider returned HTTP {status}: {text}"
            )));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| InsightError::Transport(format!("malformed response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InsightError::Transport("response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments));
                ToolCallRequest {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".into()),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_order_is_openai_first() {
        assert_eq!(PROVIDER_CANDIDATES[0].name, "openai");
        assert!(PROVIDER_CANDIDATES.iter().any(|c| c.name == "gemini"));
    }

    #[test]
    fn unknown_provider_name_fails() {
        let config = AgentConfig {
            provider: "nonsense".into(),
            ..AgentConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn response_without_tool_calls_terminates() {
        let response = ChatResponse {
            content: Some("done".into()),
            tool_calls: vec![],
            finish_reason: "stop".into(),
        };
        assert!(!response.has_tool_calls());
    }
}
