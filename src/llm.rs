// Thin client for OpenAI-compatible chat completion endpoints that asks the
// model for a structured `{reasoning, reply}` answer.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "Provide responses in JSON format with:
    - \"reasoning\": Your step-by-step analysis
    - \"reply\": Final answer/solution
    Use plain text without markdown formatting.";

const NO_REASONING: &str = "No reasoning provided";
const NO_REPLY: &str = "No answer provided";

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("Authentication failed: Check API key")]
    Authentication,

    #[error("API request failed with status {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

/// How much effort a reasoning model should spend before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Result of a completed query.
///
/// `reasoning` and `reply` are passed through as the model sent them; the
/// default text is used only when the key is absent. `Raw` is returned when
/// the model ignored the JSON instruction; the text is kept so the caller can
/// still show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelOutput {
    Structured {
        reasoning: Value,
        reply: Value,
        model: String,
    },
    Raw {
        raw_response: String,
        error: String,
    },
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let api_key = env("OPENAI_API_KEY")
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let base_url = env("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(
        &self,
        model: &str,
        prompt: &str,
        effort: Option<ReasoningEffort>,
    ) -> Result<ModelOutput, LlmError> {
        if prompt.trim().is_empty() {
            return Err(LlmError::EmptyPrompt);
        }

        let body = build_request(model, prompt, effort);
        tracing::debug!(model, effort = ?effort, "Sending chat completion request");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(LlmError::Authentication);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("Completion request failed with {status}");
            return Err(LlmError::Api { status, body });
        }

        let completion: CompletionResponse = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no message content".into()))?;

        Ok(parse_content(model, &content))
    }
}

fn build_request(model: &str, prompt: &str, effort: Option<ReasoningEffort>) -> Value {
    let mut body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt },
        ],
        "response_format": { "type": "json_object" },
    });
    if let Some(effort) = effort {
        body["reasoning_effort"] = json!(effort.as_str());
    }
    body
}

fn parse_content(model: &str, content: &str) -> ModelOutput {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => {
            let field = |name: &str, default: &str| {
                value
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Value::String(default.to_string()))
            };
            ModelOutput::Structured {
                reasoning: field("reasoning", NO_REASONING),
                reply: field("reply", NO_REPLY),
                model: model.to_string(),
            }
        }
        Err(_) => ModelOutput::Raw {
            raw_response: content.to_string(),
            error: "Invalid JSON format".to_string(),
        },
    }
}
