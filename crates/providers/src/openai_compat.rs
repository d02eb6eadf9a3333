//! OpenAI-compatible agent backend.
//!
//! Works with: Ollama, OpenAI, OpenRouter, Gemini (OpenAI endpoint), vLLM,
//! Groq, and any server exposing `/v1/chat/completions`.
//!
//! One agent call is one non-streaming chat completion: the identity's
//! instruction becomes the system message and the input the user message.

use async_trait::async_trait;
use conductor_core::agent::AgentIdentity;
use conductor_core::error::InvocationError;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An agent invoker backed by an OpenAI-compatible endpoint.
pub struct OpenAiCompatInvoker {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatInvoker {
    /// Create a new OpenAI-compatible invoker.
    ///
    /// Fails with [`InvocationError::NotConfigured`] if the HTTP client
    /// cannot be constructed.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, InvocationError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| InvocationError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: "llama3.2".into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(120),
            client,
        })
    }

    /// Create an Ollama invoker (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Result<Self, InvocationError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Create an OpenAI invoker (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, InvocationError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Upper bound on a single call, reported as [`InvocationError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The system message for an agent: its instruction, followed by the
    /// capabilities the model may assume it has.
    fn system_prompt(agent: &AgentIdentity) -> String {
        if agent.capabilities.is_empty() {
            return agent.instruction.clone();
        }

        let mut prompt = agent.instruction.clone();
        prompt.push_str("\n\nAvailable tools:");
        for capability in &agent.capabilities {
            prompt.push_str(&format!("\n- {}: {}", capability.name, capability.description));
        }
        prompt
    }

    fn to_api_messages(request: &InvokeRequest) -> Vec<ApiMessage> {
        vec![
            ApiMessage {
                role: "system".into(),
                content: Some(Self::system_prompt(&request.agent)),
            },
            ApiMessage {
                role: "user".into(),
                content: Some(request.input.clone()),
            },
        ]
    }

    fn request_body(&self, request: &InvokeRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(request),
            "temperature": self.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

/// Map a non-success HTTP status to the matching invocation failure.
fn status_error(status: u16, body: String, retry_after: Option<u64>) -> InvocationError {
    match status {
        429 => InvocationError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(5),
        },
        401 | 403 => InvocationError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        408 | 504 => InvocationError::Timeout(format!("backend returned {status}")),
        _ => InvocationError::Api {
            status_code: status,
            message: body,
        },
    }
}

fn transport_error(name: &str, timeout: Duration, e: reqwest::Error) -> InvocationError {
    if e.is_timeout() {
        InvocationError::Timeout(format!(
            "backend '{name}' did not answer within {}s",
            timeout.as_secs()
        ))
    } else {
        InvocationError::Network(e.to_string())
    }
}

/// Pull the assistant text out of a completion response.
fn extract_content(response: ApiResponse) -> Result<String, InvocationError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InvocationError::MalformedResponse("No choices in response".into()))?;

    choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| InvocationError::MalformedResponse("Empty message content".into()))
}

#[async_trait]
impl AgentInvoker for OpenAiCompatInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            backend = %self.name,
            model = %self.model,
            agent = %request.agent.name,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, self.timeout, e))?;

        let status = response.status().as_u16();

        if status != 200 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let error_body = response.text().await.unwrap_or_default();
            warn!(backend = %self.name, status, body = %error_body, "Backend returned error");
            return Err(status_error(status, error_body, retry_after));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            InvocationError::MalformedResponse(format!("Failed to parse response: {e}"))
        })?;

        extract_content(api_response)
    }

    async fn health_check(&self) -> Result<bool, InvocationError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| transport_error(&self.name, self.timeout, e))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
