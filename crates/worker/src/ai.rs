//! Chat-completions client for the external LLM service.
//!
//! The worker talks to an OpenAI-compatible `/chat/completions` endpoint
//! via [`reqwest`]. The [`AiClient`] trait is the seam that lets the
//! runner be exercised with a scripted client in tests.

use async_trait::async_trait;
use serde::Deserialize;

/// Input for a single assessment analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Pillar the assessment belongs to, when known.
    pub pillar: Option<String>,
    /// Raw assessment answers as submitted by the client.
    pub input: serde_json::Value,
}

/// Errors from the LLM client layer.
#[derive(Debug, thiserror::Error)]
pub enum AiClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("LLM API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),
}

/// Produces an analysis payload for an assessment.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Run the analysis and return the structured result payload.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<serde_json::Value, AiClientError>;
}

// ---------------------------------------------------------------------------
// Chat-completions implementation
// ---------------------------------------------------------------------------

/// Response shape of the `/chat/completions` endpoint, reduced to the
/// fields the worker reads.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You are a personal development coach. Analyze the \
user's self-assessment answers and respond with a single JSON object with the \
keys \"summary\", \"strengths\", \"growth_areas\", and \"recommendations\".";

/// HTTP client for an OpenAI-compatible chat-completions service.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    /// Create a client for the given endpoint.
    ///
    /// * `api_url` - Base URL, e.g. `https://api.openai.com/v1`.
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    /// Build a client from environment variables.
    ///
    /// | Variable     | Default                     |
    /// |--------------|-----------------------------|
    /// | `AI_API_URL` | `https://api.openai.com/v1` |
    /// | `AI_API_KEY` | (required)                  |
    /// | `AI_MODEL`   | `gpt-4o-mini`               |
    pub fn from_env() -> Self {
        let api_url = std::env::var("AI_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("AI_API_KEY").expect("AI_API_KEY must be set");
        let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Self::new(api_url, api_key, model)
    }
}

#[async_trait]
impl AiClient for ChatCompletionsClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<serde_json::Value, AiClientError> {
        let user_prompt = build_user_prompt(request);

        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AiClientError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        extract_analysis(parsed)
    }
}

/// Render the user message sent alongside the system prompt.
fn build_user_prompt(request: &AnalysisRequest) -> String {
    match &request.pillar {
        Some(pillar) => format!(
            "Pillar: {pillar}\nAssessment answers (JSON):\n{}",
            request.input
        ),
        None => format!("Assessment answers (JSON):\n{}", request.input),
    }
}

/// Pull the analysis payload out of a chat-completions response.
///
/// The model is asked for a JSON object; if the content is not valid JSON
/// it is preserved verbatim under an `analysis_text` key rather than
/// discarded.
fn extract_analysis(response: ChatCompletionResponse) -> Result<serde_json::Value, AiClientError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiClientError::MalformedResponse("response had no choices".to_string()))?;

    match serde_json::from_str(&choice.message.content) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        _ => Ok(serde_json::json!({ "analysis_text": choice.message.content })),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn response_with(content: &str) -> ChatCompletionResponse {
        ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    content: content.to_string(),
                },
            }],
        }
    }

    #[test]
    fn extract_analysis_parses_json_content() {
        let response = response_with(r#"{"summary": "doing well", "strengths": []}"#);

        let value = extract_analysis(response).unwrap();
        assert_eq!(value["summary"], "doing well");
    }

    #[test]
    fn extract_analysis_wraps_non_json_content() {
        let response = response_with("The user shows strong discipline.");

        let value = extract_analysis(response).unwrap();
        assert_eq!(value["analysis_text"], "The user shows strong discipline.");
    }

    #[test]
    fn extract_analysis_rejects_empty_choices() {
        let response = ChatCompletionResponse { choices: vec![] };

        assert_matches!(
            extract_analysis(response),
            Err(AiClientError::MalformedResponse(_))
        );
    }

    #[test]
    fn user_prompt_includes_pillar_when_present() {
        let request = AnalysisRequest {
            pillar: Some("skills".to_string()),
            input: serde_json::json!({"q1": "yes"}),
        };

        let prompt = build_user_prompt(&request);
        assert!(prompt.starts_with("Pillar: skills"));
        assert!(prompt.contains(r#""q1":"yes""#));
    }
}
