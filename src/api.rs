//! Chat completion calls against an OpenAI-compatible endpoint.
//!
//! # Architecture
//!
//! - [`ChatModel`]: core trait sending the whole conversation and returning
//!   the reply text
//! - [`OpenAiChat`]: the HTTP implementation
//! - [`SamplingParams`]: model name and fixed sampling parameters
//!
//! Each call is a pure function of the message history plus the sampling
//! parameters. There is no retry: a failed call is reported to the user and
//! nothing is appended to the conversation.

use crate::error::ModelError;
use crate::models::ConversationMessage;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Models offered to the user, with a short description.
pub const SUPPORTED_MODELS: &[(&str, &str)] = &[
    (
        "gpt-4o-mini",
        "modelo compacto otimizado para raciocínio rápido e eficaz; a pesquisa de menor custo",
    ),
    (
        "gpt-4o",
        "modelo topo de linha, versátil e altamente inteligente; a pesquisa de maior custo",
    ),
    ("gpt-4.1-nano", "o modelo GPT-4.1 mais rápido e econômico"),
];

/// Model name and sampling parameters sent with every request.
///
/// Every field has a default, so a YAML config file only needs the keys it
/// overrides:
///
/// ```yaml
/// model: gpt-4o
/// temperature: 0.3
/// presence_penalty: 0.1
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingParams {
    /// One of [`SUPPORTED_MODELS`].
    pub model: String,
    pub temperature: f32,
    /// Upper bound on the reply length.
    pub max_tokens: u32,
    /// Omitted from the request when `None`.
    pub presence_penalty: Option<f32>,
    /// Omitted from the request when `None`.
    pub frequency_penalty: Option<f32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 4000,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }
}

/// Trait for conversational LLM interaction.
///
/// Implementations receive the whole conversation, hidden messages
/// included, on every call and must not keep state between calls.
pub trait ChatModel {
    /// Send the full history and return the assistant reply.
    ///
    /// # Arguments
    ///
    /// * `messages` - The conversation so far, oldest first
    ///
    /// # Returns
    ///
    /// The reply text, or a [`ModelError`] for transport failures, non-2xx
    /// statuses and responses without message content.
    async fn complete(&self, messages: &[ConversationMessage]) -> Result<String, ModelError>;

    /// Name of the model answering, shown in reports.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// OpenAI chat completions client authenticated with a bearer key.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    api_key: String,
    params: SamplingParams,
}

impl OpenAiChat {
    /// Create a client for `endpoint` authenticated with `api_key`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Full chat completions URL
    /// * `api_key` - Sent as a bearer token
    /// * `params` - Model and sampling parameters used for every call
    ///
    /// # Errors
    ///
    /// Fails only if the underlying HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let chat = OpenAiChat::new(
    ///     "https://api.openai.com/v1/chat/completions",
    ///     "sk-...",
    ///     SamplingParams::default(),
    /// )?;
    /// let reply = chat.complete(conversation.messages()).await?;
    /// ```
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        params: SamplingParams,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            params,
        })
    }

    fn request_body<'a>(&'a self, messages: &'a [ConversationMessage]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.params.model,
            messages,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            presence_penalty: self.params.presence_penalty,
            frequency_penalty: self.params.frequency_penalty,
        }
    }
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("endpoint", &self.endpoint)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ChatModel for OpenAiChat {
    #[instrument(level = "info", skip_all, fields(model = %self.params.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ConversationMessage]) -> Result<String, ModelError> {
        let t0 = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&body, 300),
                "Model call failed"
            );
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let raw = response.text().await?;
        let reply = parse_reply(&raw);
        match &reply {
            Ok(text) => info!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                reply_bytes = text.len(),
                "Model call succeeded"
            ),
            Err(e) => error!(
                error = %e,
                response_preview = %truncate_for_log(&raw, 300),
                "Model returned an unexpected payload"
            ),
        }
        reply
    }

    fn model_name(&self) -> &str {
        &self.params.model
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn parse_reply(raw: &str) -> Result<String, ModelError> {
    let parsed: CompletionResponse =
        serde_json::from_str(raw).map_err(|e| ModelError::Malformed(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ModelError::Malformed("response has no message content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::serve_once;

    #[test]
    fn test_request_body_shape() {
        let chat = OpenAiChat::new("http://localhost/v1", "sk-test", SamplingParams::default()).unwrap();
        let messages = vec![
            ConversationMessage::hidden_user("Texto: artigos"),
            ConversationMessage::user("Diretriz: resuma"),
        ];
        let body = serde_json::to_value(chat.request_body(&messages)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 4000);
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Texto: artigos");
        assert!(body["messages"][0].get("visible").is_none());
        assert!(body.get("presence_penalty").is_none());
        assert!(body.get("frequency_penalty").is_none());
    }

    #[test]
    fn test_request_body_with_penalties() {
        let params = SamplingParams {
            presence_penalty: Some(0.5),
            frequency_penalty: Some(0.25),
            ..SamplingParams::default()
        };
        let chat = OpenAiChat::new("http://localhost/v1", "sk-test", params).unwrap();
        let body = serde_json::to_value(chat.request_body(&[])).unwrap();
        assert_eq!(body["presence_penalty"], 0.5);
        assert_eq!(body["frequency_penalty"], 0.25);
    }

    #[test]
    fn test_parse_reply() {
        let raw = r#"{"id": "x", "choices": [{"index": 0, "message": {"role": "assistant", "content": "Análise pronta."}}]}"#;
        assert_eq!(parse_reply(raw).unwrap(), "Análise pronta.");
    }

    #[test]
    fn test_parse_reply_malformed() {
        assert!(matches!(parse_reply("not json"), Err(ModelError::Malformed(_))));
        assert!(matches!(parse_reply(r#"{"choices": []}"#), Err(ModelError::Malformed(_))));
        assert!(matches!(
            parse_reply(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(ModelError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_against_local_server() {
        let reply = r#"{"choices": [{"message": {"role": "assistant", "content": "Selic estável."}}]}"#;
        let (base, request) = serve_once("200 OK", "application/json", reply).await;
        let chat = OpenAiChat::new(format!("{base}/v1/chat/completions"), "sk-test", SamplingParams::default()).unwrap();

        let text = chat.complete(&[ConversationMessage::user("Diretriz: resuma")]).await.unwrap();

        assert_eq!(text, "Selic estável.");
        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /v1/chat/completions http/1.1"));
        assert!(request.contains("authorization: bearer sk-test"));
    }

    #[tokio::test]
    async fn test_complete_maps_error_status() {
        let (base, _request) = serve_once("429 Too Many Requests", "application/json", r#"{"error": "rate limited"}"#).await;
        let chat = OpenAiChat::new(base, "sk-test", SamplingParams::default()).unwrap();

        let err = chat.complete(&[ConversationMessage::user("Olá")]).await.unwrap_err();

        assert!(matches!(err, ModelError::Status { status: 429, ref body } if body.contains("rate limited")));
    }

    #[test]
    fn test_sampling_params_from_partial_yaml() {
        let params: SamplingParams = serde_yaml::from_str("model: gpt-4o\nmax_tokens: 1500\n").unwrap();
        assert_eq!(params.model, "gpt-4o");
        assert_eq!(params.max_tokens, 1500);
        assert!((params.temperature - 0.2).abs() < f32::EPSILON);
    }
}
