//! Gemini API client with function calling
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use super::ChatModel;
use crate::config::LlmConfig;
use crate::error::ChatError;
use crate::models::{CompletionRequest, ModelMessage, ModelResponse, ToolChoice, ToolInvocation, ToolSpec};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> crate::Result<ModelResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ChatError::Configuration("GEMINI_API_KEY not configured".to_string())
        })?;

        let body = build_request(request);
        info!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                ChatError::Llm(format!("Gemini API request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response ({}): {}", status, error_text);
            return Err(classify_error(status, &error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            ChatError::Llm(format!("Gemini parse error: {}", e))
        })?;

        parse_response(gemini_response)
    }
}

/// Map a non-success status and body onto the error taxonomy
fn classify_error(status: StatusCode, body: &str) -> ChatError {
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("API_KEY_INVALID")
    {
        ChatError::UpstreamAuth(format!("Gemini rejected the API key ({})", status))
    } else if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        ChatError::UpstreamRateLimited(format!("Gemini returned {}", status))
    } else {
        ChatError::Llm(format!("Gemini API error ({}): {}", status, body))
    }
}

//
// ================= Wire Types =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct FunctionCallingConfig {
    mode: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

//
// ================= Conversion =================
//

fn text_part(text: impl Into<String>) -> Part {
    Part {
        text: Some(text.into()),
        ..Part::default()
    }
}

fn build_request(request: &CompletionRequest) -> GeminiRequest {
    let mut contents: Vec<Content> = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        match message {
            ModelMessage::User(text) => contents.push(Content {
                role: Some("user".to_string()),
                parts: vec![text_part(text.as_str())],
            }),
            ModelMessage::Assistant(text) => contents.push(Content {
                role: Some("model".to_string()),
                parts: vec![text_part(text.as_str())],
            }),
            ModelMessage::ToolCalls { text, calls } => {
                let mut parts = Vec::with_capacity(calls.len() + 1);
                if let Some(text) = text {
                    parts.push(text_part(text.as_str()));
                }
                parts.extend(calls.iter().map(|call| Part {
                    function_call: Some(FunctionCall {
                        id: Some(call.id.clone()),
                        name: call.name.clone(),
                        args: call.arguments.clone(),
                    }),
                    ..Part::default()
                }));
                contents.push(Content {
                    role: Some("model".to_string()),
                    parts,
                });
            }
            ModelMessage::ToolResult(result) => {
                let part = Part {
                    function_response: Some(FunctionResponse {
                        id: Some(result.call_id.clone()),
                        name: result.name.clone(),
                        response: serde_json::json!({
                            "name": result.name,
                            "content": result.content,
                        }),
                    }),
                    ..Part::default()
                };

                // Responses to one round travel together in a single turn
                match contents.last_mut().filter(|last| is_function_response_turn(last)) {
                    Some(last) => last.parts.push(part),
                    None => contents.push(Content {
                        role: Some("user".to_string()),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    let (tools, tool_config) = if request.tools.is_empty() {
        (Vec::new(), None)
    } else {
        let mode = match request.tool_choice {
            ToolChoice::Auto => "AUTO",
            ToolChoice::None => "NONE",
        };
        (
            vec![GeminiTool {
                function_declarations: request.tools.iter().map(declaration).collect(),
            }],
            Some(ToolConfig {
                function_calling_config: FunctionCallingConfig { mode },
            }),
        )
    };

    GeminiRequest {
        contents,
        system_instruction: Content {
            role: None,
            parts: vec![text_part(request.system_prompt.as_str())],
        },
        tools,
        tool_config,
        generation_config: GenerationConfig {
            temperature: request.temperature,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 2048,
        },
    }
}

fn is_function_response_turn(content: &Content) -> bool {
    !content.parts.is_empty() && content.parts.iter().all(|p| p.function_response.is_some())
}

fn declaration(spec: &ToolSpec) -> FunctionDeclaration {
    FunctionDeclaration {
        name: spec.name.clone(),
        description: spec.description.clone(),
        parameters: to_gemini_schema(&spec.parameters),
    }
}

/// Gemini's schema dialect spells types in upper case (`OBJECT`, `STRING`)
fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let converted = match (key.as_str(), value) {
                        ("type", Value::String(t)) => Value::String(t.to_uppercase()),
                        _ => to_gemini_schema(value),
                    };
                    (key.clone(), converted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

fn parse_response(response: GeminiResponse) -> crate::Result<ModelResponse> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ChatError::Llm(format!("No response from Gemini API: {}", reason)));
    };

    debug!(finish_reason = ?candidate.finish_reason, "Gemini candidate received");

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let mut texts = Vec::new();
    let mut calls = Vec::new();

    for part in parts {
        if let Some(text) = part.text {
            texts.push(text);
        }
        if let Some(call) = part.function_call {
            calls.push(ToolInvocation {
                id: call.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                name: call.name,
                arguments: call.args,
            });
        }
    }

    let text = texts.join("");
    if calls.is_empty() {
        Ok(ModelResponse::Text(text))
    } else {
        Ok(ModelResponse::ToolCalls {
            text: Some(text).filter(|t| !t.trim().is_empty()),
            calls,
        })
    }
}
