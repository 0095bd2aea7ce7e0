//! OpenAI Responses API client.
//!
//! Talks to `POST {base_url}/responses`, the endpoint that supports both
//! strict JSON-schema replies and hosted tools such as web search. Works
//! against any service that mirrors that endpoint (Azure, local proxies).

use crate::client::ModelClient;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{ModelRequest, ModelResponse, ResponseFormat, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "openai";

/// Client for the OpenAI Responses API.
pub struct OpenAiResponsesClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_secs: Option<u64>,
}

impl OpenAiResponsesClient {
    /// Create a new client from configuration.
    ///
    /// Reads the API key from the environment variable named in `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = super::resolve_api_key(config)?;
        Self::new_with_key(config, api_key)
    }

    /// Create a new client with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| LlmError::Connection {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build the JSON request body for a model request.
    fn request_body(request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "instructions": request.instructions,
            "input": request.input,
        });

        if let ResponseFormat::JsonSchema { name, schema } = &request.response_format {
            body["text"] = json!({
                "format": {
                    "type": "json_schema",
                    "name": name,
                    "schema": schema,
                    "strict": true,
                }
            });
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| json!({ "type": t.wire_name() }))
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }

    /// Concatenate every `output_text` part of every `message` item.
    ///
    /// Some gateways add a top-level `output_text` convenience field; it wins
    /// when present.
    fn collect_output_text(body: &Value) -> String {
        if let Some(text) = body.get("output_text").and_then(|t| t.as_str()) {
            return text.to_string();
        }

        let mut parts: Vec<&str> = Vec::new();
        for item in body
            .get("output")
            .and_then(|o| o.as_array())
            .into_iter()
            .flatten()
        {
            if item.get("type").and_then(|t| t.as_str()) != Some("message") {
                continue;
            }
            for part in item
                .get("content")
                .and_then(|c| c.as_array())
                .into_iter()
                .flatten()
            {
                match part.get("type").and_then(|t| t.as_str()) {
                    Some("output_text") => {
                        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                            parts.push(text);
                        }
                    }
                    Some("refusal") => {
                        warn!(
                            refusal = part.get("refusal").and_then(|r| r.as_str()).unwrap_or(""),
                            "Model refused to answer"
                        );
                    }
                    _ => {}
                }
            }
        }
        parts.concat()
    }

    /// Parse a Responses API body into a `ModelResponse`.
    fn parse_response(body: Value, model: &str) -> Result<ModelResponse, LlmError> {
        if !body.is_object() {
            return Err(LlmError::MalformedBody {
                message: "response body is not a JSON object".to_string(),
            });
        }

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(LlmError::ApiRequest {
                message: format!("Response failed: {}", message),
            });
        }

        match body.get("status").and_then(|s| s.as_str()) {
            Some("failed") => {
                return Err(LlmError::ApiRequest {
                    message: "Response status: failed".to_string(),
                });
            }
            Some("incomplete") => {
                let reason = body
                    .get("incomplete_details")
                    .and_then(|d| d.get("reason"))
                    .and_then(|r| r.as_str())
                    .unwrap_or("unknown");
                return Err(LlmError::ApiRequest {
                    message: format!("Response incomplete: {}", reason),
                });
            }
            _ => {}
        }

        if body.get("output").is_none() && body.get("output_text").is_none() {
            return Err(LlmError::MalformedBody {
                message: "No output in response".to_string(),
            });
        }

        let usage_obj = body.get("usage");
        let usage = TokenUsage {
            input_tokens: usage_obj
                .and_then(|u| u.get("input_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
            output_tokens: usage_obj
                .and_then(|u| u.get("output_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
        };

        let id = body
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or_default()
            .to_string();
        let resp_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();
        let output_text = Self::collect_output_text(&body);

        Ok(ModelResponse {
            id,
            model: resp_model,
            output_text,
            raw: body,
            usage,
        })
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(
        status: reqwest::StatusCode,
        retry_after: Option<u64>,
        body: &str,
        timeout_secs: Option<u64>,
    ) -> LlmError {
        let api_message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        });

        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed ({})", status);
                LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                }
            }
            429 => {
                let retry_secs = retry_after
                    .or_else(|| {
                        // "Rate limit reached ... Please try again in 20s."
                        api_message.as_deref().and_then(|msg| {
                            msg.split("in ").last().and_then(|s| {
                                s.trim_end_matches('.').trim_end_matches('s').parse::<u64>().ok()
                            })
                        })
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            408 | 504 => LlmError::Timeout {
                timeout_secs: timeout_secs.unwrap_or(0),
            },
            code if code >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, api_message.as_deref().unwrap_or(body)),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, api_message.as_deref().unwrap_or(body)),
            },
        }
    }

    /// Map a reqwest send/read failure to the appropriate LlmError.
    fn map_transport_error(err: reqwest::Error, timeout_secs: Option<u64>) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                timeout_secs: timeout_secs.unwrap_or(0),
            }
        } else if err.is_connect() {
            LlmError::Connection {
                message: err.to_string(),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiResponsesClient {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        let url = format!("{}/responses", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            url = %url,
            model = %request.model,
            tools = request.tools.len(),
            structured = matches!(request.response_format, ResponseFormat::JsonSchema { .. }),
            "Sending Responses API request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, self.timeout_secs))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let response_body = response
            .text()
            .await
            .map_err(|e| Self::map_transport_error(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(Self::map_http_error(
                status,
                retry_after,
                &response_body,
                self.timeout_secs,
            ));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::MalformedBody {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(json, &request.model)
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
