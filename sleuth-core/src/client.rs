//! Model client abstraction.
//!
//! Defines the `ModelClient` trait every stage talks through, and a
//! `MockModelClient` that replays queued responses for tests and dry runs.

use crate::error::LlmError;
use crate::types::{ModelRequest, ModelResponse, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Trait for model services. One call is one request/response exchange.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `request` and wait for the full reply.
    ///
    /// Implementations must not retry; every failure is surfaced to the caller.
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, LlmError>;

    /// Name of the service/provider for log lines.
    fn provider_name(&self) -> &str;
}

/// A scripted client for tests.
///
/// Each `respond` call pops the next queued result and records the request.
/// An empty queue yields an `ApiRequest` error so a test that under-scripts a
/// run fails loudly instead of hanging on a default.
pub struct MockModelClient {
    responses: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response.
    pub fn queue_response(&self, response: ModelResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Queue a plain-text reply.
    pub fn queue_text(&self, text: &str) {
        self.queue_response(Self::text_response(text));
    }

    /// Queue a structured reply serialized from `value`.
    pub fn queue_json(&self, value: serde_json::Value) {
        self.queue_response(Self::text_response(&value.to_string()));
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> ModelResponse {
        let mut response = ModelResponse::from_text("mock-model", text);
        response.id = "resp_mock".to_string();
        response.usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        response
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of `respond` calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::ApiRequest {
                    message: "mock client has no queued response".to_string(),
                })
            })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
