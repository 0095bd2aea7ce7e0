//! Model service implementations.
//!
//! Provides the OpenAI Responses API client. Use `create_client()` to build
//! the client described by the configuration.

pub mod openai_responses;

use crate::client::ModelClient;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;
use tracing::debug;

pub use openai_responses::OpenAiResponsesClient;

/// Whether the configured endpoint is a local server.
fn is_local_endpoint(config: &LlmConfig) -> bool {
    config.base_url.contains("localhost") || config.base_url.contains("127.0.0.1")
}

/// Resolve the API key from the environment variable named in the config.
///
/// Local endpoints (proxies, mock servers) get a placeholder key when the
/// variable is unset; remote endpoints fail with `LlmError::AuthFailed`.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String, LlmError> {
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ if is_local_endpoint(config) => {
            debug!("No API key set for local endpoint; using placeholder bearer token");
            Ok("local".to_string())
        }
        _ => Err(LlmError::AuthFailed {
            provider: format!("env var '{}' not set", config.api_key_env),
        }),
    }
}

/// Create the model client described by `config`.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn ModelClient>, LlmError> {
    Ok(Arc::new(OpenAiResponsesClient::new(config)?))
}
