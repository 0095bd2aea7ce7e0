//! Error types for the Sleuth research pipeline.
//!
//! Uses `thiserror` for public API error types. The three classes that end a
//! run are transport failures talking to the model service (`LlmError`),
//! responses that do not fit the expected shape (`ValidationError`), and the
//! user walking away from a required prompt (`AbortError`).

/// Top-level error type for the Sleuth core library.
#[derive(Debug, thiserror::Error)]
pub enum SleuthError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Aborted: {0}")]
    Aborted(#[from] AbortError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SleuthError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            SleuthError::Validation(_) => 2,
            SleuthError::Llm(_) => 3,
            SleuthError::Aborted(_) => 4,
            SleuthError::Config(_) => 5,
            _ => 1,
        }
    }
}

/// Transport-level failures talking to the model service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Malformed response body: {message}")]
    MalformedBody { message: String },
}

/// A model reply that could not be coerced into the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("response does not match schema '{schema}': {message}")]
    SchemaMismatch { schema: String, message: String },

    #[error("{stage} stage returned no text")]
    EmptyOutput { stage: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from the pipeline state machine.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Research result requested before the research stage completed")]
    NoResult,
}

/// The user ended input at a prompt that required an answer.
#[derive(Debug, thiserror::Error)]
pub enum AbortError {
    #[error("input closed at the {prompt} prompt")]
    InputClosed { prompt: String },
}

/// A type alias for results using the top-level `SleuthError`.
pub type Result<T> = std::result::Result<T, SleuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_llm() {
        let err = SleuthError::Llm(LlmError::ApiRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_validation() {
        let err = SleuthError::Validation(ValidationError::SchemaMismatch {
            schema: "triage_response".into(),
            message: "missing field `needs_clarification`".into(),
        });
        assert_eq!(
            err.to_string(),
            "Validation error: response does not match schema 'triage_response': \
             missing field `needs_clarification`"
        );
    }

    #[test]
    fn test_error_display_abort() {
        let err = SleuthError::Aborted(AbortError::InputClosed {
            prompt: "save".into(),
        });
        assert_eq!(err.to_string(), "Aborted: input closed at the save prompt");
    }

    #[test]
    fn test_error_display_config() {
        let err = SleuthError::Config(ConfigError::ParseError {
            message: "invalid type for `pipeline.variant`".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Configuration parse error: invalid type for `pipeline.variant`"
        );
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_exit_codes_by_class() {
        let validation: SleuthError = ValidationError::EmptyOutput {
            stage: "research".into(),
        }
        .into();
        let transport: SleuthError = LlmError::Timeout { timeout_secs: 30 }.into();
        let abort: SleuthError = AbortError::InputClosed {
            prompt: "query".into(),
        }
        .into();
        let io: SleuthError = std::io::Error::other("disk full").into();

        assert_eq!(validation.exit_code(), 2);
        assert_eq!(transport.exit_code(), 3);
        assert_eq!(abort.exit_code(), 4);
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: SleuthError = serde_err.into();
        assert!(matches!(err, SleuthError::Serialization(_)));
    }

    #[test]
    fn test_llm_error_variants() {
        let err = LlmError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(err.to_string(), "Rate limited by provider, retry after 60s");

        let err = LlmError::AuthFailed {
            provider: "openai".into(),
        };
        assert_eq!(err.to_string(), "Authentication failed for provider openai");
    }
}
