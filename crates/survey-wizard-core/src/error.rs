//! Core error types for survey-wizard-core.
//!
//! Every fallible operation in the library reports one of the enums below.
//! None of them is fatal to the process: the controller turns remote failures
//! into degraded state and surfaces validation/flow errors inline.

use std::path::PathBuf;
use thiserror::Error;

use crate::onboarding::Page;

/// Core error type for survey-wizard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Backend request errors
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Page/step sequencing errors
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the remote survey client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The configured base URL cannot be used to build endpoint URLs
    #[error("Invalid base URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Connection refused, DNS failure, broken body, ...
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout
    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Non-2xx response
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The task running the request panicked or was cancelled
    #[error("Request to {endpoint} was aborted: {message}")]
    Aborted { endpoint: String, message: String },

    /// 2xx response whose body is not the expected shape
    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport { .. } | ApiError::Timeout { .. } => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::InvalidUrl { .. } | ApiError::Aborted { .. } | ApiError::Decode { .. } => false,
        }
    }

    pub(crate) fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Decode {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            ApiError::Transport {
                endpoint: endpoint.to_string(),
                source: err,
            }
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The config directory cannot be determined or created
    #[error("Config directory unavailable: {0}")]
    DirUnavailable(String),
}

/// Local validation errors. Raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Likert answer outside the closed scale
    #[error("Answer {value} is outside the scale {min}..={max}")]
    AnswerOutOfRange { value: i64, min: u8, max: u8 },

    /// Required form field left blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Chat message is empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// Return code is empty after trimming
    #[error("User code is empty")]
    EmptyUserCode,

    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: &'static str,
        index: usize,
        len: usize,
    },

    /// The wizard has no questions to operate on
    #[error("No questions are loaded")]
    QuestionsNotLoaded,
}

/// Page and identity sequencing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The requested action has no edge from the current page
    #[error("Cannot {action} from the {from:?} page")]
    InvalidTransition { from: Page, action: &'static str },

    /// Home is disabled while the survey is in progress
    #[error("Returning home is disabled while the survey is in progress")]
    HomeDisabled,

    /// Usercode is assigned once per session
    #[error("A user code is already assigned to this session")]
    IdentityAlreadySet,

    /// An operation needs a usercode that has not been assigned
    #[error("No user code is assigned to this session")]
    IdentityMissing,

    /// Server rejected the return code
    #[error("Invalid code. Please try again.")]
    InvalidUserCode,

    /// Leaving Instructions requires the demographics collected earlier
    #[error("No pending demographics to register")]
    NoPendingDemographics,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_transient_only_for_server_side_codes() {
        let server = ApiError::Status {
            endpoint: "/questions".into(),
            status: 503,
            body: String::new(),
        };
        let client = ApiError::Status {
            endpoint: "/questions".into(),
            status: 404,
            body: String::new(),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(ApiError::Timeout {
            endpoint: "/questions".into()
        }
        .is_transient());
    }

    #[test]
    fn flow_errors_render_inline_messages() {
        assert_eq!(
            FlowError::InvalidUserCode.to_string(),
            "Invalid code. Please try again."
        );
        let err = FlowError::InvalidTransition {
            from: Page::Front,
            action: "accept consent",
        };
        assert_eq!(err.to_string(), "Cannot accept consent from the Front page");
    }

    #[test]
    fn validation_error_converts_into_core_error() {
        let err: CoreError = ValidationError::EmptyMessage.into();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyMessage)));
    }
}
