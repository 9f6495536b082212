//! Client error types.

use serde::Deserialize;
use studyhub_core::CoreError;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while talking to the hosted backend.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// WebSocket failure on the realtime channel.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Sign-up succeeded but the account must be confirmed by e-mail.
    #[error("Confirm your e-mail address before signing in")]
    ConfirmationRequired,

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<ClientError> for CoreError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(e) => CoreError::Network(e.to_string()),
            ClientError::Api { status: 401, .. } => CoreError::NotAuthenticated,
            ClientError::Api { status, message } => CoreError::Backend { status, message },
            ClientError::WebSocket(e) => CoreError::Realtime(e.to_string()),
            ClientError::Decode(s) => CoreError::Serialization(s),
            ClientError::ConfirmationRequired => {
                CoreError::Validation(ClientError::ConfirmationRequired.to_string())
            }
            ClientError::Config(s) => CoreError::Config(s),
        }
    }
}

/// Error body shapes used by the REST, auth and storage services.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message, falling back to the raw body.
    pub(crate) fn message(raw: &str) -> String {
        let body: ErrorBody = serde_json::from_str(raw).unwrap_or_default();
        let main = body
            .message
            .or(body.msg)
            .or(body.error_description)
            .or(body.error);
        match (main, body.details) {
            (Some(m), Some(d)) if !d.is_empty() => format!("{m} ({d})"),
            (Some(m), _) => m,
            (None, _) if raw.trim().is_empty() => "empty response".to_string(),
            (None, _) => raw.trim().to_string(),
        }
    }
}

/// Turn a non-success response into [`ClientError::Api`].
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message: ErrorBody::message(&raw),
    })
}
