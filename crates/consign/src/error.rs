use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Structured error body the registry returns for failed API calls.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub http_status: u16,
    pub error_code: i64,
    pub message: String,
}

impl std::fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[HTTP {}]({}) - {}",
            self.http_status, self.error_code, self.message
        )
    }
}

/// Error detail for a single registry API exchange.
#[derive(Debug, Error)]
pub enum ApiFailure {
    /// Upload exceeded the registry's size limit; the body is not JSON here.
    #[error("payload too large")]
    PayloadTooLarge,
    /// The registry returned a decodable structured error body.
    #[error("API responded with error: {0}")]
    Registry(ApiErrorBody),
    /// Non-2xx response without a JSON body.
    #[error("API responded with HTTP code {0}")]
    Http(u16),
    /// The response claimed JSON but the body could not be decoded.
    #[error("failed to read error json")]
    MalformedErrorBody(#[source] serde_json::Error),
    /// Connection-level failure or unreadable response.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Error taxonomy for the whole core. Every variant is fatal to the
/// operation that raised it; callers decide whether to abort the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("registry {0} must not be blank")]
    InvalidCredentials(&'static str),

    #[error("failed to read deployments data from {path}")]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {operation}: {source}")]
    Api {
        /// What the client was doing, including the deployment id where
        /// one is in play (e.g. "drop deployment 28d9e...").
        operation: String,
        #[source]
        source: ApiFailure,
    },

    #[error("failed to write archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl Error {
    /// Wrap an `io::Error` with the file/operation it interrupted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn api(operation: impl Into<String>, source: ApiFailure) -> Self {
        Error::Api {
            operation: operation.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_body_display_matches_registry_convention() {
        let body = ApiErrorBody {
            http_status: 400,
            error_code: 42,
            message: "bad bundle".to_string(),
        };
        assert_eq!(body.to_string(), "[HTTP 400](42) - bad bundle");
    }

    #[test]
    fn api_error_body_parses_camel_case() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"httpStatus": 401, "errorCode": 10, "message": "unauthorized"}"#,
        )
        .expect("deserialize");
        assert_eq!(body.http_status, 401);
        assert_eq!(body.error_code, 10);
    }

    #[test]
    fn api_error_carries_operation_and_cause() {
        let err = Error::api("drop deployment d-1", ApiFailure::Http(500));
        let msg = err.to_string();
        assert!(msg.contains("drop deployment d-1"));
        assert!(msg.contains("HTTP code 500"));
    }

    #[test]
    fn io_error_keeps_context() {
        let err = Error::io(
            "failed to read staged file a.jar",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("a.jar"));
    }
}
