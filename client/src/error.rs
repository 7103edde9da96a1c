use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with `success: false`.
    #[error("Server returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("Response from {0} carried no data")]
    MissingData(String),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// The server could not be reached or is failing, as opposed to having
    /// rejected the request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ClientError::Api { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
