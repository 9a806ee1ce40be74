use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("OVHcloud API error (status code {status}): {class}: \"{message}\" (X-OVH-Query-Id: {query_id})")]
    ApiError {
        status: u16,
        class: String,
        message: String,
        query_id: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The entity behind the path no longer exists
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
