use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The gateway did not respond in time: {0}")]
    Timeout(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl GatewayApiError {
    /// Server-side and transport failures. Retrying may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RestResponseError(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            Self::Initialization(_) | Self::JsonError(_) => false,
        }
    }
}
