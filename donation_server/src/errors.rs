use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use donation_engine::DonationFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    DonationError(#[from] DonationFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::DonationError(e) => match e {
                DonationFlowError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                DonationFlowError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                DonationFlowError::RefundAmountExceedsDonation { .. } => StatusCode::BAD_REQUEST,
                DonationFlowError::SignatureInvalid => StatusCode::UNAUTHORIZED,
                DonationFlowError::CampaignNotFound(_) => StatusCode::NOT_FOUND,
                DonationFlowError::DonationNotFound(_) => StatusCode::NOT_FOUND,
                DonationFlowError::PaymentIdReused(_) => StatusCode::CONFLICT,
                DonationFlowError::NotRefundable(_) => StatusCode::CONFLICT,
                DonationFlowError::InvalidStatusTransition(_) => StatusCode::CONFLICT,
                DonationFlowError::GatewayRefundFailed(_) => StatusCode::BAD_GATEWAY,
                DonationFlowError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DonationFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Don't leak storage details to clients
        let message = match self {
            Self::DonationError(DonationFlowError::DatabaseError(_)) | Self::BackendError(_) => {
                "An error occurred on the backend of the server.".to_string()
            },
            e => e.to_string(),
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}
