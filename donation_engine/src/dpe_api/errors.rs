use dpg_common::Amount;
use thiserror::Error;

use crate::traits::DonationDbError;

#[derive(Debug, Clone, Error)]
pub enum DonationFlowError {
    #[error("Campaign {0} does not exist or is not accepting donations")]
    CampaignNotFound(i64),
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("The payment gateway is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("Donation {0} does not exist")]
    DonationNotFound(i64),
    #[error("The payment signature is not valid")]
    SignatureInvalid,
    #[error("Gateway payment {0} has already been credited to another donation")]
    PaymentIdReused(String),
    #[error("Donation {0} cannot be refunded in its current state")]
    NotRefundable(i64),
    #[error("Cannot refund {requested}. Only {available} is refundable")]
    RefundAmountExceedsDonation { requested: Amount, available: Amount },
    #[error("The payment gateway did not refund the payment. {0}")]
    GatewayRefundFailed(String),
    #[error("Illegal donation state change. {0}")]
    InvalidStatusTransition(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DonationDbError> for DonationFlowError {
    fn from(e: DonationDbError) -> Self {
        match e {
            DonationDbError::CampaignNotFound(id) => Self::CampaignNotFound(id),
            DonationDbError::DonationNotFound(id) => Self::DonationNotFound(id),
            DonationDbError::PaymentIdAlreadyBound(payment_id) => Self::PaymentIdReused(payment_id),
            DonationDbError::InvalidTransition(s) => Self::InvalidStatusTransition(s),
            DonationDbError::CollectedAmountOverflow(s) => Self::InvalidAmount(s),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
