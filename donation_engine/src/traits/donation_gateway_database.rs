use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Campaign, Donation, GatewaySettlement, NewCampaign, NewDonation, RefundRecord},
    traits::CompletionResult,
};

/// This trait defines the highest level of behaviour for backends supporting the donation engine.
///
/// Each method is atomic. Methods that change a donation's status do so with a conditional write on the donation's
/// current status, so that two racing callers cannot both win. Methods that move money apply the delta to the
/// campaign's collected amount in the same transaction as the status change.
///
/// All timestamps are supplied by the caller.
#[allow(async_fn_in_trait)]
pub trait DonationGatewayDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new campaign with a zero collected amount.
    async fn insert_campaign(&self, campaign: NewCampaign, now: DateTime<Utc>) -> Result<Campaign, DonationDbError>;

    /// Stores a new donation in `Pending` status. The campaign's collected amount is not touched.
    async fn insert_pending_donation(&self, donation: NewDonation) -> Result<Donation, DonationDbError>;

    /// Binds the gateway order id to a `Pending` donation that does not have one yet.
    ///
    /// Returns `InvalidTransition` if the donation is no longer pending or already has an order id.
    async fn attach_gateway_order(
        &self,
        donation_id: i64,
        gateway_order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Donation, DonationDbError>;

    /// Moves the donation with the given gateway order id from `Pending` to `Processing`.
    ///
    /// Returns `None` if no donation was transitioned, either because the order id is unknown or because the donation
    /// has already moved on.
    async fn mark_donation_processing(
        &self,
        gateway_order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Donation>, DonationDbError>;

    /// Moves an open (`Pending` or `Processing`) donation to `Failed`, recording the reason.
    ///
    /// Returns `None` if the donation was not open, in which case nothing changes.
    async fn fail_donation(
        &self,
        donation_id: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Donation>, DonationDbError>;

    /// Settles an open donation against a verified gateway payment. In a single atomic transaction,
    /// * the donation moves to `Completed` and the payment id, signature and verification time are stored,
    /// * the donation amount is added to the campaign's collected amount.
    ///
    /// If the donation is already settled, nothing changes and `AlreadySettled` is returned. If the payment id is
    /// already bound to another donation, `PaymentIdAlreadyBound` is returned and nothing changes.
    async fn complete_donation(
        &self,
        settlement: GatewaySettlement,
        now: DateTime<Utc>,
    ) -> Result<CompletionResult, DonationDbError>;

    /// Records a refund against a `Completed` donation. In a single atomic transaction,
    /// * the donation moves to `Refunded` and the refunded amount and refund id are stored,
    /// * the refund amount is subtracted from the campaign's collected amount.
    ///
    /// Returns `None` if the donation was not `Completed` (e.g. a concurrent refund won), and nothing changes.
    async fn record_refund(&self, refund: RefundRecord, now: DateTime<Utc>) -> Result<Option<Donation>, DonationDbError>;

    /// Inserts an offline donation directly in `Completed` status and credits the campaign, atomically.
    async fn insert_offline_donation(&self, donation: NewDonation) -> Result<Donation, DonationDbError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), DonationDbError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum DonationDbError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The requested campaign {0} does not exist")]
    CampaignNotFound(i64),
    #[error("The requested donation {0} does not exist")]
    DonationNotFound(i64),
    #[error("Gateway payment {0} is already bound to another donation")]
    PaymentIdAlreadyBound(String),
    #[error("Gateway order {0} is already bound to another donation")]
    OrderIdAlreadyBound(String),
    #[error("Illegal donation state change. {0}")]
    InvalidTransition(String),
    #[error("The campaign's collected amount cannot cover this change. {0}")]
    InsufficientCollectedAmount(String),
    #[error("The campaign's collected amount cannot absorb this credit. {0}")]
    CollectedAmountOverflow(String),
}

impl From<sqlx::Error> for DonationDbError {
    fn from(e: sqlx::Error) -> Self {
        DonationDbError::DatabaseError(e.to_string())
    }
}
