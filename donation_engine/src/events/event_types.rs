use dpg_common::Amount;
use serde::{Deserialize, Serialize};

use crate::db_types::Donation;

/// A donation was verified and credited to its campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationCompletedEvent {
    pub donation: Donation,
}

impl DonationCompletedEvent {
    pub fn new(donation: Donation) -> Self {
        Self { donation }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationFailedEvent {
    pub donation: Donation,
}

impl DonationFailedEvent {
    pub fn new(donation: Donation) -> Self {
        Self { donation }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRefundedEvent {
    pub donation: Donation,
    /// The amount returned to the donor by this refund
    pub amount: Amount,
}

impl DonationRefundedEvent {
    pub fn new(donation: Donation, amount: Amount) -> Self {
        Self { donation, amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    DonationCompleted(DonationCompletedEvent),
    DonationFailed(DonationFailedEvent),
    DonationRefunded(DonationRefundedEvent),
}
