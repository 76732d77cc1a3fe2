use std::fmt::Display;

use chrono::{DateTime, Utc};
use donation_engine::{
    db_types::{Donation, DonationStatus, PaymentChannel},
    flow_objects::PaymentVerification,
};
use dpg_common::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The body of an admin refund request. An empty body refunds everything that is left on the donation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundParams {
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignDonationsParams {
    #[serde(default)]
    pub status: Option<DonationStatus>,
}

/// What anyone holding a donation id may see. Donor contact details and gateway credentials are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicDonation {
    pub id: i64,
    pub campaign_id: i64,
    pub amount: Amount,
    pub refunded_amount: Amount,
    pub currency: String,
    pub channel: PaymentChannel,
    pub status: DonationStatus,
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Donation> for PublicDonation {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id,
            campaign_id: d.campaign_id,
            amount: d.amount,
            refunded_amount: d.refunded_amount,
            currency: d.currency,
            channel: d.channel,
            status: d.status,
            gateway_order_id: d.gateway_order_id,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub donation: PublicDonation,
    /// False if the donation had already been credited before this request
    pub newly_credited: bool,
}

impl From<PaymentVerification> for VerificationResult {
    fn from(v: PaymentVerification) -> Self {
        Self { donation: v.donation.into(), newly_credited: v.newly_credited }
    }
}
