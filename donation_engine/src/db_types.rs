use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use dpg_common::{Amount, DEFAULT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------   CampaignStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CampaignStatus {
    /// The campaign is being set up and does not accept donations yet.
    Draft,
    /// The campaign is live and accepting donations.
    Active,
    /// Donations are temporarily suspended.
    Paused,
    /// The campaign has finished.
    Completed,
    /// The campaign was withdrawn.
    Cancelled,
}

impl Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "Draft"),
            CampaignStatus::Active => write!(f, "Active"),
            CampaignStatus::Paused => write!(f, "Paused"),
            CampaignStatus::Completed => write!(f, "Completed"),
            CampaignStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Active" => Ok(Self::Active),
            "Paused" => Ok(Self::Paused),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid campaign status: {s}"))),
        }
    }
}

//--------------------------------------      Campaign        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub target_amount: Amount,
    /// Running total of settled donations. Only ever changed by the reconciliation and refund flows.
    pub collected_amount: Amount,
    pub currency: String,
    pub status: CampaignStatus,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// A campaign only issues new donation orders while it is active and publicly visible.
    pub fn accepts_donations(&self) -> bool {
        self.status == CampaignStatus::Active && self.is_public
    }
}

//--------------------------------------     NewCampaign      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub target_amount: Amount,
    pub currency: String,
    pub status: CampaignStatus,
    pub is_public: bool,
}

impl NewCampaign {
    /// A new, active, public campaign in the default currency.
    pub fn new<S: Into<String>>(name: S, target_amount: Amount) -> Self {
        Self {
            name: name.into(),
            target_amount,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            status: CampaignStatus::Active,
            is_public: true,
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_visibility(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}

//--------------------------------------   DonationStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum DonationStatus {
    /// An order has been requested and the donor has not paid yet.
    Pending,
    /// The gateway has reported that the payment is authorized but not yet captured.
    Processing,
    /// The payment was verified and credited to the campaign.
    Completed,
    /// The attempt was rejected or abandoned. Terminal.
    Failed,
    /// A completed donation was reversed, in full or in part. Terminal.
    Refunded,
}

impl DonationStatus {
    /// Pending or Processing: the donation may still be completed or failed.
    pub fn is_open(&self) -> bool {
        matches!(self, DonationStatus::Pending | DonationStatus::Processing)
    }

    /// Completed or Refunded: the payment has been credited to the campaign at some point.
    pub fn is_settled(&self) -> bool {
        matches!(self, DonationStatus::Completed | DonationStatus::Refunded)
    }

    pub fn can_transition_to(&self, next: DonationStatus) -> bool {
        use DonationStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) |
                (Pending, Completed) |
                (Pending, Failed) |
                (Processing, Completed) |
                (Processing, Failed) |
                (Completed, Refunded)
        )
    }
}

impl Display for DonationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DonationStatus::Pending => write!(f, "Pending"),
            DonationStatus::Processing => write!(f, "Processing"),
            DonationStatus::Completed => write!(f, "Completed"),
            DonationStatus::Failed => write!(f, "Failed"),
            DonationStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for DonationStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid donation status: {s}"))),
        }
    }
}

//--------------------------------------   PaymentChannel     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentChannel {
    /// Paid through the payment gateway, and verified by signature.
    Gateway,
    /// Recorded by an administrator for a payment received outside the gateway (cash, cheque, bank transfer).
    Offline,
}

impl Display for PaymentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentChannel::Gateway => write!(f, "Gateway"),
            PaymentChannel::Offline => write!(f, "Offline"),
        }
    }
}

impl FromStr for PaymentChannel {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gateway" => Ok(Self::Gateway),
            "Offline" => Ok(Self::Offline),
            s => Err(ConversionError(format!("Invalid payment channel: {s}"))),
        }
    }
}

//--------------------------------------      DonorInfo       ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorInfo {
    pub name: String,
    /// Email address or phone number
    pub contact: String,
    /// Tax identifier, for donors who want a tax receipt
    #[serde(default)]
    pub tax_id: Option<String>,
}

impl DonorInfo {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, contact: S2) -> Self {
        Self { name: name.into(), contact: contact.into(), tax_id: None }
    }

    pub fn with_tax_id<S: Into<String>>(mut self, tax_id: S) -> Self {
        self.tax_id = Some(tax_id.into());
        self
    }
}

//--------------------------------------      Donation        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub campaign_id: i64,
    pub donor_name: String,
    pub donor_contact: String,
    pub donor_tax_id: Option<String>,
    pub amount: Amount,
    /// The part of `amount` that has been returned to the donor
    pub refunded_amount: Amount,
    pub currency: String,
    pub channel: PaymentChannel,
    /// Free-form reference for offline donations (receipt or cheque number)
    pub reference: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    #[serde(skip_serializing)]
    pub gateway_signature: Option<String>,
    pub gateway_refund_id: Option<String>,
    pub status: DonationStatus,
    pub status_reason: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    pub fn donor(&self) -> DonorInfo {
        DonorInfo {
            name: self.donor_name.clone(),
            contact: self.donor_contact.clone(),
            tax_id: self.donor_tax_id.clone(),
        }
    }

    /// The amount this donation currently contributes to its campaign's collected total.
    pub fn credited_amount(&self) -> Amount {
        if self.status.is_settled() {
            self.amount - self.refunded_amount
        } else {
            Amount::default()
        }
    }

    /// The amount that can still be refunded.
    pub fn refundable_amount(&self) -> Amount {
        match self.status {
            DonationStatus::Completed => self.amount - self.refunded_amount,
            _ => Amount::default(),
        }
    }
}

//--------------------------------------     NewDonation      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub campaign_id: i64,
    pub donor: DonorInfo,
    pub amount: Amount,
    pub currency: String,
    pub channel: PaymentChannel,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewDonation {
    pub fn new(campaign_id: i64, donor: DonorInfo, amount: Amount, currency: String, created_at: DateTime<Utc>) -> Self {
        Self { campaign_id, donor, amount, currency, channel: PaymentChannel::Gateway, reference: None, created_at }
    }

    pub fn offline(mut self, reference: Option<String>) -> Self {
        self.channel = PaymentChannel::Offline;
        self.reference = reference;
        self
    }
}

//--------------------------------------  GatewaySettlement   ---------------------------------------------------------
/// The verified gateway credentials that settle a donation.
#[derive(Debug, Clone)]
pub struct GatewaySettlement {
    pub donation_id: i64,
    pub gateway_payment_id: String,
    pub signature: String,
}

//--------------------------------------     RefundRecord     ---------------------------------------------------------
/// A reversal that has already been issued (or needs no gateway call) and must now be recorded.
#[derive(Debug, Clone)]
pub struct RefundRecord {
    pub donation_id: i64,
    pub amount: Amount,
    pub gateway_refund_id: Option<String>,
    pub reason: Option<String>,
}

//-------------------------------------- DonationStatusChange ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DonationStatusChange {
    pub id: i64,
    pub donation_id: i64,
    pub old_status: Option<DonationStatus>,
    pub new_status: DonationStatus,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}
