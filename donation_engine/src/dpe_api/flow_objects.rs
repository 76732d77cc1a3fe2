use dpg_common::Amount;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Donation, DonorInfo},
    dpe_api::errors::DonationFlowError,
};

fn require_non_empty(field: &str, value: &str) -> Result<(), DonationFlowError> {
    if value.trim().is_empty() {
        Err(DonationFlowError::InvalidRequest(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn validate_donor(donor: &DonorInfo) -> Result<(), DonationFlowError> {
    require_non_empty("Donor name", &donor.name)?;
    require_non_empty("Donor contact", &donor.contact)
}

//--------------------------------------   IssueOrderRequest   --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueOrderRequest {
    pub campaign_id: i64,
    /// In the campaign currency's minor unit
    pub amount: Amount,
    pub donor: DonorInfo,
}

impl IssueOrderRequest {
    pub fn new(campaign_id: i64, amount: Amount, donor: DonorInfo) -> Self {
        Self { campaign_id, amount, donor }
    }

    pub fn validate(&self) -> Result<(), DonationFlowError> {
        validate_donor(&self.donor)
    }
}

//--------------------------------------      IssuedOrder      --------------------------------------------------------
/// Everything a client needs to open the gateway checkout for a new donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedOrder {
    pub donation_id: i64,
    pub gateway_order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub gateway_public_key: String,
    pub receipt: String,
}

//--------------------------------------  VerifyPaymentRequest --------------------------------------------------------
/// The (order id, payment id, signature) triple the gateway handed to the donor's client after payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub donation_id: i64,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

impl VerifyPaymentRequest {
    pub fn validate(&self) -> Result<(), DonationFlowError> {
        require_non_empty("Gateway order id", &self.gateway_order_id)?;
        require_non_empty("Gateway payment id", &self.gateway_payment_id)?;
        require_non_empty("Signature", &self.signature)
    }
}

//--------------------------------------  PaymentVerification  --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub donation: Donation,
    /// False when the donation had already been settled and this call changed nothing.
    pub newly_credited: bool,
}

impl PaymentVerification {
    pub fn credited(donation: Donation) -> Self {
        Self { donation, newly_credited: true }
    }

    pub fn unchanged(donation: Donation) -> Self {
        Self { donation, newly_credited: false }
    }
}

//--------------------------------------     RefundRequest     --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    pub donation_id: i64,
    /// Partial refund amount. `None` refunds whatever is left.
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl RefundRequest {
    pub fn full(donation_id: i64) -> Self {
        Self { donation_id, amount: None, reason: None }
    }

    pub fn partial(donation_id: i64, amount: Amount) -> Self {
        Self { donation_id, amount: Some(amount), reason: None }
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

//-------------------------------------- OfflineDonationRequest -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineDonationRequest {
    pub campaign_id: i64,
    pub amount: Amount,
    pub donor: DonorInfo,
    /// Receipt, cheque or bank transfer reference
    #[serde(default)]
    pub reference: Option<String>,
}

impl OfflineDonationRequest {
    pub fn validate(&self) -> Result<(), DonationFlowError> {
        validate_donor(&self.donor)
    }
}

//--------------------------------------  GatewayPaymentEvent  --------------------------------------------------------
/// A payment lifecycle notification pushed by the gateway, already authenticated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayPaymentEvent {
    /// The donor's payment is authorized but not captured yet.
    Authorized { order_id: String, payment_id: String },
    /// The donor's payment attempt failed.
    Failed { order_id: String, payment_id: Option<String>, reason: String },
    /// Anything else the gateway sends. Acknowledged and ignored.
    Other { event: String },
}
