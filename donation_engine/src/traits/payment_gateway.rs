use dpg_common::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The external payment processor.
///
/// Implementations make network calls. Callers never hold a database transaction across these calls.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// The public key id the client needs to open the gateway's checkout for an order.
    fn public_key(&self) -> String;

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrderReceipt, GatewayError>;

    async fn refund_payment(&self, request: GatewayRefundRequest) -> Result<GatewayRefundReceipt, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    /// Amount in the currency's minor unit
    pub amount_minor_units: i64,
    pub currency: String,
    /// Our reference for the order, echoed back by the gateway
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderReceipt {
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefundRequest {
    pub payment_id: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefundReceipt {
    pub refund_id: String,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("The payment gateway returned an unexpected response: {0}")]
    InvalidResponse(String),
}
