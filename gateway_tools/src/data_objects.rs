use std::collections::HashMap;

use serde::{Deserialize, Serialize};

//--------------------------------------        Orders          --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGatewayOrder {
    /// In the currency's minor unit
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub notes: HashMap<String, String>,
}

impl NewGatewayOrder {
    pub fn new<S1: Into<String>, S2: Into<String>>(amount: i64, currency: S1, receipt: S2) -> Self {
        Self { amount, currency: currency.into(), receipt: receipt.into(), notes: HashMap::new() }
    }

    pub fn with_note<S1: Into<String>, S2: Into<String>>(mut self, key: S1, value: S2) -> Self {
        self.notes.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayOrder {
    pub id: String,
    #[serde(default)]
    pub entity: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub attempts: u32,
    /// Unix timestamp
    #[serde(default)]
    pub created_at: i64,
}

//--------------------------------------        Refunds         --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGatewayRefund {
    /// In the currency's minor unit
    pub amount: i64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayRefund {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    pub payment_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: i64,
}

//--------------------------------------       Payments         --------------------------------------------------------
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_reason: Option<String>,
}

impl GatewayPayment {
    /// A human-readable reason for a failed payment.
    pub fn failure_reason(&self) -> String {
        self.error_description
            .as_ref()
            .or(self.error_reason.as_ref())
            .or(self.error_code.as_ref())
            .cloned()
            .unwrap_or_else(|| "No reason given".to_string())
    }
}

//--------------------------------------       Webhooks         --------------------------------------------------------
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<EntityWrapper<GatewayPayment>>,
    #[serde(default)]
    pub order: Option<EntityWrapper<GatewayOrder>>,
}

/// A webhook delivery from the gateway. The body is signed with the webhook secret. Callers must check the signature
/// before trusting anything in here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayWebhook {
    pub event: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: i64,
}

impl GatewayWebhook {
    pub fn payment(&self) -> Option<&GatewayPayment> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}
