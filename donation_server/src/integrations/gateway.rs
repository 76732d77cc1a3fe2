//! Glue between the donation engine and the payment gateway's REST API.
use donation_engine::{
    events::{EventHandlers, EventHooks},
    flow_objects::GatewayPaymentEvent,
    traits::{
        GatewayError,
        GatewayOrderReceipt,
        GatewayOrderRequest,
        GatewayRefundReceipt,
        GatewayRefundRequest,
        PaymentGateway,
    },
};
use gateway_tools::{GatewayApi, GatewayApiError, GatewayConfig, GatewayWebhook, NewGatewayOrder, NewGatewayRefund};
use log::*;

pub const DONATION_EVENT_BUFFER_SIZE: usize = 25;

/// A [`PaymentGateway`] backed by the gateway's REST API.
#[derive(Clone)]
pub struct GatewayClient {
    api: GatewayApi,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config)?;
        Ok(Self { api })
    }
}

/// Transport failures and 5xx responses are outages. Any other error response is a refusal.
pub fn gateway_error(e: GatewayApiError) -> GatewayError {
    match e {
        e if e.is_transient() => GatewayError::Unavailable(e.to_string()),
        GatewayApiError::JsonError(s) => GatewayError::InvalidResponse(s),
        GatewayApiError::Initialization(s) => GatewayError::Unavailable(s),
        e => GatewayError::Rejected(e.to_string()),
    }
}

impl PaymentGateway for GatewayClient {
    fn public_key(&self) -> String {
        self.api.key_id().to_string()
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrderReceipt, GatewayError> {
        let order = NewGatewayOrder::new(request.amount_minor_units, request.currency, request.receipt.clone())
            .with_note("receipt", request.receipt);
        let order = self.api.create_order(order).await.map_err(gateway_error)?;
        Ok(GatewayOrderReceipt { order_id: order.id })
    }

    async fn refund_payment(&self, request: GatewayRefundRequest) -> Result<GatewayRefundReceipt, GatewayError> {
        let refund = NewGatewayRefund { amount: request.amount.value(), ..Default::default() };
        let refund = self.api.refund_payment(&request.payment_id, refund).await.map_err(gateway_error)?;
        Ok(GatewayRefundReceipt { refund_id: refund.id })
    }
}

/// Translates a webhook delivery into the payment event the engine understands.
///
/// Payment events without an order id can't be matched to a donation, so they are treated like any other event.
pub fn payment_event_from_webhook(webhook: GatewayWebhook) -> GatewayPaymentEvent {
    let order_id = webhook.payment().and_then(|p| p.order_id.clone());
    match (webhook.event.as_str(), order_id) {
        ("payment.authorized", Some(order_id)) => {
            let payment_id = webhook.payment().map(|p| p.id.clone()).unwrap_or_default();
            GatewayPaymentEvent::Authorized { order_id, payment_id }
        },
        ("payment.failed", Some(order_id)) => {
            let payment = webhook.payment();
            GatewayPaymentEvent::Failed {
                order_id,
                payment_id: payment.map(|p| p.id.clone()),
                reason: payment.map(|p| p.failure_reason()).unwrap_or_default(),
            }
        },
        (event, _) => GatewayPaymentEvent::Other { event: event.to_string() },
    }
}

/// Event handlers that keep a record of every settled, failed and refunded donation in the server log.
pub fn create_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_donation_completed(|ev| {
            let d = ev.donation;
            Box::pin(async move {
                info!(
                    "📬️ Donation #{} of {} {} from {} credited to campaign #{}",
                    d.id, d.amount, d.currency, d.donor_name, d.campaign_id
                );
            })
        })
        .on_donation_failed(|ev| {
            let d = ev.donation;
            Box::pin(async move {
                info!(
                    "📬️ Donation #{} for campaign #{} failed. {}",
                    d.id,
                    d.campaign_id,
                    d.status_reason.unwrap_or_default()
                );
            })
        })
        .on_donation_refunded(|ev| {
            let amount = ev.amount;
            let d = ev.donation;
            Box::pin(async move {
                info!("📬️ Donation #{} refunded {amount} {}. Campaign #{} debited", d.id, d.currency, d.campaign_id);
            })
        });
    EventHandlers::new(DONATION_EVENT_BUFFER_SIZE, hooks)
}
