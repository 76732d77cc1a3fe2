use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
    Mutex,
};

use crate::{
    helpers::sign_payment,
    traits::{
        GatewayError,
        GatewayOrderReceipt,
        GatewayOrderRequest,
        GatewayRefundReceipt,
        GatewayRefundRequest,
        PaymentGateway,
    },
};

pub const TEST_GATEWAY_SECRET: &str = "test_gateway_secret";
pub const TEST_GATEWAY_PUBLIC_KEY: &str = "rzp_test_donations";

#[derive(Debug, Default)]
struct FakeGatewayState {
    next_id: AtomicU64,
    fail_orders: AtomicBool,
    fail_refunds: AtomicBool,
    orders: Mutex<Vec<GatewayOrderRequest>>,
    refunds: Mutex<Vec<GatewayRefundRequest>>,
}

/// An in-memory payment gateway. Orders and refunds always succeed unless told otherwise, and every request is
/// recorded so tests can inspect what was sent.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Arc<FakeGatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_orders(&self, fail: bool) {
        self.state.fail_orders.store(fail, Ordering::SeqCst);
    }

    pub fn fail_refunds(&self, fail: bool) {
        self.state.fail_refunds.store(fail, Ordering::SeqCst);
    }

    /// Signs a payment the way the real gateway would.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        sign_payment(order_id, payment_id, TEST_GATEWAY_SECRET)
    }

    pub fn orders(&self) -> Vec<GatewayOrderRequest> {
        self.state.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn refunds(&self) -> Vec<GatewayRefundRequest> {
        self.state.refunds.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_id(&self) -> u64 {
        self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl PaymentGateway for FakeGateway {
    fn public_key(&self) -> String {
        TEST_GATEWAY_PUBLIC_KEY.to_string()
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrderReceipt, GatewayError> {
        if self.state.fail_orders.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        let order_id = format!("order_fake{:06}", self.next_id());
        if let Ok(mut orders) = self.state.orders.lock() {
            orders.push(request);
        }
        Ok(GatewayOrderReceipt { order_id })
    }

    async fn refund_payment(&self, request: GatewayRefundRequest) -> Result<GatewayRefundReceipt, GatewayError> {
        if self.state.fail_refunds.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected("refund declined".into()));
        }
        let refund_id = format!("rfnd_fake{:06}", self.next_id());
        if let Ok(mut refunds) = self.state.refunds.lock() {
            refunds.push(request);
        }
        Ok(GatewayRefundReceipt { refund_id })
    }
}
