use donation_engine::traits::{
    GatewayError,
    GatewayOrderReceipt,
    GatewayOrderRequest,
    GatewayRefundReceipt,
    GatewayRefundRequest,
    PaymentGateway,
};
use mockall::mock;

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        fn public_key(&self) -> String;
        async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrderReceipt, GatewayError>;
        async fn refund_payment(&self, request: GatewayRefundRequest) -> Result<GatewayRefundReceipt, GatewayError>;
    }
}

pub const MOCK_PUBLIC_KEY: &str = "rzp_test_mock";

/// A gateway that hands out order ids derived from the receipt, and refunds anything.
pub fn obliging_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_public_key().return_const(MOCK_PUBLIC_KEY.to_string());
    gateway
        .expect_create_order()
        .returning(|req| Ok(GatewayOrderReceipt { order_id: format!("order_{}", req.receipt) }));
    gateway
        .expect_refund_payment()
        .returning(|req| Ok(GatewayRefundReceipt { refund_id: format!("rfnd_{}", req.payment_id) }));
    gateway
}
