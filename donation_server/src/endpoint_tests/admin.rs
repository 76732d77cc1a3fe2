use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test::TestRequest,
};
use donation_engine::{
    db_types::{Donation, DonationStatus, DonationStatusChange, NewCampaign, PaymentChannel},
    flow_objects::IssuedOrder,
    traits::{GatewayError, GatewayOrderReceipt, GatewayRefundReceipt},
    CampaignAudit,
};
use dpg_common::Amount;
use serde_json::json;

use super::{
    helpers::{init_app, send, sign, TestContext, ADMIN_KEY},
    mocks::{obliging_gateway, MockGateway, MOCK_PUBLIC_KEY},
};
use crate::middleware::API_KEY_HEADER;

/// Issues and verifies a donation through the public routes, returning the order.
async fn completed_donation<S, B>(app: &S, campaign_id: i64, amount: i64, payment_id: &str) -> IssuedOrder
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let body = json!({
        "campaign_id": campaign_id,
        "amount": amount,
        "donor": { "name": "Arjun Das", "contact": "+91 90000 11111" }
    });
    let (status, body) = send(app, TestRequest::post().uri("/donations/order").set_json(body).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order: IssuedOrder = serde_json::from_str(&body).unwrap();
    let confirmation = json!({
        "donation_id": order.donation_id,
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": payment_id,
        "signature": sign(&order.gateway_order_id, payment_id),
    });
    let (status, body) =
        send(app, TestRequest::post().uri("/donations/verify").set_json(confirmation).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    order
}

fn admin_post(uri: &str) -> TestRequest {
    TestRequest::post().uri(uri).insert_header((API_KEY_HEADER, ADMIN_KEY))
}

fn admin_get(uri: &str) -> TestRequest {
    TestRequest::get().uri(uri).insert_header((API_KEY_HEADER, ADMIN_KEY))
}

#[actix_web::test]
async fn admin_routes_require_the_key() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Orphanage roof", Amount::from_major(10_000))).await;
    let app = init_app(&ctx, MockGateway::new()).await;
    let uri = format!("/api/campaigns/{}/audit", campaign.id);

    let (status, body) = send(&app, TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "An admin key is required.");

    let req = TestRequest::get().uri(&uri).insert_header((API_KEY_HEADER, "not-the-key")).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid admin key.");

    let (status, body) = send(&app, admin_get(&uri).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let audit: CampaignAudit = serde_json::from_str(&body).unwrap();
    assert!(audit.is_consistent());

    let req = TestRequest::post().uri("/api/donations/1/refund").to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.teardown().await;
}

#[actix_web::test]
async fn full_and_partial_refunds() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("School library", Amount::from_major(10_000))).await;
    let mut gateway = MockGateway::new();
    gateway.expect_public_key().return_const(MOCK_PUBLIC_KEY.to_string());
    gateway.expect_create_order().returning(|req| Ok(GatewayOrderReceipt { order_id: format!("order_{}", req.receipt) }));
    gateway
        .expect_refund_payment()
        .withf(|req| req.payment_id == "pay_Lib00001" && req.amount == Amount::from_major(3_000))
        .times(1)
        .returning(|_| Ok(GatewayRefundReceipt { refund_id: "rfnd_Lib00001".into() }));
    gateway
        .expect_refund_payment()
        .withf(|req| req.payment_id == "pay_Lib00002" && req.amount == Amount::from_major(1_000))
        .times(1)
        .returning(|_| Ok(GatewayRefundReceipt { refund_id: "rfnd_Lib00002".into() }));
    let app = init_app(&ctx, gateway).await;
    let first = completed_donation(&app, campaign.id, 300_000, "pay_Lib00001").await;
    let second = completed_donation(&app, campaign.id, 400_000, "pay_Lib00002").await;
    assert_eq!(ctx.collected(campaign.id).await, Amount::from_major(7_000));

    // An empty body refunds everything
    let req = admin_post(&format!("/api/donations/{}/refund", first.donation_id)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let donation: Donation = serde_json::from_str(&body).unwrap();
    assert_eq!(donation.status, DonationStatus::Refunded);
    assert_eq!(donation.gateway_refund_id.as_deref(), Some("rfnd_Lib00001"));
    assert_eq!(ctx.collected(campaign.id).await, Amount::from_major(4_000));

    let req = admin_post(&format!("/api/donations/{}/refund", second.donation_id))
        .set_json(json!({ "amount": 100_000, "reason": "Pledge reduced" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let donation: Donation = serde_json::from_str(&body).unwrap();
    assert_eq!(donation.refunded_amount, Amount::from_major(1_000));
    assert_eq!(donation.status_reason.as_deref(), Some("Pledge reduced"));
    assert_eq!(ctx.collected(campaign.id).await, Amount::from_major(3_000));

    // Refunded is terminal
    let req = admin_post(&format!("/api/donations/{}/refund", first.donation_id)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = admin_get(&format!("/api/donations/{}/history", first.donation_id)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<DonationStatusChange> = serde_json::from_str(&body).unwrap();
    let statuses = history.iter().map(|h| h.new_status).collect::<Vec<_>>();
    assert_eq!(statuses, vec![DonationStatus::Pending, DonationStatus::Completed, DonationStatus::Refunded]);
    ctx.teardown().await;
}

#[actix_web::test]
async fn bad_refund_requests_change_nothing() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Water filters", Amount::from_major(10_000))).await;
    let mut gateway = MockGateway::new();
    gateway.expect_public_key().return_const(MOCK_PUBLIC_KEY.to_string());
    gateway.expect_create_order().returning(|req| Ok(GatewayOrderReceipt { order_id: format!("order_{}", req.receipt) }));
    gateway.expect_refund_payment().returning(|_| Err(GatewayError::Rejected("The payment has been fully refunded".into())));
    let app = init_app(&ctx, gateway).await;
    let order = completed_donation(&app, campaign.id, 50_000, "pay_Filter01").await;
    let uri = format!("/api/donations/{}/refund", order.donation_id);

    let req = admin_post(&uri).set_payload("{\"amount\": ").to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = admin_post(&uri).set_json(json!({ "amount": 50_001 })).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("refundable"), "{body}");

    let req = admin_post(&uri).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("fully refunded"), "{body}");

    let (status, _) = send(&app, admin_post("/api/donations/5150/refund").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(ctx.collected(campaign.id).await, Amount::from(50_000));
    ctx.teardown().await;
}

#[actix_web::test]
async fn offline_donations_and_campaign_listing() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Mid-day meals", Amount::from_major(10_000))).await;
    let app = init_app(&ctx, obliging_gateway()).await;
    completed_donation(&app, campaign.id, 25_000, "pay_Meals001").await;

    let offline = json!({
        "campaign_id": campaign.id,
        "amount": 120_000,
        "donor": { "name": "Ravi Menon", "contact": "ravi@example.org" },
        "reference": "NEFT-88123"
    });
    let (status, body) = send(&app, admin_post("/api/donations/offline").set_json(offline).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let donation: Donation = serde_json::from_str(&body).unwrap();
    assert_eq!(donation.channel, PaymentChannel::Offline);
    assert_eq!(donation.status, DonationStatus::Completed);
    assert_eq!(ctx.collected(campaign.id).await, Amount::from(145_000));

    // A pending donation that should not show up under Completed
    let body = json!({
        "campaign_id": campaign.id,
        "amount": 10_000,
        "donor": { "name": "Undecided", "contact": "maybe@example.org" }
    });
    send(&app, TestRequest::post().uri("/donations/order").set_json(body).to_request()).await;

    let uri = format!("/api/campaigns/{}/donations", campaign.id);
    let (status, body) = send(&app, admin_get(&uri).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let all: Vec<Donation> = serde_json::from_str(&body).unwrap();
    assert_eq!(all.len(), 3);

    let (status, body) = send(&app, admin_get(&format!("{uri}?status=Completed")).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let completed: Vec<Donation> = serde_json::from_str(&body).unwrap();
    assert_eq!(completed.len(), 2);
    assert!(completed.iter().all(|d| d.status == DonationStatus::Completed));

    let (status, body) = send(&app, admin_get(&format!("/api/campaigns/{}/audit", campaign.id)).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let audit: CampaignAudit = serde_json::from_str(&body).unwrap();
    assert_eq!(audit.recorded, Amount::from(145_000));
    assert!(audit.is_consistent());
    ctx.teardown().await;
}
