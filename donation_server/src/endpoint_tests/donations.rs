use actix_web::{http::StatusCode, test::TestRequest};
use donation_engine::{
    db_types::{DonationStatus, NewCampaign},
    flow_objects::IssuedOrder,
    traits::{GatewayError, GatewayOrderReceipt},
};
use dpg_common::Amount;
use serde_json::{json, Value};

use super::{
    helpers::{init_app, send, sign, TestContext, ADMIN_KEY},
    mocks::{obliging_gateway, MockGateway, MOCK_PUBLIC_KEY},
};
use crate::{
    data_objects::{PublicDonation, VerificationResult},
    middleware::API_KEY_HEADER,
};

fn order_request(campaign_id: i64, amount: i64) -> Value {
    json!({
        "campaign_id": campaign_id,
        "amount": amount,
        "donor": { "name": "Meera Iyer", "contact": "meera@example.org" }
    })
}

#[actix_web::test]
async fn health_check() {
    let ctx = TestContext::new().await;
    let app = init_app(&ctx, MockGateway::new()).await;
    let (status, body) = send(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
    ctx.teardown().await;
}

#[actix_web::test]
async fn issue_and_verify_a_donation() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Village well", Amount::from_major(100_000))).await;
    let mut gateway = MockGateway::new();
    gateway.expect_public_key().return_const(MOCK_PUBLIC_KEY.to_string());
    gateway
        .expect_create_order()
        .withf(|req| req.amount_minor_units == 50_000 && req.currency == "INR")
        .times(1)
        .returning(|req| Ok(GatewayOrderReceipt { order_id: format!("order_{}", req.receipt) }));
    let app = init_app(&ctx, gateway).await;

    let req = TestRequest::post().uri("/donations/order").set_json(order_request(campaign.id, 50_000)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order: IssuedOrder = serde_json::from_str(&body).unwrap();
    assert_eq!(order.gateway_public_key, MOCK_PUBLIC_KEY);
    assert_eq!(order.gateway_order_id, format!("order_donation_{}", order.donation_id));
    assert_eq!(order.amount_minor_units, 50_000);

    let confirmation = json!({
        "donation_id": order.donation_id,
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": "pay_Well0001",
        "signature": sign(&order.gateway_order_id, "pay_Well0001"),
    });
    let req = TestRequest::post().uri("/donations/verify").set_json(&confirmation).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: VerificationResult = serde_json::from_str(&body).unwrap();
    assert!(result.newly_credited);
    assert_eq!(result.donation.status, DonationStatus::Completed);

    // The client retries. Nothing changes.
    let req = TestRequest::post().uri("/donations/verify").set_json(&confirmation).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let result: VerificationResult = serde_json::from_str(&body).unwrap();
    assert!(!result.newly_credited);
    assert_eq!(ctx.collected(campaign.id).await, Amount::from(50_000));

    let (status, body) = send(&app, TestRequest::get().uri(&format!("/campaigns/{}", campaign.id)).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let campaign: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(campaign["collected_amount"], 50_000);
    ctx.teardown().await;
}

#[actix_web::test]
async fn forged_confirmation_is_unauthorized() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Rural clinic", Amount::from_major(100_000))).await;
    let app = init_app(&ctx, obliging_gateway()).await;
    let req = TestRequest::post().uri("/donations/order").set_json(order_request(campaign.id, 20_000)).to_request();
    let (_, body) = send(&app, req).await;
    let order: IssuedOrder = serde_json::from_str(&body).unwrap();

    let confirmation = json!({
        "donation_id": order.donation_id,
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": "pay_Forged01",
        "signature": "0".repeat(64),
    });
    let req = TestRequest::post().uri("/donations/verify").set_json(&confirmation).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("signature"), "{body}");
    assert_eq!(ctx.collected(campaign.id).await, Amount::default());

    let req = TestRequest::get().uri(&format!("/donations/{}", order.donation_id)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let donation: PublicDonation = serde_json::from_str(&body).unwrap();
    assert_eq!(donation.status, DonationStatus::Failed);
    ctx.teardown().await;
}

#[actix_web::test]
async fn gateway_outage_is_reported() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Reading room", Amount::from_major(10_000))).await;
    let mut gateway = MockGateway::new();
    gateway.expect_public_key().return_const(MOCK_PUBLIC_KEY.to_string());
    gateway.expect_create_order().returning(|_| Err(GatewayError::Unavailable("connection reset".into())));
    let app = init_app(&ctx, gateway).await;

    let req = TestRequest::post().uri("/donations/order").set_json(order_request(campaign.id, 20_000)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("connection reset"), "{body}");

    let req = TestRequest::get().uri("/donations/1").to_request();
    let (_, body) = send(&app, req).await;
    let donation: PublicDonation = serde_json::from_str(&body).unwrap();
    assert_eq!(donation.status, DonationStatus::Failed);
    assert!(donation.gateway_order_id.is_none());
    ctx.teardown().await;
}

#[actix_web::test]
async fn invalid_order_requests() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Sports kit", Amount::from_major(10_000))).await;
    let private = ctx.campaign(NewCampaign::new("Board fund", Amount::from_major(10_000)).with_visibility(false)).await;
    let app = init_app(&ctx, MockGateway::new()).await;

    let req = TestRequest::post().uri("/donations/order").set_json(order_request(campaign.id, 50)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post().uri("/donations/order").set_json(order_request(private.id, 50_000)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post().uri("/donations/order").set_json(order_request(999, 50_000)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post().uri("/donations/order").set_json(json!({ "campaign_id": campaign.id })).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    ctx.teardown().await;
}

#[actix_web::test]
async fn public_views_hide_private_data() {
    let ctx = TestContext::new().await;
    let campaign = ctx.campaign(NewCampaign::new("Music school", Amount::from_major(10_000))).await;
    let private = ctx.campaign(NewCampaign::new("Staff bonus", Amount::from_major(10_000)).with_visibility(false)).await;
    let app = init_app(&ctx, obliging_gateway()).await;
    let req = TestRequest::post().uri("/donations/order").set_json(order_request(campaign.id, 20_000)).to_request();
    let (_, body) = send(&app, req).await;
    let order: IssuedOrder = serde_json::from_str(&body).unwrap();

    let req = TestRequest::get().uri(&format!("/donations/{}", order.donation_id)).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("meera@example.org"), "{body}");
    assert!(!body.contains("donor_contact"), "{body}");

    let (status, _) = send(&app, TestRequest::get().uri(&format!("/campaigns/{}", private.id)).to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, TestRequest::get().uri("/donations/4040").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A donation recorded against the private campaign stays hidden from the public view
    let offline = json!({
        "campaign_id": private.id,
        "amount": 75_000,
        "donor": { "name": "Board member", "contact": "board@example.org" }
    });
    let req = TestRequest::post()
        .uri("/api/donations/offline")
        .insert_header((API_KEY_HEADER, ADMIN_KEY))
        .set_json(offline)
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let hidden: Value = serde_json::from_str(&body).unwrap();
    let uri = format!("/donations/{}", hidden["id"]);
    let (status, body) = send(&app, TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.contains("75000"), "{body}");
    ctx.teardown().await;
}
