use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test::TestRequest,
};
use donation_engine::{
    db_types::{DonationStatus, NewCampaign},
    flow_objects::IssuedOrder,
    helpers::hmac_hex,
};
use dpg_common::{Amount, Secret};
use serde_json::json;

use super::{
    helpers::{init_app, send, TestContext, WEBHOOK_SECRET},
    mocks::obliging_gateway,
};
use crate::{
    data_objects::{JsonResponse, PublicDonation},
    middleware::WEBHOOK_SIGNATURE_HEADER,
};

fn payment_event(event: &str, order_id: &str, payment_id: &str) -> String {
    let failed = event == "payment.failed";
    let status = if failed { "failed" } else { "authorized" };
    let error_code = failed.then_some("BAD_REQUEST_ERROR");
    let error_description = failed.then_some("Payment was cancelled by the donor");
    json!({
        "entity": "event",
        "account_id": "acc_BFQ7uQEaa7j2z7",
        "event": event,
        "contains": ["payment"],
        "payload": { "payment": { "entity": {
            "id": payment_id,
            "amount": 20000,
            "currency": "INR",
            "status": status,
            "order_id": order_id,
            "method": "upi",
            "error_code": error_code,
            "error_description": error_description
        }}},
        "created_at": 1_718_275_202
    })
    .to_string()
}

fn signed_webhook(body: &str) -> TestRequest {
    TestRequest::post()
        .uri("/webhook/payment")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, hmac_hex(WEBHOOK_SECRET.as_bytes(), body.as_bytes())))
        .set_payload(body.to_string())
}

async fn donation_status<S, B>(app: &S, donation_id: i64) -> DonationStatus
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (_, body) = send(app, TestRequest::get().uri(&format!("/donations/{donation_id}")).to_request()).await;
    serde_json::from_str::<PublicDonation>(&body).unwrap().status
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let ctx = TestContext::new().await;
    let app = init_app(&ctx, obliging_gateway()).await;
    let body = payment_event("payment.failed", "order_donation_1", "pay_Unsigned1");

    let req = TestRequest::post()
        .uri("/webhook/payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.clone())
        .to_request();
    let (status, body_text) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body_text, "No HMAC signature found.");

    let req = signed_webhook(&body).insert_header((WEBHOOK_SIGNATURE_HEADER, "ab".repeat(32))).to_request();
    let (status, body_text) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body_text, "Invalid HMAC signature.");
    ctx.teardown().await;
}

#[actix_web::test]
async fn webhooks_drive_the_donation_lifecycle() {
    let ctx = TestContext::new().await;
    let campaign_id = ctx.campaign(NewCampaign::new("Bridge repair", Amount::from_major(10_000))).await.id;
    let app = init_app(&ctx, obliging_gateway()).await;
    let order = json!({
        "campaign_id": campaign_id,
        "amount": 20_000,
        "donor": { "name": "Lakshmi Rao", "contact": "lakshmi@example.org" }
    });
    let (_, body) = send(&app, TestRequest::post().uri("/donations/order").set_json(order).to_request()).await;
    let order: IssuedOrder = serde_json::from_str(&body).unwrap();

    let authorized = payment_event("payment.authorized", &order.gateway_order_id, "pay_Bridge01");
    let (status, body) = send(&app, signed_webhook(&authorized).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert_eq!(donation_status(&app, order.donation_id).await, DonationStatus::Processing);

    // Redelivery is acknowledged and changes nothing
    let (status, body) = send(&app, signed_webhook(&authorized).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No change"), "{body}");

    let failed = payment_event("payment.failed", &order.gateway_order_id, "pay_Bridge01");
    let (status, _) = send(&app, signed_webhook(&failed).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(donation_status(&app, order.donation_id).await, DonationStatus::Failed);
    assert_eq!(ctx.collected(campaign_id).await, Amount::default());

    // Events for orders we never issued, and events we don't handle, are acknowledged too
    let stranger = payment_event("payment.failed", "order_Unknown99", "pay_Unknown99");
    let (status, _) = send(&app, signed_webhook(&stranger).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let other = json!({ "event": "refund.processed", "payload": {} }).to_string();
    let (status, _) = send(&app, signed_webhook(&other).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    ctx.teardown().await;
}

#[actix_web::test]
async fn signature_checks_can_be_disabled() {
    let mut ctx = TestContext::new().await;
    ctx.config.webhook_hmac_checks = false;
    let app = init_app(&ctx, obliging_gateway()).await;
    let body = json!({ "event": "order.paid" }).to_string();
    let req = TestRequest::post()
        .uri("/webhook/payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    ctx.teardown().await;
}

#[actix_web::test]
async fn signatures_are_checked_against_the_raw_body() {
    let mut ctx = TestContext::new().await;
    let app = init_app(&ctx, obliging_gateway()).await;
    let body = payment_event("payment.failed", "order_Unknown42", "pay_Unknown42");

    // Hex case does not matter
    let tag = hmac_hex(WEBHOOK_SECRET.as_bytes(), body.as_bytes()).to_uppercase();
    let req = signed_webhook(&body).insert_header((WEBHOOK_SIGNATURE_HEADER, tag)).to_request();
    let (status, body_text) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body_text}");

    // Re-serialising the payload changes the bytes, so the original tag no longer fits
    let reformatted = serde_json::to_string_pretty(&serde_json::from_str::<serde_json::Value>(&body).unwrap()).unwrap();
    let tag = hmac_hex(WEBHOOK_SECRET.as_bytes(), body.as_bytes());
    let req = signed_webhook(&reformatted).insert_header((WEBHOOK_SIGNATURE_HEADER, tag)).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Without a configured secret nothing verifies, not even a tag made with the empty key
    ctx.config.gateway.webhook_secret = Secret::new(String::new());
    let app = init_app(&ctx, obliging_gateway()).await;
    let tag = hmac_hex(b"", body.as_bytes());
    let req = signed_webhook(&body).insert_header((WEBHOOK_SIGNATURE_HEADER, tag)).to_request();
    let (status, body_text) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body_text, "Invalid HMAC signature.");
    ctx.teardown().await;
}
