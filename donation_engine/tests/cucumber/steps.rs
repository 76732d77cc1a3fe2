use cucumber::{then, when};
use donation_engine::{
    db_types::{DonationStatus, DonorInfo},
    flow_objects::{GatewayPaymentEvent, IssueOrderRequest, RefundRequest},
    DonationFlowError,
};
use dpg_common::Amount;

use crate::cucumber::DonationWorld;

fn error_name(err: &DonationFlowError) -> &'static str {
    match err {
        DonationFlowError::CampaignNotFound(_) => "CampaignNotFound",
        DonationFlowError::InvalidAmount(_) => "InvalidAmount",
        DonationFlowError::InvalidRequest(_) => "InvalidRequest",
        DonationFlowError::GatewayUnavailable(_) => "GatewayUnavailable",
        DonationFlowError::DonationNotFound(_) => "DonationNotFound",
        DonationFlowError::SignatureInvalid => "SignatureInvalid",
        DonationFlowError::PaymentIdReused(_) => "PaymentIdReused",
        DonationFlowError::NotRefundable(_) => "NotRefundable",
        DonationFlowError::RefundAmountExceedsDonation { .. } => "RefundAmountExceedsDonation",
        DonationFlowError::GatewayRefundFailed(_) => "GatewayRefundFailed",
        DonationFlowError::InvalidStatusTransition(_) => "InvalidStatusTransition",
        DonationFlowError::DatabaseError(_) => "DatabaseError",
    }
}

#[when(expr = "'{word}' pledges {int} to campaign '{word}' as donation {word}")]
async fn pledge(world: &mut DonationWorld, donor: String, amount: i64, campaign: String, label: String) {
    let campaign_id = world.campaigns.get(&campaign).copied().unwrap_or(-1);
    let donor = DonorInfo::new(donor.clone(), format!("{}@example.org", donor.to_lowercase()));
    let request = IssueOrderRequest::new(campaign_id, Amount::from_major(amount), donor);
    let result = world.system().api.issue_order(request).await;
    if let Some(order) = world.record(result) {
        world.orders.insert(label, order);
    }
}

#[when(expr = "the gateway is down")]
async fn gateway_down(world: &mut DonationWorld) {
    world.system().gateway.fail_orders(true);
    world.system().gateway.fail_refunds(true);
}

#[when(expr = "the gateway recovers")]
async fn gateway_recovers(world: &mut DonationWorld) {
    world.system().gateway.fail_orders(false);
    world.system().gateway.fail_refunds(false);
}

#[when(expr = "donation {word} is confirmed with payment {word}")]
async fn confirm(world: &mut DonationWorld, label: String, payment_id: String) {
    let request = world.system().signed_verification(world.order(&label), &payment_id);
    let result = world.system().api.verify_payment(request).await;
    world.record(result);
}

#[when(expr = "donation {word} is confirmed {int} times concurrently with payment {word}")]
async fn confirm_concurrently(world: &mut DonationWorld, label: String, count: usize, payment_id: String) {
    let request = world.system().signed_verification(world.order(&label), &payment_id);
    let api = &world.system().api;
    let results = futures_util::future::join_all((0..count).map(|_| api.verify_payment(request.clone()))).await;
    let credited = results.iter().filter(|r| matches!(r, Ok(v) if v.newly_credited)).count();
    assert!(credited <= 1, "{credited} confirmations credited the campaign");
    assert!(results.iter().all(Result::is_ok), "Some confirmations failed: {results:?}");
}

#[when(expr = "a forged confirmation for donation {word} arrives with payment {word}")]
async fn forged_confirmation(world: &mut DonationWorld, label: String, payment_id: String) {
    let mut request = world.system().signed_verification(world.order(&label), &payment_id);
    request.signature = world.system().gateway.sign(&request.gateway_order_id, "pay_someone_else");
    let result = world.system().api.verify_payment(request).await;
    world.record(result);
}

#[when(expr = "the gateway reports payment {word} for donation {word} as {word}")]
async fn gateway_event(world: &mut DonationWorld, payment_id: String, label: String, event: String) {
    let order_id = world.order(&label).gateway_order_id.clone();
    let event = match event.as_str() {
        "authorized" => GatewayPaymentEvent::Authorized { order_id, payment_id },
        "failed" => GatewayPaymentEvent::Failed {
            order_id,
            payment_id: Some(payment_id),
            reason: "Payment declined by the issuing bank".into(),
        },
        other => GatewayPaymentEvent::Other { event: other.to_string() },
    };
    let result = world.system().api.apply_gateway_event(event).await;
    world.record(result);
}

#[when(expr = "donation {word} is refunded in full")]
async fn refund_in_full(world: &mut DonationWorld, label: String) {
    let request = RefundRequest::full(world.order(&label).donation_id);
    let result = world.system().api.refund_donation(request).await;
    world.record(result);
}

#[when(expr = "{int} is refunded from donation {word}")]
async fn partial_refund(world: &mut DonationWorld, amount: i64, label: String) {
    let request = RefundRequest::partial(world.order(&label).donation_id, Amount::from_major(amount));
    let result = world.system().api.refund_donation(request).await;
    world.record(result);
}

#[then(expr = "campaign '{word}' has collected {int}")]
async fn collected(world: &mut DonationWorld, campaign: String, amount: i64) {
    let collected = world.system().collected(world.campaign_id(&campaign)).await;
    assert_eq!(collected, Amount::from_major(amount), "Collected amount is incorrect");
}

#[then(expr = "campaign '{word}' passes its audit")]
async fn audit(world: &mut DonationWorld, campaign: String) {
    let audit =
        world.system().queries.audit_campaign(world.campaign_id(&campaign)).await.expect("Error auditing campaign");
    assert!(audit.is_consistent(), "Audit failed: {audit:?}");
}

#[then(expr = "donation {word} is {word}")]
async fn donation_status(world: &mut DonationWorld, label: String, status: String) {
    let expected = status.parse::<DonationStatus>().unwrap_or_else(|e| panic!("{e}"));
    let id = world.order(&label).donation_id;
    let donation = world
        .system()
        .queries
        .donation_by_id(id)
        .await
        .expect("Error fetching donation")
        .unwrap_or_else(|| panic!("Donation {label} does not exist"));
    assert_eq!(donation.status, expected, "Status is incorrect");
}

#[then(expr = "the request fails with {word}")]
async fn request_failed(world: &mut DonationWorld, expected: String) {
    let err = world.last_error.as_ref().expect("The last request did not fail");
    assert_eq!(error_name(err), expected, "Unexpected error: {err}");
}

#[then(expr = "the request succeeds")]
async fn request_succeeded(world: &mut DonationWorld) {
    assert!(world.last_error.is_none(), "The last request failed: {:?}", world.last_error);
}

#[then(expr = "the status history of donation {word} reads {string}")]
async fn status_history(world: &mut DonationWorld, label: String, expected: String) {
    let id = world.order(&label).donation_id;
    let history = world.system().queries.status_history(id).await.expect("Error fetching history");
    let actual = history.iter().map(|h| h.new_status.to_string()).collect::<Vec<_>>().join(" -> ");
    assert_eq!(actual, expected, "Status history is incorrect");
}
