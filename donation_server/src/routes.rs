//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
//!
//! A note about cancellation:
//! Actix drops a handler's future when the client goes away. Every handler that changes donation state hands the work
//! to [`run_to_completion`], so a verification or refund that has started is never abandoned half way.
use actix_web::{get, web, HttpResponse, Responder};
use donation_engine::{
    flow_objects::{IssueOrderRequest, OfflineDonationRequest, RefundRequest, VerifyPaymentRequest},
    traits::{DonationBackend, DonationManagement, PaymentGateway},
    DonationFlowApi,
    DonationQueryApi,
};
use gateway_tools::GatewayWebhook;
use log::*;

use crate::{
    data_objects::{CampaignDonationsParams, JsonResponse, PublicDonation, RefundParams, VerificationResult},
    errors::ServerError,
    helpers::run_to_completion,
    integrations::gateway::payment_event_from_webhook,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Donations  ----------------------------------------------------
route!(issue_order => Post "/donations/order" impl DonationBackend, PaymentGateway);
/// Starts a donation. The response carries the gateway order id and the public key the client needs to open the
/// gateway checkout.
pub async fn issue_order<B, G>(
    api: web::Data<DonationFlowApi<B, G>>,
    body: web::Json<IssueOrderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DonationBackend + 'static,
    G: PaymentGateway + 'static,
{
    let request = body.into_inner();
    debug!("💻️ Order requested for {} to campaign #{}", request.amount, request.campaign_id);
    let order = run_to_completion(async move { api.issue_order(request).await }).await??;
    Ok(HttpResponse::Ok().json(order))
}

route!(verify_payment => Post "/donations/verify" impl DonationBackend, PaymentGateway);
/// Accepts the signed payment confirmation the gateway hands to the donor's client after checkout. Presenting the
/// same confirmation again is harmless: `newly_credited` will be false.
pub async fn verify_payment<B, G>(
    api: web::Data<DonationFlowApi<B, G>>,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DonationBackend + 'static,
    G: PaymentGateway + 'static,
{
    let request = body.into_inner();
    debug!("💻️ Payment confirmation received for donation #{}", request.donation_id);
    let result = run_to_completion(async move { api.verify_payment(request).await }).await??;
    Ok(HttpResponse::Ok().json(VerificationResult::from(result)))
}

route!(donation_by_id => Get "/donations/{id}" impl DonationManagement);
/// Public donation status. Donations to private campaigns are reported as missing, like the campaigns themselves.
pub async fn donation_by_id<B: DonationManagement>(
    path: web::Path<i64>,
    api: web::Data<DonationQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET donation #{id}");
    let not_found = || ServerError::NoRecordFound(format!("Donation {id} does not exist"));
    let donation = api.donation_by_id(id).await?.ok_or_else(not_found)?;
    let is_public = api.campaign_by_id(donation.campaign_id).await?.is_some_and(|c| c.is_public);
    if !is_public {
        return Err(not_found());
    }
    Ok(HttpResponse::Ok().json(PublicDonation::from(donation)))
}

route!(campaign_by_id => Get "/campaigns/{id}" impl DonationManagement);
/// Public campaign totals. Private campaigns are reported as missing.
pub async fn campaign_by_id<B: DonationManagement>(
    path: web::Path<i64>,
    api: web::Data<DonationQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET campaign #{id}");
    let campaign = api
        .campaign_by_id(id)
        .await?
        .filter(|c| c.is_public)
        .ok_or_else(|| ServerError::NoRecordFound(format!("Campaign {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(campaign))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_webhook => Post "/payment" impl DonationBackend, PaymentGateway);
/// Gateway payment notifications. The HMAC middleware has already checked the signature by the time we get here.
///
/// Events that don't concern a known, open donation are acknowledged so the gateway stops retrying them.
pub async fn payment_webhook<B, G>(
    api: web::Data<DonationFlowApi<B, G>>,
    body: web::Json<GatewayWebhook>,
) -> Result<HttpResponse, ServerError>
where
    B: DonationBackend + 'static,
    G: PaymentGateway + 'static,
{
    let webhook = body.into_inner();
    info!("💻️ Received gateway webhook: {}", webhook.event);
    let event = payment_event_from_webhook(webhook);
    let updated = run_to_completion(async move { api.apply_gateway_event(event).await }).await??;
    let message = match updated {
        Some(d) => format!("Donation #{} is {}", d.id, d.status),
        None => "No change".to_string(),
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

//----------------------------------------------    Admin    ----------------------------------------------------
route!(refund_donation => Post "/donations/{id}/refund" impl DonationBackend, PaymentGateway);
/// Refunds a completed donation. Send `{"amount": n}` for a partial refund. An empty body refunds in full.
pub async fn refund_donation<B, G>(
    path: web::Path<i64>,
    api: web::Data<DonationFlowApi<B, G>>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError>
where
    B: DonationBackend + 'static,
    G: PaymentGateway + 'static,
{
    let id = path.into_inner();
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        RefundParams::default()
    } else {
        serde_json::from_slice::<RefundParams>(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?
    };
    info!("💻️ Refund requested for donation #{id}. Amount: {:?}", params.amount);
    let request = RefundRequest { donation_id: id, amount: params.amount, reason: params.reason };
    let donation = run_to_completion(async move { api.refund_donation(request).await }).await??;
    Ok(HttpResponse::Ok().json(donation))
}

route!(offline_donation => Post "/donations/offline" impl DonationBackend, PaymentGateway);
pub async fn offline_donation<B, G>(
    api: web::Data<DonationFlowApi<B, G>>,
    body: web::Json<OfflineDonationRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DonationBackend + 'static,
    G: PaymentGateway + 'static,
{
    let request = body.into_inner();
    info!("💻️ Recording offline donation of {} for campaign #{}", request.amount, request.campaign_id);
    let donation = run_to_completion(async move { api.record_offline_donation(request).await }).await??;
    Ok(HttpResponse::Ok().json(donation))
}

route!(donation_history => Get "/donations/{id}/history" impl DonationManagement);
pub async fn donation_history<B: DonationManagement>(
    path: web::Path<i64>,
    api: web::Data<DonationQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let history = api.status_history(id).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(campaign_donations => Get "/campaigns/{id}/donations" impl DonationManagement);
/// All donations for a campaign. Use `?status=Completed` (etc.) to filter.
pub async fn campaign_donations<B: DonationManagement>(
    path: web::Path<i64>,
    query: web::Query<CampaignDonationsParams>,
    api: web::Data<DonationQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let statuses = query.into_inner().status.into_iter().collect::<Vec<_>>();
    trace!("💻️ Fetching donations for campaign #{id} with statuses {statuses:?}");
    let donations = api.donations_for_campaign(id, &statuses).await?;
    Ok(HttpResponse::Ok().json(donations))
}

route!(campaign_audit => Get "/campaigns/{id}/audit" impl DonationManagement);
/// Compares the campaign's collected amount against the sum of its credited donations.
pub async fn campaign_audit<B: DonationManagement>(
    path: web::Path<i64>,
    api: web::Data<DonationQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let audit = api.audit_campaign(id).await?;
    if !audit.is_consistent() {
        warn!("💻️ Campaign #{id} failed its audit. Recorded: {}, computed: {}", audit.recorded, audit.computed);
    }
    Ok(HttpResponse::Ok().json(audit))
}
