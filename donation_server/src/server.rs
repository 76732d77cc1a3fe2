use std::{path::Path, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use donation_engine::{
    events::EventProducers,
    traits::{DonationBackend, PaymentGateway},
    DonationFlowApi,
    DonationQueryApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::gateway::{create_event_handlers, GatewayClient},
    middleware::{ApiKeyMiddlewareFactory, HmacMiddlewareFactory, WEBHOOK_SIGNATURE_HEADER},
    routes::{
        health,
        CampaignAuditRoute,
        CampaignByIdRoute,
        CampaignDonationsRoute,
        DonationByIdRoute,
        DonationHistoryRoute,
        IssueOrderRoute,
        OfflineDonationRoute,
        PaymentWebhookRoute,
        RefundDonationRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    ensure_database_directory(&config.database_url)?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        GatewayClient::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayClient,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    // One instance for all workers, so that every worker sees the same in-flight refunds
    let flow_api = web::Data::new(DonationFlowApi::new(db.clone(), gateway, config.flow_config(), producers));
    let query_api = web::Data::new(DonationQueryApi::new(db));
    let route_config = config.clone();
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dpg::access_log"))
            .app_data(flow_api.clone())
            .app_data(query_api.clone())
            .configure(|cfg| configure_routes::<SqliteDatabase, GatewayClient>(cfg, &route_config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. Admin routes sit behind the API key and gateway webhooks behind the HMAC check.
///
/// The app must carry a `DonationFlowApi<B, G>` and a `DonationQueryApi<B>` as app data.
pub fn configure_routes<B, G>(cfg: &mut web::ServiceConfig, config: &ServerConfig)
where
    B: DonationBackend + 'static,
    G: PaymentGateway + 'static,
{
    let admin_scope = web::scope("/api")
        .wrap(ApiKeyMiddlewareFactory::new(config.admin_api_key.clone()))
        .service(RefundDonationRoute::<B, G>::new())
        .service(OfflineDonationRoute::<B, G>::new())
        .service(DonationHistoryRoute::<B>::new())
        .service(CampaignDonationsRoute::<B>::new())
        .service(CampaignAuditRoute::<B>::new());
    let webhook_scope = web::scope("/webhook")
        .wrap(HmacMiddlewareFactory::new(
            WEBHOOK_SIGNATURE_HEADER,
            config.gateway.webhook_secret.clone(),
            config.webhook_hmac_checks,
        ))
        .service(PaymentWebhookRoute::<B, G>::new());
    cfg.service(health)
        .service(IssueOrderRoute::<B, G>::new())
        .service(VerifyPaymentRoute::<B, G>::new())
        .service(DonationByIdRoute::<B>::new())
        .service(CampaignByIdRoute::<B>::new())
        .service(admin_scope)
        .service(webhook_scope);
}

/// SQLite creates the database file on first use, but not the directory it lives in.
fn ensure_database_directory(url: &str) -> Result<(), ServerError> {
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            info!("🗃️ Creating database directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
            Ok(())
        },
        _ => Ok(()),
    }
}
