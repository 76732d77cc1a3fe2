use std::env;

use donation_engine::{DonationFlowConfig, DEFAULT_MINIMUM_AMOUNT};
use dpg_common::{helpers::parse_boolean_flag, Amount, Secret};
use gateway_tools::GatewayConfig;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_DPG_HOST: &str = "127.0.0.1";
const DEFAULT_DPG_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/donations.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Requests to `/api` routes must carry this key in the `X-Api-Key` header.
    pub admin_api_key: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**. Only for local testing against a gateway sandbox
    /// that cannot reach you with signed requests.
    pub webhook_hmac_checks: bool,
    /// Donations below this amount (in minor units) are rejected.
    pub minimum_amount: Amount,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DPG_HOST.to_string(),
            port: DEFAULT_DPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_api_key: Secret::default(),
            webhook_hmac_checks: true,
            minimum_amount: Amount::from(DEFAULT_MINIMUM_AMOUNT),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DPG_HOST").ok().unwrap_or_else(|| DEFAULT_DPG_HOST.into());
        let port = env::var("DPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for DPG_PORT. {e} Using the default, {DEFAULT_DPG_PORT}, instead."
                    );
                    DEFAULT_DPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DPG_PORT);
        let database_url = env::var("DPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ DPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let admin_api_key = env::var("DPG_ADMIN_API_KEY").ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
            warn!(
                "🚨️🚨️🚨️ DPG_ADMIN_API_KEY is not set. I'm using a random value for this session, so the admin API \
                 is effectively disabled. Set DPG_ADMIN_API_KEY to enable refunds and offline donations. 🚨️🚨️🚨️"
            );
            random_key()
        });
        let webhook_hmac_checks = parse_boolean_flag(env::var("DPG_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !webhook_hmac_checks {
            warn!("🚨️ Webhook HMAC checks are DISABLED. Anyone can post payment events to this server. 🚨️");
        }
        let minimum_amount = env::var("DPG_MINIMUM_DONATION")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for DPG_MINIMUM_DONATION. {e}"))
                    .ok()
            })
            .map_or_else(|| Amount::from(DEFAULT_MINIMUM_AMOUNT), Amount::from);
        let gateway = GatewayConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            admin_api_key: Secret::new(admin_api_key),
            webhook_hmac_checks,
            minimum_amount,
            gateway,
        }
    }

    /// The subset of settings the donation engine needs. Payment confirmations are signed with the gateway key secret.
    pub fn flow_config(&self) -> DonationFlowConfig {
        DonationFlowConfig::new(self.gateway.key_secret.clone(), self.minimum_amount)
    }
}

fn random_key() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}
