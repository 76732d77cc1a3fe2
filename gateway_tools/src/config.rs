use std::time::Duration;

use dpg_common::Secret;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_API_URL: &str = "https://api.razorpay.com";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    /// The public key id. Clients need it to open the gateway checkout.
    pub key_id: String,
    /// Used for API basic auth and for payment signatures.
    pub key_secret: Secret<String>,
    /// Signs webhook deliveries. Configured separately from the key secret in the gateway dashboard.
    pub webhook_secret: Secret<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            key_id: String::default(),
            key_secret: Secret::default(),
            webhook_secret: Secret::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("DPG_GATEWAY_API_URL").unwrap_or_else(|_| {
            info!("🌐️ DPG_GATEWAY_API_URL not set, using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        let key_id = std::env::var("DPG_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🌐️ DPG_GATEWAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_00000000000000".to_string()
        });
        let key_secret = secret_from_env("DPG_GATEWAY_KEY_SECRET");
        let webhook_secret = secret_from_env("DPG_GATEWAY_WEBHOOK_SECRET");
        let timeout = std::env::var("DPG_GATEWAY_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🌐️ Invalid DPG_GATEWAY_TIMEOUT_MS '{s}': {e}. Using the default"))
                    .ok()
            })
            .map_or_else(|| Duration::from_millis(DEFAULT_TIMEOUT_MS), Duration::from_millis);
        Self { api_url, key_id, key_secret, webhook_secret, timeout }
    }
}

/// Reads a shared secret from the environment. A missing or blank value is replaced by a random one for this session,
/// so nothing signed by a third party will verify until the real secret is configured.
fn secret_from_env(var: &str) -> Secret<String> {
    let secret = std::env::var(var).ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
        warn!(
            "🚨️🌐️ {var} is not set. I'm using a random value for this session, so gateway signatures will not \
             verify. Set {var} to accept payments. 🚨️"
        );
        random_secret()
    });
    Secret::new(secret)
}

fn random_secret() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}
