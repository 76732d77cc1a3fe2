use dpg_common::{Amount, Secret};

/// The smallest donation accepted by default, in minor units (₹1.00).
pub const DEFAULT_MINIMUM_AMOUNT: i64 = 100;

/// Settings for the donation flow. The engine never reads these from the environment itself.
#[derive(Debug, Clone)]
pub struct DonationFlowConfig {
    /// The secret the gateway signs payment confirmations with. Never leaves the signature verifier.
    pub gateway_secret: Secret<String>,
    /// Donations below this amount are rejected.
    pub minimum_amount: Amount,
}

impl Default for DonationFlowConfig {
    fn default() -> Self {
        Self { gateway_secret: Secret::default(), minimum_amount: Amount::from(DEFAULT_MINIMUM_AMOUNT) }
    }
}

impl DonationFlowConfig {
    pub fn new(gateway_secret: Secret<String>, minimum_amount: Amount) -> Self {
        Self { gateway_secret, minimum_amount }
    }
}
