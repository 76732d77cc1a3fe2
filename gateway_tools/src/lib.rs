//! A REST client for the payment gateway's order and refund endpoints, and the payload types of its webhooks.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{
    GatewayOrder,
    GatewayPayment,
    GatewayRefund,
    GatewayWebhook,
    NewGatewayOrder,
    NewGatewayRefund,
    WebhookPayload,
};
pub use error::GatewayApiError;
