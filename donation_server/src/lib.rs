//! # Donation server
//! This crate hosts the HTTP front end of the donation engine. It is responsible for:
//! * Issuing gateway orders for new donations and accepting the signed payment confirmations that come back.
//! * Receiving payment webhooks from the gateway, after checking their HMAC signature.
//! * Admin operations (refunds, offline donations, audits), protected by an API key.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/donations/order`, `/donations/verify`, `/donations/{id}`, `/campaigns/{id}`: The public donation API.
//! * `/webhook/payment`: The webhook route for payment events from the gateway.
//! * `/api/...`: Admin routes. Requests must carry the `X-Api-Key` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
