//! # Donation engine public API
//!
//! The `dpe_api` module exposes the programmatic API for the donation engine.
//!
//! * [`donation_flow_api`] is the primary API. It issues gateway orders for new donations, reconciles verified
//!   payments against campaigns exactly once, applies gateway webhook events, records offline donations, and handles
//!   refunds.
//! * [`query_api`] provides read-only access to campaigns, donations and their status history.
//!
//! The other submodules in this module are support types.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use donation_engine::{DonationFlowApi, DonationFlowConfig, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = DonationFlowApi::new(db, gateway, DonationFlowConfig::default(), EventProducers::default());
//! let order = api.issue_order(request).await?;
//! ```
pub mod config;
pub mod donation_flow_api;
pub mod errors;
pub mod flow_objects;
pub mod query_api;
mod reconciliation;
mod refunds;
