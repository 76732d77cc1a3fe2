//! Donation Engine
//!
//! The donation engine is the funding-reconciliation core of a campaign donation platform. It turns a payment made
//! through an external gateway into a durable, exactly-once credit against a campaign's collected total.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`SqliteDatabase`]). You should never need to access the database directly. Instead,
//!    use the public API provided by the engine. The exception is the data types used in the database. These are
//!    defined in the `db_types` module and are public.
//! 2. The donation engine public API ([`mod@dpe_api`]). This provides the public-facing functionality of the engine:
//!    issuing gateway orders, verifying and reconciling payments, refunds and queries. Storage backends implement the
//!    traits in [`mod@traits`] to act as a backend for the engine.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when donations are
//! completed, fail, or are refunded. A simple handler framework is used so that you can easily hook into these events
//! and perform custom actions.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

mod dpe_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use dpe_api::{
    config::{DonationFlowConfig, DEFAULT_MINIMUM_AMOUNT},
    donation_flow_api::DonationFlowApi,
    errors::DonationFlowError,
    flow_objects,
    query_api::DonationQueryApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CampaignAudit,
    CompletionResult,
    DonationBackend,
    DonationDbError,
    DonationGatewayDatabase,
    DonationManagement,
    DonationQueryFilter,
    GatewayError,
    PaymentGateway,
};
