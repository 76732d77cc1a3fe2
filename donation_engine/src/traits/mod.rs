//! # Backend and gateway contracts
//!
//! This module defines the interfaces that the donation engine needs from the outside world.
//!
//! * [`DonationGatewayDatabase`] is the write side of a storage backend. Every method is a single atomic unit: either
//!   every row it touches changes, or none do. It owns the donation state machine and the campaign aggregates.
//! * [`DonationManagement`] is the read side: lookups, searches, status history and aggregate audits.
//! * [`PaymentGateway`] abstracts the external payment processor that issues orders and reverses payments.
mod data_objects;
mod donation_gateway_database;
mod donation_management;
mod payment_gateway;

pub use data_objects::{CampaignAudit, CompletionResult, DonationQueryFilter};
pub use donation_gateway_database::{DonationDbError, DonationGatewayDatabase};
pub use donation_management::DonationManagement;
pub use payment_gateway::{
    GatewayError,
    GatewayOrderReceipt,
    GatewayOrderRequest,
    GatewayRefundReceipt,
    GatewayRefundRequest,
    PaymentGateway,
};

/// Everything the donation flow needs from a storage backend, as a single bound.
pub trait DonationBackend: DonationGatewayDatabase + DonationManagement {}

impl<T> DonationBackend for T where T: DonationGatewayDatabase + DonationManagement {}
