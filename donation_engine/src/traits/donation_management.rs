use dpg_common::Amount;

use crate::{
    db_types::{Campaign, Donation, DonationStatusChange},
    traits::{DonationDbError, DonationQueryFilter},
};

/// The `DonationManagement` trait defines the behaviour for querying campaigns and donations in the database backend.
/// Nothing in this trait modifies state.
#[allow(async_fn_in_trait)]
pub trait DonationManagement {
    async fn fetch_campaign(&self, campaign_id: i64) -> Result<Option<Campaign>, DonationDbError>;

    async fn fetch_donation(&self, donation_id: i64) -> Result<Option<Donation>, DonationDbError>;

    async fn fetch_donation_by_payment_id(&self, payment_id: &str) -> Result<Option<Donation>, DonationDbError>;

    async fn fetch_donation_by_order_id(&self, order_id: &str) -> Result<Option<Donation>, DonationDbError>;

    /// Donations matching the filter, oldest first.
    async fn search_donations(&self, query: DonationQueryFilter) -> Result<Vec<Donation>, DonationDbError>;

    /// Every status the donation has been in, oldest first.
    async fn fetch_status_history(&self, donation_id: i64) -> Result<Vec<DonationStatusChange>, DonationDbError>;

    /// Recomputes what the campaign's collected amount should be from its Completed and Refunded donations.
    async fn computed_collected_amount(&self, campaign_id: i64) -> Result<Amount, DonationDbError>;
}
