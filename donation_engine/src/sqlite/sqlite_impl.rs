//! `SqliteDatabase` is a concrete implementation of a donation engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! Every write transaction opens with its conditional `UPDATE` (or `INSERT`). That way the transaction holds the write
//! lock from its first statement, and concurrent writers queue on the busy handler rather than failing on a lock
//! upgrade halfway through.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use dpg_common::Amount;
use log::*;
use sqlx::SqlitePool;

use super::db::{campaigns, db_url, donations, new_pool};
use crate::{
    db_types::{
        Campaign,
        Donation,
        DonationStatus,
        DonationStatusChange,
        GatewaySettlement,
        NewCampaign,
        NewDonation,
        RefundRecord,
    },
    traits::{CompletionResult, DonationDbError, DonationGatewayDatabase, DonationManagement, DonationQueryFilter},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl DonationGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_campaign(&self, campaign: NewCampaign, now: DateTime<Utc>) -> Result<Campaign, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        let campaign = campaigns::insert_campaign(campaign, now, &mut conn).await?;
        debug!("🗃️ Campaign #{} '{}' created", campaign.id, campaign.name);
        Ok(campaign)
    }

    async fn insert_pending_donation(&self, donation: NewDonation) -> Result<Donation, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        let donation =
            donations::insert_donation(donation, DonationStatus::Pending, Some("Awaiting payment"), &mut conn).await?;
        debug!("🗃️ Pending donation #{} of {} saved for campaign #{}", donation.id, donation.amount, donation.campaign_id);
        Ok(donation)
    }

    async fn attach_gateway_order(
        &self,
        donation_id: i64,
        gateway_order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Donation, DonationDbError> {
        let mut tx = self.pool.begin().await?;
        let donation = match donations::attach_gateway_order(donation_id, gateway_order_id, now, &mut tx).await? {
            Some(d) => d,
            None => {
                let existing = donations::fetch_donation(donation_id, &mut tx).await?;
                return match existing {
                    None => Err(DonationDbError::DonationNotFound(donation_id)),
                    Some(d) => Err(DonationDbError::InvalidTransition(format!(
                        "Donation #{donation_id} is {} with order {:?}. Cannot bind order {gateway_order_id}",
                        d.status, d.gateway_order_id
                    ))),
                };
            },
        };
        tx.commit().await?;
        trace!("🗃️ Donation #{donation_id} bound to gateway order {gateway_order_id}");
        Ok(donation)
    }

    async fn mark_donation_processing(
        &self,
        gateway_order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Donation>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        let donation = donations::mark_processing_by_order_id(gateway_order_id, now, &mut conn).await?;
        if let Some(d) = &donation {
            debug!("🗃️ Donation #{} is now Processing", d.id);
        }
        Ok(donation)
    }

    async fn fail_donation(
        &self,
        donation_id: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Donation>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        let open = [DonationStatus::Pending, DonationStatus::Processing];
        let donation =
            donations::update_status_if(donation_id, &open, DonationStatus::Failed, Some(reason), now, &mut conn)
                .await?;
        if donation.is_some() {
            debug!("🗃️ Donation #{donation_id} marked as Failed. {reason}");
        }
        Ok(donation)
    }

    /// Takes a verified settlement, and in a single atomic transaction,
    /// * marks the donation as `Completed` if (and only if) it is still open,
    /// * adds the donation amount to the campaign's collected amount.
    ///
    /// If the donation was not open, the transaction is abandoned and the current record is returned instead.
    async fn complete_donation(
        &self,
        settlement: GatewaySettlement,
        now: DateTime<Utc>,
    ) -> Result<CompletionResult, DonationDbError> {
        let id = settlement.donation_id;
        let mut tx = self.pool.begin().await?;
        let result = match donations::complete(&settlement, now, &mut tx).await? {
            Some(donation) => {
                campaigns::increment_collected(donation.campaign_id, donation.amount, now, &mut tx).await?;
                debug!(
                    "🗃️ Donation #{id} completed with payment {}. {} credited to campaign #{}",
                    settlement.gateway_payment_id, donation.amount, donation.campaign_id
                );
                CompletionResult::Completed(donation)
            },
            None => {
                let donation =
                    donations::fetch_donation(id, &mut tx).await?.ok_or(DonationDbError::DonationNotFound(id))?;
                trace!("🗃️ Donation #{id} is {}. Completion skipped", donation.status);
                if donation.status.is_settled() {
                    CompletionResult::AlreadySettled(donation)
                } else {
                    CompletionResult::NotPayable(donation)
                }
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn record_refund(&self, refund: RefundRecord, now: DateTime<Utc>) -> Result<Option<Donation>, DonationDbError> {
        let mut tx = self.pool.begin().await?;
        let donation = match donations::refund(&refund, now, &mut tx).await? {
            Some(d) => d,
            None => {
                trace!("🗃️ Donation #{} was not refundable. Refund not recorded", refund.donation_id);
                return Ok(None);
            },
        };
        campaigns::decrement_collected(donation.campaign_id, refund.amount, now, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Donation #{} refunded by {}. Campaign #{} debited",
            donation.id, refund.amount, donation.campaign_id
        );
        Ok(Some(donation))
    }

    async fn insert_offline_donation(&self, donation: NewDonation) -> Result<Donation, DonationDbError> {
        let mut tx = self.pool.begin().await?;
        let donation =
            donations::insert_donation(donation, DonationStatus::Completed, Some("Recorded offline"), &mut tx).await?;
        campaigns::increment_collected(donation.campaign_id, donation.amount, donation.created_at, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Offline donation #{} of {} credited to campaign #{}",
            donation.id, donation.amount, donation.campaign_id
        );
        Ok(donation)
    }

    async fn close(&mut self) -> Result<(), DonationDbError> {
        self.pool.close().await;
        Ok(())
    }
}

impl DonationManagement for SqliteDatabase {
    async fn fetch_campaign(&self, campaign_id: i64) -> Result<Option<Campaign>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        campaigns::fetch_campaign(campaign_id, &mut conn).await
    }

    async fn fetch_donation(&self, donation_id: i64) -> Result<Option<Donation>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        donations::fetch_donation(donation_id, &mut conn).await
    }

    async fn fetch_donation_by_payment_id(&self, payment_id: &str) -> Result<Option<Donation>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        donations::fetch_donation_by_payment_id(payment_id, &mut conn).await
    }

    async fn fetch_donation_by_order_id(&self, order_id: &str) -> Result<Option<Donation>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        donations::fetch_donation_by_order_id(order_id, &mut conn).await
    }

    async fn search_donations(&self, query: DonationQueryFilter) -> Result<Vec<Donation>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        donations::search_donations(query, &mut conn).await
    }

    async fn fetch_status_history(&self, donation_id: i64) -> Result<Vec<DonationStatusChange>, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        donations::fetch_status_history(donation_id, &mut conn).await
    }

    async fn computed_collected_amount(&self, campaign_id: i64) -> Result<Amount, DonationDbError> {
        let mut conn = self.pool.acquire().await?;
        campaigns::computed_collected_amount(campaign_id, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
