use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Campaign, Donation, DonationStatus, DonationStatusChange},
    dpe_api::errors::DonationFlowError,
    traits::{CampaignAudit, DonationManagement, DonationQueryFilter},
};

/// Read-only access to campaigns, donations and their history.
pub struct DonationQueryApi<B> {
    db: B,
}

impl<B> Debug for DonationQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DonationQueryApi")
    }
}

impl<B: Clone> Clone for DonationQueryApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> DonationQueryApi<B>
where B: DonationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn donation_by_id(&self, donation_id: i64) -> Result<Option<Donation>, DonationFlowError> {
        let donation = self.db.fetch_donation(donation_id).await?;
        Ok(donation)
    }

    pub async fn campaign_by_id(&self, campaign_id: i64) -> Result<Option<Campaign>, DonationFlowError> {
        let campaign = self.db.fetch_campaign(campaign_id).await?;
        Ok(campaign)
    }

    /// All donations for the campaign, optionally restricted to the given statuses.
    pub async fn donations_for_campaign(
        &self,
        campaign_id: i64,
        statuses: &[DonationStatus],
    ) -> Result<Vec<Donation>, DonationFlowError> {
        let query = statuses
            .iter()
            .fold(DonationQueryFilter::default().with_campaign_id(campaign_id), |q, s| q.with_status(*s));
        self.search_donations(query).await
    }

    pub async fn search_donations(&self, query: DonationQueryFilter) -> Result<Vec<Donation>, DonationFlowError> {
        let donations = self.db.search_donations(query).await?;
        Ok(donations)
    }

    pub async fn status_history(&self, donation_id: i64) -> Result<Vec<DonationStatusChange>, DonationFlowError> {
        let history = self.db.fetch_status_history(donation_id).await?;
        if history.is_empty() && self.db.fetch_donation(donation_id).await?.is_none() {
            return Err(DonationFlowError::DonationNotFound(donation_id));
        }
        Ok(history)
    }

    /// Compares the campaign's running total with the total implied by its donations.
    pub async fn audit_campaign(&self, campaign_id: i64) -> Result<CampaignAudit, DonationFlowError> {
        let campaign =
            self.db.fetch_campaign(campaign_id).await?.ok_or(DonationFlowError::CampaignNotFound(campaign_id))?;
        let computed = self.db.computed_collected_amount(campaign_id).await?;
        let audit = CampaignAudit { campaign_id, recorded: campaign.collected_amount, computed };
        if !audit.is_consistent() {
            error!(
                "🔄️🔎️ Campaign #{campaign_id} has a collected amount of {}, but its donations add up to {computed}",
                campaign.collected_amount
            );
        }
        Ok(audit)
    }
}
