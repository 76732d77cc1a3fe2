use chrono::{DateTime, Utc};
use dpg_common::Amount;
use serde::{Deserialize, Serialize};

use crate::db_types::{Donation, DonationStatus, PaymentChannel};

/// The outcome of trying to settle a donation against a verified gateway payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    /// The donation moved to Completed and the campaign was credited in this call.
    Completed(Donation),
    /// The donation was already Completed or Refunded. Nothing was changed.
    AlreadySettled(Donation),
    /// The donation is in a state that cannot be completed (i.e. Failed).
    NotPayable(Donation),
}

impl CompletionResult {
    pub fn donation(&self) -> &Donation {
        match self {
            CompletionResult::Completed(d) | CompletionResult::AlreadySettled(d) | CompletionResult::NotPayable(d) => d,
        }
    }

    pub fn into_donation(self) -> Donation {
        match self {
            CompletionResult::Completed(d) | CompletionResult::AlreadySettled(d) | CompletionResult::NotPayable(d) => d,
        }
    }
}

/// Compares a campaign's running total with the total recomputed from its donations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAudit {
    pub campaign_id: i64,
    pub recorded: Amount,
    pub computed: Amount,
}

impl CampaignAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded == self.computed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonationQueryFilter {
    pub campaign_id: Option<i64>,
    #[serde(default)]
    pub statuses: Vec<DonationStatus>,
    pub channel: Option<PaymentChannel>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DonationQueryFilter {
    pub fn with_campaign_id(mut self, campaign_id: i64) -> Self {
        self.campaign_id = Some(campaign_id);
        self
    }

    pub fn with_status(mut self, status: DonationStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_channel(mut self, channel: PaymentChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.campaign_id.is_none() &&
            self.statuses.is_empty() &&
            self.channel.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}
