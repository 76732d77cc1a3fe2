use std::{
    collections::HashSet,
    fmt::Debug,
    sync::{Arc, Mutex},
};

use dpg_common::Amount;
use log::*;

use crate::{
    db_types::{Campaign, Donation, NewDonation},
    dpe_api::{
        config::DonationFlowConfig,
        errors::DonationFlowError,
        flow_objects::{IssueOrderRequest, IssuedOrder},
    },
    events::{DonationCompletedEvent, DonationFailedEvent, DonationRefundedEvent, EventProducers},
    helpers::{Clock, SystemClock},
    traits::{DonationGatewayDatabase, DonationManagement, GatewayOrderRequest, PaymentGateway},
};

/// `DonationFlowApi` is the primary API for the donation lifecycle: issuing orders, reconciling verified payments
/// against campaigns, applying gateway events, and refunds.
///
/// Reconciliation and refund operations live in their own modules, but are all methods on this type.
pub struct DonationFlowApi<B, G> {
    pub(crate) db: B,
    pub(crate) gateway: G,
    pub(crate) config: DonationFlowConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) producers: EventProducers,
    pub(crate) refunds_in_flight: Arc<Mutex<HashSet<i64>>>,
}

impl<B, G> Debug for DonationFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DonationFlowApi")
    }
}

impl<B: Clone, G: Clone> Clone for DonationFlowApi<B, G> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
            producers: self.producers.clone(),
            refunds_in_flight: Arc::clone(&self.refunds_in_flight),
        }
    }
}

impl<B, G> DonationFlowApi<B, G> {
    pub fn new(db: B, gateway: G, config: DonationFlowConfig, producers: EventProducers) -> Self {
        Self {
            db,
            gateway,
            config,
            clock: Arc::new(SystemClock),
            producers,
            refunds_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replaces the system clock. Every timestamp the engine writes comes from this clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &DonationFlowConfig {
        &self.config
    }
}

impl<B, G> DonationFlowApi<B, G>
where
    B: DonationGatewayDatabase + DonationManagement,
    G: PaymentGateway,
{
    /// Starts a new donation.
    ///
    /// A `Pending` donation row is stored first, then the gateway is asked for an order. The gateway's order id is
    /// bound to the row before this call returns, and the client uses it to open the gateway checkout.
    ///
    /// If the gateway cannot create the order, the donation is marked `Failed` and `GatewayUnavailable` is returned.
    /// A donation without a gateway order id can never be completed, so no orphaned row can be credited later.
    pub async fn issue_order(&self, request: IssueOrderRequest) -> Result<IssuedOrder, DonationFlowError> {
        request.validate()?;
        let campaign = self.fetch_open_campaign(request.campaign_id).await?;
        self.check_amount(request.amount)?;
        let new_donation =
            NewDonation::new(campaign.id, request.donor, request.amount, campaign.currency.clone(), self.clock.now());
        let donation = self.db.insert_pending_donation(new_donation).await?;
        let receipt = format!("donation_{}", donation.id);
        let order_request = GatewayOrderRequest {
            amount_minor_units: donation.amount.value(),
            currency: donation.currency.clone(),
            receipt: receipt.clone(),
        };
        let order = match self.gateway.create_order(order_request).await {
            Ok(order) if !order.order_id.trim().is_empty() => order,
            Ok(_) => {
                let reason = "Gateway returned an empty order id".to_string();
                return Err(self.abandon_order(&donation, reason).await);
            },
            Err(e) => {
                let reason = format!("Gateway order creation failed. {e}");
                return Err(self.abandon_order(&donation, reason).await);
            },
        };
        let donation = self.db.attach_gateway_order(donation.id, &order.order_id, self.clock.now()).await?;
        info!(
            "🔄️🧾️ Donation #{} of {} {} for campaign #{} issued gateway order {}",
            donation.id, donation.amount, donation.currency, campaign.id, order.order_id
        );
        Ok(IssuedOrder {
            donation_id: donation.id,
            gateway_order_id: order.order_id,
            amount_minor_units: donation.amount.value(),
            currency: donation.currency,
            gateway_public_key: self.gateway.public_key(),
            receipt,
        })
    }

    async fn abandon_order(&self, donation: &Donation, reason: String) -> DonationFlowError {
        warn!("🔄️🧾️ Could not issue an order for donation #{}. {reason}", donation.id);
        if let Err(e) = self.fail_and_notify(donation.id, &reason).await {
            error!("🔄️🧾️ Donation #{} could not be marked as failed after the gateway error. {e}", donation.id);
        }
        DonationFlowError::GatewayUnavailable(reason)
    }

    /// The campaign must exist, be `Active`, and be public.
    pub(crate) async fn fetch_open_campaign(&self, campaign_id: i64) -> Result<Campaign, DonationFlowError> {
        let campaign =
            self.db.fetch_campaign(campaign_id).await?.ok_or(DonationFlowError::CampaignNotFound(campaign_id))?;
        if !campaign.accepts_donations() {
            debug!("🔄️ Campaign #{campaign_id} is {} (public: {}). Not accepting donations", campaign.status, campaign.is_public);
            return Err(DonationFlowError::CampaignNotFound(campaign_id));
        }
        Ok(campaign)
    }

    pub(crate) fn check_amount(&self, amount: Amount) -> Result<(), DonationFlowError> {
        if !amount.is_positive() {
            return Err(DonationFlowError::InvalidAmount(format!("{amount} is not a positive amount")));
        }
        if amount < self.config.minimum_amount {
            return Err(DonationFlowError::InvalidAmount(format!(
                "{amount} is below the minimum of {}",
                self.config.minimum_amount
            )));
        }
        Ok(())
    }

    /// Fails an open donation and, if this call made the change, tells the subscribers.
    pub(crate) async fn fail_and_notify(
        &self,
        donation_id: i64,
        reason: &str,
    ) -> Result<Option<Donation>, DonationFlowError> {
        let failed = self.db.fail_donation(donation_id, reason, self.clock.now()).await?;
        if let Some(donation) = &failed {
            self.call_donation_failed_hook(donation).await;
        }
        Ok(failed)
    }

    pub(crate) async fn call_donation_completed_hook(&self, donation: &Donation) {
        for emitter in &self.producers.donation_completed_producer {
            debug!("🔄️📬️ Notifying donation completed hook subscribers");
            emitter.publish_event(DonationCompletedEvent::new(donation.clone())).await;
        }
    }

    pub(crate) async fn call_donation_failed_hook(&self, donation: &Donation) {
        for emitter in &self.producers.donation_failed_producer {
            debug!("🔄️📬️ Notifying donation failed hook subscribers");
            emitter.publish_event(DonationFailedEvent::new(donation.clone())).await;
        }
    }

    pub(crate) async fn call_donation_refunded_hook(&self, donation: &Donation, amount: Amount) {
        for emitter in &self.producers.donation_refunded_producer {
            debug!("🔄️📬️ Notifying donation refunded hook subscribers");
            emitter.publish_event(DonationRefundedEvent::new(donation.clone(), amount)).await;
        }
    }
}
