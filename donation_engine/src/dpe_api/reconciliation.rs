//! Exactly-once settlement of gateway payments against campaigns.
//!
//! A donation is credited to its campaign at most once, no matter how many times (or how concurrently) its payment
//! confirmation is presented. The database does the heavy lifting: the transition to `Completed` is a conditional
//! update on the donation's current status, the gateway payment id is unique across all donations, and the campaign
//! total moves in the same transaction as the status change.
use log::*;

use crate::{
    db_types::{Donation, DonationStatus, GatewaySettlement, NewDonation},
    dpe_api::{
        donation_flow_api::DonationFlowApi,
        errors::DonationFlowError,
        flow_objects::{GatewayPaymentEvent, OfflineDonationRequest, PaymentVerification, VerifyPaymentRequest},
    },
    helpers::{constant_time_eq, verify_payment_signature},
    traits::{CompletionResult, DonationDbError, DonationGatewayDatabase, DonationManagement, PaymentGateway},
};

impl<B, G> DonationFlowApi<B, G>
where
    B: DonationGatewayDatabase + DonationManagement,
    G: PaymentGateway,
{
    /// Verifies a payment confirmation and, if it is authentic, credits the donation to its campaign.
    ///
    /// | Donation status       | Result                                                        |
    /// |-----------------------|---------------------------------------------------------------|
    /// | Completed, Refunded   | No-op. The current record is returned.                        |
    /// | Failed                | `InvalidStatusTransition`                                     |
    /// | Pending, Processing   | See below                                                     |
    ///
    /// For an open donation:
    /// * If the payment id is already bound to another donation, this donation is marked `Failed` and
    ///   `PaymentIdReused` is returned, whether or not the signature is valid.
    /// * If the claimed order id is not the one issued for this donation, or the signature does not verify, the
    ///   donation is marked `Failed` and `SignatureInvalid` is returned.
    /// * Otherwise the donation becomes `Completed` and the campaign's collected amount grows by the donation amount,
    ///   atomically. If a concurrent call got there first, this call becomes a no-op.
    ///
    /// The campaign aggregate is never touched by a rejected call.
    pub async fn verify_payment(&self, request: VerifyPaymentRequest) -> Result<PaymentVerification, DonationFlowError> {
        request.validate()?;
        let id = request.donation_id;
        let payment_id = request.gateway_payment_id.trim().to_string();
        let donation = self.db.fetch_donation(id).await?.ok_or(DonationFlowError::DonationNotFound(id))?;
        if donation.status.is_settled() {
            debug!("🔄️✅️ Donation #{id} is already {}. Verification is a no-op", donation.status);
            return Ok(PaymentVerification::unchanged(donation));
        }
        if donation.status == DonationStatus::Failed {
            return Err(DonationFlowError::InvalidStatusTransition(format!(
                "Donation #{id} has failed and cannot be completed"
            )));
        }
        if let Some(other) = self.db.fetch_donation_by_payment_id(&payment_id).await? {
            if other.id != id {
                return Err(self.reject_reused_payment(&donation, &payment_id, other.id).await);
            }
        }
        if !self.is_authentic(&donation, &request) {
            warn!(
                "🔄️🔐️ Rejected payment confirmation for donation #{id}. order: {}, payment: {payment_id}, stored order: \
                 {:?}",
                request.gateway_order_id, donation.gateway_order_id
            );
            self.fail_and_notify(id, "Payment signature verification failed").await?;
            return Err(DonationFlowError::SignatureInvalid);
        }
        let settlement =
            GatewaySettlement { donation_id: id, gateway_payment_id: payment_id.clone(), signature: request.signature };
        match self.db.complete_donation(settlement, self.clock.now()).await {
            Ok(CompletionResult::Completed(donation)) => {
                info!(
                    "🔄️✅️ Donation #{id} verified with payment {payment_id}. {} {} credited to campaign #{}",
                    donation.amount, donation.currency, donation.campaign_id
                );
                self.call_donation_completed_hook(&donation).await;
                Ok(PaymentVerification::credited(donation))
            },
            Ok(CompletionResult::AlreadySettled(donation)) => {
                debug!("🔄️✅️ Donation #{id} was settled by a concurrent verification. No-op");
                Ok(PaymentVerification::unchanged(donation))
            },
            Ok(CompletionResult::NotPayable(donation)) => Err(DonationFlowError::InvalidStatusTransition(format!(
                "Donation #{id} is {} and cannot be completed",
                donation.status
            ))),
            Err(DonationDbError::PaymentIdAlreadyBound(_)) => {
                let other = self.db.fetch_donation_by_payment_id(&payment_id).await?.map(|d| d.id).unwrap_or_default();
                Err(self.reject_reused_payment(&donation, &payment_id, other).await)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// The claimed order must be the one we issued for this donation, and the gateway must have signed it together
    /// with the payment id.
    fn is_authentic(&self, donation: &Donation, request: &VerifyPaymentRequest) -> bool {
        let order_matches = donation
            .gateway_order_id
            .as_deref()
            .map(|stored| constant_time_eq(stored.as_bytes(), request.gateway_order_id.as_bytes()))
            .unwrap_or(false);
        let signature_valid = verify_payment_signature(
            &request.gateway_order_id,
            request.gateway_payment_id.trim(),
            &request.signature,
            self.config.gateway_secret.reveal(),
        );
        order_matches && signature_valid
    }

    async fn reject_reused_payment(&self, donation: &Donation, payment_id: &str, credited_to: i64) -> DonationFlowError {
        warn!(
            "🔄️🔐️ Payment {payment_id} was presented for donation #{}, but it was already credited to donation \
             #{credited_to}",
            donation.id
        );
        let reason = format!("Payment {payment_id} was already credited to another donation");
        if let Err(e) = self.fail_and_notify(donation.id, &reason).await {
            error!("🔄️🔐️ Could not mark donation #{} as failed. {e}", donation.id);
        }
        DonationFlowError::PaymentIdReused(payment_id.to_string())
    }

    /// Records a payment received outside the gateway. The donation is stored as `Completed` and the campaign is
    /// credited in the same transaction.
    pub async fn record_offline_donation(&self, request: OfflineDonationRequest) -> Result<Donation, DonationFlowError> {
        request.validate()?;
        let campaign = self
            .db
            .fetch_campaign(request.campaign_id)
            .await?
            .ok_or(DonationFlowError::CampaignNotFound(request.campaign_id))?;
        self.check_amount(request.amount)?;
        let reference = request.reference.filter(|r| !r.trim().is_empty());
        let new_donation =
            NewDonation::new(campaign.id, request.donor, request.amount, campaign.currency, self.clock.now())
                .offline(reference);
        let donation = self.db.insert_offline_donation(new_donation).await?;
        info!(
            "🔄️🏦️ Offline donation #{} of {} {} credited to campaign #{}",
            donation.id, donation.amount, donation.currency, donation.campaign_id
        );
        self.call_donation_completed_hook(&donation).await;
        Ok(donation)
    }

    /// Applies an (already authenticated) gateway webhook event.
    ///
    /// * `Authorized` moves a `Pending` donation to `Processing`.
    /// * `Failed` moves an open donation to `Failed`. Settled donations are never failed by a webhook.
    /// * Everything else is ignored.
    ///
    /// Returns the donation if its status changed.
    pub async fn apply_gateway_event(&self, event: GatewayPaymentEvent) -> Result<Option<Donation>, DonationFlowError> {
        match event {
            GatewayPaymentEvent::Authorized { order_id, payment_id } => {
                let updated = self.db.mark_donation_processing(&order_id, self.clock.now()).await?;
                match &updated {
                    Some(d) => info!("🔄️📨️ Payment {payment_id} authorized. Donation #{} is Processing", d.id),
                    None => debug!("🔄️📨️ Authorization for order {order_id} did not change any donation"),
                }
                Ok(updated)
            },
            GatewayPaymentEvent::Failed { order_id, payment_id, reason } => {
                let Some(donation) = self.db.fetch_donation_by_order_id(&order_id).await? else {
                    warn!("🔄️📨️ Gateway reported a failed payment for unknown order {order_id}. Ignoring");
                    return Ok(None);
                };
                if !donation.status.is_open() {
                    warn!(
                        "🔄️📨️ Gateway reported payment {payment_id:?} failed for donation #{}, which is {}. Ignoring",
                        donation.id, donation.status
                    );
                    return Ok(None);
                }
                let reason = format!("Gateway reported payment failure: {reason}");
                let updated = self.fail_and_notify(donation.id, &reason).await?;
                if updated.is_some() {
                    info!("🔄️📨️ Donation #{} failed at the gateway", donation.id);
                }
                Ok(updated)
            },
            GatewayPaymentEvent::Other { event } => {
                trace!("🔄️📨️ Ignoring gateway event {event}");
                Ok(None)
            },
        }
    }
}
