use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use log::*;

use crate::{
    db_types::{Donation, DonationStatus, PaymentChannel, RefundRecord},
    dpe_api::{donation_flow_api::DonationFlowApi, errors::DonationFlowError, flow_objects::RefundRequest},
    traits::{DonationGatewayDatabase, DonationManagement, GatewayRefundRequest, PaymentGateway},
};

/// Claims a donation for the duration of one refund. A second refund for the same donation cannot start while the
/// first is talking to the gateway. The claim is released on drop, so a cancelled refund doesn't leave it stuck.
struct RefundClaim {
    donation_id: i64,
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

impl RefundClaim {
    fn try_claim(in_flight: &Arc<Mutex<HashSet<i64>>>, donation_id: i64) -> Option<Self> {
        let mut set = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.insert(donation_id).then(|| Self { donation_id, in_flight: Arc::clone(in_flight) })
    }
}

impl Drop for RefundClaim {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.donation_id);
    }
}

impl<B, G> DonationFlowApi<B, G>
where
    B: DonationGatewayDatabase + DonationManagement,
    G: PaymentGateway,
{
    /// Reverses a completed donation, in full or in part.
    ///
    /// The caller is responsible for authorizing the request.
    ///
    /// For gateway donations, the reversal is requested from the gateway first. If the gateway refuses, nothing
    /// changes locally and `GatewayRefundFailed` is returned. Once the gateway has refunded the payment, the donation
    /// moves to `Refunded` and the refund amount is subtracted from the campaign's collected amount in one
    /// transaction. Offline donations skip the gateway.
    ///
    /// A partial refund still moves the donation to `Refunded`. The unrefunded remainder stays credited to the
    /// campaign.
    pub async fn refund_donation(&self, request: RefundRequest) -> Result<Donation, DonationFlowError> {
        let id = request.donation_id;
        let _claim = RefundClaim::try_claim(&self.refunds_in_flight, id).ok_or_else(|| {
            debug!("🔄️↩️ A refund for donation #{id} is already in progress");
            DonationFlowError::NotRefundable(id)
        })?;
        let donation = self.db.fetch_donation(id).await?.ok_or(DonationFlowError::DonationNotFound(id))?;
        if donation.status != DonationStatus::Completed {
            debug!("🔄️↩️ Donation #{id} is {}. It cannot be refunded", donation.status);
            return Err(DonationFlowError::NotRefundable(id));
        }
        let available = donation.refundable_amount();
        let amount = match request.amount {
            None => available,
            Some(a) if !a.is_positive() => {
                return Err(DonationFlowError::InvalidAmount(format!("{a} is not a positive refund amount")));
            },
            Some(a) if a > available => {
                return Err(DonationFlowError::RefundAmountExceedsDonation { requested: a, available });
            },
            Some(a) => a,
        };
        let gateway_refund_id = match donation.channel {
            PaymentChannel::Gateway => {
                let payment_id = donation.gateway_payment_id.clone().ok_or_else(|| {
                    DonationFlowError::InvalidStatusTransition(format!(
                        "Donation #{id} is Completed but has no gateway payment id"
                    ))
                })?;
                let receipt = self
                    .gateway
                    .refund_payment(GatewayRefundRequest { payment_id: payment_id.clone(), amount })
                    .await
                    .map_err(|e| {
                        warn!("🔄️↩️ The gateway did not refund payment {payment_id} for donation #{id}. {e}");
                        DonationFlowError::GatewayRefundFailed(e.to_string())
                    })?;
                debug!("🔄️↩️ Gateway refunded {amount} of payment {payment_id} as {}", receipt.refund_id);
                Some(receipt.refund_id)
            },
            PaymentChannel::Offline => None,
        };
        let record =
            RefundRecord { donation_id: id, amount, gateway_refund_id: gateway_refund_id.clone(), reason: request.reason };
        match self.db.record_refund(record, self.clock.now()).await {
            Ok(Some(donation)) => {
                info!(
                    "🔄️↩️ Donation #{id} refunded {amount} {}. Campaign #{} debited",
                    donation.currency, donation.campaign_id
                );
                self.call_donation_refunded_hook(&donation, amount).await;
                Ok(donation)
            },
            Ok(None) => {
                error!(
                    "🔄️↩️ Donation #{id} stopped being refundable while the gateway processed refund {gateway_refund_id:?}. \
                     This refund must be reconciled manually"
                );
                Err(DonationFlowError::NotRefundable(id))
            },
            Err(e) => {
                error!(
                    "🔄️↩️ Could not record refund {gateway_refund_id:?} for donation #{id}. This refund must be reconciled \
                     manually. {e}"
                );
                Err(e.into())
            },
        }
    }
}
