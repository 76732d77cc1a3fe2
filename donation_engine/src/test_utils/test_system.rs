use std::sync::Arc;

use dpg_common::{Amount, Secret};
use log::*;

use crate::{
    db_types::{Campaign, DonorInfo, NewCampaign},
    events::EventProducers,
    flow_objects::{IssueOrderRequest, IssuedOrder, VerifyPaymentRequest},
    helpers::Clock,
    test_utils::{
        prepare_env::{drop_test_database, prepare_test_env, random_db_path},
        FakeGateway,
        FixedClock,
        TEST_GATEWAY_SECRET,
    },
    DonationFlowApi,
    DonationFlowConfig,
    DonationGatewayDatabase,
    DonationManagement,
    DonationQueryApi,
    SqliteDatabase,
};

/// A complete engine on a throwaway database, with a fake gateway and a fixed clock.
#[derive(Debug)]
pub struct TestSystem {
    pub db_path: String,
    pub api: DonationFlowApi<SqliteDatabase, FakeGateway>,
    pub queries: DonationQueryApi<SqliteDatabase>,
    pub gateway: FakeGateway,
    pub clock: Arc<FixedClock>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db_path = random_db_path();
        prepare_test_env(&db_path).await;
        let db = SqliteDatabase::new_with_url(&db_path, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {db_path}");
        let gateway = FakeGateway::new();
        let clock = Arc::new(FixedClock::default());
        let config = DonationFlowConfig::new(Secret::new(TEST_GATEWAY_SECRET.to_string()), Amount::from(100));
        let queries = DonationQueryApi::new(db.clone());
        let api = DonationFlowApi::new(db, gateway.clone(), config, producers).with_clock(clock.clone());
        Self { db_path, api, queries, gateway, clock }
    }

    pub async fn create_campaign(&self, campaign: NewCampaign) -> Campaign {
        self.api.db().insert_campaign(campaign, self.clock.now()).await.expect("Error creating campaign")
    }

    pub async fn issue(&self, campaign_id: i64, amount: Amount) -> IssuedOrder {
        let donor = DonorInfo::new("Test Donor", "donor@example.org");
        self.api.issue_order(IssueOrderRequest::new(campaign_id, amount, donor)).await.expect("Error issuing order")
    }

    /// The verification request the gateway would hand the donor after paying `order` with `payment_id`.
    pub fn signed_verification(&self, order: &IssuedOrder, payment_id: &str) -> VerifyPaymentRequest {
        VerifyPaymentRequest {
            donation_id: order.donation_id,
            gateway_order_id: order.gateway_order_id.clone(),
            gateway_payment_id: payment_id.to_string(),
            signature: self.gateway.sign(&order.gateway_order_id, payment_id),
        }
    }

    pub async fn collected(&self, campaign_id: i64) -> Amount {
        self.api
            .db()
            .fetch_campaign(campaign_id)
            .await
            .expect("Error fetching campaign")
            .expect("Campaign does not exist")
            .collected_amount
    }

    pub async fn teardown(mut self) {
        if let Err(e) = self.api.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        drop(self.queries);
        drop_test_database(&self.db_path).await;
    }
}
