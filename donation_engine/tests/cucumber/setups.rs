use cucumber::given;
use donation_engine::{
    db_types::{CampaignStatus, NewCampaign},
    test_utils::TestSystem,
};
use dpg_common::Amount;

use crate::cucumber::DonationWorld;

#[given("a fresh install")]
async fn fresh_database(world: &mut DonationWorld) {
    let system = TestSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "an active campaign '{word}' with a target of {int}")]
async fn active_campaign(world: &mut DonationWorld, name: String, target: i64) {
    let campaign = world.system().create_campaign(NewCampaign::new(name.clone(), Amount::from_major(target))).await;
    world.campaigns.insert(name, campaign.id);
}

#[given(expr = "a {word} campaign '{word}'")]
async fn campaign_with_status(world: &mut DonationWorld, status: String, name: String) {
    let status = status.parse::<CampaignStatus>().unwrap_or_else(|e| panic!("{e}"));
    let new_campaign = NewCampaign::new(name.clone(), Amount::from_major(1_000)).with_status(status);
    let campaign = world.system().create_campaign(new_campaign).await;
    world.campaigns.insert(name, campaign.id);
}
