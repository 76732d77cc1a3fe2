use std::collections::HashMap;

use cucumber::World;
use donation_engine::{flow_objects::IssuedOrder, test_utils::TestSystem, DonationFlowError};

#[derive(Default, Debug, World)]
pub struct DonationWorld {
    pub system: Option<TestSystem>,
    /// Campaign ids, by the name used in the feature file
    pub campaigns: HashMap<String, i64>,
    /// Issued orders, by the label used in the feature file
    pub orders: HashMap<String, IssuedOrder>,
    pub last_error: Option<DonationFlowError>,
}

impl DonationWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("Donation system not initialised")
    }

    pub fn campaign_id(&self, name: &str) -> i64 {
        *self.campaigns.get(name).unwrap_or_else(|| panic!("Unknown campaign {name}"))
    }

    pub fn order(&self, label: &str) -> &IssuedOrder {
        self.orders.get(label).unwrap_or_else(|| panic!("Unknown donation {label}"))
    }

    pub fn record<T>(&mut self, result: Result<T, DonationFlowError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                self.last_error = Some(e);
                None
            },
        }
    }
}
