use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DonationCompletedEvent,
    DonationFailedEvent,
    DonationRefundedEvent,
    EventHandler,
    EventProducer,
    Handler,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub donation_completed_producer: Vec<EventProducer<DonationCompletedEvent>>,
    pub donation_failed_producer: Vec<EventProducer<DonationFailedEvent>>,
    pub donation_refunded_producer: Vec<EventProducer<DonationRefundedEvent>>,
}

pub struct EventHandlers {
    pub on_donation_completed: Option<EventHandler<DonationCompletedEvent>>,
    pub on_donation_failed: Option<EventHandler<DonationFailedEvent>>,
    pub on_donation_refunded: Option<EventHandler<DonationRefundedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_donation_completed = hooks.on_donation_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_donation_failed = hooks.on_donation_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_donation_refunded = hooks.on_donation_refunded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_donation_completed, on_donation_failed, on_donation_refunded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_donation_completed {
            result.donation_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_donation_failed {
            result.donation_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_donation_refunded {
            result.donation_refunded_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_donation_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_donation_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_donation_refunded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_donation_completed: Option<Handler<DonationCompletedEvent>>,
    pub on_donation_failed: Option<Handler<DonationFailedEvent>>,
    pub on_donation_refunded: Option<Handler<DonationRefundedEvent>>,
}

impl EventHooks {
    pub fn on_donation_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_donation_completed = Some(Arc::new(f));
        self
    }

    pub fn on_donation_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_donation_failed = Some(Arc::new(f));
        self
    }

    pub fn on_donation_refunded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationRefundedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_donation_refunded = Some(Arc::new(f));
        self
    }
}
