//! Handler types and dependencies

use std::sync::Arc;

use teloxide::types::UserId;

use crate::download::pipeline::DeliveryCoordinator;
use crate::telegram::subscription::SubscriptionGate;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub coordinator: Arc<DeliveryCoordinator>,
    pub gate: Arc<dyn SubscriptionGate>,
    pub bot_username: Option<String>,
    pub bot_id: UserId,
}

impl HandlerDeps {
    pub fn new(
        coordinator: Arc<DeliveryCoordinator>,
        gate: Arc<dyn SubscriptionGate>,
        bot_username: Option<String>,
        bot_id: UserId,
    ) -> Self {
        Self {
            coordinator,
            gate,
            bot_username,
            bot_id,
        }
    }
}
