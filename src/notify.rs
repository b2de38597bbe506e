use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::pubsub::Event;

/// Fire-and-forget hook invoked on every major ride transition with the
/// affected party and a small payload. Formatting and delivery of the actual
/// push notification happen elsewhere; a dispatcher must never fail a ride
/// mutation, so the trait is infallible and implementations swallow their own
/// errors.
#[async_trait]
pub trait NotificationDispatcher {
    async fn notify(&self, user_id: Uuid, event: &Event);
}

pub type DynDispatcher = Arc<dyn NotificationDispatcher + Send + Sync>;

pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn notify(&self, user_id: Uuid, event: &Event) {
        tracing::info!(%user_id, kind = ?event.kind, "dispatching notification");
    }
}
