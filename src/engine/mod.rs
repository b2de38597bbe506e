mod bid_api;
mod driver_location_api;
mod matching_api;
mod ride_api;

use serde_json::json;
use uuid::Uuid;

use crate::api::API;
use crate::config::Config;
use crate::entities::Ride;
use crate::notify::{DynDispatcher, NotificationDispatcher};
use crate::pubsub::{DynChannel, Event, EventKind, PubSubChannel, Topic};
use crate::registry::DriverLocationRegistry;
use crate::store::DynRideStore;

pub struct Engine {
    store: DynRideStore,
    registry: DriverLocationRegistry,
    channel: DynChannel,
    dispatcher: DynDispatcher,
    config: Config,
}

impl Engine {
    pub fn new(
        store: DynRideStore,
        channel: DynChannel,
        dispatcher: DynDispatcher,
        config: Config,
    ) -> Self {
        let registry = DriverLocationRegistry::new(config.staleness_window);

        Self {
            store,
            registry,
            channel,
            dispatcher,
            config,
        }
    }

    /// Publishes a committed transition to the ride topic and mirrors it onto
    /// each affected party's notification stream. The write has already
    /// happened; delivery problems are logged, never surfaced.
    async fn emit(&self, kind: EventKind, ride: &Ride, notify: &[Uuid]) {
        let event = Event::new(kind, json!(ride));

        if let Err(err) = self.channel.publish(&Topic::Ride(ride.id), event.clone()).await {
            tracing::warn!(ride_id = %ride.id, error = %err.message, "failed to publish ride event");
        }

        for user_id in notify {
            if let Err(err) = self
                .channel
                .publish(&Topic::Notifications(*user_id), event.clone())
                .await
            {
                tracing::warn!(%user_id, error = %err.message, "failed to publish notification");
            }

            self.dispatcher.notify(*user_id, &event).await;
        }
    }
}

impl API for Engine {}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::notify::LogDispatcher;
    use crate::pubsub::LocalChannel;
    use crate::store::MemoryRideStore;
    use std::sync::Arc;

    pub fn engine() -> (Engine, DynChannel) {
        engine_with_config(Config::default())
    }

    pub fn engine_with_config(config: Config) -> (Engine, DynChannel) {
        let channel: DynChannel = Arc::new(LocalChannel::new());
        let engine = Engine::new(
            Arc::new(MemoryRideStore::new()),
            channel.clone(),
            Arc::new(LogDispatcher),
            config,
        );

        (engine, channel)
    }
}
