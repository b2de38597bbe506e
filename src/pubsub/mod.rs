use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::Error;

const TOPIC_BUFFER: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RideCreated,
    RideAccepted,
    RideStarted,
    RideCompleted,
    RideCancelled,
    DriverLocation,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    Ride(Uuid),
    DriverRequests(Uuid),
    Notifications(Uuid),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ride(id) => write!(f, "ride:{}", id),
            Self::DriverRequests(id) => write!(f, "driver-requests:{}", id),
            Self::Notifications(id) => write!(f, "notifications:{}", id),
        }
    }
}

/// One end of an open topic. `recv` resolves to `Ok(None)` when the topic is
/// closed cleanly and to a transport error when the connection is lost.
#[async_trait]
pub trait TopicStream: Send {
    async fn recv(&mut self) -> Result<Option<Event>, Error>;
}

#[async_trait]
pub trait PubSubChannel {
    async fn open(&self, topic: &Topic) -> Result<Box<dyn TopicStream>, Error>;
    async fn publish(&self, topic: &Topic, event: Event) -> Result<(), Error>;
}

pub type DynChannel = Arc<dyn PubSubChannel + Send + Sync>;

/// In-process transport backed by one broadcast channel per topic.
pub struct LocalChannel {
    topics: RwLock<HashMap<String, broadcast::Sender<Event>>>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    fn sender(&self, topic: &Topic) -> broadcast::Sender<Event> {
        let key = topic.to_string();

        if let Some(tx) = self.topics.read().unwrap().get(&key) {
            return tx.clone();
        }

        let mut topics = self.topics.write().unwrap();
        topics
            .entry(key)
            .or_insert_with(|| broadcast::channel(TOPIC_BUFFER).0)
            .clone()
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubChannel for LocalChannel {
    async fn open(&self, topic: &Topic) -> Result<Box<dyn TopicStream>, Error> {
        let rx = self.sender(topic).subscribe();

        Ok(Box::new(LocalStream { rx }))
    }

    async fn publish(&self, topic: &Topic, event: Event) -> Result<(), Error> {
        // A send error only means nobody is listening right now.
        let _ = self.sender(topic).send(event);

        Ok(())
    }
}

struct LocalStream {
    rx: broadcast::Receiver<Event>,
}

#[async_trait]
impl TopicStream for LocalStream {
    async fn recv(&mut self) -> Result<Option<Event>, Error> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "topic stream lagged, dropping missed events");
                    continue;
                }
            }
        }
    }
}
