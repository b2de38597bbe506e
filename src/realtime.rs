use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::pubsub::{DynChannel, Event, Topic};

pub type EventListener = Arc<dyn Fn(Event) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Connecting,
    Open,
    Closing,
    Closed,
    Failed,
}

#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

struct Subscription {
    topic: Topic,
    status: Arc<Mutex<SubscriptionStatus>>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Keeps one logical subscription per (topic, listener) pair alive over a
/// transport connection. Events reach the listener in arrival order while a
/// connection is open. On transport loss the service reconnects with
/// exponential backoff; after exhausting its attempts the subscription goes
/// `Failed` and stays dead until the caller subscribes again, so silently
/// stale subscriptions never accumulate. Nothing is replayed across a
/// reconnect — listeners treat events as change signals and re-read
/// authoritative state.
pub struct SubscriptionService {
    channel: DynChannel,
    policy: BackoffPolicy,
    subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl SubscriptionService {
    pub fn new(channel: DynChannel, policy: BackoffPolicy) -> Self {
        Self {
            channel,
            policy,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    #[tracing::instrument(skip(self, listener))]
    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> Uuid
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        let connection_id = Uuid::new_v4();
        let status = Arc::new(Mutex::new(SubscriptionStatus::Connecting));
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run_subscription(
            self.channel.clone(),
            topic,
            Arc::new(listener) as EventListener,
            self.policy,
            status.clone(),
            stop_rx,
        ));

        self.subscriptions.lock().unwrap().insert(
            connection_id,
            Subscription {
                topic,
                status,
                stop_tx: Some(stop_tx),
                task,
            },
        );

        connection_id
    }

    /// Closes the subscription and forgets its listener. Unknown ids are
    /// ignored so repeated calls are harmless.
    #[tracing::instrument(skip(self))]
    pub fn unsubscribe(&self, connection_id: Uuid) {
        let maybe_subscription = self.subscriptions.lock().unwrap().remove(&connection_id);

        if let Some(mut subscription) = maybe_subscription {
            *subscription.status.lock().unwrap() = SubscriptionStatus::Closing;

            if let Some(stop_tx) = subscription.stop_tx.take() {
                let _ = stop_tx.send(());
            }
        }
    }

    pub fn status(&self, connection_id: Uuid) -> Option<SubscriptionStatus> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&connection_id)
            .map(|subscription| *subscription.status.lock().unwrap())
    }

    pub fn topic(&self, connection_id: Uuid) -> Option<Topic> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&connection_id)
            .map(|subscription| subscription.topic)
    }

    /// Waits for every remaining subscription task to wind down.
    pub async fn shutdown(&self) {
        let subscriptions: Vec<Subscription> = {
            let mut map = self.subscriptions.lock().unwrap();
            map.drain().map(|(_, s)| s).collect()
        };

        for mut subscription in subscriptions {
            *subscription.status.lock().unwrap() = SubscriptionStatus::Closing;
            if let Some(stop_tx) = subscription.stop_tx.take() {
                let _ = stop_tx.send(());
            }
            let _ = subscription.task.await;
        }
    }
}

async fn run_subscription(
    channel: DynChannel,
    topic: Topic,
    listener: EventListener,
    policy: BackoffPolicy,
    status: Arc<Mutex<SubscriptionStatus>>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut attempt: u32 = 0;

    loop {
        match channel.open(&topic).await {
            Ok(mut stream) => {
                *status.lock().unwrap() = SubscriptionStatus::Open;
                attempt = 0;

                loop {
                    tokio::select! {
                        _ = &mut stop_rx => {
                            *status.lock().unwrap() = SubscriptionStatus::Closed;
                            return;
                        }
                        received = stream.recv() => match received {
                            Ok(Some(event)) => listener(event),
                            Ok(None) => {
                                tracing::info!(%topic, "topic closed, reconnecting");
                                break;
                            }
                            Err(err) => {
                                tracing::warn!(%topic, error = %err.message, "transport lost");
                                break;
                            }
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%topic, error = %err.message, "failed to open topic");
            }
        }

        if attempt >= policy.max_attempts {
            tracing::warn!(%topic, attempts = attempt, "giving up on subscription");
            *status.lock().unwrap() = SubscriptionStatus::Failed;
            return;
        }

        let delay = policy.delay(attempt);
        attempt += 1;
        *status.lock().unwrap() = SubscriptionStatus::Connecting;

        tokio::select! {
            _ = &mut stop_rx => {
                *status.lock().unwrap() = SubscriptionStatus::Closed;
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{transport_failure_error, Error};
    use crate::pubsub::{EventKind, LocalChannel, PubSubChannel, TopicStream};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..2000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("condition never became true");
    }

    /// Transport whose every `open` fails, recording attempt times.
    struct DeadChannel {
        opened_at: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl PubSubChannel for DeadChannel {
        async fn open(&self, _topic: &Topic) -> Result<Box<dyn TopicStream>, Error> {
            self.opened_at.lock().unwrap().push(Instant::now());
            Err(transport_failure_error())
        }

        async fn publish(&self, _topic: &Topic, _event: Event) -> Result<(), Error> {
            Err(transport_failure_error())
        }
    }

    /// Transport whose first connection dies after one event.
    struct FlakyChannel {
        inner: LocalChannel,
        opens: AtomicUsize,
    }

    struct FlakyStream {
        inner: Box<dyn TopicStream>,
        events_before_drop: Option<usize>,
    }

    #[async_trait]
    impl TopicStream for FlakyStream {
        async fn recv(&mut self) -> Result<Option<Event>, Error> {
            if self.events_before_drop == Some(0) {
                return Err(transport_failure_error());
            }

            let event = self.inner.recv().await?;
            if let Some(budget) = self.events_before_drop.as_mut() {
                *budget -= 1;
            }

            Ok(event)
        }
    }

    #[async_trait]
    impl PubSubChannel for FlakyChannel {
        async fn open(&self, topic: &Topic) -> Result<Box<dyn TopicStream>, Error> {
            let first = self.opens.fetch_add(1, Ordering::SeqCst) == 0;

            Ok(Box::new(FlakyStream {
                inner: self.inner.open(topic).await?,
                events_before_drop: first.then_some(1),
            }))
        }

        async fn publish(&self, topic: &Topic, event: Event) -> Result<(), Error> {
            self.inner.publish(topic, event).await
        }
    }

    #[tokio::test]
    async fn delivers_events_in_order() {
        let channel = Arc::new(LocalChannel::new());
        let service = SubscriptionService::new(channel.clone(), policy());
        let topic = Topic::Ride(Uuid::new_v4());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = service.subscribe(topic, move |event| {
            sink.lock().unwrap().push(event.data["n"].as_i64().unwrap());
        });

        wait_for(|| service.status(id) == Some(SubscriptionStatus::Open)).await;

        for n in 0..10 {
            channel
                .publish(&topic, Event::new(EventKind::RideCreated, json!({ "n": n })))
                .await
                .unwrap();
        }

        wait_for(|| seen.lock().unwrap().len() == 10).await;
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<i64>>());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_schedule_then_failed() {
        let channel = Arc::new(DeadChannel {
            opened_at: Mutex::new(Vec::new()),
        });
        let service = SubscriptionService::new(channel.clone(), policy());

        let started = Instant::now();
        let id = service.subscribe(Topic::Ride(Uuid::new_v4()), |_| {});

        wait_for(|| service.status(id) == Some(SubscriptionStatus::Failed)).await;

        let offsets: Vec<u64> = channel
            .opened_at
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(started).as_secs())
            .collect();

        // Initial attempt, then retries 1, 2, 4, 8, 16 units apart.
        assert_eq!(offsets, vec![0, 1, 3, 7, 15, 31]);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_and_keeps_delivering() {
        let channel = Arc::new(FlakyChannel {
            inner: LocalChannel::new(),
            opens: AtomicUsize::new(0),
        });
        let service = SubscriptionService::new(channel.clone(), policy());
        let topic = Topic::Ride(Uuid::new_v4());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = service.subscribe(topic, move |event| {
            sink.lock().unwrap().push(event.data["n"].as_i64().unwrap());
        });

        wait_for(|| service.status(id) == Some(SubscriptionStatus::Open)).await;

        channel
            .publish(&topic, Event::new(EventKind::RideCreated, json!({ "n": 1 })))
            .await
            .unwrap();
        wait_for(|| seen.lock().unwrap().len() == 1).await;

        // The first connection dies after that event; wait for the reconnect.
        wait_for(|| {
            channel.opens.load(Ordering::SeqCst) == 2
                && service.status(id) == Some(SubscriptionStatus::Open)
        })
        .await;

        channel
            .publish(&topic, Event::new(EventKind::RideAccepted, json!({ "n": 2 })))
            .await
            .unwrap();

        wait_for(|| seen.lock().unwrap().len() == 2).await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let channel = Arc::new(LocalChannel::new());
        let service = SubscriptionService::new(channel, policy());

        let id = service.subscribe(Topic::Notifications(Uuid::new_v4()), |_| {});
        wait_for(|| service.status(id) == Some(SubscriptionStatus::Open)).await;

        service.unsubscribe(id);
        assert!(service.status(id).is_none());

        // A second call and an unknown id are both fine.
        service.unsubscribe(id);
        service.unsubscribe(Uuid::new_v4());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_subscription_does_not_affect_others() {
        let healthy = Arc::new(LocalChannel::new());
        let healthy_service = SubscriptionService::new(healthy.clone(), policy());
        let dead_service = SubscriptionService::new(
            Arc::new(DeadChannel {
                opened_at: Mutex::new(Vec::new()),
            }),
            policy(),
        );

        let topic = Topic::Notifications(Uuid::new_v4());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let healthy_id = healthy_service.subscribe(topic, move |event| {
            sink.lock().unwrap().push(event.kind);
        });
        let dead_id = dead_service.subscribe(Topic::Ride(Uuid::new_v4()), |_| {});

        wait_for(|| healthy_service.status(healthy_id) == Some(SubscriptionStatus::Open)).await;
        wait_for(|| dead_service.status(dead_id) == Some(SubscriptionStatus::Failed)).await;

        healthy
            .publish(&topic, Event::new(EventKind::RideCompleted, json!({})))
            .await
            .unwrap();

        wait_for(|| !seen.lock().unwrap().is_empty()).await;
        assert_eq!(seen.lock().unwrap()[0], EventKind::RideCompleted);
    }
}
