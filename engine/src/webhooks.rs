//! Best-effort webhook delivery.
//!
//! Producers hand messages to a [`WebhookCollector`] without blocking; a single
//! [`WebhookSender`] task batches them per flush interval and forwards each destination
//! the messages its type and area filters accept.

use crate::areas::any_area_matches;
use crate::config::WebhookDestination;
use crate::error::Result;
use async_trait::async_trait;
use fortwatch_wire::AreaName;
use fortwatch_wire::WebhookMessage;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

#[derive(Clone)]
pub struct WebhookCollector {
    sender: mpsc::Sender<WebhookMessage>,
}

impl WebhookCollector {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<WebhookMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queues `message`, dropping it when the queue is full or the sender has stopped.
    pub fn publish(&self, message: WebhookMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!("webhook queue full, dropping {} message", message.message_type);
                false
            }
            Err(TrySendError::Closed(message)) => {
                debug!("webhook sender stopped, dropping {} message", message.message_type);
                false
            }
        }
    }
}

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn send(&self, url: &str, batch: &[WebhookMessage]) -> Result<()>;
}

/// Keeps every batch in memory.
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<(String, Vec<WebhookMessage>)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(String, Vec<WebhookMessage>)> {
        match self.batches.lock() {
            Ok(batches) => batches.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn send(&self, url: &str, batch: &[WebhookMessage]) -> Result<()> {
        let mut batches = match self.batches.lock() {
            Ok(batches) => batches,
            Err(poisoned) => poisoned.into_inner(),
        };
        batches.push((url.to_string(), batch.to_vec()));
        Ok(())
    }
}

struct Route {
    url: String,
    types: Vec<String>,
    areas: Vec<AreaName>,
}

impl Route {
    fn accepts(&self, message: &WebhookMessage) -> bool {
        let type_ok = self.types.is_empty() || self.types.contains(&message.message_type);
        let area_ok = self.areas.is_empty() || any_area_matches(&self.areas, &message.areas);
        type_ok && area_ok
    }
}

/// Shorter flush intervals, zero included, are raised to this.
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

pub struct WebhookSender {
    routes: Vec<Route>,
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookSender {
    pub fn new(destinations: &[WebhookDestination], transport: Arc<dyn WebhookTransport>) -> Self {
        let routes = destinations
            .iter()
            .map(|destination| Route {
                url: destination.url.clone(),
                types: destination.types.clone(),
                areas: destination
                    .areas
                    .iter()
                    .map(|area| AreaName::parse(area))
                    .collect(),
            })
            .collect();
        Self { routes, transport }
    }

    /// Runs until `shutdown` fires or every collector is dropped, then flushes what is left.
    pub fn spawn(
        self,
        mut receiver: mpsc::Receiver<WebhookMessage>,
        flush_interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(flush_interval.max(MIN_FLUSH_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut pending = Vec::new();
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    message = receiver.recv() => match message {
                        Some(message) => pending.push(message),
                        None => break,
                    },
                    _ = ticker.tick() => self.flush(&mut pending).await,
                }
            }
            while let Ok(message) = receiver.try_recv() {
                pending.push(message);
            }
            self.flush(&mut pending).await;
            debug!("webhook sender stopped");
        })
    }

    pub async fn flush(&self, pending: &mut Vec<WebhookMessage>) {
        if pending.is_empty() {
            return;
        }
        for route in &self.routes {
            let batch: Vec<WebhookMessage> = pending
                .iter()
                .filter(|message| route.accepts(message))
                .cloned()
                .collect();
            if batch.is_empty() {
                continue;
            }
            if let Err(err) = self.transport.send(&route.url, &batch).await {
                warn!("webhook delivery to {} failed: {err}", route.url);
            }
        }
        pending.clear();
    }
}
