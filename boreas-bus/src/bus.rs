//! The dispatch engine.
//!
//! Owns a bounded inbound queue, a pool of worker tasks that drain it in
//! batches, and a retry worker that re-invokes failed handlers after an
//! exponential backoff. Every handler invocation produces a
//! [`ProcessingResult`] that is recorded to the optional event store and
//! folded into the bus statistics.
//!
//! Ordering contract: for one event, all matching subscriptions run
//! sequentially in priority order on the same worker. Across events there is
//! no ordering guarantee; a later event may complete before an earlier one on
//! a different worker.

#![allow(clippy::cast_possible_truncation)]

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use boreas_core::types::SubscriptionId;
use boreas_core::{Event, ProcessingResult};
use boreas_store::EventStore;

use crate::config::BusConfig;
use crate::error::{BatchPublishError, BusError};
use crate::handler::EventHandler;
use crate::registry::{SubscribeOptions, Subscription, SubscriptionRegistry};
use crate::retry::{DeadLetterQueue, RetryPolicy};
use crate::shutdown::ShutdownController;
use crate::stats::{BusStatistics, StatsRecorder};

/// A scheduled re-invocation of a failed (event, subscription) pair.
struct RetryEnvelope {
    event: Event,
    subscription: Arc<Subscription>,
    attempt: u32,
    due: tokio::time::Instant,
}

#[derive(Default)]
struct Lifecycle {
    shutdown: Option<ShutdownController>,
    workers: Vec<JoinHandle<()>>,
}

struct Inner {
    config: BusConfig,
    store: Option<Arc<dyn EventStore>>,
    registry: SubscriptionRegistry,
    inbound_tx: mpsc::Sender<Event>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<Event>>,
    retry_tx: mpsc::UnboundedSender<RetryEnvelope>,
    retry_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RetryEnvelope>>,
    retry_depth: AtomicUsize,
    retry_policy: RetryPolicy,
    dead_letters: DeadLetterQueue,
    stats: StatsRecorder,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

/// The event bus dispatch engine.
///
/// Cheap to clone; all clones share the same queues, registry and
/// statistics. Lifecycle is owned by whoever wired the bus (typically
/// [`EventSystem`](crate::system::EventSystem)) - there is no process-global
/// instance.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates a stopped bus without a store.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidConfig` if a queue, worker or batch size is
    /// zero.
    pub fn new(config: BusConfig) -> Result<Self, BusError> {
        Self::build(config, None)
    }

    /// Creates a stopped bus that records events and outcomes to `store`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidConfig` if a queue, worker or batch size is
    /// zero.
    pub fn with_store(config: BusConfig, store: Arc<dyn EventStore>) -> Result<Self, BusError> {
        Self::build(config, Some(store))
    }

    fn build(config: BusConfig, store: Option<Arc<dyn EventStore>>) -> Result<Self, BusError> {
        if config.max_queue_size == 0 {
            return Err(BusError::InvalidConfig {
                reason: "max_queue_size must be at least 1".to_string(),
            });
        }
        if config.worker_count == 0 {
            return Err(BusError::InvalidConfig {
                reason: "worker_count must be at least 1".to_string(),
            });
        }
        if config.batch_size == 0 {
            return Err(BusError::InvalidConfig {
                reason: "batch_size must be at least 1".to_string(),
            });
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(config.max_queue_size);
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(Inner {
                retry_policy: RetryPolicy::new(config.retry.clone()),
                dead_letters: DeadLetterQueue::new(config.dead_letter_capacity),
                config,
                store,
                registry: SubscriptionRegistry::new(),
                inbound_tx,
                inbound_rx: tokio::sync::Mutex::new(inbound_rx),
                retry_tx,
                retry_rx: tokio::sync::Mutex::new(retry_rx),
                retry_depth: AtomicUsize::new(0),
                stats: StatsRecorder::default(),
                running: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        })
    }

    /// Returns the bus configuration.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Returns whether the bus is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Starts the worker pool and the retry worker.
    ///
    /// Idempotent: calling while already running is a no-op. Statistics are
    /// reset on every (re)start.
    ///
    /// # Errors
    ///
    /// Returns `BusError::NoRuntime` when called outside a tokio runtime.
    pub fn start(&self) -> Result<(), BusError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| BusError::NoRuntime)?;

        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("Event bus already running");
            return Ok(());
        }

        self.inner.stats.reset();

        let shutdown = ShutdownController::new();
        let mut lifecycle = self.inner.lifecycle.lock();
        lifecycle.shutdown = Some(shutdown.clone());

        for worker_id in 0..self.inner.config.worker_count {
            lifecycle.workers.push(handle.spawn(worker_loop(
                Arc::clone(&self.inner),
                worker_id,
                shutdown.clone(),
            )));
        }
        lifecycle
            .workers
            .push(handle.spawn(retry_loop(Arc::clone(&self.inner), shutdown)));

        info!(
            worker_count = self.inner.config.worker_count,
            max_queue_size = self.inner.config.max_queue_size,
            "Event bus started"
        );
        Ok(())
    }

    /// Stops the bus, waiting up to the configured shutdown grace period.
    pub async fn stop(&self) {
        self.stop_with_grace(self.inner.config.shutdown_grace).await;
    }

    /// Stops the bus, waiting up to `grace` for workers to finish.
    ///
    /// Idempotent: calling while already stopped is a no-op. In-flight
    /// handler invocations are not interrupted; workers observe the shutdown
    /// signal at their next suspension point. The subscription registry is
    /// cleared once workers are down.
    pub async fn stop_with_grace(&self, grace: Duration) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            debug!("Event bus already stopped");
            return;
        }

        let (shutdown, workers) = {
            let mut lifecycle = self.inner.lifecycle.lock();
            (
                lifecycle.shutdown.take(),
                std::mem::take(&mut lifecycle.workers),
            )
        };

        if let Some(shutdown) = shutdown {
            shutdown.initiate();
        }

        let join_all = async {
            for worker in workers {
                let _ = worker.await;
            }
        };
        if tokio::time::timeout(grace, join_all).await.is_err() {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "Workers did not finish within the shutdown grace period; proceeding"
            );
        }

        self.inner.registry.clear();
        info!("Event bus stopped");
    }

    /// Publishes an event.
    ///
    /// The event is optionally persisted (a store failure is logged and
    /// swallowed, never blocks delivery), then enqueued without blocking.
    ///
    /// # Errors
    ///
    /// Returns `BusError::NotRunning` while stopped and
    /// `BusError::QueueFull` when the bounded inbound queue is at capacity -
    /// the backpressure signal to producers.
    pub async fn publish(&self, event: Event) -> Result<(), BusError> {
        if !self.is_running() {
            return Err(BusError::NotRunning);
        }

        if let Some(store) = &self.inner.store {
            if let Err(e) = store.store_event(&event).await {
                error!(
                    event_id = %event.id(),
                    error = %e,
                    "Event store write failed; continuing delivery"
                );
            }
        }

        match self.inner.inbound_tx.try_send(event) {
            Ok(()) => {
                self.inner.stats.record_published();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    event_id = %event.id(),
                    capacity = self.inner.config.max_queue_size,
                    "Inbound queue full; rejecting publish"
                );
                Err(BusError::QueueFull {
                    capacity: self.inner.config.max_queue_size,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(BusError::NotRunning),
        }
    }

    /// Publishes a batch of events in order.
    ///
    /// Stops at the first failure; events published before it stay
    /// published. Callers must not assume all-or-nothing semantics.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchPublishError`] carrying the prefix count and the
    /// error that stopped the batch.
    pub async fn publish_batch(&self, events: Vec<Event>) -> Result<usize, BatchPublishError> {
        let mut published = 0;
        for event in events {
            match self.publish(event).await {
                Ok(()) => published += 1,
                Err(source) => return Err(BatchPublishError { published, source }),
            }
        }
        Ok(published)
    }

    /// Registers a handler for an event type.
    ///
    /// Subscribing does not require the bus to be running. A subscription
    /// added while a batch is already in flight may or may not see the events
    /// of that batch.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidSubscription` for malformed arguments.
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionId, BusError> {
        self.inner.registry.subscribe(event_type, handler, options)
    }

    /// Removes a subscription; returns whether anything was removed.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.inner.registry.unsubscribe(id)
    }

    /// Returns a consistent snapshot of the bus statistics.
    ///
    /// Safe to call from any context; never blocks dispatch.
    #[must_use]
    pub fn statistics(&self) -> BusStatistics {
        let (published_count, processed_count, failed_count, avg_processing_time_ms, uptime) =
            self.inner.stats.snapshot();
        let queue_capacity = self.inner.inbound_tx.max_capacity();
        let queue_depth = queue_capacity - self.inner.inbound_tx.capacity();

        BusStatistics {
            running: self.is_running(),
            uptime,
            published_count,
            processed_count,
            failed_count,
            avg_processing_time_ms,
            queue_depth,
            queue_capacity,
            retry_queue_depth: self.inner.retry_depth.load(Ordering::Relaxed),
            dead_letter_count: self.inner.dead_letters.len(),
            subscription_count: self.inner.registry.len(),
            worker_count: self.inner.config.worker_count,
        }
    }

    /// Zeroes the rolling counters.
    pub fn reset_statistics(&self) {
        self.inner.stats.reset();
    }

    /// Returns the dead-letter queue for operator inspection.
    #[must_use]
    pub fn dead_letters(&self) -> &DeadLetterQueue {
        &self.inner.dead_letters
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("running", &self.is_running())
            .field("worker_count", &self.inner.config.worker_count)
            .field("max_queue_size", &self.inner.config.max_queue_size)
            .finish_non_exhaustive()
    }
}

/// One dispatch worker: collect a batch, process it, repeat.
async fn worker_loop(inner: Arc<Inner>, worker_id: usize, shutdown: ShutdownController) {
    let mut shutdown_rx = shutdown.subscribe();
    debug!(worker_id, "Dispatch worker started");

    while !shutdown.is_initiated() {
        let batch = collect_batch(&inner, &shutdown, &mut shutdown_rx).await;
        for event in batch {
            dispatch_event(&inner, &event).await;
        }
    }

    debug!(worker_id, "Dispatch worker stopped");
}

/// Collects up to `batch_size` events, waiting at most `batch_timeout`.
///
/// The receiver lock is held only while collecting; processing happens after
/// release so other workers can collect concurrently.
async fn collect_batch(
    inner: &Inner,
    shutdown: &ShutdownController,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> Vec<Event> {
    let mut batch = Vec::with_capacity(inner.config.batch_size);
    let mut rx = inner.inbound_rx.lock().await;
    let deadline = tokio::time::Instant::now() + inner.config.batch_timeout;

    while batch.len() < inner.config.batch_size && !shutdown.is_initiated() {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            received = tokio::time::timeout(remaining, rx.recv()) => match received {
                Ok(Some(event)) => batch.push(event),
                // Channel closed; workers will observe shutdown next.
                Ok(None) => break,
                // Batch window elapsed.
                Err(_) => break,
            },
        }
    }

    batch
}

/// Invokes every subscription for the event, sequentially in priority order.
async fn dispatch_event(inner: &Arc<Inner>, event: &Event) {
    let subscriptions = inner.registry.subscriptions_for(event.event_type());
    if subscriptions.is_empty() {
        debug!(
            event_id = %event.id(),
            event_type = %event.event_type(),
            "No subscriptions for event"
        );
        return;
    }

    for subscription in &subscriptions {
        invoke_subscription(inner, event, subscription, 0).await;
    }
}

/// Invokes one handler, records the outcome, and routes failures.
async fn invoke_subscription(
    inner: &Arc<Inner>,
    event: &Event,
    subscription: &Arc<Subscription>,
    attempt: u32,
) {
    let started = std::time::Instant::now();
    let outcome = subscription.handler().handle(event).await;
    let processing_time_ms = started.elapsed().as_millis() as u64;

    let result = match &outcome {
        Ok(()) => ProcessingResult::success(
            event.id().clone(),
            subscription.handler_name(),
            processing_time_ms,
            attempt,
        ),
        Err(e) => ProcessingResult::failure(
            event.id().clone(),
            subscription.handler_name(),
            e.to_string(),
            processing_time_ms,
            attempt,
        ),
    };

    if let Some(store) = &inner.store {
        if let Err(e) = store.mark_processed(event.id(), &result).await {
            error!(
                event_id = %event.id(),
                error = %e,
                "Failed to record processing result; delivery continues"
            );
        }
    }

    inner.stats.record_attempt(result.success, processing_time_ms);

    match outcome {
        Ok(()) => {
            if attempt > 0 {
                info!(
                    event_id = %event.id(),
                    handler = subscription.handler_name(),
                    attempt,
                    "Handler recovered after retry"
                );
            }
        }
        Err(e) => {
            if attempt < subscription.retry_count() {
                let next_attempt = attempt + 1;
                let delay = inner.retry_policy.delay_for_attempt(next_attempt);
                let envelope = RetryEnvelope {
                    event: event.clone(),
                    subscription: Arc::clone(subscription),
                    attempt: next_attempt,
                    due: tokio::time::Instant::now() + delay,
                };

                if inner.retry_tx.send(envelope).is_ok() {
                    inner.retry_depth.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        event_id = %event.id(),
                        handler = subscription.handler_name(),
                        next_attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Handler failed; retry scheduled"
                    );
                } else {
                    warn!(
                        event_id = %event.id(),
                        handler = subscription.handler_name(),
                        "Retry queue closed; dropping retry"
                    );
                }
            } else {
                inner.dead_letters.add(
                    event.clone(),
                    subscription.handler_name(),
                    attempt + 1,
                    e.to_string(),
                );
                error!(
                    event_id = %event.id(),
                    handler = subscription.handler_name(),
                    attempts = attempt + 1,
                    error = %e,
                    "Handler failed permanently; dead-lettered"
                );
            }
        }
    }
}

/// The retry worker: one envelope at a time, sleep until due, re-invoke.
async fn retry_loop(inner: Arc<Inner>, shutdown: ShutdownController) {
    let mut shutdown_rx = shutdown.subscribe();
    let mut rx = inner.retry_rx.lock().await;
    debug!("Retry worker started");

    while !shutdown.is_initiated() {
        let envelope = tokio::select! {
            _ = shutdown_rx.recv() => break,
            received = rx.recv() => match received {
                Some(envelope) => envelope,
                None => break,
            },
        };
        inner.retry_depth.fetch_sub(1, Ordering::Relaxed);

        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!(
                    event_id = %envelope.event.id(),
                    "Shutdown during retry backoff; dropping retry"
                );
                break;
            }
            () = tokio::time::sleep_until(envelope.due) => {}
        }

        invoke_subscription(&inner, &envelope.event, &envelope.subscription, envelope.attempt)
            .await;
    }

    debug!("Retry worker stopped");
}
