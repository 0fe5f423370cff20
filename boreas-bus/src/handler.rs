//! Event handler trait and adapters.
//!
//! Handlers are owned by subscribers; the bus holds only an invocation
//! capability behind an `Arc`, never subscriber state. Failures are reported
//! as values, not panics, so the dispatch engine can route them through the
//! retry and dead-letter paths.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use boreas_core::Event;

/// Error reported by a handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A subscriber's event handler.
///
/// Implementations must be cheap to invoke repeatedly; anything that blocks
/// the thread belongs behind [`BlockingHandler`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called once per dispatch attempt with the event being delivered.
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;

    /// Returns the handler name, used for subscription ids and audit rows.
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("name", &self.name())
            .finish()
    }
}

/// Handler that runs a non-blocking closure inline on the worker.
pub struct CallbackHandler {
    name: String,
    callback: Box<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>,
}

impl CallbackHandler {
    /// Creates a new callback handler.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl EventHandler for CallbackHandler {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        (self.callback)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that runs a blocking closure on the blocking thread pool.
///
/// A slow synchronous subscriber wrapped here cannot stall the dispatch
/// worker's async loop indefinitely.
pub struct BlockingHandler {
    name: String,
    callback: Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>,
}

impl BlockingHandler {
    /// Creates a new blocking handler.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }
}

#[async_trait]
impl EventHandler for BlockingHandler {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let callback = Arc::clone(&self.callback);
        let event = event.clone();

        tokio::task::spawn_blocking(move || callback(&event))
            .await
            .map_err(|e| HandlerError::new(format!("Blocking handler panicked: {e}")))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that forwards events into an mpsc channel.
pub struct ChannelHandler {
    name: String,
    sender: mpsc::Sender<Event>,
}

impl ChannelHandler {
    /// Creates a new channel handler over an existing sender.
    #[must_use]
    pub fn new(name: impl Into<String>, sender: mpsc::Sender<Event>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Creates a channel handler together with its receiver.
    #[must_use]
    pub fn with_channel(
        name: impl Into<String>,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(name, sender), receiver)
    }
}

#[async_trait]
impl EventHandler for ChannelHandler {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        self.sender.send(event.clone()).await.map_err(|e| {
            warn!(handler = %self.name, error = %e, "Failed to forward event to channel");
            HandlerError::new(format!("Channel closed: {e}"))
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
