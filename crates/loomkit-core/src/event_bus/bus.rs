//! Session event bus.
//!
//! One bus per compositing session, shared by the layer store, the
//! compositor and the session itself. Synchronous handlers run on the
//! publishing thread, in subscription order, before the event is broadcast
//! to async receivers (the 3D scene polls one of those).
//!
//! Handlers are called with no lock held, so a handler may subscribe or
//! unsubscribe. Publishing from a handler is allowed but nests: the inner
//! event reaches every listener before the outer one reaches the receivers,
//! which breaks the dirty / composed / frame-ready ordering the session
//! relies on. Handlers attached to a session bus should only observe.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{EventCategory, SessionEvent};

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Which events a handler sees
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    #[default]
    All,
    /// Any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    pub fn matches(&self, event: &SessionEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type Handler = Arc<dyn Fn(SessionEvent) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    filter: EventFilter,
    handler: Handler,
}

/// Bus settings, filled from the `events` section of the engine config.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Broadcast buffer per receiver. A receiver that falls further behind
    /// gets `RecvError::Lagged` and skips ahead.
    pub channel_capacity: usize,
    /// Keep recent events for diagnostics.
    pub enable_history: bool,
    pub max_history_size: usize,
    /// Entries older than this are dropped on the next publish.
    pub history_retention: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: false,
            max_history_size: 500,
            history_retention: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    event: SessionEvent,
    at: Instant,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// Neither a handler nor a receiver saw the event
    #[error("No active subscribers")]
    NoSubscribers,
}

/// Notification hub owned by one compositing session
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
    subscribers: RwLock<Vec<Subscriber>>,
    history: RwLock<VecDeque<HistoryEntry>>,
    config: EventBusConfig,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            config,
        }
    }

    /// Deliver `event` to matching handlers, then broadcast it.
    ///
    /// Returns the number of async receivers reached. `NoSubscribers` means
    /// nothing at all was listening; the event is still recorded in history.
    pub fn publish(&self, event: SessionEvent) -> Result<usize, EventBusError> {
        tracing::trace!("{}", event.description());

        if self.config.enable_history {
            self.record(&event);
        }

        let (handlers, total): (Vec<Handler>, usize) = {
            let subscribers = self.subscribers.read();
            let matching = subscribers
                .iter()
                .filter(|s| s.filter.matches(&event))
                .map(|s| s.handler.clone())
                .collect();
            (matching, subscribers.len())
        };
        for handler in &handlers {
            handler(event.clone());
        }

        match self.sender.send(event) {
            Ok(count) => Ok(count),
            Err(_) if total > 0 => Ok(0),
            Err(_) => Err(EventBusError::NoSubscribers),
        }
    }

    /// Publish where nobody listening is normal. The store and compositor
    /// use this; a headless session usually has no subscribers.
    pub fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.publish(event) {
            tracing::trace!("Event dropped: {}", err);
        }
    }

    /// Attach a synchronous handler. It runs on the publishing thread and
    /// should return quickly; see the module docs before publishing from it.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.subscribers.write().push(Subscriber {
            id,
            filter,
            handler: Arc::new(handler),
        });
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Receiver for async consumers. Sees only events published after this
    /// call.
    pub fn receiver(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Synchronous handlers only; async receivers are not counted.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Recorded events, oldest first, optionally only those at or after
    /// `since`. Empty when history is disabled.
    pub fn history(&self, since: Option<Instant>) -> Vec<SessionEvent> {
        if !self.config.enable_history {
            return Vec::new();
        }
        self.history
            .read()
            .iter()
            .filter(|e| since.is_none_or(|since| e.at >= since))
            .map(|e| e.event.clone())
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn record(&self, event: &SessionEvent) {
        let mut history = self.history.write();
        let now = Instant::now();
        history.push_back(HistoryEntry {
            event: event.clone(),
            at: now,
        });

        let retention = self.config.history_retention;
        while history
            .front()
            .is_some_and(|e| now.duration_since(e.at) > retention)
        {
            history.pop_front();
        }
        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}
