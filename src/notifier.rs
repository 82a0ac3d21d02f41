//! Synchronous publish/subscribe for committed messages

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::message::{Message, MessageType};

/// Receives committed messages
pub trait Subscriber: Send {
    fn on_message(&mut self, message: &Message) -> anyhow::Result<()>;
}

impl<F> Subscriber for F
where
    F: FnMut(&Message) -> anyhow::Result<()> + Send,
{
    fn on_message(&mut self, message: &Message) -> anyhow::Result<()> {
        self(message)
    }
}

/// Which messages a subscription receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Every message
    Any,
    /// Messages of one type
    Type(MessageType),
}

impl EventFilter {
    fn matches(self, message: &Message) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Type(t) => message.message_type() == t,
        }
    }
}

impl From<MessageType> for EventFilter {
    fn from(value: MessageType) -> Self {
        EventFilter::Type(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    filter: EventFilter,
    subscriber: Box<dyn Subscriber>,
}

/// Subscription registry.
///
/// Subscribers run inline, in registration order. A failing or panicking
/// subscriber is logged and skipped; the rest still run.
#[derive(Default)]
pub struct Notifier {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        filter: impl Into<EventFilter>,
        subscriber: impl Subscriber + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            filter: filter.into(),
            subscriber: Box::new(subscriber),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver a message to every matching subscriber, returning how many
    /// completed without error
    pub fn publish(&mut self, message: &Message) -> usize {
        let mut delivered = 0;

        for subscription in self.subscriptions.iter_mut() {
            if !subscription.filter.matches(message) {
                continue;
            }

            let subscriber = &mut subscription.subscriber;
            match catch_unwind(AssertUnwindSafe(|| subscriber.on_message(message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!(
                    subscription = subscription.id.0,
                    message_id = %message.id(),
                    error = %e,
                    "Subscriber failed"
                ),
                Err(_) => warn!(
                    subscription = subscription.id.0,
                    message_id = %message.id(),
                    "Subscriber panicked"
                ),
            }
        }

        debug!(message_id = %message.id(), delivered, "Published message");
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
