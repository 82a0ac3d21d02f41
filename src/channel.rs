//! Async message streams fed by the notifier

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::message::Message;
use crate::notifier::{EventFilter, Notifier, SubscriptionId};

/// Receiving end of a notifier subscription.
///
/// Dropping the stream does not unsubscribe; the forwarding subscriber
/// reports a closed channel on every later publish until it is removed.
#[derive(Debug)]
pub struct MessageStream {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl MessageStream {
    pub fn subscription_id(&self) -> SubscriptionId {
        self.id
    }

    /// Try to receive a message (non-blocking)
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn into_inner(self) -> mpsc::UnboundedReceiver<Message> {
        self.rx
    }
}

/// Register a subscriber that forwards matching messages into a channel
pub fn subscribe_stream(notifier: &mut Notifier, filter: impl Into<EventFilter>) -> MessageStream {
    let (tx, rx) = mpsc::unbounded_channel();

    let id = notifier.subscribe(filter, move |message: &Message| -> anyhow::Result<()> {
        tx.send(message.clone())
            .map_err(|_| anyhow!("message stream closed"))
    });

    MessageStream { id, rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;
    use crate::message::{MessageBuilder, MessageType};

    fn message(message_type: MessageType) -> Message {
        MessageBuilder::new(message_type, AgentId::from("c1"), "subject")
            .to([AgentId::from("l1")])
            .build(crate::fixtures::now())
            .unwrap()
    }

    #[test]
    fn test_stream_receives_matching_messages() {
        let mut notifier = Notifier::new();
        let mut stream = subscribe_stream(&mut notifier, MessageType::Directive);

        notifier.publish(&message(MessageType::Directive));
        notifier.publish(&message(MessageType::PeerCollaboration));

        let received = stream.try_recv().unwrap();
        assert_eq!(received.message_type(), MessageType::Directive);
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_dropped_stream_fails_delivery() {
        let mut notifier = Notifier::new();
        let stream = subscribe_stream(&mut notifier, EventFilter::Any);
        let id = stream.subscription_id();
        drop(stream);

        assert_eq!(notifier.publish(&message(MessageType::Directive)), 0);
        assert!(notifier.unsubscribe(id));
    }

    #[tokio::test]
    async fn test_async_recv() {
        let mut notifier = Notifier::new();
        let mut stream = subscribe_stream(&mut notifier, EventFilter::Any);

        let sent = message(MessageType::KnowledgeShare);
        notifier.publish(&sent);

        let received = stream.recv().await.unwrap();
        assert_eq!(received.id(), sent.id());
    }
}
