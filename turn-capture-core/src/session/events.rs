use tokio::sync::broadcast;

use crate::models::recognition::TurnEvent;

/// Subscription table for recognition events.
///
/// Listeners subscribe; the transport publishes. Events published while no
/// one listens are dropped, and a lagging listener skips ahead.
pub struct EventHub {
    sender: broadcast::Sender<TurnEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.sender.subscribe()
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            sender: self.sender.clone(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Cloneable handle used by the transport to raise events.
#[derive(Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<TurnEvent>,
}

impl EventPublisher {
    pub fn publish(&self, event: TurnEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("no listeners for turn event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recognition::CancellationDetails;

    #[tokio::test]
    async fn every_listener_sees_every_event() {
        let hub = EventHub::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        let publisher = hub.publisher();

        publisher.publish(TurnEvent::ActivityReceived("{}".into()));
        publisher.publish(TurnEvent::Canceled(CancellationDetails::end_of_stream()));

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await.unwrap(), TurnEvent::ActivityReceived("{}".into()));
            assert!(matches!(rx.recv().await.unwrap(), TurnEvent::Canceled(_)));
        }
        assert_eq!(hub.listener_count(), 2);
    }

    #[test]
    fn publishing_without_listeners_is_harmless() {
        let hub = EventHub::new(1);
        hub.publisher().publish(TurnEvent::ActivityReceived("x".into()));
        assert_eq!(hub.listener_count(), 0);
    }
}
