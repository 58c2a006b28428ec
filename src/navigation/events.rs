use log::trace;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavigationEventKind {
    TransitionStart,
    /// Next page fetched and parsed, container resolved
    DomReady,
    InitBefore,
    InitAfter,
    TransitionEndBefore,
    TransitionEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationEvent {
    pub kind: NavigationEventKind,
    pub url: String,
    pub strategy: String,
}

/// Broadcast channel for lifecycle notifications
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NavigationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, kind: NavigationEventKind, url: &str, strategy: &str) {
        let event = NavigationEvent {
            kind,
            url: url.to_string(),
            strategy: strategy.to_string(),
        };
        // Nobody listening is fine
        if self.sender.send(event).is_err() {
            trace!("No subscribers for {:?}", kind);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::default();
        let mut receiver = bus.subscribe();

        bus.emit(NavigationEventKind::TransitionStart, "https://example.com/b", "general");
        bus.emit(NavigationEventKind::DomReady, "https://example.com/b", "general");

        assert_eq!(receiver.recv().await.unwrap().kind, NavigationEventKind::TransitionStart);
        let ready = receiver.recv().await.unwrap();
        assert_eq!(ready.kind, NavigationEventKind::DomReady);
        assert_eq!(ready.strategy, "general");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(NavigationEventKind::TransitionEnd, "https://example.com/", "general");
    }
}
