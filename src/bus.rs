use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast topic with bounded capacity.
///
/// Publishing never blocks the control thread: slow subscribers lag and
/// lose the oldest messages instead.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns the number of subscribers that will see `msg`.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let topic: Topic<u32> = Topic::new(4);
        assert_eq!(topic.publish(7), 0);
    }

    #[test]
    fn test_subscribers_see_later_messages() {
        let topic: Topic<&'static str> = Topic::new(4);
        let mut rx = topic.subscribe();
        assert_eq!(topic.publish("first"), 1);
        assert_eq!(*rx.try_recv().unwrap(), "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_slow_subscriber_lags() {
        let topic: Topic<u32> = Topic::new(2);
        let mut rx = topic.subscribe();
        for i in 0..5 {
            topic.publish(i);
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        ));
        assert_eq!(*rx.try_recv().unwrap(), 3);
    }
}
