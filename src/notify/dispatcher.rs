use crate::notify::domain::{NotificationEvent, NotificationSink};
use crate::shared::constants::notify;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Decoupled notification dispatch: the controller publishes into a bounded
/// in-process queue and a worker forwards to the sink with a short deadline,
/// so a slow or broken channel never stalls the submission path.
pub struct NotificationDispatcher {
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

/// Cheap publishing handle held by the controller.
#[derive(Clone)]
pub struct NotificationHandle {
    shared: Arc<Shared>,
}

struct Shared {
    queue: Mutex<VecDeque<NotificationEvent>>,
    wakeup: Notify,
    capacity: usize,
    closed: AtomicBool,
}

impl NotificationDispatcher {
    pub fn start(sink: Arc<dyn NotificationSink>, capacity: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            wakeup: Notify::new(),
            capacity,
            closed: AtomicBool::new(false),
        });

        let worker_shared = shared.clone();
        let worker = tokio::spawn(async move {
            let delivery_timeout = Duration::from_millis(notify::DELIVERY_TIMEOUT_MS);
            loop {
                let next = worker_shared.pop();
                match next {
                    Some(event) => {
                        let delivery = sink.notify(&event);
                        if tokio::time::timeout(delivery_timeout, delivery).await.is_err() {
                            warn!(kind = event.kind(), "notification delivery timed out");
                        }
                    }
                    None => {
                        if worker_shared.closed.load(Ordering::SeqCst) {
                            break;
                        }
                        worker_shared.wakeup.notified().await;
                    }
                }
            }
        });

        Self { shared, worker }
    }

    pub fn handle(&self) -> NotificationHandle {
        NotificationHandle {
            shared: self.shared.clone(),
        }
    }

    /// Drain remaining events and stop the worker.
    pub async fn close(self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wakeup.notify_one();
        let _ = self.worker.await;
    }
}

impl NotificationHandle {
    /// Non-blocking enqueue. A full queue evicts the oldest non-critical
    /// event; when everything queued is critical, non-critical newcomers are
    /// dropped instead.
    pub fn publish(&self, event: NotificationEvent) {
        let Ok(mut queue) = self.shared.queue.lock() else {
            warn!(kind = event.kind(), "notification queue poisoned, dropping event");
            return;
        };

        if queue.len() >= self.shared.capacity {
            if let Some(pos) = queue.iter().position(|e| !e.is_critical()) {
                let evicted = queue.remove(pos);
                debug!(
                    kind = evicted.map(|e| e.kind()).unwrap_or("unknown"),
                    "notification queue full, evicted oldest non-critical event"
                );
            } else if !event.is_critical() {
                debug!(kind = event.kind(), "notification queue full, dropping event");
                return;
            } else {
                queue.pop_front();
            }
        }

        queue.push_back(event);
        drop(queue);
        self.shared.wakeup.notify_one();
    }
}

impl Shared {
    fn pop(&self) -> Option<NotificationEvent> {
        self.queue.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ethers::types::U256;

    struct CollectingSink {
        events: Mutex<Vec<NotificationEvent>>,
    }

    #[async_trait]
    impl NotificationSink for CollectingSink {
        async fn notify(&self, event: &NotificationEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event.clone());
            }
        }
    }

    fn attempt_event(attempt: u32) -> NotificationEvent {
        NotificationEvent::BuyAttempt {
            attempt,
            nonce: attempt as u64,
            max_fee_per_gas: U256::from(1u64),
        }
    }

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let sink = Arc::new(CollectingSink {
            events: Mutex::new(Vec::new()),
        });
        let dispatcher = NotificationDispatcher::start(sink.clone(), 8);
        let handle = dispatcher.handle();

        handle.publish(attempt_event(1));
        handle.publish(attempt_event(2));
        handle.publish(NotificationEvent::Shutdown);
        dispatcher.close().await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], attempt_event(1));
        assert_eq!(events[2], NotificationEvent::Shutdown);
    }

    #[tokio::test]
    async fn test_full_queue_evicts_oldest_non_critical() {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            capacity: 2,
            closed: AtomicBool::new(false),
        });
        let handle = NotificationHandle {
            shared: shared.clone(),
        };

        handle.publish(attempt_event(1));
        handle.publish(NotificationEvent::Shutdown);
        // Queue is full; the non-critical attempt must be evicted.
        handle.publish(attempt_event(2));

        let queue = shared.queue.lock().unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0], NotificationEvent::Shutdown);
        assert_eq!(queue[1], attempt_event(2));
    }

    #[tokio::test]
    async fn test_non_critical_dropped_when_queue_all_critical() {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            capacity: 1,
            closed: AtomicBool::new(false),
        });
        let handle = NotificationHandle {
            shared: shared.clone(),
        };

        handle.publish(NotificationEvent::Shutdown);
        handle.publish(attempt_event(1));

        let queue = shared.queue.lock().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0], NotificationEvent::Shutdown);
    }
}
