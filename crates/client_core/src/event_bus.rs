use std::sync::{Mutex, PoisonError};

use shared::protocol::ClientEvent;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Every subscriber gets its own unbounded queue, so emission never blocks and never
/// drops. Emission happens under one lock, which gives all subscribers the same order.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<UnboundedSender<ClientEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        EventSubscription { rx }
    }

    pub fn emit(&self, event: ClientEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.len() != before {
            debug!(
                dropped = before - subscribers.len(),
                "pruned closed event subscribers"
            );
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct EventSubscription {
    rx: UnboundedReceiver<ClientEvent>,
}

impl EventSubscription {
    /// Waits for the next event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ClientEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ClientEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn drain(&mut self) -> Vec<ClientEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
