use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use tally_common::{PollBatch, PushEvent};
use tokio::{
    sync::{broadcast, Mutex},
    time,
};

struct EventLog {
    /// Sequence number of the newest event, 0 before the first one
    cursor: u64,
    backlog: VecDeque<(u64, PushEvent)>,
    capacity: usize,
}

/// Numbers published events and fans them out to live subscribers, keeping a
/// short backlog for long-poll clients.
pub struct EventHub {
    log: Mutex<EventLog>,
    broadcast_tx: broadcast::Sender<PushEvent>,
    clients: AtomicUsize,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            log: Mutex::new(EventLog {
                cursor: 0,
                backlog: VecDeque::with_capacity(capacity),
                capacity,
            }),
            broadcast_tx: broadcast::channel(capacity.max(16)).0,
            clients: AtomicUsize::new(0),
        }
    }

    pub async fn publish(&self, event: PushEvent) -> u64 {
        let mut log = self.log.lock().await;
        log.cursor += 1;
        let seq = log.cursor;
        log.backlog.push_back((seq, event.clone()));
        while log.backlog.len() > log.capacity {
            log.backlog.pop_front();
        }
        log::debug!("published {} #{seq}", event.name());
        // no receivers is fine
        let _ = self.broadcast_tx.send(event);
        seq
    }

    pub async fn cursor(&self) -> u64 {
        self.log.lock().await.cursor
    }

    /// Buffered events newer than `after`.
    ///
    /// A cursor ahead of ours (a client that outlived a restart) gets an
    /// empty batch carrying the current cursor.
    pub async fn since(&self, after: u64) -> PollBatch {
        let log = self.log.lock().await;
        let events = log
            .backlog
            .iter()
            .filter(|(seq, _)| *seq > after)
            .map(|(_, event)| event.clone())
            .collect();
        PollBatch {
            cursor: log.cursor,
            events,
        }
    }

    /// Like [`since`](Self::since), but waits up to `wait` for something new.
    pub async fn wait_since(&self, after: u64, wait: Duration) -> PollBatch {
        // subscribe before reading so nothing published in between is missed
        let mut rx = self.broadcast_tx.subscribe();
        let batch = self.since(after).await;
        if !batch.events.is_empty() || after > batch.cursor {
            return batch;
        }
        let _ = time::timeout(wait, rx.recv()).await;
        self.since(after).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn client_connected(&self) -> usize {
        self.clients.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn client_disconnected(&self) -> usize {
        self.clients.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }

    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }
}
