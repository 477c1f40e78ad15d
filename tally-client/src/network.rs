//! Connection to the push-event source.
//!
//! One logical connection per page, carried over a WebSocket or over HTTP
//! long-polling depending on the [`TransportPolicy`].

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use log::error;
use tally_common::{PollBatch, Transport, TransportPolicy};
use wasm_bindgen_futures::spawn_local;

use crate::{
    dom::{Surface, Timers},
    updater::Updater,
};

mod polling;
mod socket;

/// Receives whatever the transport delivers.
pub trait EventSink {
    fn on_text(&self, text: &str);
    fn on_batch(&self, batch: &PollBatch);
}

impl<S: Surface, T: Timers> EventSink for Updater<S, T> {
    fn on_text(&self, text: &str) {
        self.apply_text(text);
    }

    fn on_batch(&self, batch: &PollBatch) {
        self.apply_batch(batch);
    }
}

struct Shared {
    base_url: String,
    policy: TransportPolicy,
    sink: Rc<dyn EventSink>,
    closed: Cell<bool>,
    /// Consecutive failed attempts
    failures: Cell<u32>,
    socket: RefCell<Option<socket::LiveSocket>>,
}

impl Shared {
    /// Count a failed attempt. Returns the delay before the next one, or
    /// `None` when the policy has run out of attempts.
    fn record_failure(&self) -> Option<u32> {
        let failures = self.failures.get().saturating_add(1);
        self.failures.set(failures);
        if self.policy.should_reconnect(failures) {
            Some(self.policy.backoff_ms(failures))
        } else {
            error!(
                "giving up on {} after {} failed attempts",
                self.base_url, failures
            );
            None
        }
    }
}

pub struct Connection {
    shared: Rc<Shared>,
}

impl Connection {
    pub fn open(base_url: &str, policy: TransportPolicy, sink: Rc<dyn EventSink>) -> Connection {
        let shared = Rc::new(Shared {
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
            sink,
            closed: Cell::new(false),
            failures: Cell::new(0),
            socket: RefCell::new(None),
        });
        start(&shared, shared.policy.preferred());
        Connection { shared }
    }

    /// Stop receiving events. Pending long-polls finish and are discarded.
    pub fn close(&self) {
        self.shared.closed.set(true);
        self.shared.socket.borrow_mut().take();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // the socket handlers and the poll loop hold their own `Rc<Shared>`
        self.close();
    }
}

fn start(shared: &Rc<Shared>, transport: Transport) {
    match transport {
        Transport::WebSocket => socket::connect(shared),
        Transport::Polling => spawn_local(polling::run(Rc::clone(shared))),
    }
}

pub fn ws_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/ws/live")
}

pub fn poll_url(base_url: &str, after: Option<u64>, wait_ms: u32) -> String {
    let base = base_url.trim_end_matches('/');
    match after {
        None => format!("{base}/events/poll"),
        Some(after) => format!("{base}/events/poll?after={after}&wait_ms={wait_ms}"),
    }
}
