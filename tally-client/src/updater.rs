//! Routes push events to the counters they update.

use log::debug;
use tally_common::{PollBatch, PushEvent};

use crate::{
    dom::{Surface, Timers},
    pulse::Pulser,
};

pub struct Updater<S: Surface, T: Timers> {
    surface: S,
    pulser: Pulser<T>,
}

impl<S: Surface, T: Timers> Updater<S, T> {
    pub fn new(surface: S, timers: T) -> Self {
        Self {
            surface,
            pulser: Pulser::new(timers),
        }
    }

    /// Apply one event. Returns whether a counter on the page changed.
    ///
    /// Events for counters the page doesn't show are ignored.
    pub fn apply(&self, event: &PushEvent) -> bool {
        let Some((kind, update)) = event.counter() else {
            return false;
        };
        let id = kind.target_id(&update.service);
        let Some(node) = self.surface.find(&id) else {
            return false;
        };
        self.pulser.pulse(&id, node, &kind.format(update.total));
        true
    }

    /// Decode a JSON text frame and apply it.
    pub fn apply_text(&self, text: &str) -> bool {
        match serde_json::from_str::<PushEvent>(text) {
            Ok(event) => self.apply(&event),
            Err(e) => {
                debug!("dropping undecodable event: {e}");
                false
            }
        }
    }

    pub fn apply_batch(&self, batch: &PollBatch) -> usize {
        batch.events.iter().filter(|e| self.apply(e)).count()
    }
}
