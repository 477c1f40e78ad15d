//! The "pulse" highlight shown when a counter changes.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use crate::dom::{Node, Timers};

/// Class the stylesheet animates while a counter is fresh.
pub const UPDATING_CLASS: &str = "updating";

/// How long the class stays on after an update.
pub const PULSE_MS: u32 = 1000;

struct Pending<H> {
    generation: u64,
    handle: H,
}

/// Applies text updates with a pulse, one outstanding timer per target.
pub struct Pulser<T: Timers> {
    timers: T,
    pending: Rc<RefCell<HashMap<String, Pending<T::Handle>>>>,
    generation: Cell<u64>,
}

impl<T: Timers> Pulser<T> {
    pub fn new(timers: T) -> Self {
        Self {
            timers,
            pending: Rc::default(),
            generation: Cell::new(0),
        }
    }

    /// Replace the text of `node` and restart its pulse.
    ///
    /// A pulse still running for the same `key` has its timer cancelled, so
    /// the class always comes off `PULSE_MS` after the latest update.
    pub fn pulse<N: Node + Clone + 'static>(&self, key: &str, node: N, text: &str) {
        node.remove_class(UPDATING_CLASS);
        // without this the remove/add pair is coalesced and the animation won't restart
        node.force_layout();
        node.set_text(text);
        node.add_class(UPDATING_CLASS);

        let stale = self.pending.borrow_mut().remove(key);
        if let Some(stale) = stale {
            self.timers.cancel(stale.handle);
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let callback = {
            let pending = Rc::clone(&self.pending);
            let key = key.to_string();
            move || {
                let current = pending
                    .borrow()
                    .get(&key)
                    .is_some_and(|p| p.generation == generation);
                if current {
                    pending.borrow_mut().remove(&key);
                    node.remove_class(UPDATING_CLASS);
                }
            }
        };
        let handle = self.timers.schedule(PULSE_MS, Box::new(callback));
        self.pending
            .borrow_mut()
            .insert(key.to_string(), Pending { generation, handle });
    }

    /// Number of targets whose pulse has not finished yet.
    pub fn active(&self) -> usize {
        self.pending.borrow().len()
    }
}
