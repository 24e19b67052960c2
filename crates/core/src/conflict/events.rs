//! Synchronous resolution events.
//!
//! Each conflict owns an [`Emitter`]. Registering a callback returns a
//! [`Subscription`] that removes the callback when disposed. Emission runs
//! every live callback in registration order before returning.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback = Box<dyn FnMut()>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
    /// Ids disposed while their callback list was checked out by `emit`.
    disposed: Vec<u64>,
    /// Set when `clear` runs while `emit` holds the callback list.
    cleared: bool,
    emitting: bool,
}

/// A list of no-argument callbacks.
#[derive(Default)]
pub struct Emitter {
    listeners: Rc<RefCell<Listeners>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`; it runs on every subsequent [`emit`](Self::emit).
    pub fn subscribe(&self, callback: impl FnMut() + 'static) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(callback)));
        Subscription {
            listeners: Rc::downgrade(&self.listeners),
            id,
        }
    }

    /// Run every registered callback.
    ///
    /// Callbacks may subscribe or dispose while running. New subscriptions
    /// take effect from the next emission.
    pub fn emit(&self) {
        let mut running = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.emitting = true;
            std::mem::take(&mut listeners.entries)
        };

        for (id, callback) in running.iter_mut() {
            let skip = {
                let listeners = self.listeners.borrow();
                listeners.cleared || listeners.disposed.contains(id)
            };
            if !skip {
                callback();
            }
        }

        let mut listeners = self.listeners.borrow_mut();
        let added = std::mem::take(&mut listeners.entries);
        let disposed = std::mem::take(&mut listeners.disposed);
        if std::mem::take(&mut listeners.cleared) {
            running.clear();
        }
        running.retain(|(id, _)| !disposed.contains(id));
        running.extend(added);
        listeners.entries = running;
        listeners.emitting = false;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    /// Drop every callback. During [`emit`](Self::emit) the callbacks not
    /// yet run are skipped; ones subscribed after the clear are kept.
    pub fn clear(&self) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.entries.clear();
        if listeners.emitting {
            listeners.cleared = true;
        }
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle returned by [`Emitter::subscribe`].
///
/// Dropping the handle leaves the callback registered; call
/// [`dispose`](Self::dispose) to remove it.
#[must_use = "dropping a Subscription keeps the callback registered; call dispose() to remove it"]
#[derive(Debug)]
pub struct Subscription {
    listeners: Weak<RefCell<Listeners>>,
    id: u64,
}

impl Subscription {
    /// Remove the callback. A no-op if the emitter is gone.
    pub fn dispose(self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let mut listeners = listeners.borrow_mut();
        if listeners.emitting {
            listeners.disposed.push(self.id);
        }
        listeners.entries.retain(|(id, _)| *id != self.id);
    }
}
