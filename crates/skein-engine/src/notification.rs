//! Per-context notification broadcast plumbing.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// One outstanding notification waiter.
///
/// Owned (`Rc`) by the wait-notification instruction that created it and
/// referenced weakly from the hub, so ownership stays with the process
/// holding the instruction as its pending one. Deliveries append to the
/// buffer until the waiter completes or is dropped.
pub(crate) struct WaiterSlot<T> {
    predicate: Option<Box<dyn Fn(&T) -> bool>>,
    buffer: RefCell<Vec<T>>,
    done: Cell<bool>,
}

impl<T> WaiterSlot<T> {
    pub(crate) fn new(predicate: Option<Box<dyn Fn(&T) -> bool>>) -> Rc<Self> {
        Rc::new(Self {
            predicate,
            buffer: RefCell::new(Vec::new()),
            done: Cell::new(false),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    pub(crate) fn clone_buffer(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.buffer.borrow().clone()
    }

    pub(crate) fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.buffer.borrow_mut())
    }

    pub(crate) fn mark_done(&self) {
        self.done.set(true);
    }

    fn accepts(&self, payload: &T) -> bool {
        self.predicate.as_ref().map_or(true, |pred| pred(payload))
    }
}

/// Per-context, per-payload-type registry of outstanding waiters.
///
/// A raise scans the waiters of its payload type and appends a clone of the
/// payload to every matching buffer; raises that match nothing are
/// discarded permanently — never buffered for later waiters.
#[derive(Default)]
pub struct NotificationHub {
    // Each entry holds Weak<WaiterSlot<T>> boxed as Any, keyed by the
    // payload TypeId.
    waiters: RefCell<HashMap<TypeId, Vec<Box<dyn Any>>>>,
}

impl NotificationHub {
    pub(crate) fn register<T: 'static>(&self, slot: &Rc<WaiterSlot<T>>) {
        self.waiters
            .borrow_mut()
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Box::new(Rc::downgrade(slot)));
    }

    /// Deliver `payload` to every live, not-yet-done waiter of `T` whose
    /// predicate accepts it. Dead and completed waiters are pruned.
    pub(crate) fn deliver<T: Clone + 'static>(&self, payload: &T) {
        let mut waiters = self.waiters.borrow_mut();
        let Some(entries) = waiters.get_mut(&TypeId::of::<T>()) else {
            return;
        };
        entries.retain(|entry| {
            let weak = entry
                .downcast_ref::<Weak<WaiterSlot<T>>>()
                .expect("waiter entries are keyed by payload type");
            match weak.upgrade() {
                Some(slot) if !slot.done.get() => {
                    if slot.accepts(payload) {
                        slot.buffer.borrow_mut().push(payload.clone());
                    }
                    true
                }
                _ => false,
            }
        });
    }

    /// Number of live, not-yet-done waiters of `T`.
    pub fn outstanding<T: 'static>(&self) -> usize {
        self.waiters
            .borrow()
            .get(&TypeId::of::<T>())
            .map_or(0, |entries| {
                entries
                    .iter()
                    .filter(|entry| {
                        entry
                            .downcast_ref::<Weak<WaiterSlot<T>>>()
                            .and_then(Weak::upgrade)
                            .is_some_and(|slot| !slot.done.get())
                    })
                    .count()
            })
    }
}
