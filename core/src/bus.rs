//! Synchronous broadcast channels
//!
//! Subscribers get a [`SubscriptionToken`] back from `subscribe` and hand the
//! same token to `unsubscribe`, so removal is exact. Delivery happens on the
//! publishing thread, in registration order. Each handler call is isolated:
//! a panicking handler is logged and the remaining subscribers still run.
//!
//! Buses are `Rc` based and stay on the thread that owns the surfaces.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Broadcast requests every live overlay reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// Recompute everything (options changed, document shown, ...)
    Refresh,
    /// Recompute only the position
    Reposition,
}

/// Events raised by a single editor surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    ViewportResized,
    /// The overlay's rendered size was re-measured after a content change
    ContentMeasured,
    /// The document shown in the surface was renamed or swapped
    DocumentRenamed,
    Closed,
}

/// Handle identifying one subscription on one bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

type Handler<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Subscribers<E> {
    next_id: u64,
    entries: Vec<(SubscriptionToken, Handler<E>)>,
}

/// Payload-typed synchronous broadcast channel. Clones share subscribers.
pub struct EventBus<E> {
    inner: Rc<RefCell<Subscribers<E>>>,
}

pub type RefreshEventBus = EventBus<RefreshRequest>;
pub type SurfaceEventBus = EventBus<SurfaceEvent>;

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Subscribers {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a handler; keep the token to unsubscribe it later
    pub fn subscribe(&self, handler: impl FnMut(&E) + 'static) -> SubscriptionToken {
        let mut subs = self.inner.borrow_mut();
        let token = SubscriptionToken(subs.next_id);
        subs.next_id += 1;
        let handler: Handler<E> = Rc::new(RefCell::new(handler));
        subs.entries.push((token, handler));
        token
    }

    /// Remove the handler registered under `token`.
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subs = self.inner.borrow_mut();
        let before = subs.entries.len();
        subs.entries.retain(|(t, _)| *t != token);
        subs.entries.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Deliver `event` to every subscriber registered when the call starts.
    ///
    /// Handlers may subscribe, unsubscribe or publish from inside a delivery.
    /// A handler that is already running further up the stack is skipped.
    /// Returns the number of handlers that completed.
    pub fn publish(&self, event: &E) -> usize {
        let handlers: Vec<(SubscriptionToken, Handler<E>)> = self.inner.borrow().entries.clone();
        let mut delivered = 0;

        for (token, handler) in handlers {
            // Unsubscribed by an earlier handler in this delivery
            if !self.is_subscribed(token) {
                continue;
            }

            let Ok(mut handler) = handler.try_borrow_mut() else {
                tracing::debug!(?token, "skipping re-entrant delivery");
                continue;
            };

            match panic::catch_unwind(AssertUnwindSafe(|| (&mut *handler)(event))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!(?token, "event subscriber panicked"),
            }
        }

        delivered
    }

    fn is_subscribed(&self, token: SubscriptionToken) -> bool {
        self.inner.borrow().entries.iter().any(|(t, _)| *t == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = RefreshEventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for id in 0..3 {
            let log = Rc::clone(&log);
            bus.subscribe(move |event| log.borrow_mut().push((id, *event)));
        }

        assert_eq!(bus.publish(&RefreshRequest::Refresh), 3);
        assert_eq!(
            *log.borrow(),
            vec![
                (0, RefreshRequest::Refresh),
                (1, RefreshRequest::Refresh),
                (2, RefreshRequest::Refresh),
            ]
        );
    }

    #[test]
    fn test_unsubscribe_removes_exact_handler() {
        let bus = RefreshEventBus::new();
        let hits = Rc::new(Cell::new(0));

        let h = Rc::clone(&hits);
        let first = bus.subscribe(move |_| h.set(h.get() + 1));
        let h = Rc::clone(&hits);
        let _second = bus.subscribe(move |_| h.set(h.get() + 10));

        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&RefreshRequest::Refresh);
        assert_eq!(hits.get(), 10);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let bus = RefreshEventBus::new();
        let hits = Rc::new(Cell::new(0));

        bus.subscribe(|_| panic!("subscriber failure"));
        let h = Rc::clone(&hits);
        bus.subscribe(move |_| h.set(h.get() + 1));

        assert_eq!(bus.publish(&RefreshRequest::Reposition), 1);
        assert_eq!(hits.get(), 1);
        // Still subscribed and still isolated on the next delivery
        assert_eq!(bus.publish(&RefreshRequest::Reposition), 1);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself_during_delivery() {
        let bus = SurfaceEventBus::new();
        let token_slot: Rc<Cell<Option<SubscriptionToken>>> = Rc::new(Cell::new(None));
        let hits = Rc::new(Cell::new(0));

        let bus_handle = bus.clone();
        let slot = Rc::clone(&token_slot);
        let h = Rc::clone(&hits);
        let token = bus.subscribe(move |_| {
            h.set(h.get() + 1);
            if let Some(token) = slot.get() {
                bus_handle.unsubscribe(token);
            }
        });
        token_slot.set(Some(token));

        bus.publish(&SurfaceEvent::Closed);
        bus.publish(&SurfaceEvent::Closed);
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_removed_mid_delivery_is_skipped() {
        let bus = RefreshEventBus::new();
        let second_token: Rc<Cell<Option<SubscriptionToken>>> = Rc::new(Cell::new(None));
        let hits = Rc::new(Cell::new(0));

        let bus_handle = bus.clone();
        let slot = Rc::clone(&second_token);
        bus.subscribe(move |_| {
            if let Some(token) = slot.get() {
                bus_handle.unsubscribe(token);
            }
        });
        let h = Rc::clone(&hits);
        second_token.set(Some(bus.subscribe(move |_| h.set(h.get() + 1))));

        assert_eq!(bus.publish(&RefreshRequest::Refresh), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_reentrant_publish_skips_running_handler() {
        let bus = RefreshEventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let bus_handle = bus.clone();
        let l = Rc::clone(&log);
        bus.subscribe(move |event| {
            l.borrow_mut().push(("a", *event));
            if *event == RefreshRequest::Refresh {
                bus_handle.publish(&RefreshRequest::Reposition);
            }
        });
        let l = Rc::clone(&log);
        bus.subscribe(move |event| l.borrow_mut().push(("b", *event)));

        bus.publish(&RefreshRequest::Refresh);
        assert_eq!(
            *log.borrow(),
            vec![
                ("a", RefreshRequest::Refresh),
                ("b", RefreshRequest::Reposition),
                ("b", RefreshRequest::Refresh),
            ]
        );
    }
}
