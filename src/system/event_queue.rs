//! Time-ordered event scheduler with per-kind and wildcard handlers.
//!
//! Events are kept sorted by due time (FIFO among equal times) and dispatched
//! in batches by [`EventQueue::process_events`]. A handler that fails, or
//! panics, is logged and skipped; the rest of the batch still runs.

use crate::error::HandlerError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};

/// An event that can be routed by kind.
pub trait QueuedEvent {
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}

pub type HandlerId = u64;

type Handler<E> = Box<dyn FnMut(&E) -> Result<(), HandlerError>>;

struct Scheduled<E> {
    at_ms: f64,
    event: E,
}

pub struct EventQueue<E: QueuedEvent> {
    pending: Vec<Scheduled<E>>,
    handlers: HashMap<E::Kind, Vec<(HandlerId, Handler<E>)>>,
    wildcard: Vec<(HandlerId, Handler<E>)>,
    now_ms: f64,
    next_id: HandlerId,
}

impl<E: QueuedEvent> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            handlers: HashMap::new(),
            wildcard: Vec::new(),
            now_ms: 0.0,
            next_id: 0,
        }
    }

    /// Schedules `event` `delay_ms` after the last processed time.
    pub fn enqueue(&mut self, event: E, delay_ms: f64) {
        let at = self.now_ms + delay_ms.max(0.0);
        self.enqueue_at(event, at);
    }

    /// Schedules `event` at an absolute time. Non-finite times are dropped.
    pub fn enqueue_at(&mut self, event: E, at_ms: f64) {
        if !at_ms.is_finite() {
            log::warn!("QUEUE: Dropped {:?} scheduled at {at_ms}", event.kind());
            return;
        }
        let index = self.pending.partition_point(|s| s.at_ms <= at_ms);
        self.pending.insert(index, Scheduled { at_ms, event });
    }

    pub fn on<F>(&mut self, kind: E::Kind, handler: F) -> HandlerId
    where
        F: FnMut(&E) -> Result<(), HandlerError> + 'static,
    {
        let id = self.allocate_id();
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Registers a handler that sees every event, after the kind handlers.
    pub fn on_any<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&E) -> Result<(), HandlerError> + 'static,
    {
        let id = self.allocate_id();
        self.wildcard.push((id, Box::new(handler)));
        id
    }

    /// Removes a handler. Returns whether it existed.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let before = self.handler_count();
        for list in self.handlers.values_mut() {
            list.retain(|(hid, _)| *hid != id);
        }
        self.wildcard.retain(|(hid, _)| *hid != id);
        self.handler_count() != before
    }

    /// Dispatches every event due at or before `now_ms`. Returns how many.
    pub fn process_events(&mut self, now_ms: f64) -> usize {
        if now_ms.is_nan() {
            return 0;
        }
        self.now_ms = now_ms;
        let due = self.pending.partition_point(|s| s.at_ms <= now_ms);
        let batch: Vec<Scheduled<E>> = self.pending.drain(..due).collect();

        for scheduled in &batch {
            let event = &scheduled.event;
            let kind = event.kind();
            if let Some(list) = self.handlers.get_mut(&kind) {
                for (id, handler) in list.iter_mut() {
                    Self::invoke(*id, kind, handler, event);
                }
            }
            for (id, handler) in self.wildcard.iter_mut() {
                Self::invoke(*id, kind, handler, event);
            }
        }
        batch.len()
    }

    /// Time of the next pending event.
    pub fn next_due(&self) -> Option<f64> {
        self.pending.first().map(|s| s.at_ms)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops pending events. Handlers stay registered.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn invoke(id: HandlerId, kind: E::Kind, handler: &mut Handler<E>, event: &E) {
        match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("QUEUE: Handler {id} failed on {kind:?}: {e}"),
            Err(_) => log::error!("QUEUE: Handler {id} panicked on {kind:?}"),
        }
    }

    fn allocate_id(&mut self) -> HandlerId {
        self.next_id += 1;
        self.next_id
    }

    fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum::<usize>() + self.wildcard.len()
    }
}

impl<E: QueuedEvent> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        A(u32),
        B(u32),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum PingKind {
        A,
        B,
    }

    impl QueuedEvent for Ping {
        type Kind = PingKind;

        fn kind(&self) -> PingKind {
            match self {
                Ping::A(_) => PingKind::A,
                Ping::B(_) => PingKind::B,
            }
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<Ping>>>, impl FnMut(&Ping) -> Result<(), HandlerError>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |e: &Ping| {
            sink.borrow_mut().push(e.clone());
            Ok(())
        })
    }

    #[test]
    fn dispatches_in_time_order() {
        let mut queue = EventQueue::new();
        let (seen, handler) = recorder();
        queue.on_any(handler);

        queue.enqueue(Ping::A(3), 300.0);
        queue.enqueue(Ping::A(1), 100.0);
        queue.enqueue(Ping::B(2), 200.0);
        queue.enqueue(Ping::B(4), 200.0);

        assert_eq!(queue.process_events(150.0), 1);
        assert_eq!(queue.process_events(300.0), 3);
        assert_eq!(
            *seen.borrow(),
            vec![Ping::A(1), Ping::B(2), Ping::B(4), Ping::A(3)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn non_finite_times_are_dropped() {
        let mut queue = EventQueue::new();
        let (seen, handler) = recorder();
        queue.on_any(handler);

        queue.enqueue_at(Ping::A(1), 10.0);
        queue.enqueue_at(Ping::B(2), f64::NAN);
        queue.enqueue_at(Ping::B(3), f64::INFINITY);
        queue.enqueue_at(Ping::A(4), 20.0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.next_due(), Some(10.0));

        assert_eq!(queue.process_events(f64::NAN), 0);
        queue.enqueue(Ping::A(5), 5.0);
        assert_eq!(queue.process_events(20.0), 3);
        assert_eq!(*seen.borrow(), vec![Ping::A(5), Ping::A(1), Ping::A(4)]);
    }

    #[test]
    fn kind_handlers_only_see_their_kind() {
        let mut queue = EventQueue::new();
        let (seen, handler) = recorder();
        queue.on(PingKind::B, handler);
        queue.enqueue(Ping::A(1), 0.0);
        queue.enqueue(Ping::B(2), 0.0);
        queue.process_events(0.0);
        assert_eq!(*seen.borrow(), vec![Ping::B(2)]);
    }

    #[test]
    fn failing_handlers_do_not_block_the_batch() {
        let mut queue = EventQueue::new();
        queue.on(PingKind::A, |_| Err("boom".into()));
        queue.on(PingKind::A, |_| panic!("handler bug"));
        let (seen, handler) = recorder();
        queue.on_any(handler);

        queue.enqueue(Ping::A(1), 0.0);
        queue.enqueue(Ping::A(2), 0.0);
        assert_eq!(queue.process_events(10.0), 2);
        assert_eq!(*seen.borrow(), vec![Ping::A(1), Ping::A(2)]);
    }

    #[test]
    fn delay_is_relative_to_last_processed_time() {
        let mut queue = EventQueue::new();
        queue.process_events(1000.0);
        queue.enqueue(Ping::A(1), 50.0);
        assert_eq!(queue.next_due(), Some(1050.0));
        assert_eq!(queue.process_events(1049.0), 0);
        assert_eq!(queue.process_events(1050.0), 1);
    }

    #[test]
    fn off_removes_handler() {
        let mut queue = EventQueue::new();
        let (seen, handler) = recorder();
        let id = queue.on_any(handler);
        assert!(queue.off(id));
        assert!(!queue.off(id));
        queue.enqueue(Ping::A(1), 0.0);
        queue.process_events(0.0);
        assert!(seen.borrow().is_empty());
    }
}
