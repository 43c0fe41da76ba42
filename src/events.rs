//! Synchronous, in-process publish/subscribe.
//!
//! One [`EventBroker<Event>`] exists per annotated image and decouples the
//! selection and viewer components from the [`crate::ImagePlugin`]. The broker
//! is generic so the in-memory host can reuse it for its own topics.

use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::model::{Annotation, Shape};

/// An event that can be routed by its kind.
pub trait BrokerEvent {
    type Kind: Copy + Eq + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by `subscribe`; pass it back to `unsubscribe` to detach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

impl Subscription {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

type Handler<E> = Rc<dyn Fn(&E)>;

struct Entry<E: BrokerEvent> {
    subscription: Subscription,
    kind: E::Kind,
    handler: Handler<E>,
}

struct Registry<E: BrokerEvent> {
    next_id: u64,
    entries: Vec<Entry<E>>,
}

/// Typed publish/subscribe hub.
///
/// Delivery is synchronous: every handler registered for the event's kind has
/// run, in subscription order, before [`EventBroker::publish`] returns. A
/// panicking handler is isolated and does not stop delivery to the rest,
/// as long as panics unwind. On `wasm32-unknown-unknown` they abort, so a
/// panicking handler ends the whole module there.
/// Cloning yields another handle to the same registry.
pub struct EventBroker<E: BrokerEvent> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: BrokerEvent> Clone for EventBroker<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E: BrokerEvent> Default for EventBroker<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BrokerEvent> fmt::Debug for EventBroker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBroker")
            .field("handlers", &registry.entries.len())
            .finish()
    }
}

impl<E: BrokerEvent> EventBroker<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, kind: E::Kind, handler: impl Fn(&E) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let subscription = Subscription(registry.next_id);
        registry.entries.push(Entry {
            subscription,
            kind,
            handler: Rc::new(handler),
        });
        subscription
    }

    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.entries.len();
        registry.entries.retain(|e| e.subscription != subscription);
        registry.entries.len() != before
    }

    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    /// Deliver `event` to every handler of its kind and return how many
    /// completed normally. Publishing with no handlers is a no-op.
    ///
    /// Handler panics are caught only where they unwind; the browser build
    /// aborts instead.
    pub fn publish(&self, event: E) -> usize {
        let kind = event.kind();

        // Handlers may subscribe or publish re-entrantly, so the registry must
        // not stay borrowed while they run.
        let handlers: Vec<Handler<E>> = self
            .registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| Rc::clone(&e.handler))
            .collect();

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivered += 1,
                Err(_) => log::error!("Handler for {kind:?} panicked; continuing delivery"),
            }
        }
        delivered
    }
}

/// Kinds of events flowing through an image's broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    SelectionStarted,
    SelectionCompleted,
    SelectionCanceled,
    PopupHidden,
    MouseOverAnnotatableMedia,
    MouseOutOfAnnotatableMedia,
    MouseOverAnnotation,
    MouseOutOfAnnotation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    SelectionStarted { x: f64, y: f64 },
    SelectionCompleted { shape: Shape },
    SelectionCanceled,
    PopupHidden,
    MouseOverAnnotatableMedia,
    MouseOutOfAnnotatableMedia,
    MouseOverAnnotation { annotation: Annotation },
    MouseOutOfAnnotation { annotation: Annotation },
}

impl BrokerEvent for Event {
    type Kind = EventType;

    fn kind(&self) -> EventType {
        match self {
            Self::SelectionStarted { .. } => EventType::SelectionStarted,
            Self::SelectionCompleted { .. } => EventType::SelectionCompleted,
            Self::SelectionCanceled => EventType::SelectionCanceled,
            Self::PopupHidden => EventType::PopupHidden,
            Self::MouseOverAnnotatableMedia => EventType::MouseOverAnnotatableMedia,
            Self::MouseOutOfAnnotatableMedia => EventType::MouseOutOfAnnotatableMedia,
            Self::MouseOverAnnotation { .. } => EventType::MouseOverAnnotation,
            Self::MouseOutOfAnnotation { .. } => EventType::MouseOutOfAnnotation,
        }
    }
}
