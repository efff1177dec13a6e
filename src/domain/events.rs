use crate::domain::errors::AppError;
use crate::domain::market_data::{FetchKind, InstrumentKey, Timestamp};
use std::cell::RefCell;
use std::fmt::Debug;

/// Base trait for all domain events
pub trait DomainEvent: Debug + Clone {
    fn event_type(&self) -> &'static str;
}

/// Changes published by the candle data source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    KeyChanged {
        key: InstrumentKey,
    },
    FetchStarted {
        key: InstrumentKey,
        kind: FetchKind,
        to: Option<Timestamp>,
    },
    PageApplied {
        key: InstrumentKey,
        kind: FetchKind,
        page_index: usize,
        candle_count: usize,
    },
    Exhausted {
        key: InstrumentKey,
    },
    FetchFailed {
        key: InstrumentKey,
        kind: FetchKind,
        error: AppError,
    },
    StaleResponseDiscarded {
        key: InstrumentKey,
        kind: FetchKind,
    },
    Cleared,
}

impl DomainEvent for SourceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SourceEvent::KeyChanged { .. } => "KeyChanged",
            SourceEvent::FetchStarted { .. } => "FetchStarted",
            SourceEvent::PageApplied { .. } => "PageApplied",
            SourceEvent::Exhausted { .. } => "Exhausted",
            SourceEvent::FetchFailed { .. } => "FetchFailed",
            SourceEvent::StaleResponseDiscarded { .. } => "StaleResponseDiscarded",
            SourceEvent::Cleared => "Cleared",
        }
    }
}

type Handler = Box<dyn Fn(&SourceEvent)>;

/// Fan-out of source events to subscribed closures
#[derive(Default)]
pub struct SourceEventDispatcher {
    handlers: RefCell<Vec<Handler>>,
}

impl SourceEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&SourceEvent) + 'static,
    {
        self.handlers.borrow_mut().push(Box::new(handler));
    }

    /// Handlers must not subscribe from inside a callback.
    pub fn publish(&self, event: &SourceEvent) {
        for handler in self.handlers.borrow().iter() {
            handler(event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl Debug for SourceEventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceEventDispatcher")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
