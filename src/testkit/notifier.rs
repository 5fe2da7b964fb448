//! Event-capturing notifier.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::port::outbound::notifier::{Event, Notifier, NotifierRegistry};

/// Thread-safe event collector for notification assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding a clone of this recorder.
    pub fn registry(&self) -> NotifierRegistry {
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(self.clone()));
        registry
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &Event) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
