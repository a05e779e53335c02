use mnema_protocol::{EventMsg, EventPayload, EventSink};
use parking_lot::Mutex;
use std::sync::Arc;

/// Event sink that keeps every event for later inspection.
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<EventMsg>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventMsg> {
        self.events.lock().clone()
    }

    /// Event type tags in emission order, e.g. `turn_started`.
    pub fn kinds(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| match &event.payload {
                EventPayload::TurnStarted { .. } => "turn_started".to_string(),
                EventPayload::MessageAppended { .. } => "message_appended".to_string(),
                EventPayload::TurnCompleted { .. } => "turn_completed".to_string(),
                EventPayload::TurnFailed { kind, .. } => format!("turn_failed:{kind}"),
            })
            .collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: EventMsg) {
        self.events.lock().push(event);
    }
}
