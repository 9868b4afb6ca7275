//! Structured run events delivered to the host.

use std::{cell::RefCell, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{host::Host, value::Value};

/// Severity of a reported event. Serializes lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    #[default]
    Debug,
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EventLevel::Debug => "debug",
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        }
    }

    /// Case-insensitive lookup. `warn` and `err` are accepted as aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(EventLevel::Debug),
            "info" => Some(EventLevel::Info),
            "warn" | "warning" => Some(EventLevel::Warning),
            "err" | "error" => Some(EventLevel::Error),
            _ => None,
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{level, message, error?}` record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Event {
    pub level: EventLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Event {
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, message)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Reads an event from a script object.
    ///
    /// A missing or non-string `level` falls back to `debug`, an unknown one
    /// too. A non-string `message` is ignored. Any present `error` property
    /// is kept in its string form.
    pub fn from_value(value: &Value) -> Event {
        let mut event = Event::default();
        let Some(object) = value.as_object() else {
            return event;
        };

        if let Some(level) = object.get("level").and_then(Value::as_str) {
            match EventLevel::parse(level) {
                Some(level) => event.level = level,
                None => tracing::debug!(level, "unknown event level, using debug"),
            }
        }
        if let Some(message) = object.get("message").and_then(Value::as_str) {
            event.message = message.to_string();
        }
        if let Some(error) = object.get("error").filter(|e| !e.is_undefined()) {
            event.error = Some(error.to_string());
        }
        event
    }

    pub fn is_error(&self) -> bool {
        self.level == EventLevel::Error
    }
}

/// Forwards events to the host's reporting capability, keeping a copy of
/// everything sent for the run report.
#[derive(Clone)]
pub struct EventSink {
    host: Rc<dyn Host>,
    sent: Rc<RefCell<Vec<Event>>>,
}

impl EventSink {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            host,
            sent: Rc::default(),
        }
    }

    pub fn push(&self, event: Event) {
        self.host.report(std::slice::from_ref(&event));
        self.sent.borrow_mut().push(event);
    }

    /// Script-facing `events.push(...)`: each argument becomes one event and
    /// the whole batch is reported at once.
    pub fn push_values(&self, values: &[Value]) {
        if values.is_empty() {
            return;
        }
        let batch: Vec<Event> = values.iter().map(Event::from_value).collect();
        self.host.report(&batch);
        self.sent.borrow_mut().extend(batch);
    }

    /// Every event sent through this sink so far.
    pub fn history(&self) -> Vec<Event> {
        self.sent.borrow().clone()
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("sent", &self.sent.borrow().len())
            .finish_non_exhaustive()
    }
}
