//! Wire protocol for skill execution streams.
//!
//! The service speaks SSE: each frame's `data:` payload is one JSON-encoded
//! `WireEvent`. The request body is a JSON `ExecuteRequest`.

use serde::{Deserialize, Serialize};
use skillstream_core::StreamEvent;

/// Request body for starting a skill execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// User prompt, already trimmed and validated by the caller.
    pub prompt: String,
}

/// One SSE frame payload from the skill service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Incremental generated text.
    Fragment { text: String },
    /// Execution finished; server-reported wall time.
    Completed { execution_time_seconds: f64 },
    /// Execution failed.
    Failed { message: String },
}

impl From<WireEvent> for StreamEvent {
    fn from(wire: WireEvent) -> Self {
        match wire {
            WireEvent::Fragment { text } => Self::TextFragment { text },
            WireEvent::Completed {
                execution_time_seconds,
            } => Self::Completed {
                execution_time_seconds,
            },
            WireEvent::Failed { message } => Self::Failed { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_events_parse_from_tagged_json() {
        let parsed: WireEvent = serde_json::from_str(r#"{"type":"fragment","text":"MA("}"#).unwrap();
        assert_eq!(parsed, WireEvent::Fragment { text: "MA(".into() });

        let parsed: WireEvent =
            serde_json::from_str(r#"{"type":"completed","execution_time_seconds":4.2}"#).unwrap();
        assert!(matches!(parsed, WireEvent::Completed { .. }));
    }

    #[test]
    fn wire_event_maps_to_stream_event() {
        let ev: StreamEvent = WireEvent::Failed {
            message: "connection reset".into(),
        }
        .into();
        assert_eq!(
            ev,
            StreamEvent::Failed {
                message: "connection reset".into()
            }
        );
    }
}
