//! Events delivered by a skill execution stream.

use serde::{Deserialize, Serialize};

/// One discrete unit of information from an in-flight skill execution.
///
/// A well-formed stream is finite: zero or more `TextFragment`s followed by
/// exactly one terminal event (`Completed` or `Failed`), unless the consumer
/// abandons the stream early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// An incremental piece of generated text.
    TextFragment { text: String },
    /// The skill finished; carries server-reported wall time.
    Completed { execution_time_seconds: f64 },
    /// The skill or its connection failed.
    Failed { message: String },
}

impl StreamEvent {
    /// Convenience constructor for a text fragment.
    #[must_use]
    pub fn fragment(text: impl Into<String>) -> Self {
        Self::TextFragment { text: text.into() }
    }

    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(!StreamEvent::fragment("x").is_terminal());
        assert!(
            StreamEvent::Completed {
                execution_time_seconds: 1.0
            }
            .is_terminal()
        );
        assert!(
            StreamEvent::Failed {
                message: "boom".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn event_serialization_is_tagged() {
        let json = serde_json::to_string(&StreamEvent::fragment("MA(")).unwrap();
        assert!(json.contains("text_fragment"));

        let parsed: StreamEvent =
            serde_json::from_str(r#"{"type":"completed","execution_time_seconds":4.2}"#).unwrap();
        assert_eq!(
            parsed,
            StreamEvent::Completed {
                execution_time_seconds: 4.2
            }
        );
    }
}
