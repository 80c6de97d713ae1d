//! Records streamed back to the caller.
//!
//! A run produces one or two records: the assistant's message, then the id
//! of a produced file if there is one. Streaming callers receive each record
//! as its own SSE `data:` event; JSON callers receive them folded into one
//! object.
//!
//! # Example
//!
//! ```rust
//! use opendata_bridge::events::StreamRecord;
//!
//! let record = StreamRecord::Message { message: "Hello".to_string() };
//! assert_eq!(record.to_json(), r#"{"message":"Hello"}"#);
//! ```

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::assistant::RunOutcome;

/// One streamed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamRecord {
    /// Assistant message (or failure placeholder).
    Message {
        /// Text to display.
        message: String,
    },
    /// A file the caller can fetch from the download route.
    File {
        /// File id, scoped to the requesting user.
        file_id: String,
    },
}

impl StreamRecord {
    /// Serialize the record as a compact JSON object.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Build the SSE event carrying this record.
    #[must_use]
    pub fn to_sse_event(&self) -> Event {
        Event::default().data(self.to_json())
    }
}

/// Records describing a run outcome, message first.
#[must_use]
pub fn outcome_records(outcome: &RunOutcome) -> Vec<StreamRecord> {
    let mut records = vec![StreamRecord::Message {
        message: outcome.message.clone(),
    }];
    if let Some(file_id) = &outcome.file_id {
        records.push(StreamRecord::File {
            file_id: file_id.clone(),
        });
    }
    records
}

/// Single-object response body for non-streaming callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub file_id: Option<String>,
}

impl ChatResponse {
    /// Fold records into one object; the last file record wins.
    #[must_use]
    pub fn from_records(records: &[StreamRecord]) -> Self {
        let mut response = Self {
            message: String::new(),
            file_id: None,
        };
        for record in records {
            match record {
                StreamRecord::Message { message } => response.message.push_str(message),
                StreamRecord::File { file_id } => response.file_id = Some(file_id.clone()),
            }
        }
        response
    }
}

/// Wrap records in an SSE response.
pub fn build_sse_response(
    records: Vec<StreamRecord>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let stream = async_stream::stream! {
        for record in records {
            yield Ok(record.to_sse_event());
        }
    };
    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let file = StreamRecord::File {
            file_id: "f-1".to_string(),
        };
        assert_eq!(file.to_json(), r#"{"file_id":"f-1"}"#);
    }

    #[test]
    fn test_outcome_records_order() {
        let outcome = RunOutcome {
            message: "done".to_string(),
            file_id: Some("file-9".to_string()),
        };
        let records = outcome_records(&outcome);
        assert_eq!(
            records,
            vec![
                StreamRecord::Message {
                    message: "done".to_string()
                },
                StreamRecord::File {
                    file_id: "file-9".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_outcome_without_file_is_single_record() {
        let outcome = RunOutcome {
            message: "hello".to_string(),
            file_id: None,
        };
        assert_eq!(outcome_records(&outcome).len(), 1);
    }

    #[test]
    fn test_chat_response_folds_records() {
        let records = vec![
            StreamRecord::Message {
                message: "ok".to_string(),
            },
            StreamRecord::File {
                file_id: "a".to_string(),
            },
        ];
        let response = ChatResponse::from_records(&records);
        assert_eq!(response.message, "ok");
        assert_eq!(response.file_id.as_deref(), Some("a"));
    }
}
