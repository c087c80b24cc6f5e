//! The SSE streaming fabric
//!
//! Drains one session's event channel into a long-lived response. Large
//! COMPLETE payloads are split into METADATA + BATCH chunks + a bare
//! COMPLETE; backpressure falls out of the pull-based stream (the next
//! chunk is produced only after the socket accepts the previous one).

use agent::{AgentEvent, FinalPayload};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;

/// Expand one agent event into the events actually sent on the wire.
///
/// Everything passes through untouched except a COMPLETE whose row count
/// exceeds `batch_size`.
pub fn expand_event(event: AgentEvent, batch_size: usize) -> Vec<AgentEvent> {
    match event {
        AgentEvent::Complete {
            payload: Some(payload),
        } if payload.rows.len() > batch_size => batch_payload(payload, batch_size),
        other => vec![other],
    }
}

fn batch_payload(payload: FinalPayload, batch_size: usize) -> Vec<AgentEvent> {
    let FinalPayload {
        display,
        columns,
        rows,
        metadata,
    } = payload;

    let total_records = rows.len();
    let total_batches = total_records.div_ceil(batch_size);

    let mut events = Vec::with_capacity(total_batches + 2);
    events.push(AgentEvent::Metadata {
        total_batches,
        total_records,
        display,
        metadata: json!({
            "columns": columns,
            "total_rows": metadata.total_rows,
            "data_source": metadata.data_source,
            "last_sync_time": metadata.last_sync_time,
        }),
    });

    let mut rows = rows;
    let mut batch_number = 0;
    while !rows.is_empty() {
        let take = rows.len().min(batch_size);
        let chunk: Vec<_> = rows.drain(..take).collect();
        batch_number += 1;
        events.push(AgentEvent::Batch {
            batch: batch_number,
            rows: chunk,
        });
    }

    events.push(AgentEvent::Complete { payload: None });
    events
}

/// Turn a session's event channel into an SSE response.
///
/// The stream ends when the channel closes (the agent task finished) or
/// right after a terminal event.
pub fn stream_events(
    mut rx: mpsc::Receiver<AgentEvent>,
    batch_size: usize,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            for wire_event in expand_event(event, batch_size) {
                match Event::default().json_data(&wire_event) {
                    Ok(sse_event) => yield Ok(sse_event),
                    Err(error) => {
                        tracing::error!(%error, "failed to serialize SSE event");
                    }
                }
            }
            if terminal {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent::answer::{ColumnHeader, ResultMetadata};
    use serde_json::Value;

    fn payload(rows: usize) -> FinalPayload {
        FinalPayload {
            display: "table".to_string(),
            columns: vec![ColumnHeader {
                key: "id".to_string(),
                label: "Id".to_string(),
                sortable: false,
            }],
            rows: (0..rows).map(|i| json!({"id": format!("p{}", i)})).collect(),
            metadata: ResultMetadata {
                total_rows: rows,
                data_source: "snapshot".to_string(),
                last_sync_time: None,
            },
        }
    }

    #[test]
    fn small_results_pass_through_unbatched() {
        let events = expand_event(
            AgentEvent::Complete {
                payload: Some(payload(10)),
            },
            1000,
        );
        assert_eq!(events.len(), 1);
        match &events[0] {
            AgentEvent::Complete { payload: Some(p) } => assert_eq!(p.rows.len(), 10),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn twenty_five_hundred_rows_make_three_batches() {
        let events = expand_event(
            AgentEvent::Complete {
                payload: Some(payload(2500)),
            },
            1000,
        );

        // METADATA, BATCH x3, COMPLETE
        assert_eq!(events.len(), 5);
        match &events[0] {
            AgentEvent::Metadata {
                total_batches,
                total_records,
                ..
            } => {
                assert_eq!(*total_batches, 3);
                assert_eq!(*total_records, 2500);
            }
            other => panic!("expected METADATA first, got {:?}", other),
        }

        let sizes: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Batch { rows, .. } => Some(rows.len()),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);

        match events.last().unwrap() {
            AgentEvent::Complete { payload } => assert!(payload.is_none()),
            other => panic!("expected bare COMPLETE last, got {:?}", other),
        }
    }

    #[test]
    fn concatenated_batches_equal_the_unbatched_rows() {
        let original: Vec<Value> = payload(2500).rows;
        let events = expand_event(
            AgentEvent::Complete {
                payload: Some(payload(2500)),
            },
            1000,
        );

        let mut reassembled = Vec::new();
        let mut batch_numbers = Vec::new();
        for event in &events {
            if let AgentEvent::Batch { batch, rows } = event {
                batch_numbers.push(*batch);
                reassembled.extend(rows.clone());
            }
        }

        assert_eq!(batch_numbers, vec![1, 2, 3]);
        assert_eq!(reassembled, original);
    }

    #[test]
    fn non_complete_events_are_untouched() {
        let event = AgentEvent::ToolCall {
            tool: "probe_rest".to_string(),
            description: "probing".to_string(),
        };
        let events = expand_event(event, 1000);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AgentEvent::ToolCall { .. }));
    }

    #[test]
    fn exactly_threshold_rows_stay_inline() {
        let events = expand_event(
            AgentEvent::Complete {
                payload: Some(payload(1000)),
            },
            1000,
        );
        assert_eq!(events.len(), 1);
    }
}
