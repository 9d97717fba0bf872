use crate::state::{AppState, JobEvent, JobLog};
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

const RELAY_BUFFER: usize = 64;

/// Server-sent events for one job. Each frame's `data` is one event as JSON.
/// The stream ends after the terminal event, or at once for an unknown id.
pub async fn translation_progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::channel(RELAY_BUFFER);

    match state.registry.get(&job_id).await {
        Some(log) => {
            tokio::spawn(relay_events(log, tx, state.config.poll_interval()));
        }
        None => debug!(job_id = %job_id, "Progress requested for unknown job"),
    }

    let stream = ReceiverStream::new(rx).map(|event| Event::default().json_data(event));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Forwards every event of `log` to `tx` in append order, stopping after the
/// terminal event or when the receiver goes away.
pub async fn relay_events(log: Arc<JobLog>, tx: mpsc::Sender<JobEvent>, poll_interval: Duration) {
    let mut changes = log.subscribe();
    let mut offset = 0;

    loop {
        changes.borrow_and_update();
        let (events, next_offset) = log.read_from(offset).await;
        offset = next_offset;

        for event in events {
            let terminal = event.is_terminal();
            if tx.send(event).await.is_err() {
                debug!(job_id = %log.job_id(), "Progress client disconnected");
                return;
            }
            if terminal {
                return;
            }
        }

        // Timeout only bounds the wait; the next read decides what is new.
        tokio::select! {
            _ = tx.closed() => {
                debug!(job_id = %log.job_id(), "Progress client disconnected");
                return;
            }
            _ = tokio::time::timeout(poll_interval, changes.changed()) => {}
        }
    }
}
