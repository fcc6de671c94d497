// Readers that turn the assistant CLI's output pipes into `AgentEvent`s.

use clause_common::protocol::events::AgentEvent;
use clause_common::protocol::stream_json::decode_line;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Decode stdout lines until the pipe closes, then send a terminal
/// `complete` so a turn never stays open after the process is gone.
///
/// Undecodable lines are logged and skipped. Returns the number of events
/// forwarded, including the final `complete`.
pub async fn pump_stream_json<R>(reader: R, tx: mpsc::Sender<AgentEvent>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut forwarded = 0;
    let mut session_id = String::new();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "assistant stdout read failed");
                let event = AgentEvent::error(&session_id, format!("Read error: {error}"));
                if tx.send(event).await.is_ok() {
                    forwarded += 1;
                }
                break;
            }
        };

        let events = match decode_line(&line) {
            Ok(events) => events,
            Err(error) => {
                debug!(%error, "skipping undecodable stream-json line");
                continue;
            }
        };
        for event in events {
            if !event.session_id.is_empty() {
                session_id.clone_from(&event.session_id);
            }
            if tx.send(event).await.is_err() {
                debug!("event channel closed, stopping stdout pump");
                return forwarded;
            }
            forwarded += 1;
        }
    }

    if tx.send(AgentEvent::complete(&session_id)).await.is_ok() {
        forwarded += 1;
    }
    forwarded
}

/// Forward stderr as `error` events. Lines that look like errors are sent
/// immediately; anything else is buffered and sent once when the pipe closes.
pub async fn pump_stderr<R>(reader: R, tx: mpsc::Sender<AgentEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut buffered = String::new();
    let mut reported_any = false;

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if line.contains("Error:") || line.contains("error:") {
            reported_any = true;
            if tx.send(AgentEvent::error("", line)).await.is_err() {
                return;
            }
            continue;
        }
        if !buffered.is_empty() {
            buffered.push('\n');
        }
        buffered.push_str(&line);
    }

    if !buffered.is_empty() && !reported_any {
        let _ = tx.send(AgentEvent::error("", format!("Assistant stderr: {buffered}"))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clause_common::protocol::events::AgentEventKind;

    async fn collect(mut rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn decodes_lines_and_appends_complete() {
        let stdout = concat!(
            r#"{"type":"system","subtype":"init","session_id":"s1"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"type":"assistant","session_id":"s1","message":{"content":[{"type":"text","text":"Hi"}]}}"#,
            "\n",
        );
        let (tx, rx) = mpsc::channel(16);

        let forwarded = pump_stream_json(stdout.as_bytes(), tx).await;
        let events = collect(rx).await;

        assert_eq!(forwarded, 3);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![AgentEventKind::Init, AgentEventKind::Text, AgentEventKind::Complete]);
        assert_eq!(events[2].session_id, "s1");
    }

    #[tokio::test]
    async fn empty_stream_still_completes() {
        let (tx, rx) = mpsc::channel(4);
        pump_stream_json(&b""[..], tx).await;
        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
    }

    #[tokio::test]
    async fn stderr_error_lines_are_immediate() {
        let (tx, rx) = mpsc::channel(4);
        pump_stderr(&b"warming up\nError: invalid api key\n"[..], tx).await;
        let events = collect(rx).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].error.as_deref(), Some("Error: invalid api key"));
    }

    #[tokio::test]
    async fn stderr_noise_is_reported_once_at_close() {
        let (tx, rx) = mpsc::channel(4);
        pump_stderr(&b"first\nsecond\n"[..], tx).await;
        let events = collect(rx).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].error.as_deref(), Some("Assistant stderr: first\nsecond"));
    }
}
