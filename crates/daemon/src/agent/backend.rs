// Stream-json backend: writes user turns to the stdin pipe of a running
// assistant CLI.

use std::process::Stdio;

use clause_common::protocol::stream_json::encode_user_turn;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::{AgentError, AssistantBackend, SendRequest};

/// True when `<program> --version` runs and exits successfully.
pub async fn probe_cli_available(program: &str) -> bool {
    let status = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) => status.success(),
        Err(error) => {
            debug!(program, %error, "assistant CLI probe failed");
            false
        }
    }
}

pub struct StreamJsonBackend<W> {
    writer: Mutex<W>,
    program: String,
}

impl<W> StreamJsonBackend<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// `program` is only used for the availability probe.
    pub fn new(writer: W, program: impl Into<String>) -> Self {
        Self { writer: Mutex::new(writer), program: program.into() }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> AssistantBackend for StreamJsonBackend<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn check_available(&self) -> bool {
        probe_cli_available(&self.program).await
    }

    async fn send(&self, request: SendRequest) -> Result<(), AgentError> {
        let mut line = encode_user_turn(&request.message, request.context.as_deref())?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        debug!(
            session_id = request.session_id.as_deref().unwrap_or("<new>"),
            working_dir = %request.working_dir.display(),
            "turn sent to assistant"
        );
        trace!(bytes = line.len(), "stream-json turn written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn request(message: &str, context: Option<&str>) -> SendRequest {
        SendRequest {
            message: message.into(),
            session_id: Some("s1".into()),
            working_dir: PathBuf::from("/work"),
            context: context.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn send_writes_one_json_line_per_turn() {
        let backend = StreamJsonBackend::new(Vec::<u8>::new(), "claude");
        backend.send(request("Tighten the intro", None)).await.unwrap();
        backend.send(request("Fix typos", Some("From a.md (lines 1-2):\nteh cat"))).await.unwrap();

        let written = String::from_utf8(backend.into_inner()).unwrap();
        let lines: Vec<Value> =
            written.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            json!({"type": "user", "message": {"role": "user", "content": "Tighten the intro"}})
        );
        assert_eq!(
            lines[1]["message"]["content"],
            "Fix typos\n\n---\nContext:\nFrom a.md (lines 1-2):\nteh cat"
        );
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        assert!(!probe_cli_available("clause-definitely-not-installed-binary").await);
        let backend =
            StreamJsonBackend::new(Vec::<u8>::new(), "clause-definitely-not-installed-binary");
        assert!(!backend.check_available().await);
    }
}
