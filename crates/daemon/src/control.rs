// Line-delimited JSON control channel for a headless presentation layer.
//
// Each inbound line is one `ControlCommand`. Every published `DocumentView`
// and `ChatView` is written back as one `ControlUpdate` line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::document::{DocumentCommand, DocumentView};
use crate::runtime::RuntimeHandle;
use crate::transcript::{ChatCommand, ChatView};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    Open { path: PathBuf },
    Edit { text: String },
    AcceptAll,
    DenyAll,
    Send {
        message: String,
        #[serde(default)]
        context: Option<String>,
    },
    RefreshAvailability,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlUpdate {
    Document { view: DocumentView },
    Chat { view: ChatView },
    Error { message: String },
}

enum Routed {
    Document(DocumentCommand),
    Chat(ChatCommand),
    Shutdown,
}

fn route(command: ControlCommand) -> Routed {
    match command {
        ControlCommand::Open { path } => Routed::Document(DocumentCommand::Open(path)),
        ControlCommand::Edit { text } => Routed::Document(DocumentCommand::Edit(text)),
        ControlCommand::AcceptAll => Routed::Document(DocumentCommand::AcceptAll),
        ControlCommand::DenyAll => Routed::Document(DocumentCommand::DenyAll),
        ControlCommand::Send { message, context } => {
            Routed::Chat(ChatCommand::Send { message, context })
        }
        ControlCommand::RefreshAvailability => Routed::Chat(ChatCommand::RefreshAvailability),
        ControlCommand::Shutdown => Routed::Shutdown,
    }
}

async fn write_update<W>(writer: &mut W, update: &ControlUpdate) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = serde_json::to_vec(update).context("failed to serialize control update")?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await.context("failed to write control update")?;
    writer.flush().await.context("failed to flush control update")
}

async fn chat_changed(view: &mut Option<watch::Receiver<ChatView>>) -> Option<ChatView> {
    match view {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => {
                *view = None;
                None
            }
        },
        None => std::future::pending().await,
    }
}

/// Serve commands from `reader` and stream view updates to `writer` until
/// the reader closes or a `shutdown` command arrives.
pub async fn serve_control<R, W>(runtime: &RuntimeHandle, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut document_view = runtime.document_view();
    let mut chat_view = runtime.chat_view();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read control command")? else {
                    debug!("control input closed");
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match serde_json::from_str::<ControlCommand>(&line) {
                    Ok(command) => command,
                    Err(error) => {
                        let message = format!("invalid control command: {error}");
                        write_update(&mut writer, &ControlUpdate::Error { message }).await?;
                        continue;
                    }
                };
                let result = match route(command) {
                    Routed::Document(command) => runtime.document(command).await,
                    Routed::Chat(command) => runtime.chat(command).await,
                    Routed::Shutdown => return Ok(()),
                };
                if let Err(error) = result {
                    warn!(?error, "control command rejected");
                    let message = format!("{error:#}");
                    write_update(&mut writer, &ControlUpdate::Error { message }).await?;
                }
            }
            changed = document_view.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let view = document_view.borrow_and_update().clone();
                write_update(&mut writer, &ControlUpdate::Document { view }).await?;
            }
            Some(view) = chat_changed(&mut chat_view) => {
                write_update(&mut writer, &ControlUpdate::Chat { view }).await?;
            }
        }
    }
}
