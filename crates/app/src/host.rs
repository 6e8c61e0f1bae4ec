//! Line-delimited JSON bridge to the host editor plugin.
//!
//! The plugin writes [`HostMessage`]s to our stdin and reads
//! [`HostNotice`](presence_core::HostNotice)s from our stdout. Logs never go to stdout.

use presence_core::{HostMessage, NoticeReceiver};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Parse host messages from `reader` until EOF or until the receiver goes away.
pub async fn read_host_messages<R>(reader: R, tx: mpsc::Sender<HostMessage>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match HostMessage::parse_line(&line) {
            Ok(message) => {
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("skipping malformed host message: {e}"),
        }
    }
    tracing::debug!("host input closed");
    Ok(())
}

/// Write every notice as one JSON line, flushing after each.
pub async fn write_notices<W>(mut rx: NoticeReceiver, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(notice) = rx.recv().await {
        let line = match notice.to_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("cannot encode notice {notice:?}: {e}");
                continue;
            }
        };
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Spawn the stdin reader; the returned receiver closes when the host hangs up.
pub fn spawn_stdin_reader(buffer: usize) -> mpsc::Receiver<HostMessage> {
    let (tx, rx) = mpsc::channel(buffer);
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = read_host_messages(stdin, tx).await {
            tracing::error!("reading host input failed: {e}");
        }
    });
    rx
}

/// Spawn the stdout writer for notices.
pub fn spawn_notice_writer(rx: NoticeReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = write_notices(rx, tokio::io::stdout()).await {
            tracing::error!("writing host notices failed: {e}");
        }
    })
}
