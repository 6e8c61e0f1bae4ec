use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use presence_core::Presence;
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("no chat client is listening for IPC connections")]
    NotRunning,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),
}

/// A logged-in connection to the presence endpoint.
pub trait PresenceTransport {
    fn set_activity(&mut self, presence: &Presence) -> Result<(), RpcError>;
    fn clear_activity(&mut self) -> Result<(), RpcError>;
    fn reconnect(&mut self) -> Result<(), RpcError>;
    fn close(&mut self) -> Result<(), RpcError>;
}

/// Performs the login handshake and hands back a connected transport.
pub trait TransportFactory {
    type Transport: PresenceTransport;

    fn connect(&self, client_id: &str) -> Result<Self::Transport, RpcError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiscordConnector;

impl TransportFactory for DiscordConnector {
    type Transport = DiscordTransport;

    fn connect(&self, client_id: &str) -> Result<DiscordTransport, RpcError> {
        tracing::info!("creating IPC client for application {client_id}");
        let mut client = DiscordIpcClient::new(client_id)
            .map_err(|e| RpcError::Connect(e.to_string()))?;
        client.connect().map_err(|e| classify_connect_error(e.as_ref()))?;
        Ok(DiscordTransport { client })
    }
}

pub struct DiscordTransport {
    client: DiscordIpcClient,
}

impl std::fmt::Debug for DiscordTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordTransport").finish()
    }
}

impl PresenceTransport for DiscordTransport {
    fn set_activity(&mut self, presence: &Presence) -> Result<(), RpcError> {
        let mut assets = activity::Assets::new();
        if !presence.large_image_key.is_empty() {
            assets = assets
                .large_image(&presence.large_image_key)
                .large_text(&presence.large_image_text);
        }
        if !presence.small_image_key.is_empty() {
            assets = assets
                .small_image(&presence.small_image_key)
                .small_text(&presence.small_image_text);
        }

        let mut payload = activity::Activity::new()
            .details(&presence.details)
            .assets(assets);
        if let Some(state) = &presence.state {
            payload = payload.state(state);
        }
        if let Some(start) = presence.start_timestamp {
            payload = payload.timestamps(activity::Timestamps::new().start(start));
        }

        self.client
            .set_activity(payload)
            .map_err(|e| RpcError::Send(e.to_string()))
    }

    fn clear_activity(&mut self) -> Result<(), RpcError> {
        self.client
            .clear_activity()
            .map_err(|e| RpcError::Send(e.to_string()))
    }

    fn reconnect(&mut self) -> Result<(), RpcError> {
        self.client
            .reconnect()
            .map_err(|e| classify_connect_error(e.as_ref()))
    }

    fn close(&mut self) -> Result<(), RpcError> {
        self.client
            .close()
            .map_err(|e| RpcError::Send(e.to_string()))
    }
}

/// Missing or refusing sockets mean the chat client simply is not running.
pub fn classify_connect_error(err: &(dyn StdError + 'static)) -> RpcError {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
            ) {
                return RpcError::NotRunning;
            }
        }
        source = e.source();
    }

    let message = err.to_string();
    if message.contains("ENOENT") || message.contains("Couldn't connect to the Discord IPC socket")
    {
        return RpcError::NotRunning;
    }
    RpcError::Connect(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug, Error)]
    #[error("handshake failed")]
    struct Wrapped(#[source] io::Error);

    #[test]
    fn test_missing_socket_is_not_running() {
        let err = io::Error::new(io::ErrorKind::NotFound, "no socket");
        assert_eq!(classify_connect_error(&err), RpcError::NotRunning);

        let err = Wrapped(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(classify_connect_error(&err), RpcError::NotRunning);
    }

    #[test]
    fn test_socket_message_is_not_running() {
        let err: Box<dyn StdError> = "Couldn't connect to the Discord IPC socket".into();
        assert_eq!(classify_connect_error(err.as_ref()), RpcError::NotRunning);
    }

    #[test]
    fn test_other_errors_keep_message() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "bad handshake");
        assert_eq!(
            classify_connect_error(&err),
            RpcError::Connect("bad handshake".to_string())
        );
        assert_eq!(
            RpcError::Connect("x".to_string()).to_string(),
            "connect failed: x"
        );
    }
}
