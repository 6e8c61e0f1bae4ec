//! Presence lifecycle: login, listeners, refreshes and user commands.

use crate::events::{earliest, IdleTimer, Throttle, ThrottleConfig, ThrottleDecision};
use activity::{ActivityBuilder, DocumentProbe, FsProbe};
use presence_core::{HostMessage, HostNotice, HostState, NoticeSender, Presence, PresenceCommand};
use rpc::{PresenceTransport, RpcError, TransportFactory};
use std::time::Instant;
use workspace::WorkspaceService;

/// Whether the driver loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

pub struct PresenceSession<F: TransportFactory, P: DocumentProbe = FsProbe> {
    factory: F,
    builder: ActivityBuilder<P>,
    workspace: WorkspaceService,
    host: HostState,
    client: Option<F::Transport>,
    activated: bool,
    listening: bool,
    idle: bool,
    previous: Presence,
    throttle: Throttle,
    idle_timer: IdleTimer,
    notices: NoticeSender,
}

impl<F: TransportFactory, P: DocumentProbe> PresenceSession<F, P> {
    pub fn new(
        factory: F,
        builder: ActivityBuilder<P>,
        workspace: WorkspaceService,
        notices: NoticeSender,
    ) -> Self {
        let throttle = Throttle::new(ThrottleConfig {
            edit_refresh_interval: workspace.settings().edit_throttle(),
        });
        Self {
            factory,
            builder,
            workspace,
            host: HostState::default(),
            client: None,
            activated: false,
            listening: false,
            idle: false,
            previous: Presence::default(),
            throttle,
            idle_timer: IdleTimer::default(),
            notices,
        }
    }

    pub fn workspace(&self) -> &WorkspaceService {
        &self.workspace
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Last presence successfully handed to the client.
    pub fn last_presence(&self) -> &Presence {
        &self.previous
    }

    /// Log in if presence is enabled and the workspace is not excluded.
    pub fn activate(&mut self) {
        tracing::info!("presence activated for {}", self.host.app_name);
        self.activated = true;
        self.follow_active_repository();

        if self.workspace.is_excluded(&self.host) {
            tracing::info!("workspace is excluded, not connecting");
            return;
        }
        if self.workspace.settings().enabled {
            self.login();
        }
    }

    /// Tear everything down; the session is not reused afterwards.
    pub fn deactivate(&mut self) {
        tracing::info!("presence deactivated");
        self.cleanup();
        self.destroy();
    }

    pub fn handle_message(&mut self, message: HostMessage, now: Instant) -> Flow {
        self.host.apply(&message);

        match message {
            HostMessage::Hello { .. } => {
                if self.activated {
                    self.send_activity();
                } else {
                    self.activate();
                }
            }
            HostMessage::WorkspaceChanged { .. } => {
                if self.is_connected() && self.workspace.is_excluded(&self.host) {
                    tracing::info!("workspace became excluded, disconnecting");
                    self.disable(false);
                } else {
                    self.send_activity();
                }
            }
            HostMessage::ActiveEditorChanged { .. } => {
                self.wake(now);
                self.follow_active_repository();
                self.send_activity();
            }
            HostMessage::DocumentChanged { .. } => {
                self.wake(now);
                if !self.listening {
                    return Flow::Continue;
                }
                match self.throttle.hit(now) {
                    ThrottleDecision::Fire => self.send_activity(),
                    ThrottleDecision::Deferred(due) => {
                        tracing::trace!("edit refresh deferred by {:?}", due - now);
                    }
                }
            }
            HostMessage::WindowFocusChanged { focused: true } => {
                self.idle_timer.clear();
                if self.idle {
                    self.idle = false;
                    self.send_activity();
                }
            }
            HostMessage::WindowFocusChanged { focused: false } => self.schedule_idle(now),
            HostMessage::Command { command } => self.run_command(command),
            HostMessage::Shutdown => {
                self.deactivate();
                return Flow::Shutdown;
            }
        }
        Flow::Continue
    }

    /// Fire whatever timers are due.
    pub fn tick(&mut self, now: Instant) {
        if !self.listening {
            return;
        }
        if self.throttle.take_due(now) {
            self.send_activity();
        }
        if self.idle_timer.take_expired(now) {
            tracing::info!("idle timeout reached");
            self.idle = true;
            self.send_activity();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.listening {
            return None;
        }
        earliest(self.throttle.deadline(), self.idle_timer.deadline())
    }

    /// The settings file changed on disk.
    pub fn reload_settings(&mut self) {
        let was_enabled = self.workspace.settings().enabled;
        if !self.workspace.reload_settings() {
            return;
        }
        tracing::info!("settings reloaded");
        let settings = self.workspace.settings();
        self.throttle.set_interval(settings.edit_throttle());

        let enabled = settings.enabled;
        if !enabled && self.is_connected() {
            self.disable(false);
        } else if enabled
            && !was_enabled
            && self.activated
            && !self.is_connected()
            && !self.workspace.is_excluded(&self.host)
        {
            self.login();
        } else {
            self.send_activity();
        }
    }

    /// The followed repository switched branches.
    pub fn repository_changed(&mut self) {
        tracing::debug!("git HEAD changed");
        self.send_activity();
    }

    fn run_command(&mut self, command: PresenceCommand) {
        tracing::info!(?command, "running command");
        match command {
            PresenceCommand::Enable => {
                self.disable(true);
                self.enable(true);
                self.notify(HostNotice::info("Enabled rich presence for this workspace"));
            }
            PresenceCommand::Disable => {
                self.disable(true);
                self.notify(HostNotice::info("Disabled rich presence for this workspace"));
            }
            PresenceCommand::Reconnect => {
                self.disable(false);
                self.enable(false);
            }
            PresenceCommand::Disconnect => self.disable(false),
        }
    }

    fn enable(&mut self, persist: bool) {
        if persist {
            self.workspace.set_enabled(true);
        }
        tracing::info!("enable: cleaning up old listeners");
        self.cleanup();
        tracing::info!("enable: attempting to recreate login");
        self.login();
    }

    fn disable(&mut self, persist: bool) {
        if persist {
            self.workspace.set_enabled(false);
        }
        tracing::info!("disable: cleaning up old listeners");
        self.cleanup();
        if self.destroy() {
            tracing::info!("disable: destroyed the rpc client");
        }
    }

    fn login(&mut self) {
        self.destroy();
        let client_id = self.workspace.settings().client_id.clone();

        match self.factory.connect(&client_id) {
            Ok(client) => {
                tracing::info!("successfully connected to the chat client");
                self.client = Some(client);
                self.listening = true;
                self.notify(HostNotice::Status { connected: true });
                self.send_activity();
            }
            Err(e) => {
                tracing::error!("encountered an error while trying to login: {e}");
                self.cleanup();
                self.destroy();
                if !self.workspace.settings().suppress_notifications {
                    let message = match e {
                        RpcError::NotRunning => "No Discord client detected".to_string(),
                        other => format!("Couldn't connect to Discord via RPC: {other}"),
                    };
                    self.notify(HostNotice::error(message));
                }
            }
        }
    }

    fn send_activity(&mut self) {
        if !self.listening {
            return;
        }
        let presence = self.builder.build_now(
            &self.previous,
            &self.host,
            self.workspace.settings(),
            self.idle,
        );
        let Some(client) = self.client.as_mut() else {
            return;
        };

        let result = client.set_activity(&presence).or_else(|e| {
            tracing::warn!("set activity failed ({e}), reconnecting");
            client.reconnect()?;
            client.set_activity(&presence)
        });

        match result {
            Ok(()) => {
                tracing::debug!(details = %presence.details, "presence updated");
                self.previous = presence;
            }
            Err(e) => {
                tracing::error!("lost connection to the chat client: {e}");
                self.cleanup();
                self.destroy();
            }
        }
    }

    fn follow_active_repository(&mut self) {
        let dir = self
            .host
            .active_document
            .as_ref()
            .and_then(|d| d.path.parent())
            .map(|p| p.to_path_buf());
        self.workspace.follow_repository(dir.as_deref());
    }

    /// Activity in the editor. While unfocused the idle countdown restarts instead.
    fn wake(&mut self, now: Instant) {
        self.idle = false;
        if self.host.window_focused {
            self.idle_timer.clear();
        } else {
            self.schedule_idle(now);
        }
    }

    fn schedule_idle(&mut self, now: Instant) {
        if let (true, Some(timeout)) = (self.listening, self.workspace.settings().idle_timeout()) {
            self.idle_timer.schedule(now, timeout);
        }
    }

    /// Stop reacting to host events.
    fn cleanup(&mut self) {
        self.listening = false;
        self.throttle.reset();
        self.idle_timer.clear();
    }

    /// Close the client. Returns whether there was one.
    fn destroy(&mut self) -> bool {
        let Some(mut client) = self.client.take() else {
            return false;
        };
        if let Err(e) = client.clear_activity() {
            tracing::debug!("clearing activity: {e}");
        }
        if let Err(e) = client.close() {
            tracing::debug!("closing client: {e}");
        }
        self.notify(HostNotice::Status { connected: false });
        true
    }

    fn notify(&self, notice: HostNotice) {
        if let Err(e) = self.notices.try_send(notice) {
            tracing::warn!("dropping host notice: {e}");
        }
    }
}
