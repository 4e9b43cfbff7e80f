//! SSH-backed drivers: interactive shell and structured.

use std::sync::Arc;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::session::ShellSession;
use super::{Response, SessionPrivilege, TransportDriver};
use crate::channel::PtyConfig;
use crate::config::DriverOptions;
use crate::error::{DriverError, Result};
use crate::inventory::Host;
use crate::platform::PlatformProfile;
use crate::transport::{AuthMethod, SshConfig, SshShell, SshTransport};

/// Build the SSH configuration for a host.
pub(crate) fn ssh_config(host: &Host, profile: &PlatformProfile, options: &DriverOptions) -> SshConfig {
    let credentials = &host.credentials;
    let password = || SecretString::from(credentials.password.expose_secret().to_owned());

    let auth = match &credentials.private_key {
        Some(path) => AuthMethod::PrivateKey {
            path: path.clone(),
            passphrase: Some(password()),
        },
        None => AuthMethod::Password(password()),
    };

    SshConfig {
        host: host.hostname.clone(),
        port: host.port.unwrap_or(options.ssh_port),
        username: credentials.username.clone(),
        auth,
        timeout: options.connect_timeout,
        terminal_width: options
            .terminal_width
            .unwrap_or(profile.definition.terminal_width),
        terminal_height: options
            .terminal_height
            .unwrap_or(profile.definition.terminal_height),
        host_key_verification: options.host_key_verification.clone(),
        known_hosts_path: options.known_hosts_path.clone(),
    }
}

pub(crate) fn pty_config(options: &DriverOptions, line_ending: &'static str) -> PtyConfig {
    PtyConfig {
        timeout: options.command_timeout,
        search_depth: options.search_depth,
        line_ending,
    }
}

enum LinkState {
    Idle,
    Handshaken {
        transport: SshTransport,
        config: SshConfig,
    },
    Open(ShellSession<SshShell>),
    Closed,
}

/// SSH connection lifecycle shared by both SSH drivers.
struct SshLink {
    host: Arc<Host>,
    profile: PlatformProfile,
    options: DriverOptions,
    state: LinkState,
}

impl SshLink {
    fn new(host: Arc<Host>, profile: PlatformProfile, options: DriverOptions) -> Self {
        Self {
            host,
            profile,
            options,
            state: LinkState::Idle,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if !matches!(self.state, LinkState::Idle) {
            return Err(DriverError::AlreadyConnected.into());
        }
        let config = ssh_config(&self.host, &self.profile, &self.options);
        let transport = SshTransport::connect(&config).await?;
        self.state = LinkState::Handshaken { transport, config };
        Ok(())
    }

    /// Authenticate and open the PTY shell.
    async fn open(&mut self) -> Result<&mut ShellSession<SshShell>> {
        let (mut transport, config) = match std::mem::replace(&mut self.state, LinkState::Closed) {
            LinkState::Handshaken { transport, config } => (transport, config),
            other => {
                self.state = other;
                return Err(DriverError::NotConnected.into());
            }
        };

        if let Err(e) = transport.authenticate(&config).await {
            self.state = LinkState::Handshaken { transport, config };
            return Err(e);
        }

        let shell = transport
            .open_shell(config.terminal_width, config.terminal_height)
            .await?;
        let session = ShellSession::new(
            shell,
            self.profile.definition.clone(),
            pty_config(&self.options, "\n"),
        )?;
        self.state = LinkState::Open(session);
        self.session()
    }

    fn session(&mut self) -> Result<&mut ShellSession<SshShell>> {
        match &mut self.state {
            LinkState::Open(session) => Ok(session),
            LinkState::Handshaken { .. } => Err(DriverError::NotAuthenticated.into()),
            LinkState::Idle | LinkState::Closed => Err(DriverError::NotConnected.into()),
        }
    }

    fn privilege(&self) -> SessionPrivilege {
        match &self.state {
            LinkState::Open(session) => session.privilege(),
            _ => SessionPrivilege::Normal,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, LinkState::Closed) {
            LinkState::Handshaken { transport, .. } => transport.close().await,
            LinkState::Open(session) => session.close().await,
            LinkState::Idle | LinkState::Closed => Ok(()),
        }
    }
}

/// Interactive PTY shell over SSH with heuristic prompt matching.
pub struct ShellDriver {
    link: SshLink,
}

impl ShellDriver {
    /// Create a driver for `host`; nothing is opened until `connect`.
    pub fn new(host: Arc<Host>, profile: PlatformProfile, options: DriverOptions) -> Self {
        Self {
            link: SshLink::new(host, profile, options),
        }
    }
}

impl TransportDriver for ShellDriver {
    async fn connect(&mut self) -> Result<()> {
        self.link.connect().await
    }

    async fn authenticate(&mut self) -> Result<()> {
        let session = self.link.open().await?;
        session.wait_for_prompt().await?;
        session.run_on_open().await
    }

    async fn escalate(&mut self) -> Result<()> {
        let host = self.link.host.clone();
        let policy = self.link.profile.escalation;
        self.link
            .session()?
            .escalate(policy, &host.credentials)
            .await
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.link.session()?.send_command(command).await
    }

    async fn close(&mut self) -> Result<()> {
        self.link.close().await
    }

    fn privilege(&self) -> SessionPrivilege {
        self.link.privilege()
    }
}

/// SSH session negotiated through the platform's privilege graph.
///
/// Every prompt must belong to a known privilege level and output is cut
/// exactly at the prompt offset.
pub struct StructuredDriver {
    link: SshLink,
}

impl StructuredDriver {
    /// Create a driver for `host`; nothing is opened until `connect`.
    pub fn new(host: Arc<Host>, profile: PlatformProfile, options: DriverOptions) -> Self {
        Self {
            link: SshLink::new(host, profile, options),
        }
    }
}

impl TransportDriver for StructuredDriver {
    async fn connect(&mut self) -> Result<()> {
        self.link.connect().await
    }

    async fn authenticate(&mut self) -> Result<()> {
        let session = self.link.open().await?;
        let prompt = session.wait_for_known_prompt().await?;
        debug!(
            "structured session at '{}' ({:?})",
            prompt,
            session.current_level()
        );
        session.run_on_open().await
    }

    async fn escalate(&mut self) -> Result<()> {
        let host = self.link.host.clone();
        let session = self.link.session()?;
        let target = session.definition().default_privilege.clone();
        session
            .acquire_privilege(&target, host.credentials.enable_secret.as_ref())
            .await
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.link.session()?.send_command_strict(command).await
    }

    async fn close(&mut self) -> Result<()> {
        self.link.close().await
    }

    fn privilege(&self) -> SessionPrivilege {
        self.link.privilege()
    }
}
