//! Interactive shell driver over Telnet.

use std::sync::Arc;

use super::session::ShellSession;
use super::ssh::pty_config;
use super::{Response, SessionPrivilege, TransportDriver};
use crate::config::DriverOptions;
use crate::error::{DriverError, Result};
use crate::inventory::Host;
use crate::platform::PlatformProfile;
use crate::transport::{TelnetConfig, TelnetTransport};

/// Same contract as the SSH shell driver; authentication is the
/// interactive login dialog.
pub struct TelnetDriver {
    host: Arc<Host>,
    profile: PlatformProfile,
    options: DriverOptions,
    session: Option<ShellSession<TelnetTransport>>,
    authenticated: bool,
}

impl TelnetDriver {
    /// Create a driver for `host`; nothing is opened until `connect`.
    pub fn new(host: Arc<Host>, profile: PlatformProfile, options: DriverOptions) -> Self {
        Self {
            host,
            profile,
            options,
            session: None,
            authenticated: false,
        }
    }

    fn session(&mut self) -> Result<&mut ShellSession<TelnetTransport>> {
        match (&mut self.session, self.authenticated) {
            (Some(session), true) => Ok(session),
            (Some(_), false) => Err(DriverError::NotAuthenticated.into()),
            (None, _) => Err(DriverError::NotConnected.into()),
        }
    }
}

impl TransportDriver for TelnetDriver {
    async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let config = TelnetConfig {
            host: self.host.hostname.clone(),
            port: self.host.port.unwrap_or(self.options.telnet_port),
            timeout: self.options.connect_timeout,
        };
        let transport = TelnetTransport::connect(&config).await?;
        self.session = Some(ShellSession::new(
            transport,
            self.profile.definition.clone(),
            pty_config(&self.options, "\r\n"),
        )?);
        Ok(())
    }

    async fn authenticate(&mut self) -> Result<()> {
        let host = self.host.clone();
        let session = self.session.as_mut().ok_or(DriverError::NotConnected)?;
        session
            .login(&host.credentials.username, &host.credentials.password)
            .await?;
        session.run_on_open().await?;
        self.authenticated = true;
        Ok(())
    }

    async fn escalate(&mut self) -> Result<()> {
        let host = self.host.clone();
        let policy = self.profile.escalation;
        self.session()?.escalate(policy, &host.credentials).await
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.session()?.send_command(command).await
    }

    async fn close(&mut self) -> Result<()> {
        self.authenticated = false;
        match self.session.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    fn privilege(&self) -> SessionPrivilege {
        match &self.session {
            Some(session) if self.authenticated => session.privilege(),
            _ => SessionPrivilege::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Credentials;
    use crate::platform::PlatformRegistry;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn read_line(socket: &mut tokio::net::TcpStream) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            socket.read_exact(&mut byte).await.unwrap();
            if byte[0] == b'\n' {
                break;
            }
            if byte[0] != b'\r' {
                line.push(byte[0]);
            }
        }
        String::from_utf8(line).unwrap()
    }

    fn driver(port: u16, password: &str) -> TelnetDriver {
        let host = Host::new(
            "access-sw",
            "127.0.0.1",
            "cisco_ios_telnet",
            Credentials::new("netops", password).with_enable_secret("s3cret"),
        )
        .with_port(port);
        let profile = PlatformRegistry::builtin().resolve(&host.platform).unwrap();
        let options = DriverOptions::default().with_command_timeout(Duration::from_secs(2));
        TelnetDriver::new(Arc::new(host), profile, options)
    }

    #[tokio::test]
    async fn test_login_escalate_and_command() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let device = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"\r\nUser Access Verification\r\n\r\nUsername: ").await.unwrap();
            assert_eq!(read_line(&mut socket).await, "netops");
            socket.write_all(b"Password: ").await.unwrap();
            assert_eq!(read_line(&mut socket).await, "pw");
            socket.write_all(b"\r\naccess-sw>").await.unwrap();

            // on-open commands
            for command in ["terminal length 0", "terminal width 512"] {
                assert_eq!(read_line(&mut socket).await, command);
                socket.write_all(format!("{}\r\naccess-sw>", command).as_bytes()).await.unwrap();
            }

            assert_eq!(read_line(&mut socket).await, "enable");
            socket.write_all(b"enable\r\nPassword: ").await.unwrap();
            assert_eq!(read_line(&mut socket).await, "s3cret");
            socket.write_all(b"\r\naccess-sw#").await.unwrap();

            assert_eq!(read_line(&mut socket).await, "show clock");
            socket
                .write_all(b"show clock\r\n10:15:03.123 UTC Mon Mar 1 2026\r\naccess-sw#")
                .await
                .unwrap();
            let mut rest = Vec::new();
            let _ = socket.read_to_end(&mut rest).await;
        });

        let mut driver = driver(port, "pw");
        driver.connect().await.unwrap();
        driver.authenticate().await.unwrap();
        assert_eq!(driver.privilege(), SessionPrivilege::Normal);

        driver.escalate().await.unwrap();
        assert_eq!(driver.privilege(), SessionPrivilege::Privileged);

        let response = driver.send_command("show clock").await.unwrap();
        assert_eq!(response.result, "10:15:03.123 UTC Mon Mar 1 2026");

        driver.close().await.unwrap();
        device.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"Username: ").await.unwrap();
            read_line(&mut socket).await;
            socket.write_all(b"Password: ").await.unwrap();
            read_line(&mut socket).await;
            socket.write_all(b"\r\n% Login invalid\r\n\r\nUsername: ").await.unwrap();
            let mut rest = Vec::new();
            let _ = socket.read_to_end(&mut rest).await;
        });

        let mut driver = driver(port, "wrong");
        driver.connect().await.unwrap();
        let err = driver.authenticate().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::AuthFailed);
        driver.close().await.unwrap();
    }
}
