//! Scripted in-memory drivers for pipeline and scheduler tests.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::driver::{DriverFactory, Response, SessionPrivilege, TransportDriver};
use crate::error::{ChannelError, DriverError, Result, TransportError};
use crate::inventory::Host;
use crate::platform::PlatformProfile;

/// How one mock host behaves.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockScript {
    fail_connect: bool,
    fail_auth: bool,
    fail_escalate: bool,
    panic_on_connect: bool,
    latency: Duration,
    rejected: HashSet<String>,
    lose_session_at: Option<String>,
}

impl MockScript {
    pub(crate) fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub(crate) fn fail_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub(crate) fn fail_escalate(mut self) -> Self {
        self.fail_escalate = true;
        self
    }

    pub(crate) fn panic_on_connect(mut self) -> Self {
        self.panic_on_connect = true;
        self
    }

    /// Delay applied to every step except close.
    pub(crate) fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Device prints an error for this command.
    pub(crate) fn reject(mut self, command: &str) -> Self {
        self.rejected.insert(command.to_string());
        self
    }

    /// Session drops while this command runs.
    pub(crate) fn lose_session_at(mut self, command: &str) -> Self {
        self.lose_session_at = Some(command.to_string());
        self
    }
}

/// Counters shared by every driver a factory creates.
#[derive(Debug, Default)]
pub(crate) struct MockStats {
    created: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    escalations: AtomicUsize,
    commands: AtomicUsize,
}

impl MockStats {
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn escalations(&self) -> usize {
        self.escalations.load(Ordering::SeqCst)
    }

    pub(crate) fn commands(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }
}

/// Factory handing out [`MockDriver`]s scripted per host name.
#[derive(Debug, Default)]
pub(crate) struct MockFactory {
    scripts: HashMap<String, MockScript>,
    fallback: MockScript,
    stats: Arc<MockStats>,
}

impl MockFactory {
    /// Script used for hosts without their own.
    pub(crate) fn with_default(mut self, script: MockScript) -> Self {
        self.fallback = script;
        self
    }

    pub(crate) fn script(mut self, host: &str, script: MockScript) -> Self {
        self.scripts.insert(host.to_string(), script);
        self
    }

    pub(crate) fn stats(&self) -> Arc<MockStats> {
        self.stats.clone()
    }
}

impl DriverFactory for MockFactory {
    type Driver = MockDriver;

    fn create(&self, host: &Arc<Host>, _profile: &PlatformProfile) -> MockDriver {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        MockDriver {
            host: host.clone(),
            script: self
                .scripts
                .get(&host.name)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
            stats: self.stats.clone(),
            connected: false,
            opened: false,
            privilege: SessionPrivilege::Normal,
        }
    }
}

pub(crate) struct MockDriver {
    host: Arc<Host>,
    script: MockScript,
    stats: Arc<MockStats>,
    connected: bool,
    opened: bool,
    privilege: SessionPrivilege,
}

impl MockDriver {
    async fn pause(&self) {
        if !self.script.latency.is_zero() {
            tokio::time::sleep(self.script.latency).await;
        }
    }
}

impl TransportDriver for MockDriver {
    async fn connect(&mut self) -> Result<()> {
        self.pause().await;
        if self.script.panic_on_connect {
            panic!("scripted panic for {}", self.host.name);
        }
        if self.script.fail_connect {
            return Err(TransportError::ConnectionFailed {
                host: self.host.hostname.clone(),
                port: self.host.port.unwrap_or(22),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }
            .into());
        }
        self.connected = true;
        self.opened = true;
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);
        Ok(())
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.pause().await;
        if self.script.fail_auth {
            return Err(TransportError::AuthenticationFailed {
                user: self.host.credentials.username.clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn escalate(&mut self) -> Result<()> {
        self.stats.escalations.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.script.fail_escalate {
            return Err(DriverError::PrivilegeAcquisitionFailed {
                target: "privilege_exec".to_string(),
            }
            .into());
        }
        self.privilege = SessionPrivilege::Privileged;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.stats.commands.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.script.lose_session_at.as_deref() == Some(command) {
            self.connected = false;
            return Err(ChannelError::Closed.into());
        }

        let prompt = format!("{}#", self.host.name);
        if self.script.rejected.contains(command) {
            let message = "% Invalid input detected at '^' marker.".to_string();
            return Ok(Response::new(command, &message, &message, prompt, self.script.latency)
                .with_failure(Some(message)));
        }

        let output = format!("{} output from {}", command, self.host.name);
        let raw = format!("{}\n{}\n{}", command, output, prompt);
        Ok(Response::new(command, output, raw, prompt, self.script.latency))
    }

    async fn close(&mut self) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        if self.opened {
            self.opened = false;
            self.stats.active.fetch_sub(1, Ordering::SeqCst);
        }
        self.connected = false;
        Ok(())
    }

    fn privilege(&self) -> SessionPrivilege {
        if self.connected {
            self.privilege
        } else {
            SessionPrivilege::Normal
        }
    }
}
