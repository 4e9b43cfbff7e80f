//! Run configuration for the fleet scheduler and the drivers it creates.

use std::path::PathBuf;
use std::time::Duration;

use crate::transport::HostKeyVerification;

/// Options shared by every driver in a run.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Default SSH port when the host has none.
    pub ssh_port: u16,

    /// Default Telnet port when the host has none.
    pub telnet_port: u16,

    /// Timeout for TCP connect and the SSH handshake.
    pub connect_timeout: Duration,

    /// Timeout for a single prompt wait.
    pub command_timeout: Duration,

    /// PTY width override; the platform's width applies when `None`.
    pub terminal_width: Option<u32>,

    /// PTY height override; the platform's height applies when `None`.
    pub terminal_height: Option<u32>,

    /// How many trailing bytes are searched for a prompt.
    pub search_depth: usize,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; `~/.ssh/known_hosts` when `None`.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            ssh_port: 22,
            telnet_port: 23,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            terminal_width: None,
            terminal_height: None,
            search_depth: 1000,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

impl DriverOptions {
    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-command timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the terminal size for every platform.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = Some(width);
        self.terminal_height = Some(height);
        self
    }

    /// Set the host key verification mode.
    pub fn with_host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn with_known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }
}

/// Fleet-wide run configuration.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Maximum number of hosts in flight at once.
    pub workers: usize,

    /// Wall-clock budget for the whole run; unbounded when `None`.
    pub deadline: Option<Duration>,

    /// Upper bound on closing a session after the deadline fired.
    pub close_timeout: Duration,

    /// Options handed to the default driver factory.
    pub driver: DriverOptions,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            deadline: None,
            close_timeout: Duration::from_secs(5),
            driver: DriverOptions::default(),
        }
    }
}

impl FleetConfig {
    /// Set the worker pool width. Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the run deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the close timeout.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set the driver options.
    pub fn with_driver_options(mut self, options: DriverOptions) -> Self {
        self.driver = options;
        self
    }
}
