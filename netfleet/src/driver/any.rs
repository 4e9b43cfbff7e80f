//! Closed dispatch over the driver variants and the factory that picks one.

use std::sync::Arc;

use log::debug;

use super::ssh::{ShellDriver, StructuredDriver};
use super::telnet::TelnetDriver;
use super::{Response, SessionPrivilege, TransportDriver};
use crate::config::DriverOptions;
use crate::error::Result;
use crate::inventory::Host;
use crate::platform::{PlatformProfile, TransportKind};

/// Creates one driver per host.
///
/// The scheduler shares the factory across every host task.
pub trait DriverFactory: Send + Sync + 'static {
    /// Driver type produced.
    type Driver: TransportDriver + 'static;

    /// Create an unconnected driver for `host`.
    fn create(&self, host: &Arc<Host>, profile: &PlatformProfile) -> Self::Driver;
}

/// Factory choosing the driver variant from the profile's transport kind.
#[derive(Debug, Clone, Default)]
pub struct DefaultDriverFactory {
    options: DriverOptions,
}

impl DefaultDriverFactory {
    /// Create a factory with the given driver options.
    pub fn new(options: DriverOptions) -> Self {
        Self { options }
    }
}

impl DriverFactory for DefaultDriverFactory {
    type Driver = AnyDriver;

    fn create(&self, host: &Arc<Host>, profile: &PlatformProfile) -> AnyDriver {
        debug!("{}: {} driver for '{}'", host.name, profile.transport, profile.name);
        let (host, profile, options) = (host.clone(), profile.clone(), self.options.clone());
        match profile.transport {
            TransportKind::ShellSsh => AnyDriver::Shell(ShellDriver::new(host, profile, options)),
            TransportKind::ShellTelnet => {
                AnyDriver::Telnet(TelnetDriver::new(host, profile, options))
            }
            TransportKind::StructuredSsh => {
                AnyDriver::Structured(StructuredDriver::new(host, profile, options))
            }
        }
    }
}

/// Any of the built-in drivers.
pub enum AnyDriver {
    /// Interactive shell over SSH.
    Shell(ShellDriver),
    /// Interactive shell over Telnet.
    Telnet(TelnetDriver),
    /// Privilege-graph driver over SSH.
    Structured(StructuredDriver),
}

impl AnyDriver {
    /// Transport this driver runs over.
    pub fn transport(&self) -> TransportKind {
        match self {
            AnyDriver::Shell(_) => TransportKind::ShellSsh,
            AnyDriver::Telnet(_) => TransportKind::ShellTelnet,
            AnyDriver::Structured(_) => TransportKind::StructuredSsh,
        }
    }
}

impl TransportDriver for AnyDriver {
    async fn connect(&mut self) -> Result<()> {
        match self {
            AnyDriver::Shell(d) => d.connect().await,
            AnyDriver::Telnet(d) => d.connect().await,
            AnyDriver::Structured(d) => d.connect().await,
        }
    }

    async fn authenticate(&mut self) -> Result<()> {
        match self {
            AnyDriver::Shell(d) => d.authenticate().await,
            AnyDriver::Telnet(d) => d.authenticate().await,
            AnyDriver::Structured(d) => d.authenticate().await,
        }
    }

    async fn escalate(&mut self) -> Result<()> {
        match self {
            AnyDriver::Shell(d) => d.escalate().await,
            AnyDriver::Telnet(d) => d.escalate().await,
            AnyDriver::Structured(d) => d.escalate().await,
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        match self {
            AnyDriver::Shell(d) => d.send_command(command).await,
            AnyDriver::Telnet(d) => d.send_command(command).await,
            AnyDriver::Structured(d) => d.send_command(command).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            AnyDriver::Shell(d) => d.close().await,
            AnyDriver::Telnet(d) => d.close().await,
            AnyDriver::Structured(d) => d.close().await,
        }
    }

    fn privilege(&self) -> SessionPrivilege {
        match self {
            AnyDriver::Shell(d) => d.privilege(),
            AnyDriver::Telnet(d) => d.privilege(),
            AnyDriver::Structured(d) => d.privilege(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Credentials;
    use crate::platform::PlatformRegistry;

    #[test]
    fn test_factory_picks_variant() {
        let registry = PlatformRegistry::builtin();
        let factory = DefaultDriverFactory::default();

        let cases = [
            ("cisco_ios", TransportKind::ShellSsh),
            ("cisco_ios_telnet", TransportKind::ShellTelnet),
            ("juniper_junos", TransportKind::StructuredSsh),
            ("juniper_junos_telnet", TransportKind::ShellTelnet),
        ];
        for (platform, expected) in cases {
            let host = Arc::new(Host::new("h", "192.0.2.1", platform, Credentials::new("u", "p")));
            let profile = registry.resolve(platform).unwrap();
            assert_eq!(factory.create(&host, &profile).transport(), expected);
        }
    }
}
