//! # Netfleet
//!
//! Async command runner for fleets of network devices.
//!
//! Netfleet logs into many devices at once over SSH or Telnet, raises
//! privileges where the platform needs it, runs a list of show commands on
//! each, and reports one result per device, with a plain-text transcript
//! per device if wanted.
//!
//! ## Features
//!
//! - Async SSH connections via russh, Telnet over a plain TCP stream
//! - Multi-vendor support (Cisco IOS/XE/ASA/NX-OS/XR, Arista, Juniper,
//!   Nokia, HP ProCurve, Huawei, Linux)
//! - Efficient pattern buffer matching (tail search over the read buffer)
//! - Privilege level management with graph-based navigation
//! - Bounded concurrency and a deadline for the whole run
//! - Failures isolated per device and per command
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use netfleet::{CommandCatalog, Credentials, FleetConfig, FleetScheduler, Host};
//!
//! #[tokio::main]
//! async fn main() {
//!     let hosts = vec![Arc::new(
//!         Host::new("R1", "192.168.1.1", "cisco", Credentials::new("admin", "secret"))
//!             .with_group("cisco"),
//!     )];
//!     let catalog = CommandCatalog::new().with("cisco", ["show version"]);
//!
//!     let config = FleetConfig::default()
//!         .with_workers(50)
//!         .with_deadline(Duration::from_secs(300));
//!     let report = FleetScheduler::new(config)
//!         .run(hosts, Arc::new(catalog))
//!         .await;
//!
//!     for result in &report.results {
//!         println!("{}: {}", result.host, result.stage);
//!     }
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod fleet;
pub mod inventory;
pub mod pipeline;
pub mod platform;
pub mod resolver;
pub mod transcript;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use config::{DriverOptions, FleetConfig};
pub use driver::{
    AnyDriver, DefaultDriverFactory, DriverFactory, Response, SessionPrivilege, TransportDriver,
};
pub use error::{Error, ErrorKind, Result};
pub use fleet::{FleetReport, FleetScheduler, RunSummary};
pub use inventory::{Credentials, Host};
pub use pipeline::{CommandOutcome, HostResult, SessionPipeline, Stage};
pub use platform::{
    Escalation, PlatformDefinition, PlatformProfile, PlatformRegistry, PrivilegeLevel,
    TransportKind,
};
pub use resolver::{CommandCatalog, CommandResolver, CommandSet};
pub use transcript::TranscriptWriter;
pub use transport::HostKeyVerification;
