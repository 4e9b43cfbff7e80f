//! Built-in vendor platform definitions.
//!
//! Each module exposes constructor functions returning a
//! [`PlatformDefinition`](crate::platform::PlatformDefinition); the
//! registry table wires them to platform tags.

pub mod arista;
pub mod cisco;
pub mod hp_procurve;
pub mod huawei_vrp;
pub mod juniper;
pub mod linux;
pub mod nokia_sros;
