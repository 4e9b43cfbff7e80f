//! Inventory data model: hosts and their credentials.
//!
//! Loading the inventory file is left to the caller; anything that can
//! produce these types through `serde` works.

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

/// One device in the fleet.
///
/// Hosts are immutable for the duration of a run and shared as `Arc<Host>`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Host {
    /// Display name, also used for the transcript file name.
    pub name: String,

    /// Address to connect to.
    pub hostname: String,

    /// Port override; the transport default applies when absent.
    #[serde(default)]
    pub port: Option<u16>,

    /// Login and escalation credentials.
    #[serde(skip_serializing)]
    pub credentials: Credentials,

    /// Platform tag, e.g. `cisco_ios` or `cisco_ios_telnet`.
    pub platform: String,

    /// Groups in declaration order; the first with a catalog entry wins.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Per-host command override.
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Host {
    /// Create a host with the given credentials and no groups.
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        platform: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            port: None,
            credentials,
            platform: platform.into(),
            groups: vec![],
            commands: vec![],
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Append a group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Append a command to the per-host override.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.hostname)
    }
}

/// Opaque credential fields carried by a host.
///
/// Secrets are held as [`SecretString`] and print as `[REDACTED]`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Login username.
    pub username: String,

    /// Login password; also used as the key passphrase with `private_key`.
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,

    /// Private key for SSH public-key authentication.
    #[serde(default)]
    pub private_key: Option<PathBuf>,

    /// Secret for privilege escalation.
    #[serde(default, deserialize_with = "optional_secret")]
    pub enable_secret: Option<SecretString>,

    /// Username some platforms ask for during escalation.
    #[serde(default)]
    pub enable_username: Option<String>,
}

impl Credentials {
    /// Username and password credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            private_key: None,
            enable_secret: None,
            enable_username: None,
        }
    }

    /// Set the enable secret.
    pub fn with_enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the enable username.
    pub fn with_enable_username(mut self, username: impl Into<String>) -> Self {
        self.enable_username = Some(username.into());
        self
    }

    /// Authenticate with a private key instead of the password.
    pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key = Some(path.into());
        self
    }

    /// Username sent when escalation asks for one.
    pub fn escalation_username(&self) -> &str {
        self.enable_username.as_deref().unwrap_or(&self.username)
    }
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_deserialize_host() {
        let json = r#"{
            "name": "core-rtr-01",
            "hostname": "10.0.0.1",
            "platform": "cisco_ios",
            "groups": ["cisco", "core"],
            "credentials": {
                "username": "netops",
                "password": "hunter2",
                "enable_secret": "s3cret"
            }
        }"#;

        let host: Host = serde_json::from_str(json).unwrap();
        assert_eq!(host.name, "core-rtr-01");
        assert_eq!(host.port, None);
        assert_eq!(host.groups, vec!["cisco", "core"]);
        assert!(host.commands.is_empty());
        assert_eq!(host.credentials.password.expose_secret(), "hunter2");
        assert_eq!(
            host.credentials
                .enable_secret
                .as_ref()
                .map(|s| s.expose_secret()),
            Some("s3cret")
        );
        assert_eq!(host.credentials.escalation_username(), "netops");
    }

    #[test]
    fn test_secrets_are_redacted() {
        let credentials = Credentials::new("netops", "hunter2").with_enable_secret("s3cret");
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_serialize_skips_credentials() {
        let host = Host::new("sw1", "10.0.0.2", "arista_eos", Credentials::new("a", "b"))
            .with_group("arista");
        let json = serde_json::to_string(&host).unwrap();
        assert!(json.contains("\"name\":\"sw1\""));
        assert!(!json.contains("credentials"));
    }

    #[test]
    fn test_enable_username_override() {
        let credentials = Credentials::new("netops", "pw").with_enable_username("manager");
        assert_eq!(credentials.escalation_username(), "manager");
    }
}
