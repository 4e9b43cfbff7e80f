//! Prompt-driven session shared by every driver variant.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::SessionPrivilege;
use super::privilege::PrivilegeManager;
use super::response::Response;
use crate::channel::{PtyChannel, PtyConfig, combine_patterns};
use crate::error::{ChannelError, DriverError, Error, Result};
use crate::inventory::Credentials;
use crate::platform::{DefaultBehavior, Escalation, PlatformDefinition, VendorBehavior};
use crate::transport::ShellStream;

/// An open shell plus everything needed to read prompts on it.
pub(crate) struct ShellSession<S> {
    channel: PtyChannel<S>,
    definition: Arc<PlatformDefinition>,
    behavior: Arc<dyn VendorBehavior>,
    privileges: PrivilegeManager,
    prompt: Regex,
    escalated: bool,
}

impl<S: ShellStream> ShellSession<S> {
    /// Wrap an open stream.
    pub(crate) fn new(
        stream: S,
        definition: Arc<PlatformDefinition>,
        config: PtyConfig,
    ) -> Result<Self> {
        let prompt = combine_patterns(
            definition
                .privilege_levels
                .values()
                .map(|level| &level.pattern),
        )
        .map_err(ChannelError::from)?;

        let behavior = definition
            .behavior
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultBehavior));

        Ok(Self {
            channel: PtyChannel::new(stream, config),
            privileges: PrivilegeManager::new(definition.privilege_levels.clone()),
            definition,
            behavior,
            prompt,
            escalated: false,
        })
    }

    pub(crate) fn definition(&self) -> &PlatformDefinition {
        &self.definition
    }

    /// Name of the level the last prompt belonged to.
    pub(crate) fn current_level(&self) -> Option<&str> {
        self.privileges.current().map(|level| level.name.as_str())
    }

    pub(crate) fn privilege(&self) -> SessionPrivilege {
        let elevated = self
            .privileges
            .current()
            .is_some_and(|level| !level.is_root());
        if self.escalated || elevated {
            SessionPrivilege::Privileged
        } else {
            SessionPrivilege::Normal
        }
    }

    /// Wait for the first prompt, nudging the device once with a newline.
    pub(crate) async fn wait_for_prompt(&mut self) -> Result<String> {
        let timeout = self.channel.timeout();
        let data = match self.channel.read_until(&self.prompt, timeout).await {
            Ok(data) => data,
            Err(Error::Channel(ChannelError::PatternTimeout(_))) => {
                debug!("no prompt yet, sending a newline");
                self.channel.send_line("").await?;
                self.channel.read_until(&self.prompt, timeout).await?
            }
            Err(e) => return Err(e),
        };
        Ok(self.track_prompt(&data))
    }

    /// Like [`wait_for_prompt`](Self::wait_for_prompt), but the prompt must
    /// belong to a known privilege level.
    pub(crate) async fn wait_for_known_prompt(&mut self) -> Result<String> {
        let prompt = self.wait_for_prompt().await?;
        self.privileges.update_from_prompt(&prompt)?;
        Ok(prompt)
    }

    /// Send the platform's on-open commands. Their output is discarded.
    pub(crate) async fn run_on_open(&mut self) -> Result<()> {
        let definition = self.definition.clone();
        for command in &definition.on_open_commands {
            let response = self.send_command(command).await?;
            if !response.is_success() {
                debug!("on-open command '{}' was rejected", command);
            }
        }
        Ok(())
    }

    /// Extract the trailing prompt and update the current privilege level.
    fn track_prompt(&mut self, data: &[u8]) -> String {
        let prompt = self
            .prompt
            .find_iter(data)
            .last()
            .map(|m| String::from_utf8_lossy(&data[m.start()..]).trim().to_string())
            .unwrap_or_default();

        if let Ok(level) = self.privileges.update_from_prompt(&prompt) {
            trace!("prompt '{}' is level '{}'", prompt, level.name);
        }
        prompt
    }

    async fn exchange(&mut self, command: &str) -> Result<(Vec<u8>, String, Instant)> {
        let start = Instant::now();
        self.channel.clear_buffer();
        self.channel.send_line(command).await?;
        let timeout = self.channel.timeout();
        let data = self.channel.read_until(&self.prompt, timeout).await?;
        let prompt = self.track_prompt(&data);
        Ok((data, prompt, start))
    }

    fn failure(&self, output: &str) -> Option<String> {
        self.definition
            .detect_failure(output)
            .map(str::to_string)
            .or_else(|| self.behavior.detect_failure(output))
    }

    /// Send a command and strip the echo and prompt heuristically.
    pub(crate) async fn send_command(&mut self, command: &str) -> Result<Response> {
        let (data, prompt, start) = self.exchange(command).await?;
        let raw = String::from_utf8_lossy(&data).into_owned();

        let normalized = self.behavior.normalize_output(&raw, command);
        let result = self.behavior.post_process_output(&normalized);
        let failure = self.failure(&result);

        Ok(Response::new(command, result, raw, prompt, start.elapsed()).with_failure(failure))
    }

    /// Send a command and cut the output exactly at the prompt offset.
    ///
    /// The prompt must belong to a known privilege level, otherwise the
    /// output cannot be trusted and an error is returned.
    pub(crate) async fn send_command_strict(&mut self, command: &str) -> Result<Response> {
        let (data, prompt, start) = self.exchange(command).await?;
        self.privileges.update_from_prompt(&prompt)?;

        let prompt_start = self
            .prompt
            .find_iter(&data)
            .last()
            .map(|m| m.start())
            .ok_or_else(|| DriverError::UnexpectedResponse {
                message: format!("no prompt after '{}'", command),
            })?;

        let raw = String::from_utf8_lossy(&data).into_owned();
        let body = String::from_utf8_lossy(&data[..prompt_start]).replace("\r\n", "\n");

        // First line is the echo whenever the device echoes at all
        let body = match body.split_once('\n') {
            Some((first, rest)) if first.trim_end().ends_with(command.trim()) => rest,
            None if body.trim_end().ends_with(command.trim()) => "",
            _ => body.as_str(),
        };
        let result = self
            .behavior
            .post_process_output(body)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        let failure = self.failure(&result);

        Ok(Response::new(command, result, raw, prompt, start.elapsed()).with_failure(failure))
    }

    /// Send `command` and answer secret and username prompts until the
    /// device shows a regular prompt again.
    ///
    /// Returns everything the device printed during the dialog. A second
    /// request for the same answer means the device rejected it.
    pub(crate) async fn answer_dialog(
        &mut self,
        command: &str,
        secret: Option<&SecretString>,
        username: Option<&str>,
    ) -> Result<String> {
        let target = self.definition.default_privilege.clone();
        let timeout = self.channel.timeout();
        let mut transcript = String::new();
        let mut sent_secret = false;
        let mut sent_username = false;

        self.channel.clear_buffer();
        self.channel.send_line(command).await?;

        loop {
            let (index, data) = self
                .channel
                .read_until_any(
                    &[
                        &self.definition.password_prompt,
                        &self.definition.username_prompt,
                        &self.prompt,
                    ],
                    timeout,
                )
                .await?;
            transcript.push_str(&String::from_utf8_lossy(&data));

            match index {
                0 if !sent_secret => {
                    let secret = secret.ok_or(DriverError::MissingEscalationCredential {
                        what: "an enable secret",
                    })?;
                    self.channel.send_hidden(secret.expose_secret()).await?;
                    sent_secret = true;
                }
                1 if !sent_username => {
                    let username = username.ok_or(DriverError::MissingEscalationCredential {
                        what: "an enable username",
                    })?;
                    self.channel.send_line(username).await?;
                    sent_username = true;
                }
                2 => {
                    self.track_prompt(&data);
                    return Ok(transcript);
                }
                _ => {
                    debug!("'{}' asked for the same credential twice", command);
                    return Err(DriverError::PrivilegeAcquisitionFailed { target }.into());
                }
            }
        }
    }

    /// Answer an interactive login dialog (Telnet).
    pub(crate) async fn login(&mut self, username: &str, password: &SecretString) -> Result<()> {
        let timeout = self.channel.timeout();
        let mut sent_username = false;
        let mut sent_password = false;
        let rejected = || DriverError::LoginRejected {
            user: username.to_string(),
        };

        loop {
            let (index, data) = self
                .channel
                .read_until_any(
                    &[
                        &self.definition.username_prompt,
                        &self.definition.password_prompt,
                        &self.prompt,
                    ],
                    timeout,
                )
                .await?;

            match index {
                0 if !sent_username => {
                    self.channel.send_line(username).await?;
                    sent_username = true;
                }
                1 if !sent_password => {
                    self.channel.send_hidden(password.expose_secret()).await?;
                    sent_password = true;
                }
                2 => {
                    let text = String::from_utf8_lossy(&data);
                    if self.definition.detect_failure(&text).is_some() {
                        return Err(rejected().into());
                    }
                    self.track_prompt(&data);
                    debug!("logged in as {}", username);
                    return Ok(());
                }
                _ => return Err(rejected().into()),
            }
        }
    }

    /// Raise the session to the platform's working level according to
    /// `policy`, using the escalation fields of `credentials`.
    pub(crate) async fn escalate(
        &mut self,
        policy: Escalation,
        credentials: &Credentials,
    ) -> Result<()> {
        let missing_secret = DriverError::MissingEscalationCredential {
            what: "an enable secret",
        };

        let transcript = match policy {
            Escalation::None => return Ok(()),
            Escalation::SecretOnly | Escalation::SecretPlusUsername => {
                if self.privilege() == SessionPrivilege::Privileged {
                    debug!("already privileged, skipping escalation");
                    self.escalated = true;
                    return Ok(());
                }
                let secret = credentials.enable_secret.as_ref().ok_or(missing_secret)?;

                let command = self
                    .definition
                    .get_privilege(&self.definition.default_privilege)
                    .and_then(|level| level.escalate_command.clone())
                    .unwrap_or_else(|| "enable".to_string());
                let username = (policy == Escalation::SecretPlusUsername)
                    .then(|| credentials.escalation_username());

                self.answer_dialog(&command, Some(secret), username).await?
            }
            Escalation::SequenceCommand => {
                let definition = self.definition.clone();
                let mut transcript = String::new();
                for command in &definition.escalate_commands {
                    let output = self
                        .answer_dialog(command, credentials.enable_secret.as_ref(), None)
                        .await?;
                    transcript.push_str(&output);
                }
                transcript
            }
        };

        self.confirm_escalated(&transcript)
    }

    /// Check that an escalation dialog left the session privileged.
    ///
    /// Platforms whose privileged level has its own prompt must show it;
    /// others are judged by the failure patterns in the dialog output.
    pub(crate) fn confirm_escalated(&mut self, transcript: &str) -> Result<()> {
        let target = self.definition.default_privilege.clone();
        if let Some(message) = self.failure(transcript) {
            debug!("escalation to '{}' rejected: {}", target, message);
            return Err(DriverError::PrivilegeAcquisitionFailed { target }.into());
        }

        let needs_prompt = self
            .definition
            .get_privilege(&target)
            .is_some_and(|level| !level.is_root());
        if needs_prompt && self.current_level() != Some(target.as_str()) {
            return Err(DriverError::PrivilegeAcquisitionFailed { target }.into());
        }

        self.escalated = true;
        Ok(())
    }

    /// Walk the privilege graph to `target`, answering secret prompts.
    pub(crate) async fn acquire_privilege(
        &mut self,
        target: &str,
        secret: Option<&SecretString>,
    ) -> Result<()> {
        let current = self
            .current_level()
            .map(str::to_string)
            .ok_or(DriverError::NotAuthenticated)?;
        if current == target {
            return Ok(());
        }

        let path = self.privileges.find_path(&current, target)?;
        for hop in path.windows(2) {
            let (from, to) = (&hop[0], &hop[1]);
            let transition = self.privileges.get_transition(from, to).ok_or_else(|| {
                DriverError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                }
            })?;
            debug!("privilege {} -> {} via '{}'", from, to, transition.command);

            let timeout = self.channel.timeout();
            self.channel.clear_buffer();
            self.channel.send_line(&transition.command).await?;

            if let Some(auth_prompt) = &transition.auth_prompt {
                let (index, data) = self
                    .channel
                    .read_until_any(&[auth_prompt, &self.prompt], timeout)
                    .await?;
                if index == 0 {
                    let secret = secret.ok_or(DriverError::MissingEscalationCredential {
                        what: "an enable secret",
                    })?;
                    self.channel.send_hidden(secret.expose_secret()).await?;
                    let data = self.channel.read_until(&self.prompt, timeout).await?;
                    self.track_prompt(&data);
                } else {
                    self.track_prompt(&data);
                }
            } else {
                let data = self.channel.read_until(&self.prompt, timeout).await?;
                self.track_prompt(&data);
            }

            if self.current_level() != Some(to.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: to.clone() }.into());
            }
        }

        self.escalated = true;
        Ok(())
    }

    /// Close the shell and the connection under it.
    pub(crate) async fn close(self) -> Result<()> {
        self.channel.close().await
    }
}
