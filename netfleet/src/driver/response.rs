//! Response type for command execution results.

use std::fmt;
use std::time::Duration;

/// Output of one command as the driver saw it.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Normalized output: command echo and trailing prompt removed.
    pub result: String,

    /// Output before normalization.
    pub raw_result: String,

    /// The prompt that ended the output.
    pub prompt: String,

    /// Time from sending the command to seeing the prompt.
    pub elapsed: Duration,

    /// Failure text the device printed, if it rejected the command.
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a successful response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Mark the response as failed with the device's message.
    pub fn with_failure(mut self, message: Option<String>) -> Self {
        self.failure_message = message;
        self
    }

    /// Check if the device accepted the command.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}
