//! Side panels that talk to the host through [`bridge::Bridge`].
//!
//! Each panel is a plain state struct. Actions that need the host return a
//! future resolving to a message; the caller runs it wherever it likes and
//! feeds the message back through `update`. Messages carry a
//! [`bridge::LivenessTicket`] where a newer action can supersede them, and
//! stale ones are dropped on arrival.

use bridge::BridgeError;
use thiserror::Error;

pub mod assistant;
pub mod ffmpeg;
pub mod settings;

pub use assistant::{AssistantMsg, AssistantPanel, ChatEntry, ChatRole};
pub use ffmpeg::{FfmpegMsg, FfmpegPanel, FfmpegState};
pub use settings::{ModelListState, SettingsMsg, SettingsPanel};

pub const MAX_CREDENTIAL_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PanelError {
    #[error("API key is empty")]
    EmptyCredential,
    #[error("API key is too long ({0} bytes)")]
    CredentialTooLong(usize),
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("a request is already in progress")]
    Busy,
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Rejects keys the host would refuse anyway.
pub fn validate_credential(value: &str) -> Result<(), PanelError> {
    if value.trim().is_empty() {
        return Err(PanelError::EmptyCredential);
    }
    if value.len() > MAX_CREDENTIAL_LEN {
        return Err(PanelError::CredentialTooLong(value.len()));
    }
    Ok(())
}

/// Log-safe preview of a secret: `abcd...wxyz` for long values, all
/// asterisks otherwise.
pub fn redact(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction() {
        assert_eq!(redact("sk-1234567890abcdef"), "sk-1...cdef");
        assert_eq!(redact("short"), "*****");
        assert_eq!(redact("12345678"), "********");
        assert_eq!(redact("123456789012"), "1234...9012");
    }

    #[test]
    fn credential_validation() {
        assert_eq!(validate_credential(""), Err(PanelError::EmptyCredential));
        assert_eq!(validate_credential("   "), Err(PanelError::EmptyCredential));
        assert_eq!(validate_credential(&"x".repeat(1025)), Err(PanelError::CredentialTooLong(1025)));
        assert!(validate_credential("sk-ant-abc").is_ok());
    }
}
