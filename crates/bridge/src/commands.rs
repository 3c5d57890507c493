//! Typed request/response contracts for host commands. Wire names are the
//! snake_case command strings; argument and result objects are camelCase.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub trait Command: 'static {
    const NAME: &'static str;
    type Args: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;
}

/// Declares a unit struct implementing [`Command`].
macro_rules! command {
    ($ty:ident, $name:literal, $args:ty => $out:ty) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $ty;

        impl Command for $ty {
            const NAME: &'static str = $name;
            type Args = $args;
            type Output = $out;
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoArgs {}

// ---- ffmpeg ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FfmpegStatus {
    pub available: bool,
    pub version: Option<String>,
    pub is_bundled: bool,
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractFrameArgs {
    pub input_path: String,
    pub time_sec: f64,
    pub output_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateWaveformArgs {
    pub input_path: String,
    pub output_path: String,
    pub width: u32,
    pub height: u32,
}

command!(CheckFfmpeg, "check_ffmpeg", NoArgs => FfmpegStatus);
command!(ExtractFrame, "extract_frame", ExtractFrameArgs => ());
command!(GenerateWaveform, "generate_waveform", GenerateWaveformArgs => ());

// ---- AI providers and credentials ----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAi,
    #[default]
    Anthropic,
    Gemini,
    Local,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [Self::OpenAi, Self::Anthropic, Self::Gemini, Self::Local];

    pub fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Google Gemini",
            Self::Local => "Local (Ollama)",
        }
    }

    /// Credential backing this provider; local models need none.
    pub fn credential(self) -> Option<CredentialType> {
        match self {
            Self::OpenAi => Some(CredentialType::Openai),
            Self::Anthropic => Some(CredentialType::Anthropic),
            Self::Gemini => Some(CredentialType::Google),
            Self::Local => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    Openai,
    Anthropic,
    Google,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context_window: Option<u32>,
}

impl AiModelInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), description: None, context_window: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderArgs {
    pub provider: ProviderType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCredentialArgs {
    pub credential_type: CredentialType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialArgs {
    pub credential_type: CredentialType,
}

command!(GetAvailableAiModels, "get_available_ai_models", ProviderArgs => Vec<AiModelInfo>);
command!(GetCredentialStatus, "get_credential_status", NoArgs => BTreeMap<CredentialType, bool>);
command!(StoreCredential, "store_credential", StoreCredentialArgs => ());
command!(DeleteCredential, "delete_credential", CredentialArgs => ());

// ---- settings ----

/// Persisted AI settings as sent to `set_settings`. Clamping lives with the
/// settings panel; the wire type carries whatever the panel produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub primary_provider: ProviderType,
    pub primary_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub frame_extraction_rate: f32,
    pub per_request_limit_cents: u32,
    pub cache_duration_hours: u32,
    pub local_only_mode: bool,
}

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20251015";

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            primary_provider: ProviderType::Anthropic,
            primary_model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            frame_extraction_rate: 1.0,
            per_request_limit_cents: 50,
            cache_duration_hours: 24,
            local_only_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSettingsArgs {
    pub settings: AiSettings,
}

command!(SetSettings, "set_settings", SetSettingsArgs => ());

// ---- edit scripts ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditContext {
    pub project_name: Option<String>,
    pub timeline_duration: f64,
    pub asset_ids: Vec<String>,
    pub track_ids: Vec<String>,
    pub playhead_position: f64,
    pub selected_clips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommand {
    pub command_type: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditScript {
    pub intent: String,
    #[serde(default)]
    pub commands: Vec<EditCommand>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateEditScriptArgs {
    pub intent: String,
    pub context: EditContext,
}

command!(GenerateEditScript, "generate_edit_script", GenerateEditScriptArgs => EditScript);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_are_camel_case() {
        let args = ExtractFrameArgs { input_path: "a.mp4".into(), time_sec: 1.5, output_path: "f.png".into() };
        assert_eq!(
            serde_json::to_value(&args).unwrap(),
            json!({"inputPath": "a.mp4", "timeSec": 1.5, "outputPath": "f.png"})
        );
        let cred = StoreCredentialArgs { credential_type: CredentialType::Openai, value: "k".into() };
        assert_eq!(serde_json::to_value(&cred).unwrap(), json!({"credentialType": "openai", "value": "k"}));
    }

    #[test]
    fn provider_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ProviderType::OpenAi).unwrap(), json!("openai"));
        assert_eq!(serde_json::to_value(ProviderType::Anthropic).unwrap(), json!("anthropic"));
        let p: ProviderType = serde_json::from_value(json!("gemini")).unwrap();
        assert_eq!(p, ProviderType::Gemini);
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let s: AiSettings = serde_json::from_value(json!({"primaryProvider": "local"})).unwrap();
        assert_eq!(s.primary_provider, ProviderType::Local);
        assert_eq!(s.max_tokens, 4096);
        assert_eq!(s.primary_model, DEFAULT_MODEL);
    }

    #[test]
    fn credential_status_map_round_trips_as_object() {
        let v = json!({"openai": true, "anthropic": false});
        let m: BTreeMap<CredentialType, bool> = serde_json::from_value(v).unwrap();
        assert_eq!(m.get(&CredentialType::Openai), Some(&true));
        assert_eq!(m.get(&CredentialType::Google), None);
    }
}
