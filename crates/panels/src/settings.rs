use std::collections::BTreeMap;
use std::sync::Arc;

use bridge::commands::{
    AiModelInfo, AiSettings, CredentialArgs, CredentialType, DeleteCredential, GetAvailableAiModels,
    GetCredentialStatus, NoArgs, ProviderArgs, ProviderType, SetSettings, SetSettingsArgs, StoreCredential,
    StoreCredentialArgs, DEFAULT_MODEL,
};
use bridge::{Bridge, BridgeError, BridgeExt, Liveness, LivenessTicket};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info, warn};

use crate::{redact, validate_credential, PanelError};

const OPENAI_MODELS: &[&str] = &["gpt-5.2", "gpt-5.1", "gpt-5-mini", "gpt-4.1", "o3", "o4-mini"];
const ANTHROPIC_MODELS: &[&str] = &[
    "claude-opus-4-5-20251115",
    DEFAULT_MODEL,
    "claude-haiku-4-5-20251015",
    "claude-sonnet-4-20250514",
];
const GEMINI_MODELS: &[&str] = &["gemini-3-pro-preview", "gemini-3-flash-preview", "gemini-2.5-flash", "gemini-2.5-pro"];
const LOCAL_MODELS: &[&str] = &["llama3.2", "llama3.1", "mistral", "qwen2.5"];

pub fn default_model(provider: ProviderType) -> &'static str {
    match provider {
        ProviderType::OpenAi => "gpt-5.2",
        ProviderType::Anthropic => DEFAULT_MODEL,
        ProviderType::Gemini => "gemini-3-flash-preview",
        ProviderType::Local => "llama3.2",
    }
}

/// Built-in list shown when the host cannot report models.
pub fn fallback_models(provider: ProviderType) -> Vec<AiModelInfo> {
    let ids = match provider {
        ProviderType::OpenAi => OPENAI_MODELS,
        ProviderType::Anthropic => ANTHROPIC_MODELS,
        ProviderType::Gemini => GEMINI_MODELS,
        ProviderType::Local => LOCAL_MODELS,
    };
    ids.iter().map(|id| AiModelInfo::new(*id, *id)).collect()
}

/// Clamps every numeric field into its accepted range. Non-finite floats and
/// a zero token budget fall back to defaults.
pub fn normalize(settings: &AiSettings) -> AiSettings {
    let defaults = AiSettings::default();
    let mut out = settings.clone();
    out.temperature = if settings.temperature.is_finite() {
        settings.temperature.clamp(0.0, 1.0)
    } else {
        defaults.temperature
    };
    out.max_tokens = match settings.max_tokens {
        0 => defaults.max_tokens,
        n => n.clamp(256, 128_000),
    };
    out.frame_extraction_rate = if settings.frame_extraction_rate.is_finite() {
        settings.frame_extraction_rate.clamp(0.5, 2.0)
    } else {
        defaults.frame_extraction_rate
    };
    out.per_request_limit_cents = settings.per_request_limit_cents.max(1);
    out.cache_duration_hours = settings.cache_duration_hours.clamp(1, 168);
    out.primary_model = settings.primary_model.trim().to_string();
    if out.primary_model.is_empty() {
        out.primary_model = default_model(settings.primary_provider).to_string();
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModelListState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<AiModelInfo>),
    /// Host call failed; the built-in list is shown with the error inline.
    Fallback { models: Vec<AiModelInfo>, error: String },
}

impl ModelListState {
    pub fn models(&self) -> &[AiModelInfo] {
        match self {
            Self::Loaded(m) | Self::Fallback { models: m, .. } => m,
            Self::Idle | Self::Loading => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Fallback { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SettingsMsg {
    Models { ticket: LivenessTicket, provider: ProviderType, result: Result<Vec<AiModelInfo>, BridgeError> },
    Credentials(Result<BTreeMap<CredentialType, bool>, BridgeError>),
    CredentialStored { credential: CredentialType, result: Result<(), BridgeError> },
    CredentialDeleted { credential: CredentialType, result: Result<(), BridgeError> },
    Saved { settings: AiSettings, result: Result<(), BridgeError> },
}

pub type ErrorHook = Box<dyn FnMut(&PanelError) + Send>;

/// AI settings section: a draft of [`AiSettings`], the model list for the
/// selected provider, and credential management.
pub struct SettingsPanel {
    bridge: Arc<dyn Bridge>,
    pub draft: AiSettings,
    saved: AiSettings,
    models: ModelListState,
    credentials: BTreeMap<CredentialType, bool>,
    credential_error: Option<String>,
    save_error: Option<String>,
    saving: bool,
    model_requests: Liveness,
    on_error: Option<ErrorHook>,
}

impl SettingsPanel {
    pub fn new(bridge: Arc<dyn Bridge>, saved: AiSettings) -> Self {
        let saved = normalize(&saved);
        Self {
            bridge,
            draft: saved.clone(),
            saved,
            models: ModelListState::Idle,
            credentials: BTreeMap::new(),
            credential_error: None,
            save_error: None,
            saving: false,
            model_requests: Liveness::new(),
            on_error: None,
        }
    }

    pub fn with_on_error(mut self, hook: impl FnMut(&PanelError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn models(&self) -> &ModelListState { &self.models }
    pub fn credentials(&self) -> &BTreeMap<CredentialType, bool> { &self.credentials }
    pub fn has_credential(&self, credential: CredentialType) -> bool {
        self.credentials.get(&credential).copied().unwrap_or(false)
    }
    pub fn credential_error(&self) -> Option<&str> { self.credential_error.as_deref() }
    pub fn save_error(&self) -> Option<&str> { self.save_error.as_deref() }
    pub fn is_saving(&self) -> bool { self.saving }
    pub fn saved(&self) -> &AiSettings { &self.saved }
    pub fn is_dirty(&self) -> bool { self.draft != self.saved }

    /// Fetches models for the draft provider. Any earlier model request
    /// becomes stale.
    pub fn load_models(&mut self) -> BoxFuture<'static, SettingsMsg> {
        let ticket = self.model_requests.issue();
        let provider = self.draft.primary_provider;
        self.models = ModelListState::Loading;
        let call = self.bridge.call::<GetAvailableAiModels>(ProviderArgs { provider });
        async move { SettingsMsg::Models { ticket, provider, result: call.await } }.boxed()
    }

    /// Switches provider, resets the model to that provider's default and
    /// reloads the list. Returns `None` when the provider is unchanged.
    pub fn set_provider(&mut self, provider: ProviderType) -> Option<BoxFuture<'static, SettingsMsg>> {
        if provider == self.draft.primary_provider {
            return None;
        }
        self.model_requests.invalidate();
        self.draft.primary_provider = provider;
        self.draft.primary_model = default_model(provider).to_string();
        Some(self.load_models())
    }

    pub fn refresh_credentials(&mut self) -> BoxFuture<'static, SettingsMsg> {
        let call = self.bridge.call::<GetCredentialStatus>(NoArgs {});
        async move { SettingsMsg::Credentials(call.await) }.boxed()
    }

    /// Validates locally before anything leaves the panel.
    pub fn store_credential(
        &mut self,
        credential: CredentialType,
        value: String,
    ) -> Result<BoxFuture<'static, SettingsMsg>, PanelError> {
        if let Err(e) = validate_credential(&value) {
            self.credential_error = Some(e.to_string());
            self.report(&e);
            return Err(e);
        }
        info!(?credential, key = %redact(&value), "storing credential");
        self.credential_error = None;
        let call = self.bridge.call::<StoreCredential>(StoreCredentialArgs { credential_type: credential, value });
        Ok(async move { SettingsMsg::CredentialStored { credential, result: call.await } }.boxed())
    }

    pub fn delete_credential(&mut self, credential: CredentialType) -> BoxFuture<'static, SettingsMsg> {
        self.credential_error = None;
        let call = self.bridge.call::<DeleteCredential>(CredentialArgs { credential_type: credential });
        async move { SettingsMsg::CredentialDeleted { credential, result: call.await } }.boxed()
    }

    /// Normalizes the draft and sends it to the host.
    pub fn save(&mut self) -> BoxFuture<'static, SettingsMsg> {
        let settings = normalize(&self.draft);
        self.draft = settings.clone();
        self.saving = true;
        self.save_error = None;
        let call = self.bridge.call::<SetSettings>(SetSettingsArgs { settings: settings.clone() });
        async move { SettingsMsg::Saved { settings, result: call.await } }.boxed()
    }

    /// Drop any in-flight model list; called when the panel closes.
    pub fn unmount(&self) {
        self.model_requests.invalidate();
    }

    pub fn update(&mut self, msg: SettingsMsg) {
        match msg {
            SettingsMsg::Models { ticket, provider, result } => {
                if !self.model_requests.is_live(ticket) || provider != self.draft.primary_provider {
                    debug!(?provider, "stale model list ignored");
                    return;
                }
                self.models = match result {
                    Ok(models) if !models.is_empty() => ModelListState::Loaded(models),
                    Ok(_) => ModelListState::Fallback {
                        models: fallback_models(provider),
                        error: "no models reported".to_string(),
                    },
                    Err(e) => {
                        warn!(?provider, error = %e, "model list unavailable, using built-in list");
                        ModelListState::Fallback { models: fallback_models(provider), error: e.to_string() }
                    }
                };
            }
            SettingsMsg::Credentials(result) => match result {
                Ok(map) => {
                    self.credentials = map;
                    self.credential_error = None;
                }
                Err(e) => {
                    warn!(error = %e, "credential status unavailable");
                    self.credential_error = Some(e.to_string());
                }
            },
            SettingsMsg::CredentialStored { credential, result } => {
                self.apply_credential(credential, true, result)
            }
            SettingsMsg::CredentialDeleted { credential, result } => {
                self.apply_credential(credential, false, result)
            }
            SettingsMsg::Saved { settings, result } => {
                self.saving = false;
                match result {
                    Ok(()) => {
                        info!("settings saved");
                        self.saved = settings;
                    }
                    Err(e) => {
                        warn!(error = %e, "saving settings failed");
                        self.save_error = Some(e.to_string());
                        self.report(&PanelError::Bridge(e));
                    }
                }
            }
        }
    }

    fn apply_credential(&mut self, credential: CredentialType, present: bool, result: Result<(), BridgeError>) {
        match result {
            Ok(()) => {
                self.credentials.insert(credential, present);
            }
            Err(e) => {
                warn!(?credential, error = %e, "credential update failed");
                self.credential_error = Some(e.to_string());
                self.report(&PanelError::Bridge(e));
            }
        }
    }

    fn report(&mut self, err: &PanelError) {
        if let Some(hook) = self.on_error.as_mut() {
            hook(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::CommandRouter;
    use parking_lot::Mutex;

    fn router() -> CommandRouter {
        let r = CommandRouter::new();
        r.register::<GetAvailableAiModels, _, _>(|args: ProviderArgs| async move {
            match args.provider {
                ProviderType::Gemini => Err(BridgeError::Rejected("no key".into())),
                p => Ok(vec![AiModelInfo::new(default_model(p), "Default")]),
            }
        });
        r.register::<SetSettings, _, _>(|args: SetSettingsArgs| async move {
            if args.settings.local_only_mode {
                Err(BridgeError::Rejected("disk full".into()))
            } else {
                Ok(())
            }
        });
        r.register::<StoreCredential, _, _>(|_: StoreCredentialArgs| async { Ok(()) });
        r
    }

    #[test]
    fn normalize_clamps() {
        let raw = AiSettings {
            temperature: f32::NAN,
            max_tokens: 0,
            frame_extraction_rate: 9.0,
            per_request_limit_cents: 0,
            cache_duration_hours: 1000,
            primary_model: "  ".into(),
            primary_provider: ProviderType::Local,
            ..AiSettings::default()
        };
        let n = normalize(&raw);
        assert_eq!(n.temperature, 0.3);
        assert_eq!(n.max_tokens, 4096);
        assert_eq!(n.frame_extraction_rate, 2.0);
        assert_eq!(n.per_request_limit_cents, 1);
        assert_eq!(n.cache_duration_hours, 168);
        assert_eq!(n.primary_model, "llama3.2");
        assert_eq!(normalize(&AiSettings { max_tokens: 10, ..AiSettings::default() }).max_tokens, 256);
    }

    #[tokio::test]
    async fn provider_change_discards_older_model_list() {
        let mut panel = SettingsPanel::new(Arc::new(router()), AiSettings::default());
        let first = panel.load_models();
        let second = panel.set_provider(ProviderType::OpenAi).unwrap();
        assert_eq!(panel.draft.primary_model, "gpt-5.2");

        let (a, b) = (first.await, second.await);
        panel.update(a);
        assert_eq!(panel.models(), &ModelListState::Loading);
        panel.update(b);
        assert_eq!(panel.models().models()[0].id, "gpt-5.2");
    }

    #[tokio::test]
    async fn failed_model_list_falls_back() {
        let mut panel = SettingsPanel::new(Arc::new(router()), AiSettings::default());
        let fut = panel.set_provider(ProviderType::Gemini).unwrap();
        panel.update(fut.await);
        assert_eq!(panel.models().error(), Some("no key"));
        assert_eq!(panel.models().models().len(), GEMINI_MODELS.len());
    }

    #[tokio::test]
    async fn unmount_drops_in_flight_list() {
        let mut panel = SettingsPanel::new(Arc::new(router()), AiSettings::default());
        let fut = panel.load_models();
        panel.unmount();
        panel.update(fut.await);
        assert_eq!(panel.models(), &ModelListState::Loading);
    }

    #[tokio::test]
    async fn empty_key_never_reaches_host() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let mut panel = SettingsPanel::new(Arc::new(router()), AiSettings::default())
            .with_on_error(move |e| sink.lock().push(e.clone()));
        assert!(panel.store_credential(CredentialType::Openai, String::new()).is_err());
        assert_eq!(panel.credential_error(), Some("API key is empty"));
        assert_eq!(errors.lock().as_slice(), &[PanelError::EmptyCredential]);

        let fut = panel.store_credential(CredentialType::Openai, "sk-1234567890abcdef".into()).unwrap();
        panel.update(fut.await);
        assert!(panel.has_credential(CredentialType::Openai));
        assert_eq!(panel.credential_error(), None);
    }

    #[tokio::test]
    async fn save_rejection_is_inline_and_hooked() {
        let hits = Arc::new(Mutex::new(0));
        let sink = hits.clone();
        let mut panel = SettingsPanel::new(Arc::new(router()), AiSettings::default())
            .with_on_error(move |_| *sink.lock() += 1);
        panel.draft.local_only_mode = true;
        panel.draft.temperature = 4.0;
        let fut = panel.save();
        assert!(panel.is_saving());
        assert_eq!(panel.draft.temperature, 1.0);
        panel.update(fut.await);
        assert!(!panel.is_saving());
        assert_eq!(panel.save_error(), Some("disk full"));
        assert_eq!(*hits.lock(), 1);
        assert!(panel.is_dirty());

        panel.draft.local_only_mode = false;
        let fut = panel.save();
        panel.update(fut.await);
        assert_eq!(panel.save_error(), None);
        assert!(!panel.is_dirty());
    }
}
