//! Native side of the bridge: command handlers registered on a
//! [`CommandRouter`] plus the synchronous extractor the preview workers use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use bridge::commands::{
    CheckFfmpeg, CredentialArgs, CredentialType, DeleteCredential, ExtractFrame, ExtractFrameArgs, FfmpegStatus,
    GenerateEditScript, GenerateEditScriptArgs, GenerateWaveform, GenerateWaveformArgs, GetAvailableAiModels,
    GetCredentialStatus, NoArgs, ProviderArgs, SetSettings, SetSettingsArgs, StoreCredential, StoreCredentialArgs,
};
use bridge::{BridgeError, CommandRouter};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::jobs_crate::{JobError, PreviewKind, PreviewOutput, PreviewRequest};

pub(crate) fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(std::env::temp_dir).join("timeline-editor")
}

pub(crate) fn config_dir() -> PathBuf { app_dir(dirs::config_dir()) }

pub(crate) fn cache_dir() -> PathBuf { app_dir(dirs::cache_dir()) }

/// ffmpeg/ffprobe as found on PATH.
pub(crate) fn locate_ffmpeg() -> (Option<PathBuf>, Option<PathBuf>) {
    (which::which("ffmpeg").ok(), which::which("ffprobe").ok())
}

fn ffmpeg_or_reject() -> Result<PathBuf, BridgeError> {
    locate_ffmpeg().0.ok_or_else(|| BridgeError::Rejected("ffmpeg not found on PATH".into()))
}

async fn run_ffmpeg(bin: PathBuf, args: Vec<String>) -> Result<(), BridgeError> {
    tracing::debug!(?bin, ?args, "spawning ffmpeg");
    let out = tokio::process::Command::new(&bin)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| BridgeError::Rejected(format!("failed to run ffmpeg: {e}")))?;
    if out.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&out.stderr);
        let last = stderr.lines().last().unwrap_or("ffmpeg failed").to_string();
        Err(BridgeError::Rejected(last))
    }
}

fn frame_args(input: &str, time_sec: f64, output: &str) -> Vec<String> {
    vec![
        "-hide_banner".into(), "-loglevel".into(), "error".into(),
        "-ss".into(), format!("{:.3}", time_sec.max(0.0)),
        "-i".into(), input.into(),
        "-frames:v".into(), "1".into(),
        "-vf".into(), "scale=192:-2".into(),
        "-y".into(), output.into(),
    ]
}

fn waveform_args(input: &str, width: u32, height: u32, output: &str) -> Vec<String> {
    vec![
        "-hide_banner".into(), "-loglevel".into(), "error".into(),
        "-i".into(), input.into(),
        "-filter_complex".into(), format!("showwavespic=s={}x{}:colors=0x78b4f0", width.max(1), height.max(1)),
        "-frames:v".into(), "1".into(),
        "-y".into(), output.into(),
    ]
}

fn credentials_from_env() -> BTreeMap<CredentialType, String> {
    [
        (CredentialType::Openai, "OPENAI_API_KEY"),
        (CredentialType::Anthropic, "ANTHROPIC_API_KEY"),
        (CredentialType::Google, "GOOGLE_API_KEY"),
    ]
    .into_iter()
    .filter_map(|(ty, var)| std::env::var(var).ok().filter(|v| !v.is_empty()).map(|v| (ty, v)))
    .collect()
}

/// Registers every host command. Credentials live in memory for the session.
pub(crate) fn router() -> CommandRouter {
    let router = CommandRouter::new();
    let vault: Arc<Mutex<BTreeMap<CredentialType, String>>> = Arc::new(Mutex::new(credentials_from_env()));

    router.register::<CheckFfmpeg, _, _>(|_: NoArgs| async {
        let (ffmpeg, ffprobe) = locate_ffmpeg();
        let version = match &ffmpeg {
            Some(bin) => tokio::process::Command::new(bin)
                .arg("-version")
                .output()
                .await
                .ok()
                .and_then(|o| String::from_utf8_lossy(&o.stdout).lines().next().map(str::to_string)),
            None => None,
        };
        Ok(FfmpegStatus {
            available: ffmpeg.is_some(),
            version,
            is_bundled: false,
            ffmpeg_path: ffmpeg.map(|p| p.display().to_string()),
            ffprobe_path: ffprobe.map(|p| p.display().to_string()),
        })
    });

    router.register::<ExtractFrame, _, _>(|args: ExtractFrameArgs| async move {
        let bin = ffmpeg_or_reject()?;
        run_ffmpeg(bin, frame_args(&args.input_path, args.time_sec, &args.output_path)).await
    });

    router.register::<GenerateWaveform, _, _>(|args: GenerateWaveformArgs| async move {
        let bin = ffmpeg_or_reject()?;
        run_ffmpeg(bin, waveform_args(&args.input_path, args.width, args.height, &args.output_path)).await
    });

    let v = vault.clone();
    router.register::<GetCredentialStatus, _, _>(move |_: NoArgs| {
        let status: BTreeMap<CredentialType, bool> = [
            CredentialType::Openai,
            CredentialType::Anthropic,
            CredentialType::Google,
            CredentialType::Custom,
        ]
        .into_iter()
        .map(|ty| (ty, v.lock().contains_key(&ty)))
        .collect();
        async move { Ok(status) }
    });

    let v = vault.clone();
    router.register::<StoreCredential, _, _>(move |args: StoreCredentialArgs| {
        let result = panels_crate::validate_credential(&args.value)
            .map_err(|e| BridgeError::Rejected(e.to_string()))
            .map(|()| {
                v.lock().insert(args.credential_type, args.value);
            });
        async move { result }
    });

    let v = vault.clone();
    router.register::<DeleteCredential, _, _>(move |args: CredentialArgs| {
        v.lock().remove(&args.credential_type);
        async { Ok(()) }
    });

    let v = vault;
    router.register::<GetAvailableAiModels, _, _>(move |args: ProviderArgs| {
        let missing = args.provider.credential().filter(|ty| !v.lock().contains_key(ty));
        async move {
            match missing {
                Some(ty) => Err(BridgeError::Rejected(format!("no API key stored for {ty:?}"))),
                None => Ok(panels_crate::settings::fallback_models(args.provider)),
            }
        }
    });

    router.register::<SetSettings, _, _>(|args: SetSettingsArgs| async move {
        let dir = config_dir();
        let json = serde_json::to_string_pretty(&args.settings)
            .map_err(|e| BridgeError::Rejected(e.to_string()))?;
        tokio::fs::create_dir_all(&dir).await.map_err(|e| BridgeError::Rejected(e.to_string()))?;
        tokio::fs::write(dir.join("ai_settings.json"), json)
            .await
            .map_err(|e| BridgeError::Rejected(e.to_string()))?;
        tracing::info!(path = %dir.display(), "ai settings written");
        Ok(())
    });

    router.register::<GenerateEditScript, _, _>(|args: GenerateEditScriptArgs| async move {
        tracing::debug!(intent = %args.intent, "edit script requested");
        Err::<bridge::commands::EditScript, _>(BridgeError::Rejected(
            "no AI provider is connected in this build".into(),
        ))
    });

    router
}

pub(crate) fn load_ai_settings() -> bridge::commands::AiSettings {
    std::fs::read_to_string(config_dir().join("ai_settings.json"))
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Readable prefix plus a digest of the raw key, so keys that sanitize
/// alike still get their own file.
fn slot_file(dir: &Path, key: &str) -> PathBuf {
    let safe: String = key.chars().take(48).map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' }).collect();
    let digest = Sha256::digest(key.as_bytes());
    let short: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    dir.join(format!("{safe}-{short}.png"))
}

/// Blocking ffmpeg extraction for the preview workers. Asset ids are source
/// file paths.
pub(crate) fn preview_extractor(out_dir: PathBuf) -> impl Fn(&PreviewRequest) -> Result<PreviewOutput, JobError> + Send + Sync + 'static {
    move |req: &PreviewRequest| {
        let bin = locate_ffmpeg().0.ok_or_else(|| JobError::Extraction("ffmpeg not found on PATH".into()))?;
        std::fs::create_dir_all(&out_dir).map_err(|e| JobError::Extraction(e.to_string()))?;
        let out = slot_file(&out_dir, &req.key);
        let out_str = out.display().to_string();
        let args = match req.kind {
            PreviewKind::Thumbnail { source_time } => frame_args(&req.asset_id, source_time, &out_str),
            PreviewKind::Waveform { width, height } => waveform_args(&req.asset_id, width, height, &out_str),
        };
        let status = std::process::Command::new(&bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| JobError::Extraction(e.to_string()))?;
        if !status.success() {
            return Err(JobError::Extraction(format!("ffmpeg exited with {status}")));
        }
        Ok(PreviewOutput { path: out_str })
    }
}
