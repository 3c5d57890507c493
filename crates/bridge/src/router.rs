use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::{Bridge, BridgeError, BridgeResult, Command};

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, BridgeResult<Value>> + Send + Sync>;

/// In-process [`Bridge`] that dispatches command names to registered
/// handlers. Cloning shares the handler table.
#[derive(Clone, Default)]
pub struct CommandRouter {
    handlers: Arc<RwLock<HashMap<&'static str, Handler>>>,
}

impl CommandRouter {
    pub fn new() -> Self { Self::default() }

    /// Registers a typed handler for `C`, replacing any previous one.
    pub fn register<C, F, Fut>(&self, handler: F) -> &Self
    where
        C: Command,
        F: Fn(C::Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BridgeResult<C::Output>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let raw: Handler = Arc::new(move |value: Value| {
            let args: C::Args = match serde_json::from_value(value) {
                Ok(a) => a,
                Err(e) => {
                    let err = BridgeError::InvalidArgs { command: C::NAME.to_string(), message: e.to_string() };
                    return future::ready(Err(err)).boxed();
                }
            };
            let fut = handler(args);
            async move {
                let out = fut.await?;
                serde_json::to_value(out)
                    .map_err(|e| BridgeError::InvalidResponse { command: C::NAME.to_string(), message: e.to_string() })
            }
            .boxed()
        });
        self.handlers.write().insert(C::NAME, raw);
        self
    }

    /// Untyped registration, used by tests and scripted hosts.
    pub fn register_raw<F>(&self, name: &'static str, handler: F) -> &Self
    where
        F: Fn(Value) -> BoxFuture<'static, BridgeResult<Value>> + Send + Sync + 'static,
    {
        self.handlers.write().insert(name, Arc::new(handler));
        self
    }

    pub fn has(&self, name: &str) -> bool { self.handlers.read().contains_key(name) }
}

impl Bridge for CommandRouter {
    fn invoke(&self, command: &str, args: Value) -> BoxFuture<'static, BridgeResult<Value>> {
        let handler = self.handlers.read().get(command).cloned();
        let Some(handler) = handler else {
            debug!(command, "no handler registered");
            return future::ready(Err(BridgeError::UnknownCommand(command.to_string()))).boxed();
        };
        let args = if args.is_null() { Value::Object(Default::default()) } else { args };
        handler(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CheckFfmpeg, FfmpegStatus, NoArgs, ProviderArgs, ProviderType, GetAvailableAiModels, AiModelInfo};
    use crate::BridgeExt;
    use serde_json::json;

    fn router() -> CommandRouter {
        let r = CommandRouter::new();
        r.register::<CheckFfmpeg, _, _>(|_: NoArgs| async {
            Ok(FfmpegStatus { available: true, version: Some("6.1".into()), ..Default::default() })
        });
        r.register::<GetAvailableAiModels, _, _>(|args: ProviderArgs| async move {
            match args.provider {
                ProviderType::Local => Err(BridgeError::Rejected("ollama not running".into())),
                _ => Ok(vec![AiModelInfo::new("m1", "Model One")]),
            }
        });
        r
    }

    #[tokio::test]
    async fn typed_call_round_trips() {
        let r = router();
        let status = r.call::<CheckFfmpeg>(NoArgs {}).await.unwrap();
        assert!(status.available);
        assert_eq!(status.version.as_deref(), Some("6.1"));
    }

    #[tokio::test]
    async fn null_args_become_empty_object() {
        let r = router();
        let v = r.invoke("check_ffmpeg", Value::Null).await.unwrap();
        assert_eq!(v["available"], json!(true));
    }

    #[tokio::test]
    async fn unknown_command_rejects() {
        let r = router();
        let err = r.invoke("nope", json!({})).await.unwrap_err();
        assert_eq!(err, BridgeError::UnknownCommand("nope".into()));
    }

    #[tokio::test]
    async fn bad_args_and_handler_errors_surface() {
        let r = router();
        let err = r.invoke("get_available_ai_models", json!({"provider": 3})).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgs { .. }));
        let err = r.call::<GetAvailableAiModels>(ProviderArgs { provider: ProviderType::Local }).await.unwrap_err();
        assert_eq!(err.to_string(), "ollama not running");
    }

    #[tokio::test]
    async fn raw_handler_gets_wrong_shape_response() {
        let r = router();
        r.register_raw("check_ffmpeg", |_| future::ready(Ok(json!("garbage"))).boxed());
        let err = r.call::<CheckFfmpeg>(NoArgs {}).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidResponse { .. }));
    }
}
