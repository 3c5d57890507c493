//! Command bridge to the native host. Everything the front end needs from the
//! outside world (ffmpeg, credentials, AI calls, settings persistence) goes
//! through [`Bridge::invoke`] with a command name and a JSON argument object.

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use thiserror::Error;

pub mod commands;
mod liveness;
mod router;

pub use commands::Command;
pub use liveness::{Liveness, LivenessTicket};
pub use router::CommandRouter;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid arguments for {command}: {message}")]
    InvalidArgs { command: String, message: String },
    #[error("invalid response from {command}: {message}")]
    InvalidResponse { command: String, message: String },
    /// The host ran the command and reported a failure.
    #[error("{0}")]
    Rejected(String),
    #[error("bridge closed")]
    Closed,
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Asynchronous request/response channel to the host.
pub trait Bridge: Send + Sync {
    fn invoke(&self, command: &str, args: Value) -> BoxFuture<'static, BridgeResult<Value>>;
}

impl<B: Bridge + ?Sized> Bridge for std::sync::Arc<B> {
    fn invoke(&self, command: &str, args: Value) -> BoxFuture<'static, BridgeResult<Value>> {
        (**self).invoke(command, args)
    }
}

/// Typed calls on top of [`Bridge::invoke`].
pub trait BridgeExt: Bridge {
    fn call<C: Command>(&self, args: C::Args) -> BoxFuture<'static, BridgeResult<C::Output>> {
        let value = match serde_json::to_value(&args) {
            Ok(v) => v,
            Err(e) => {
                let err = BridgeError::InvalidArgs { command: C::NAME.to_string(), message: e.to_string() };
                return future::ready(Err(err)).boxed();
            }
        };
        decode::<C>(self.invoke(C::NAME, value))
    }
}

fn decode<C: Command>(pending: BoxFuture<'static, BridgeResult<Value>>) -> BoxFuture<'static, BridgeResult<C::Output>> {
    async move {
        let raw = pending.await?;
        serde_json::from_value(raw)
            .map_err(|e| BridgeError::InvalidResponse { command: C::NAME.to_string(), message: e.to_string() })
    }
    .boxed()
}

impl<B: Bridge + ?Sized> BridgeExt for B {}
