use std::sync::Arc;

use bridge::commands::{EditContext, EditScript, GenerateEditScript, GenerateEditScriptArgs};
use bridge::{Bridge, BridgeError, BridgeExt, Liveness, LivenessTicket};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::PanelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<EditScript>,
}

impl ChatEntry {
    fn user(text: String) -> Self { Self { role: ChatRole::User, text, script: None } }
    fn error(text: String) -> Self { Self { role: ChatRole::Error, text, script: None } }
}

#[derive(Debug, Clone)]
pub struct AssistantMsg {
    ticket: LivenessTicket,
    result: Result<EditScript, BridgeError>,
}

/// AI assistant sidebar. Holds the conversation and at most one pending
/// `generate_edit_script` call.
pub struct AssistantPanel {
    bridge: Arc<dyn Bridge>,
    pub input: String,
    history: Vec<ChatEntry>,
    pending: Option<LivenessTicket>,
    live: Liveness,
}

impl AssistantPanel {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge, input: String::new(), history: Vec::new(), pending: None, live: Liveness::new() }
    }

    pub fn history(&self) -> &[ChatEntry] { &self.history }
    pub fn is_pending(&self) -> bool { self.pending.is_some() }

    /// Sends the current input. The input is consumed only if the request is
    /// actually issued.
    pub fn submit(&mut self, context: EditContext) -> Result<BoxFuture<'static, AssistantMsg>, PanelError> {
        if self.pending.is_some() {
            return Err(PanelError::Busy);
        }
        let intent = self.input.trim().to_string();
        if intent.is_empty() {
            return Err(PanelError::EmptyPrompt);
        }
        self.input.clear();
        self.history.push(ChatEntry::user(intent.clone()));
        let ticket = self.live.issue();
        self.pending = Some(ticket);
        let call = self.bridge.call::<GenerateEditScript>(GenerateEditScriptArgs { intent, context });
        Ok(async move { AssistantMsg { ticket, result: call.await } }.boxed())
    }

    /// Empties the conversation; a reply still in flight is discarded.
    pub fn clear(&mut self) {
        self.live.invalidate();
        self.pending = None;
        self.history.clear();
    }

    pub fn unmount(&self) { self.live.invalidate(); }

    pub fn update(&mut self, msg: AssistantMsg) {
        if !self.live.is_live(msg.ticket) || self.pending != Some(msg.ticket) {
            debug!("stale assistant reply ignored");
            return;
        }
        self.pending = None;
        match msg.result {
            Ok(script) => {
                let text = if script.explanation.is_empty() {
                    format!("{} command(s) proposed", script.commands.len())
                } else {
                    script.explanation.clone()
                };
                self.history.push(ChatEntry { role: ChatRole::Assistant, text, script: Some(script) });
            }
            Err(e) => {
                warn!(error = %e, "edit script request failed");
                self.history.push(ChatEntry::error(e.to_string()));
            }
        }
    }
}
