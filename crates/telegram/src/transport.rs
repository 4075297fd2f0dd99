use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

use leadline_core::domain::lead::ChatId;

use crate::keyboards::InlineKeyboard;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("chat transport request failed: {0}")]
    Request(String),
    #[error("chat transport rejected the call with status {status}: {detail}")]
    Status { status: u16, detail: String },
}

/// Outbound side of the messaging transport. One fixed bot account; the
/// conversation is addressed per call.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<(), TransportError>;
    async fn send_buttons(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<(), TransportError>;
    async fn acknowledge_callback(&self, callback_id: &str) -> Result<(), TransportError>;
}

/// Discards outbound traffic. Used when wiring without credentials.
#[derive(Default)]
pub struct NoopChatTransport;

#[async_trait]
impl ChatTransport for NoopChatTransport {
    async fn send_message(&self, _chat: ChatId, _text: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_buttons(
        &self,
        _chat: ChatId,
        _text: &str,
        _keyboard: InlineKeyboard,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn acknowledge_callback(&self, _callback_id: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Bot API client over HTTPS. Timeouts are bounded by the injected duration;
/// failures surface as errors and are never retried here.
pub struct HttpChatTransport {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl HttpChatTransport {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Request(error.to_string()))?;
        let base_url: String = base_url.into();

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned(), token })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.expose_secret(), method)
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status: status.as_u16(), detail });
        }

        Ok(())
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<(), TransportError> {
        self.call("sendMessage", &json!({ "chat_id": chat.0, "text": text })).await
    }

    async fn send_buttons(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<(), TransportError> {
        self.call(
            "sendMessage",
            &json!({ "chat_id": chat.0, "text": text, "reply_markup": keyboard }),
        )
        .await
    }

    async fn acknowledge_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        self.call("answerCallbackQuery", &json!({ "callback_query_id": callback_id })).await
    }
}

/// One outbound message as observed by the recording transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

/// Records outbound calls instead of sending them; backs router, notifier,
/// and webhook tests across the workspace.
#[derive(Clone, Default)]
pub struct RecordingChatTransport {
    state: Arc<Mutex<RecordingTransportState>>,
}

#[derive(Default)]
struct RecordingTransportState {
    sent: Vec<SentMessage>,
    acknowledged: Vec<String>,
    fail_sends: bool,
}

impl RecordingChatTransport {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.lock().acknowledged.clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    fn lock(&self) -> MutexGuard<'_, RecordingTransportState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingChatTransport {
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(TransportError::Request("scripted send failure".to_owned()));
        }
        state.sent.push(SentMessage { chat, text: text.to_owned(), keyboard: None });
        Ok(())
    }

    async fn send_buttons(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(TransportError::Request("scripted send failure".to_owned()));
        }
        state.sent.push(SentMessage { chat, text: text.to_owned(), keyboard: Some(keyboard) });
        Ok(())
    }

    async fn acknowledge_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        self.lock().acknowledged.push(callback_id.to_owned());
        Ok(())
    }
}
