use std::sync::Arc;

use async_trait::async_trait;

use leadline_core::domain::lead::ChatId;
use leadline_core::notify::{LeadAlert, NotifyError, OperatorNotifier};

use crate::transport::ChatTransport;

/// Delivers rendered lead alerts to the single configured operator chat.
pub struct TelegramNotifier {
    transport: Arc<dyn ChatTransport>,
    operator_chat: ChatId,
}

impl TelegramNotifier {
    pub fn new(transport: Arc<dyn ChatTransport>, operator_chat: ChatId) -> Self {
        Self { transport, operator_chat }
    }
}

#[async_trait]
impl OperatorNotifier for TelegramNotifier {
    async fn notify(&self, alert: &LeadAlert) -> Result<(), NotifyError> {
        self.transport
            .send_message(self.operator_chat, &alert.render())
            .await
            .map_err(|error| NotifyError::Delivery(error.to_string()))
    }
}
