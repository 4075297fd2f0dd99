use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use leadline_core::dialogue::{DialogueEngine, Reply};

use crate::keyboards::keyboard_for;
use crate::transport::{ChatTransport, TransportError};
use crate::update::{classify, Update};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Glue from one raw transport update to dialogue replies. Engine faults
/// (persistence, alert delivery) are logged here and never abort the reply
/// path; only a failure to reach the user surfaces as an error.
pub struct UpdateRouter {
    engine: Arc<DialogueEngine>,
    transport: Arc<dyn ChatTransport>,
}

impl UpdateRouter {
    pub fn new(engine: Arc<DialogueEngine>, transport: Arc<dyn ChatTransport>) -> Self {
        Self { engine, transport }
    }

    pub async fn handle_update(&self, update: Update) -> Result<(), RouterError> {
        if let Some(callback) = &update.callback_query {
            // Telegram keeps the button spinner until the callback is
            // answered; best-effort, the dialogue must not depend on it.
            if let Err(ack_error) = self.transport.acknowledge_callback(&callback.id).await {
                warn!(
                    event_name = "ingress.chat.ack_failed",
                    update_id = update.update_id,
                    error = %ack_error,
                    "callback acknowledgement failed"
                );
            }
        }

        let Some(inbound) = classify(&update) else {
            debug!(
                event_name = "ingress.chat.update_ignored",
                update_id = update.update_id,
                "update carried no actionable event"
            );
            return Ok(());
        };

        let report =
            self.engine.handle_event(inbound.chat, &inbound.sender, inbound.event).await;

        if let Some(ingest_error) = &report.persistence_error {
            error!(
                event_name = "pipeline.lead.persistence_failed",
                update_id = update.update_id,
                error = %ingest_error,
                "lead persistence failed; operator alert was still attempted"
            );
        }
        if let Some(notify_error) = &report.notify_error {
            error!(
                event_name = "pipeline.lead.alert_failed",
                update_id = update.update_id,
                error = %notify_error,
                "operator alert delivery failed"
            );
        }

        for reply in report.replies {
            match reply {
                Reply::Text(text) => {
                    self.transport.send_message(inbound.chat, &text).await?;
                }
                Reply::Menu { text, menu } => {
                    self.transport.send_buttons(inbound.chat, &text, keyboard_for(menu)).await?;
                }
            }
        }

        Ok(())
    }
}
