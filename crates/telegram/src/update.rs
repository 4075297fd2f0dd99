use serde::Deserialize;

use leadline_core::dialogue::ChatEvent;
use leadline_core::domain::lead::{ChatId, ChatIdentity};
use leadline_core::segment::Segment;

pub const SEGMENT_CALLBACK_PREFIX: &str = "seg_";
pub const BRIEF_START_CALLBACK: &str = "brief_start";
pub const BACK_TO_SEGMENTS_CALLBACK: &str = "back_to_segments";

/// Subset of the Bot API update payload this service consumes. Everything
/// else deserializes to `None` and classifies to nothing.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// A decoded inbound interaction ready for the dialogue engine.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    pub chat: ChatId,
    pub sender: ChatIdentity,
    pub event: ChatEvent,
}

/// Turn one raw update into a dialogue event. Returns `None` for updates that
/// carry nothing actionable (stickers, edits, unknown callbacks); the engine
/// only ever sees validated input.
pub fn classify(update: &Update) -> Option<InboundEvent> {
    if let Some(callback) = &update.callback_query {
        return classify_callback(callback);
    }
    if let Some(message) = &update.message {
        return classify_message(message);
    }
    None
}

fn classify_message(message: &Message) -> Option<InboundEvent> {
    let text = message.text.as_deref()?;
    let event = match start_payload(text) {
        Some(payload) => ChatEvent::Start { segment_hint: segment_hint(payload) },
        None => ChatEvent::Text(text.to_owned()),
    };

    Some(InboundEvent {
        chat: ChatId(message.chat.id),
        sender: identity(message.from.as_ref()),
        event,
    })
}

fn classify_callback(callback: &CallbackQuery) -> Option<InboundEvent> {
    let chat_id = callback.message.as_ref().map(|message| message.chat.id).unwrap_or(callback.from.id);
    let data = callback.data.as_deref()?.trim();

    let event = if let Some(raw) = data.strip_prefix(SEGMENT_CALLBACK_PREFIX) {
        // Unknown segments are dropped here, before the state machine.
        ChatEvent::SelectSegment(Segment::parse(raw)?)
    } else if data == BRIEF_START_CALLBACK {
        ChatEvent::StartBrief
    } else if data == BACK_TO_SEGMENTS_CALLBACK {
        ChatEvent::BackToSegments
    } else {
        return None;
    };

    Some(InboundEvent {
        chat: ChatId(chat_id),
        sender: identity(Some(&callback.from)),
        event,
    })
}

/// `/start` with an optional deep-link payload. Returns `None` for ordinary
/// text, including commands that merely begin with the same letters.
fn start_payload(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix("/start")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn segment_hint(payload: &str) -> Option<Segment> {
    payload.strip_prefix(SEGMENT_CALLBACK_PREFIX).and_then(Segment::parse)
}

fn identity(user: Option<&User>) -> ChatIdentity {
    user.map(|user| ChatIdentity {
        user_id: user.id,
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    })
    .unwrap_or_default()
}
