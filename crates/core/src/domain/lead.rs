use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// Identifier assigned by the lead store at insert time. Opaque; only used as
/// a correlation token between the database row and the operator alert.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation identifier on the chat side (one per chat participant).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Bot,
    Site,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Site => "site",
        }
    }

    /// Uppercase tag used in the operator alert header.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Bot => "BOT",
            Self::Site => "SITE",
        }
    }
}

/// Who sent a chat message, as reported by the messaging transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatIdentity {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

/// The three structured brief answers collected conversationally. Answers are
/// stored trimmed; an empty string is a valid answer, never rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefAnswers {
    pub goal: String,
    pub deadline: String,
    pub contact: String,
}

/// A lead as handed to the store. The two constructors are the only way the
/// per-source field split can be produced: the bot path never carries
/// phone/email/utm fields, the site path never carries telegram fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLead {
    pub source: LeadSource,
    pub segment: Segment,
    pub name: Option<String>,
    pub telegram_username: Option<String>,
    pub telegram_user_id: Option<i64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub note: Option<String>,
}

impl NewLead {
    pub fn from_bot(segment: Segment, answers: &BriefAnswers, sender: &ChatIdentity) -> Self {
        let note = [
            format!("goal: {}", placeholder(&answers.goal)),
            format!("deadline: {}", placeholder(&answers.deadline)),
            format!("contact: {}", placeholder(&answers.contact)),
        ]
        .join("\n");

        Self {
            source: LeadSource::Bot,
            segment,
            name: sender.first_name.clone().filter(|value| !value.is_empty()),
            telegram_username: sender
                .username
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(|value| format!("@{value}")),
            telegram_user_id: Some(sender.user_id),
            phone: None,
            email: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            note: Some(note),
        }
    }

    pub fn from_site(
        segment: Segment,
        name: Option<String>,
        phone: Option<String>,
        email: Option<String>,
        message: Option<String>,
        utm_source: Option<String>,
        utm_medium: Option<String>,
        utm_campaign: Option<String>,
    ) -> Self {
        Self {
            source: LeadSource::Site,
            segment,
            name: non_empty(name),
            telegram_username: None,
            telegram_user_id: None,
            phone: non_empty(phone),
            email: non_empty(email),
            utm_source: non_empty(utm_source),
            utm_medium: non_empty(utm_medium),
            utm_campaign: non_empty(utm_campaign),
            note: non_empty(message),
        }
    }
}

/// A persisted lead: the stored record plus its assigned identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lead {
    pub id: LeadId,
    pub record: NewLead,
}

fn placeholder(answer: &str) -> &str {
    if answer.is_empty() {
        "-"
    } else {
        answer
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
