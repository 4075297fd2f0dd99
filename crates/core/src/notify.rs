use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::lead::{BriefAnswers, ChatIdentity, LeadId, LeadSource};
use crate::intake::SiteSubmission;
use crate::segment::Segment;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("operator alert delivery failed: {0}")]
    Delivery(String),
}

/// Optional lines of the operator alert. Only non-empty values produce a
/// line; there are no filler entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertDetails {
    pub goal: Option<String>,
    pub deadline: Option<String>,
    pub contact: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

/// One structured alert about a captured lead, addressed to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadAlert {
    pub source: LeadSource,
    pub segment: Segment,
    pub sender: Option<ChatIdentity>,
    pub details: AlertDetails,
    pub lead_id: Option<LeadId>,
}

impl LeadAlert {
    pub fn from_bot(
        segment: Segment,
        answers: &BriefAnswers,
        sender: &ChatIdentity,
        lead_id: Option<LeadId>,
    ) -> Self {
        Self {
            source: LeadSource::Bot,
            segment,
            sender: Some(sender.clone()),
            details: AlertDetails {
                goal: present(&answers.goal),
                deadline: present(&answers.deadline),
                contact: present(&answers.contact),
                ..AlertDetails::default()
            },
            lead_id,
        }
    }

    pub fn from_site(
        segment: Segment,
        submission: &SiteSubmission,
        lead_id: Option<LeadId>,
    ) -> Self {
        Self {
            source: LeadSource::Site,
            segment,
            sender: None,
            details: AlertDetails {
                name: present_opt(&submission.name),
                phone: present_opt(&submission.phone),
                email: present_opt(&submission.email),
                message: present_opt(&submission.message),
                ..AlertDetails::default()
            },
            lead_id,
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("🧾 NEW LEAD ({})", self.source.tag()),
            format!("Segment: {}", self.segment.title()),
        ];

        if let Some(sender) = &self.sender {
            if let Some(first_name) = sender.first_name.as_deref().filter(|v| !v.is_empty()) {
                lines.push(format!("Name: {first_name}"));
            }
            if let Some(username) = sender.username.as_deref().filter(|v| !v.is_empty()) {
                lines.push(format!("Handle: @{username}"));
            }
        }

        push_line(&mut lines, "Goal", &self.details.goal);
        push_line(&mut lines, "Deadline", &self.details.deadline);
        push_line(&mut lines, "Contact", &self.details.contact);
        push_line(&mut lines, "Name (site)", &self.details.name);
        push_line(&mut lines, "Phone", &self.details.phone);
        push_line(&mut lines, "Email", &self.details.email);
        push_line(&mut lines, "Message", &self.details.message);

        if let Some(id) = &self.lead_id {
            lines.push(format!("ID: {id}"));
        }

        lines.join("\n")
    }
}

fn present(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn present_opt(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(present)
}

fn push_line(lines: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = value {
        lines.push(format!("{label}: {value}"));
    }
}

/// Messaging transport boundary for the single fixed operator destination.
/// Delivery failures are surfaced, never retried here.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, alert: &LeadAlert) -> Result<(), NotifyError>;
}

/// Captures alerts instead of sending them; backs wiring without a transport
/// and the pipeline tests across the workspace.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Default)]
struct RecordingState {
    alerts: Vec<LeadAlert>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<LeadAlert> {
        self.lock().alerts.clone()
    }

    pub fn fail_deliveries(&self, fail: bool) {
        self.lock().fail = fail;
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl OperatorNotifier for RecordingNotifier {
    async fn notify(&self, alert: &LeadAlert) -> Result<(), NotifyError> {
        let mut state = self.lock();
        if state.fail {
            return Err(NotifyError::Delivery("scripted delivery failure".to_owned()));
        }
        state.alerts.push(alert.clone());
        Ok(())
    }
}
