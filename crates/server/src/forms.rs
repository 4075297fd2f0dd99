use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use leadline_core::intake::{IngestError, IngestOutcome, LeadIngestService, SiteSubmission};
use leadline_core::notify::{LeadAlert, OperatorNotifier};
use leadline_core::segment::Segment;

#[derive(Clone)]
pub struct FormsState {
    pub intake: LeadIngestService,
    pub notifier: Arc<dyn OperatorNotifier>,
}

/// Public web-form payload. Everything but the segment is optional; the
/// segment itself is validated by the ingestion service, not here.
#[derive(Debug, Deserialize)]
pub struct LeadForm {
    pub segment: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub hp: Option<String>,
}

impl From<LeadForm> for SiteSubmission {
    fn from(form: LeadForm) -> Self {
        Self {
            segment: form.segment,
            name: form.name,
            phone: form.phone,
            email: form.email,
            message: form.message,
            utm_source: form.utm_source,
            utm_medium: form.utm_medium,
            utm_campaign: form.utm_campaign,
            honeypot: form.hp,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct FormResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl FormResponse {
    fn accepted() -> Self {
        Self { ok: true, id: None }
    }

    fn accepted_with_id(id: String) -> Self {
        Self { ok: true, id: Some(id) }
    }

    fn failed() -> Self {
        Self { ok: false, id: None }
    }
}

pub fn router(state: FormsState) -> Router {
    Router::new().route("/api/lead", post(submit_lead)).with_state(state)
}

async fn submit_lead(
    State(state): State<FormsState>,
    payload: Result<Json<LeadForm>, JsonRejection>,
) -> (StatusCode, Json<FormResponse>) {
    let Ok(Json(form)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(FormResponse::failed()));
    };

    let submission = SiteSubmission::from(form);
    // The ingestion service consumes the submission; keep what the alert needs.
    let alert_source = submission.clone();

    match state.intake.ingest_site(submission).await {
        Ok(IngestOutcome::Discarded) => {
            // Indistinguishable from a success on the wire.
            info!(event_name = "ingress.form.honeypot_discarded", "spam submission discarded");
            (StatusCode::OK, Json(FormResponse::accepted()))
        }
        Ok(IngestOutcome::Stored(lead)) => {
            let alert =
                LeadAlert::from_site(lead.record.segment, &alert_source, Some(lead.id.clone()));
            if let Err(notify_error) = state.notifier.notify(&alert).await {
                error!(
                    event_name = "pipeline.lead.alert_failed",
                    lead_id = %lead.id,
                    error = %notify_error,
                    "operator alert delivery failed after lead persistence"
                );
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(FormResponse::failed()));
            }
            info!(
                event_name = "ingress.form.lead_captured",
                lead_id = %lead.id,
                segment = %lead.record.segment,
                "site lead captured"
            );
            (StatusCode::OK, Json(FormResponse::accepted_with_id(lead.id.0)))
        }
        Err(IngestError::UnknownSegment(raw)) => {
            warn!(
                event_name = "ingress.form.rejected",
                segment = %raw,
                "form submission carried an unknown segment"
            );
            (StatusCode::BAD_REQUEST, Json(FormResponse::failed()))
        }
        Err(IngestError::Persistence(store_error)) => {
            error!(
                event_name = "pipeline.lead.persistence_failed",
                error = %store_error,
                "lead persistence failed; alerting the operator without an id"
            );
            // The operator remains the fallback of last resort: the segment
            // was validated before the write, so re-parsing cannot miss.
            if let Some(segment) = Segment::parse(&alert_source.segment) {
                let alert = LeadAlert::from_site(segment, &alert_source, None);
                if let Err(notify_error) = state.notifier.notify(&alert).await {
                    error!(
                        event_name = "pipeline.lead.alert_failed",
                        error = %notify_error,
                        "operator alert delivery failed after persistence failure"
                    );
                }
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(FormResponse::failed()))
        }
    }
}
