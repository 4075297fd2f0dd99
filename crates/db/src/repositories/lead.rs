use chrono::Utc;
use uuid::Uuid;

use leadline_core::domain::lead::{BriefAnswers, LeadId, NewLead};
use leadline_core::intake::{LeadStore, StoreError};

use crate::DbPool;

const BRIEF_EVENT_TYPE: &str = "bot_brief";

/// SQLite-backed lead store. Identifiers are generated here so a returned id
/// always corresponds to a committed row.
pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(_) => StoreError::Rejected(error.to_string()),
        _ => StoreError::Unavailable(error.to_string()),
    }
}

#[async_trait::async_trait]
impl LeadStore for SqlLeadRepository {
    async fn insert_lead(&self, record: &NewLead) -> Result<LeadId, StoreError> {
        let id = LeadId(format!("LD-{}", Uuid::new_v4().simple()));

        sqlx::query(
            "INSERT INTO leads (\n                id, source, segment, name, telegram_username, telegram_user_id,\n                phone, email, utm_source, utm_medium, utm_campaign, note, created_at\n             )\n             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(record.source.as_str())
        .bind(record.segment.as_str())
        .bind(record.name.as_deref())
        .bind(record.telegram_username.as_deref())
        .bind(record.telegram_user_id)
        .bind(record.phone.as_deref())
        .bind(record.email.as_deref())
        .bind(record.utm_source.as_deref())
        .bind(record.utm_medium.as_deref())
        .bind(record.utm_campaign.as_deref())
        .bind(record.note.as_deref())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(id)
    }

    async fn insert_lead_event(
        &self,
        lead_id: &LeadId,
        answers: &BriefAnswers,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(answers)
            .map_err(|error| StoreError::Rejected(error.to_string()))?;

        sqlx::query(
            "INSERT INTO lead_events (lead_id, event_type, payload, created_at)\n             VALUES (?, ?, ?, ?)",
        )
        .bind(&lead_id.0)
        .bind(BRIEF_EVENT_TYPE)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use leadline_core::domain::lead::{BriefAnswers, ChatIdentity, LeadId, NewLead};
    use leadline_core::intake::{LeadStore, StoreError};
    use leadline_core::segment::Segment;

    use super::SqlLeadRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    #[tokio::test]
    async fn site_lead_round_trips_through_sqlite() {
        let pool = pool().await;
        let repository = SqlLeadRepository::new(pool.clone());
        let record = NewLead::from_site(
            Segment::Specialist,
            Some("Alice".to_owned()),
            Some("+1000".to_owned()),
            None,
            Some("need a landing page".to_owned()),
            Some("google".to_owned()),
            None,
            None,
        );

        let id = repository.insert_lead(&record).await.expect("insert");
        assert!(id.0.starts_with("LD-"));

        let row = sqlx::query("SELECT * FROM leads WHERE id = ?")
            .bind(&id.0)
            .fetch_one(&pool)
            .await
            .expect("fetch lead");

        assert_eq!(row.get::<String, _>("source"), "site");
        assert_eq!(row.get::<String, _>("segment"), "specialist");
        assert_eq!(row.get::<Option<String>, _>("phone").as_deref(), Some("+1000"));
        assert_eq!(row.get::<Option<String>, _>("telegram_username"), None);
        assert_eq!(row.get::<Option<String>, _>("note").as_deref(), Some("need a landing page"));

        pool.close().await;
    }

    #[tokio::test]
    async fn bot_lead_event_links_to_its_lead() {
        let pool = pool().await;
        let repository = SqlLeadRepository::new(pool.clone());
        let answers = BriefAnswers {
            goal: "launch site".to_owned(),
            deadline: "next month".to_owned(),
            contact: "@alice".to_owned(),
        };
        let sender = ChatIdentity {
            user_id: 42,
            first_name: Some("Alice".to_owned()),
            username: Some("alice".to_owned()),
        };
        let record = NewLead::from_bot(Segment::Business, &answers, &sender);

        let id = repository.insert_lead(&record).await.expect("insert lead");
        repository.insert_lead_event(&id, &answers).await.expect("insert event");

        let row = sqlx::query("SELECT event_type, payload FROM lead_events WHERE lead_id = ?")
            .bind(&id.0)
            .fetch_one(&pool)
            .await
            .expect("fetch event");

        assert_eq!(row.get::<String, _>("event_type"), "bot_brief");
        let payload: BriefAnswers =
            serde_json::from_str(&row.get::<String, _>("payload")).expect("decode payload");
        assert_eq!(payload, answers);

        pool.close().await;
    }

    #[tokio::test]
    async fn lead_event_without_a_parent_lead_is_rejected() {
        let pool = pool().await;
        let repository = SqlLeadRepository::new(pool.clone());

        let error = repository
            .insert_lead_event(&LeadId("LD-missing".to_owned()), &BriefAnswers::default())
            .await
            .expect_err("foreign key violation");

        assert!(matches!(error, StoreError::Rejected(_)));

        pool.close().await;
    }

    #[tokio::test]
    async fn generated_ids_are_unique_per_insert() {
        let pool = pool().await;
        let repository = SqlLeadRepository::new(pool.clone());
        let record = NewLead::from_site(
            Segment::Event,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        );

        let first = repository.insert_lead(&record).await.expect("first insert");
        let second = repository.insert_lead(&record).await.expect("second insert");

        assert_ne!(first, second);

        pool.close().await;
    }
}
