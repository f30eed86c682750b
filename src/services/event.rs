use sqlx::{Postgres, Transaction};

use crate::db::Database;
use crate::error::AppResult;
use crate::models::event::Event;

pub struct EventService<'a> {
    db: &'a Database,
}

impl<'a> EventService<'a> {
    pub fn new(db: &'a Database) -> Self {
        EventService { db }
    }

    /// Append an event inside the caller's transaction. Events are never
    /// mutated or deleted afterwards.
    pub async fn record(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        event_type: &str,
        name: &str,
        payload: serde_json::Value,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO events (type, name, payload) VALUES ($1, $2, $3)")
            .bind(event_type)
            .bind(name)
            .bind(payload)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// All events whose payload references the given coffee id.
    pub async fn find_by_coffee_id(&self, coffee_id: i32) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, type, name, payload, created_at
            FROM events
            WHERE payload @> $1
            "#,
        )
        .bind(serde_json::json!({ "coffeeId": coffee_id }))
        .fetch_all(&self.db.pool)
        .await?;

        Ok(events)
    }
}
