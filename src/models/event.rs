use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An append-only event record. `type` is the coarse category, `name` the
/// fine-grained action, and `payload` an opaque JSON object (here carrying
/// the coffee id that triggered the event).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub event_type: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
