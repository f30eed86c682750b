use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A flavor tag. Names are globally unique (case-sensitive) and rows are
/// never deleted by the service, even when no coffee references them.
///
/// `id` is `None` when the row was created by a concurrent writer that won
/// the uniqueness race; callers resolve the stored id through the unique
/// name instead of this value.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Flavor {
    pub id: Option<i32>,
    pub name: String,
}
