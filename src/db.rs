use futures::future::BoxFuture;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool, Postgres, Transaction,
};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Total attempts for a transactional unit of work, including the first one.
const TRANSACTION_ATTEMPTS: u32 = 5;

/// SQLSTATE reported by Postgres when a statement runs inside an aborted
/// transaction. Treated as transient: the whole unit of work is restarted.
const PG_TRANSACTION_ABORTED: &str = "25P02";

/// SQLSTATE for a unique-constraint violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let connect_options = PgConnectOptions::from_str(database_url)?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .connect_with(connect_options)
            .await?;

        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        let migrations = vec![include_str!("../migrations/postgres/001_initial.sql")];

        for (idx, migration_sql) in migrations.iter().enumerate() {
            tracing::info!("Running migration {}", idx + 1);

            for statement in migration_sql.split(';') {
                let trimmed = statement.trim();
                if !trimmed.is_empty() && !trimmed.starts_with("--") {
                    sqlx::query(trimmed).execute(&self.pool).await?;
                }
            }
        }

        tracing::info!("All migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `work` inside a transaction, committing on success and rolling
    /// back on failure.
    ///
    /// When the failure is a transaction abort reported by Postgres, the
    /// whole `work` is restarted from scratch, up to
    /// [`TRANSACTION_ATTEMPTS`] attempts in total; any prior writes were
    /// rolled back, so `work` must tolerate re-execution. Operations inside
    /// `work` receive the transaction handle and must never commit or roll
    /// it back themselves — this function owns the handle's lifecycle.
    pub async fn run_in_transaction<T, F>(&self, work: F) -> AppResult<T>
    where
        F: for<'t> Fn(&'t mut Transaction<'static, Postgres>) -> BoxFuture<'t, AppResult<T>>,
    {
        let mut attempts_left = TRANSACTION_ATTEMPTS;

        loop {
            let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

            match work(&mut tx).await {
                Ok(value) => {
                    tx.commit().await.map_err(AppError::Database)?;
                    return Ok(value);
                }
                Err(error) => {
                    if let Err(rollback_error) = tx.rollback().await {
                        tracing::debug!("Transaction rollback failed: {}", rollback_error);
                    }

                    attempts_left -= 1;
                    if attempts_left > 0 && is_transaction_aborted(&error) {
                        tracing::debug!(
                            "Transaction aborted, restarting work ({} attempts left)",
                            attempts_left
                        );
                        continue;
                    }

                    return Err(error);
                }
            }
        }
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err
            .code()
            .map(|code| code == PG_UNIQUE_VIOLATION)
            .unwrap_or(false);
    }
    false
}

fn is_transaction_aborted(error: &AppError) -> bool {
    if let AppError::Database(sqlx::Error::Database(db_err)) = error {
        return db_err
            .code()
            .map(|code| code == PG_TRANSACTION_ABORTED)
            .unwrap_or(false);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_detects_only_db_codes() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn transaction_aborted_ignores_other_errors() {
        assert!(!is_transaction_aborted(&AppError::NotFound(
            "Coffee #1 not found".to_string()
        )));
        assert!(!is_transaction_aborted(&AppError::Database(
            sqlx::Error::RowNotFound
        )));
    }
}
