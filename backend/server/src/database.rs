//! # Postgres
//!
//! Durable home of the interaction log.
//!
//! ## Requirements
//!
//! - Append-only: one insert per click or reading ping, nothing is ever updated or deleted
//! - Two reads: every row for a user, every row for an article with a given action
//! - Safe to share across request tasks
//!
//! ## Implementation
//!
//! - Single `article_logs` table, created on startup if absent
//! - `BIGSERIAL` id and `now()` default so the store assigns identity and time
//! - Index on `user_id` for the per-user lookup
//! - Composite index on `(article_id, action)` for the reading time lookup
//! - `sqlx::PgPool` handles connection reuse, every statement binds its parameters
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
};
use tracing::{debug, info};

use crate::{
    config::DatabaseConfig,
    error::StoreError,
    models::{Action, ArticleLog, NewArticleLog},
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS article_logs (
    id BIGSERIAL PRIMARY KEY,
    user_id TEXT NOT NULL,
    article_id TEXT NOT NULL,
    action TEXT NOT NULL CHECK (action IN ('click', 'reading')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS article_logs_user_id_idx ON article_logs (user_id)";

const CREATE_ARTICLE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS article_logs_article_action_idx ON article_logs (article_id, action)";

/// Every read and write of the interaction log goes through this trait.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist one record; the returned copy carries the assigned `id` and `created_at`.
    async fn insert(&self, record: NewArticleLog) -> Result<ArticleLog, StoreError>;
    /// All records for `user_id`, oldest first. No match is an empty vector.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<ArticleLog>, StoreError>;
    /// All records for `article_id` with the given action, oldest first.
    async fn find_by_article_and_action(
        &self,
        article_id: &str,
        action: Action,
    ) -> Result<Vec<ArticleLog>, StoreError>;
    /// Round trip to the store without touching any rows.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(FromRow)]
struct ArticleLogRow {
    id: i64,
    user_id: String,
    article_id: String,
    action: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ArticleLogRow> for ArticleLog {
    type Error = StoreError;

    fn try_from(row: ArticleLogRow) -> Result<Self, Self::Error> {
        let action = row
            .action
            .parse()
            .map_err(|e| StoreError::Query(Box::new(e)))?;

        Ok(ArticleLog {
            id: row.id,
            user_id: row.user_id,
            article_id: row.article_id,
            action,
            created_at: row.created_at,
        })
    }
}

fn into_logs(rows: Vec<ArticleLogRow>) -> Result<Vec<ArticleLog>, StoreError> {
    rows.into_iter().map(ArticleLog::try_from).collect()
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Open the pool and make sure the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.dbname)
            .ssl_mode(config.ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(Box::new(e)))?;

        info!(
            "Connected to Postgres at {}:{}/{}",
            config.host, config.port, config.dbname
        );

        let store = Self { pool };
        store.initialize().await?;

        Ok(store)
    }

    /// Idempotent: safe to run on every startup.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        for statement in [CREATE_TABLE, CREATE_USER_INDEX, CREATE_ARTICLE_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Schema(Box::new(e)))?;
        }

        info!("Schema for article_logs is ready");

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LogStore for PostgresStore {
    async fn insert(&self, record: NewArticleLog) -> Result<ArticleLog, StoreError> {
        let row: ArticleLogRow = sqlx::query_as(
            "INSERT INTO article_logs (user_id, article_id, action) VALUES ($1, $2, $3) \
             RETURNING id, user_id, article_id, action, created_at",
        )
        .bind(&record.user_id)
        .bind(&record.article_id)
        .bind(record.action.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Write(Box::new(e)))?;

        let log = ArticleLog::try_from(row).map_err(|e| match e {
            StoreError::Query(source) => StoreError::Write(source),
            other => other,
        })?;
        debug!(id = log.id, action = %log.action, "Stored article log");

        Ok(log)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<ArticleLog>, StoreError> {
        let rows: Vec<ArticleLogRow> = sqlx::query_as(
            "SELECT id, user_id, article_id, action, created_at FROM article_logs \
             WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(Box::new(e)))?;

        into_logs(rows)
    }

    async fn find_by_article_and_action(
        &self,
        article_id: &str,
        action: Action,
    ) -> Result<Vec<ArticleLog>, StoreError> {
        let rows: Vec<ArticleLogRow> = sqlx::query_as(
            "SELECT id, user_id, article_id, action, created_at FROM article_logs \
             WHERE article_id = $1 AND action = $2 ORDER BY id",
        )
        .bind(article_id)
        .bind(action.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(Box::new(e)))?;

        into_logs(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(Box::new(e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlx::postgres::PgSslMode;

    use super::*;

    fn row(action: &str) -> ArticleLogRow {
        ArticleLogRow {
            id: 7,
            user_id: "u1".to_string(),
            article_id: "a1".to_string(),
            action: action.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_into_log() {
        let log = ArticleLog::try_from(row("reading")).unwrap();
        assert_eq!(log.id, 7);
        assert_eq!(log.action, Action::Reading);
        assert_eq!(log.article_id, "a1");
    }

    #[test]
    fn row_with_unknown_action_is_a_query_error() {
        let result = ArticleLog::try_from(row("share"));
        assert!(matches!(result, Err(StoreError::Query(_))));
    }

    #[test]
    fn schema_statements_are_idempotent() {
        for statement in [CREATE_TABLE, CREATE_USER_INDEX, CREATE_ARTICLE_INDEX] {
            assert!(statement.contains("IF NOT EXISTS"));
        }
    }

    #[tokio::test]
    async fn unreachable_store_is_a_connection_error() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "pguser".to_string(),
            password: String::new(),
            dbname: "user-db".to_string(),
            ssl_mode: PgSslMode::Disable,
            max_connections: 1,
            acquire_timeout: Duration::from_millis(500),
        };

        let result = PostgresStore::connect(&config).await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
