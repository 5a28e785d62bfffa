use std::{path::Path, time::Duration};

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row};

use super::{parse_expected_labels, FeedbackEntry, StoreError, ValidationError};
use crate::classifier::LabelMap;

/// Opens (creating if needed) the feedback database and ensures the table exists.
pub async fn init_pool(db_path: &Path) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            comment TEXT,
            toxic INTEGER,
            severe_toxic INTEGER,
            obscene INTEGER,
            threat INTEGER,
            insult INTEGER,
            identity_hate INTEGER,
            timestamp DATETIME
        )
        "#,
    )
    .execute(&pool)
    .await?;

    log::info!("Feedback database ready at {}", db_path.display());
    Ok(pool)
}

/// Append-only access to the `feedback` table.
#[derive(Clone)]
pub struct FeedbackRepository {
    pool: SqlitePool,
}

impl FeedbackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Validates `expected_labels` and stores one row. Nothing is written
    /// when a label is unknown.
    pub async fn submit<S: AsRef<str>>(
        &self,
        comment: &str,
        expected_labels: &[S],
    ) -> Result<i64, StoreError> {
        let flags = parse_expected_labels(expected_labels)?;
        self.insert(comment, &flags).await
    }

    /// Stores one row stamped with the current time and returns its id.
    pub async fn insert(&self, comment: &str, labels: &LabelMap<bool>) -> Result<i64, StoreError> {
        let id = sqlx::query(
            r#"INSERT INTO feedback
                (comment, toxic, severe_toxic, obscene, threat, insult, identity_hate, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(comment)
        .bind(labels.toxic)
        .bind(labels.severe_toxic)
        .bind(labels.obscene)
        .bind(labels.threat)
        .bind(labels.insult)
        .bind(labels.identity_hate)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        log::debug!("Stored feedback entry {}", id);
        Ok(id)
    }

    pub async fn count_all(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM feedback"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Up to `limit` rows after skipping `offset`, in ascending id order.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<FeedbackEntry>, StoreError> {
        if limit < 0 {
            return Err(ValidationError::Negative { field: "limit", value: limit }.into());
        }
        if offset < 0 {
            return Err(ValidationError::Negative { field: "offset", value: offset }.into());
        }

        let rows = sqlx::query_as::<_, FeedbackEntry>(
            r#"SELECT id, comment, toxic, severe_toxic, obscene, threat, insult, identity_hate, timestamp
                FROM feedback
                ORDER BY id ASC
                LIMIT ?1 OFFSET ?2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

impl<'r> FromRow<'r, SqliteRow> for FeedbackEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            comment: row.try_get::<Option<String>, _>("comment")?.unwrap_or_default(),
            labels: LabelMap {
                toxic: flag(row, "toxic")?,
                severe_toxic: flag(row, "severe_toxic")?,
                obscene: flag(row, "obscene")?,
                threat: flag(row, "threat")?,
                insult: flag(row, "insult")?,
                identity_hate: flag(row, "identity_hate")?,
            },
            timestamp: row.try_get("timestamp")?,
        })
    }
}

fn flag(row: &SqliteRow, column: &str) -> Result<bool, sqlx::Error> {
    Ok(row.try_get::<Option<i64>, _>(column)?.unwrap_or(0) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository() -> (tempfile::TempDir, FeedbackRepository) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool(&dir.path().join("feedback.db")).await.unwrap();
        (dir, FeedbackRepository::new(pool))
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.db");
        let first = init_pool(&path).await.unwrap();
        FeedbackRepository::new(first.clone()).submit("hello", &["none"]).await.unwrap();
        first.close().await;

        let second = FeedbackRepository::new(init_pool(&path).await.unwrap());
        assert_eq!(second.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_increase() {
        let (_dir, repo) = repository().await;
        let a = repo.submit("first", &["toxic"]).await.unwrap();
        let b = repo.submit("second", &["insult"]).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_negative_pagination_rejected() {
        let (_dir, repo) = repository().await;
        assert!(matches!(
            repo.list(-1, 0).await,
            Err(StoreError::Validation(ValidationError::Negative { field: "limit", .. }))
        ));
        assert!(matches!(
            repo.list(10, -3).await,
            Err(StoreError::Validation(ValidationError::Negative { field: "offset", .. }))
        ));
    }
}
