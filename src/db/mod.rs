// Database access layer (SQLite via sqlx).

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::scores::ScoreRecord;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every connection to `sqlite::memory:` gets its own database, so an
        // in-memory store must live on exactly one connection that is never
        // recycled.
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(database_url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                score INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scores_score ON scores(score DESC, id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Close the pool. Operations issued afterwards fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    // ── Scores ────────────────────────────────────────────────────────

    pub async fn add_score(&self, record: &ScoreRecord) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO scores (score, timestamp) VALUES (?, ?)")
            .bind(record.score)
            .bind(&record.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Highest `limit` scores, descending. Equal scores keep insertion order.
    pub async fn top_scores(&self, limit: i64) -> Result<Vec<i64>, sqlx::Error> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.max(0);
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT score FROM scores ORDER BY score DESC, id ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_scores(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM scores")
            .fetch_one(&self.pool)
            .await
    }

    /// All stored records in insertion order.
    pub async fn list_scores(&self) -> Result<Vec<ScoreRecord>, sqlx::Error> {
        sqlx::query_as::<_, ScoreRecord>("SELECT score, timestamp FROM scores ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::TOP_SCORES_LIMIT;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    async fn add_all(db: &Database, scores: &[i64]) {
        for (i, s) in scores.iter().enumerate() {
            db.add_score(&ScoreRecord::new(*s, format!("2025-01-01T00:00:{i:02}")))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_scores() {
        let db = test_db().await;
        let top = db.top_scores(TOP_SCORES_LIMIT).await.unwrap();
        assert!(top.is_empty());
        assert_eq!(db.count_scores().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_score() {
        let db = test_db().await;
        add_all(&db, &[100]).await;
        assert_eq!(db.top_scores(TOP_SCORES_LIMIT).await.unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn test_top_five_descending() {
        let db = test_db().await;
        add_all(&db, &[50, 75, 100, 25, 90, 85]).await;

        let top = db.top_scores(TOP_SCORES_LIMIT).await.unwrap();
        assert_eq!(top, vec![100, 90, 85, 75, 50]);
        assert_eq!(db.count_scores().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_fewer_than_limit_returns_all() {
        let db = test_db().await;
        add_all(&db, &[3, 9, 1]).await;
        assert_eq!(db.top_scores(5).await.unwrap(), vec![9, 3, 1]);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let db = test_db().await;
        add_all(&db, &[10, 10, 10, 5]).await;
        assert_eq!(db.top_scores(5).await.unwrap(), vec![10, 10, 10, 5]);

        let all = db.list_scores().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].timestamp, "2025-01-01T00:00:00");
    }

    #[tokio::test]
    async fn test_custom_and_degenerate_limits() {
        let db = test_db().await;
        add_all(&db, &[1, 2, 3, 4, 5, 6, 7]).await;

        assert_eq!(db.top_scores(2).await.unwrap(), vec![7, 6]);
        assert!(db.top_scores(0).await.unwrap().is_empty());
        assert!(db.top_scores(-1).await.unwrap().is_empty());
        assert_eq!(db.top_scores(100).await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_negative_scores_sort_below_zero() {
        let db = test_db().await;
        add_all(&db, &[-5, 0, -1, 3]).await;
        assert_eq!(db.top_scores(5).await.unwrap(), vec![3, 0, -1, -5]);
    }

    #[tokio::test]
    async fn test_query_is_idempotent() {
        let db = test_db().await;
        add_all(&db, &[4, 8, 8, 2, 6, 1]).await;

        let first = db.top_scores(TOP_SCORES_LIMIT).await.unwrap();
        let second = db.top_scores(TOP_SCORES_LIMIT).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_closed_store_fails() {
        let db = test_db().await;
        db.close().await;
        assert!(db.is_closed());

        let err = db.add_score(&ScoreRecord::new(1, "t")).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::PoolClosed));
        assert!(db.top_scores(5).await.is_err());
    }

    #[tokio::test]
    async fn test_scores_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("scores.db").display());

        let db = Database::new(&url).await.unwrap();
        add_all(&db, &[42, 17]).await;
        db.close().await;

        let reopened = Database::new(&url).await.unwrap();
        assert_eq!(reopened.top_scores(5).await.unwrap(), vec![42, 17]);
    }
}
