//! Opening the fee database and applying its schema.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("schema.sql");

/// Bumped whenever `schema.sql` changes shape. Stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Opens (creating if needed) the fee database and applies the schema.
///
/// # Errors
/// Fails if the parent directory cannot be created, the file cannot be
/// opened, or a schema statement is rejected.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;

    info!(path = db_path, version = SCHEMA_VERSION, "fee database ready");
    Ok(pool)
}

/// Applies every schema statement and records the version, all in one
/// transaction. Statements are `IF NOT EXISTS`, so reruns are no-ops.
async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in schema_statements(SCHEMA) {
        debug!(statement = %statement, "applying schema statement");
        sqlx::query(&statement).execute(&mut *tx).await?;
    }
    let set_version = format!("PRAGMA user_version = {}", SCHEMA_VERSION);
    sqlx::query(&set_version).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(())
}

/// Splits a SQL script into statements. `--` comments are dropped first so
/// punctuation inside them never ends a statement. String literals in the
/// script must not contain `--` or `;`.
fn schema_statements(script: &str) -> Vec<String> {
    let without_comments = script
        .lines()
        .map(|line| match line.find("--") {
            Some(start) => &line[..start],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_path(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().to_string()
    }

    #[test]
    fn test_comment_punctuation_does_not_split_statements() {
        let script = "-- first; second\nCREATE TABLE a (x INTEGER); -- trailing; note\n\n-- only a comment;\nCREATE TABLE b (y TEXT);\n";
        assert_eq!(
            schema_statements(script),
            vec!["CREATE TABLE a (x INTEGER)", "CREATE TABLE b (y TEXT)"]
        );
    }

    #[test]
    fn test_bundled_schema_statements() {
        let statements = schema_statements(SCHEMA);
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| s.starts_with("CREATE ")));
    }

    #[tokio::test]
    async fn test_init_db_creates_nested_database() {
        let temp_dir = TempDir::new().unwrap();
        let path = db_path(&temp_dir, "state/fees/fees.db");

        let pool = init_db(&path).await.expect("init_db failed");
        assert!(Path::new(&path).exists());

        let result: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);
    }

    #[tokio::test]
    async fn test_init_db_reports_unusable_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("blocker"), b"not a directory").unwrap();
        let path = db_path(&temp_dir, "blocker/fees.db");

        let err = init_db(&path).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::Io(_)), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_schema_creates_fee_tables() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir, "fees.db")).await.unwrap();

        let columns: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info('performance_fees') ORDER BY cid")
                .fetch_all(&pool)
                .await
                .unwrap();
        let columns: Vec<&str> = columns.iter().map(|c| c.0.as_str()).collect();
        assert_eq!(
            columns,
            vec![
                "fund_id",
                "rate",
                "high_water_mark",
                "last_share_price",
                "aggregate_value_due",
                "shares_outstanding",
                "created_at"
            ]
        );

        let index: (String,) = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_settlements_fund'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(index.0, "idx_settlements_fund");
    }

    #[tokio::test]
    async fn test_settlement_log_rejects_unknown_fee_kind() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir, "fees.db")).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO settlements (fund_id, fee_kind, hook, shares_due, settled_at, created_at) \
             VALUES ('fund-a', 'custody', NULL, '0', 0, 0)",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reopening_keeps_schema_and_version() {
        let temp_dir = TempDir::new().unwrap();
        let path = db_path(&temp_dir, "fees.db");
        let pool = init_db(&path).await.unwrap();
        apply_schema(&pool).await.expect("second schema run failed");
        pool.close().await;

        let pool = init_db(&path).await.expect("reopen failed");
        let version: (i64,) = sqlx::query_as("PRAGMA user_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version.0, SCHEMA_VERSION);

        let tables: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE '%fees'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables.0, 2);
    }

    #[tokio::test]
    async fn test_connection_options_applied() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir, "fees.db")).await.unwrap();

        let foreign_keys: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(foreign_keys.0, 1);

        let journal: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(matches!(journal.0.as_str(), "wal" | "delete"), "journal_mode {}", journal.0);
    }
}
