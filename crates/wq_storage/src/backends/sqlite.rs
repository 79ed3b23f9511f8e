use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use wq_core::{Error, QuizArtifact, QuizStorage, QuizSummary, Result, StoredQuiz};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS quizzes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        key_entities TEXT NOT NULL,
        sections TEXT NOT NULL,
        quiz TEXT NOT NULL,
        related_topics TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_quizzes_url ON quizzes (url)",
    // Add future migrations here
];

/// One row per generated quiz; list-valued fields are stored as JSON text.
pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

fn storage_error(context: &str, err: sqlx::Error) -> Error {
    Error::Storage(format!("{}: {}", context, err))
}

fn column<T>(row: &SqliteRow, name: &str) -> Result<T>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| storage_error(&format!("Failed to read column '{}'", name), e))
}

fn json_column<T: serde::de::DeserializeOwned>(row: &SqliteRow, name: &str) -> Result<T> {
    let raw: String = column(row, name)?;
    Ok(serde_json::from_str(&raw)?)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("Failed to parse timestamp '{}': {}", raw, e)))
}

fn row_to_stored(row: &SqliteRow) -> Result<StoredQuiz> {
    let created_at: String = column(row, "created_at")?;
    Ok(StoredQuiz {
        id: column(row, "id")?,
        created_at: parse_timestamp(&created_at)?,
        artifact: QuizArtifact {
            url: column(row, "url")?,
            title: column(row, "title")?,
            summary: column(row, "summary")?,
            key_entities: json_column(row, "key_entities")?,
            sections: json_column(row, "sections")?,
            quiz: json_column(row, "quiz")?,
            related_topics: json_column(row, "related_topics")?,
        },
    })
}

/// Resolve a `DATABASE_URL` setting to a database file. Accepts a plain path
/// or a `sqlite:` URL, where `sqlite:///rel.db` is relative to the working
/// directory and `sqlite:////abs.db` is absolute. Query parameters are dropped.
pub fn database_path(url: &str) -> PathBuf {
    let url = url.trim();
    let Some(rest) = url
        .strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return PathBuf::from(url);
    };
    let path = rest.split_once('?').map_or(rest, |(path, _)| path);
    PathBuf::from(path)
}

impl SQLiteStorage {
    /// Open the database named by a path or `sqlite:` URL.
    pub async fn new_with_url(url: &str) -> Result<Self> {
        Self::new_with_path(database_path(url)).await
    }

    pub async fn new_with_path(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| storage_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| storage_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self { pool, db_path })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl QuizStorage for SQLiteStorage {
    async fn save(&self, artifact: &QuizArtifact) -> Result<StoredQuiz> {
        let created_at = Utc::now();
        let timestamp = created_at.to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO quizzes
            (url, title, summary, key_entities, sections, quiz, related_topics, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artifact.url)
        .bind(&artifact.title)
        .bind(&artifact.summary)
        .bind(serde_json::to_string(&artifact.key_entities)?)
        .bind(serde_json::to_string(&artifact.sections)?)
        .bind(serde_json::to_string(&artifact.quiz)?)
        .bind(serde_json::to_string(&artifact.related_topics)?)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to store quiz", e))?;

        Ok(StoredQuiz {
            id: result.last_insert_rowid(),
            created_at,
            artifact: artifact.clone(),
        })
    }

    async fn get(&self, id: i64) -> Result<Option<StoredQuiz>> {
        let row = sqlx::query("SELECT * FROM quizzes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to load quiz", e))?;

        row.as_ref().map(row_to_stored).transpose()
    }

    async fn list(&self) -> Result<Vec<QuizSummary>> {
        let rows = sqlx::query("SELECT id, url, title, created_at FROM quizzes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to list quizzes", e))?;

        rows.iter()
            .map(|row| {
                let created_at: String = column(row, "created_at")?;
                Ok(QuizSummary {
                    id: column(row, "id")?,
                    url: column(row, "url")?,
                    title: column(row, "title")?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}
