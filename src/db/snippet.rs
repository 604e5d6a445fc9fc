use sqlx::sqlite::SqlitePool;

/// How many snippets the home page lists.
const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: String,
    pub expires: String,
}

#[derive(sqlx::FromRow)]
struct SnippetRow {
    id: i64,
    title: String,
    content: String,
    created: String,
    expires: String,
}

impl From<SnippetRow> for Snippet {
    fn from(row: SnippetRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created: row.created,
            expires: row.expires,
        }
    }
}

#[derive(Clone)]
pub struct SnippetStore {
    pool: SqlitePool,
}

impl SnippetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a snippet expiring `days` from now. Returns the snippet ID.
    pub async fn insert(
        &self,
        title: &str,
        content: &str,
        days: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO snippets (title, content, created, expires)
             VALUES (?, ?, datetime('now'), datetime('now', '+' || ? || ' days'))",
        )
        .bind(title)
        .bind(content)
        .bind(days)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a snippet by ID. Expired snippets read as absent.
    pub async fn get(&self, id: i64) -> Result<Option<Snippet>, sqlx::Error> {
        let row: Option<SnippetRow> = sqlx::query_as(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE expires > datetime('now') AND id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Snippet::from))
    }

    /// The most recently created live snippets, newest first.
    pub async fn latest(&self) -> Result<Vec<Snippet>, sqlx::Error> {
        let rows: Vec<SnippetRow> = sqlx::query_as(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE expires > datetime('now') ORDER BY created DESC, id DESC LIMIT ?",
        )
        .bind(LATEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Snippet::from).collect())
    }
}
