use sqlx::sqlite::SqlitePool;
use thiserror::Error;

/// User store errors. Duplicate email is distinguished so signup can
/// re-render the form instead of reporting a server fault.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("email address is already in use")]
    DuplicateEmail,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    created: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            created: row.created,
        }
    }
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user with an already-hashed password. Returns the user ID.
    pub async fn insert(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<i64, UserError> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, hashed_password, created)
             VALUES (?, ?, ?, datetime('now'))",
        )
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                UserError::DuplicateEmail
            } else {
                UserError::Sqlx(e)
            }
        })?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by ID. The hashed password is never exposed here.
    pub async fn get(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, email, created FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Look up the stored credential for an email address.
    /// Returns the user ID and the stored password hash.
    pub async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(i64, String)>, sqlx::Error> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, hashed_password FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }
}
