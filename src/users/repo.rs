use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Stored user record. `password` holds a hex digest, never the plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub birth_date: Date,
    pub email: String,
    pub password: String,
    pub address: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated input for an insert; the repository assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub birth_date: Date,
    pub email: String,
    pub password: String,
    pub address: String,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("store timed out")]
    Timeout,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return RepoError::DuplicateEmail;
            }
        }
        RepoError::Database(err)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn email_taken(&self, email: &str) -> Result<bool, RepoError>;
    async fn email_taken_by_other(&self, email: &str, id: Uuid) -> Result<bool, RepoError>;
    async fn insert(&self, new: NewUser) -> Result<User, RepoError>;
    async fn replace(&self, user: User) -> Result<User, RepoError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}

const DB_TIMEOUT: Duration = Duration::from_secs(5);

async fn with_timeout<T>(
    fut: impl Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, RepoError> {
    match tokio::time::timeout(DB_TIMEOUT, fut).await {
        Ok(result) => result.map_err(RepoError::from),
        Err(_) => Err(RepoError::Timeout),
    }
}

/// Postgres-backed repository. The `users_email_key` unique index is the
/// authoritative uniqueness guarantee; advisory checks in the service can
/// lose races that end up here as `DuplicateEmail`.
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        with_timeout(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, birth_date, email, password, address, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn email_taken(&self, email: &str) -> Result<bool, RepoError> {
        with_timeout(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.db),
        )
        .await
    }

    async fn email_taken_by_other(&self, email: &str, id: Uuid) -> Result<bool, RepoError> {
        with_timeout(
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn insert(&self, new: NewUser) -> Result<User, RepoError> {
        let now = OffsetDateTime::now_utc();
        with_timeout(
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, name, birth_date, email, password, address, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                RETURNING id, name, birth_date, email, password, address, created_at, updated_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(new.birth_date)
            .bind(&new.email)
            .bind(&new.password)
            .bind(&new.address)
            .bind(now)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn replace(&self, user: User) -> Result<User, RepoError> {
        let now = OffsetDateTime::now_utc();
        with_timeout(
            sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET name = $2, birth_date = $3, email = $4, password = $5, address = $6,
                    updated_at = $7
                WHERE id = $1
                RETURNING id, name, birth_date, email, password, address, created_at, updated_at
                "#,
            )
            .bind(user.id)
            .bind(&user.name)
            .bind(user.birth_date)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.address)
            .bind(now)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        with_timeout(
            async {
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(&self.db)
                    .await?;
                Ok(())
            },
        )
        .await
    }
}
