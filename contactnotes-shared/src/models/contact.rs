/// Contact model and database operations
///
/// Every query that serves a request is scoped by `user_id`, so a contact
/// belonging to another user is indistinguishable from a missing one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE contacts (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(80) NOT NULL,
///     email VARCHAR(120),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A contact owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    pub name: String,

    pub email: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a contact
#[derive(Debug, Clone)]
pub struct CreateContact {
    pub user_id: i64,
    pub name: String,
    pub email: Option<String>,
}

/// Partial update of a contact
///
/// `None` leaves a field untouched. For `email`, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateContact {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
}

impl Contact {
    pub async fn create(pool: &PgPool, data: CreateContact) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (user_id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, email, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.name)
        .bind(data.email)
        .fetch_one(pool)
        .await
    }

    /// Lists all contacts of a user, oldest first
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, user_id, name, email, created_at
            FROM contacts
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Finds a contact by ID if it belongs to `user_id`
    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, user_id, name, email, created_at
            FROM contacts
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Applies a partial update; returns `None` if the contact is not owned by `user_id`
    pub async fn update_for_user(
        pool: &PgPool,
        id: i64,
        user_id: i64,
        data: UpdateContact,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (email_provided, email) = match data.email {
            Some(email) => (true, email),
            None => (false, None),
        };

        sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET
                name = COALESCE($3, name),
                email = CASE WHEN $4 THEN $5 ELSE email END
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, email, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.name)
        .bind(email_provided)
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a contact owned by `user_id`; its notes go with it
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete_for_user(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
