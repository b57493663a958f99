/// Note model, database operations and payload normalization
///
/// Notes belong to a contact, and through it to a user. Request-serving
/// queries join on `contacts.user_id` so ownership is checked in SQL.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notes (
///     id BIGSERIAL PRIMARY KEY,
///     contact_id BIGINT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
///     body TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};

/// Keys accepted for the note text, in precedence order
pub const NOTE_BODY_KEYS: [&str; 3] = ["body", "note_body", "note_text"];

/// A note attached to a contact
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: i64,
    pub contact_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a note
#[derive(Debug, Clone)]
pub struct CreateNote {
    pub contact_id: i64,
    pub body: String,
}

/// Canonical form of an incoming note payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedNote {
    pub body: Option<String>,
}

/// Collapses the accepted body aliases into a single `body` field
///
/// The first key of [`NOTE_BODY_KEYS`] holding a non-empty string wins.
/// Empty strings and non-string values are treated as absent. Anything
/// other than a JSON object normalizes to `{"body": null}`.
pub fn normalize_note_data(data: Option<&Value>) -> NormalizedNote {
    let body = data.and_then(Value::as_object).and_then(|map| {
        NOTE_BODY_KEYS
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .map(str::to_owned)
    });

    NormalizedNote { body }
}

impl Note {
    pub async fn create(pool: &PgPool, data: CreateNote) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (contact_id, body)
            VALUES ($1, $2)
            RETURNING id, contact_id, body, created_at
            "#,
        )
        .bind(data.contact_id)
        .bind(data.body)
        .fetch_one(pool)
        .await
    }

    /// Lists the notes of a contact, oldest first
    ///
    /// Callers must have checked contact ownership.
    pub async fn list_by_contact(pool: &PgPool, contact_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            SELECT id, contact_id, body, created_at
            FROM notes
            WHERE contact_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(contact_id)
        .fetch_all(pool)
        .await
    }

    /// Finds a note by ID without any ownership check
    ///
    /// Generic over the executor so background tasks can read inside their
    /// own transaction.
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Note>(
            r#"
            SELECT id, contact_id, body, created_at
            FROM notes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a note under a contact owned by `user_id`
    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        contact_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            SELECT n.id, n.contact_id, n.body, n.created_at
            FROM notes n
            JOIN contacts c ON c.id = n.contact_id
            WHERE n.id = $1 AND n.contact_id = $2 AND c.user_id = $3
            "#,
        )
        .bind(id)
        .bind(contact_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the body of a note owned by `user_id`
    pub async fn update_body_for_user(
        pool: &PgPool,
        id: i64,
        contact_id: i64,
        user_id: i64,
        body: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes n
            SET body = $4
            FROM contacts c
            WHERE n.id = $1
              AND n.contact_id = $2
              AND c.id = n.contact_id
              AND c.user_id = $3
            RETURNING n.id, n.contact_id, n.body, n.created_at
            "#,
        )
        .bind(id)
        .bind(contact_id)
        .bind(user_id)
        .bind(body)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a note owned by `user_id`
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete_for_user(
        pool: &PgPool,
        id: i64,
        contact_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM notes n
            USING contacts c
            WHERE n.id = $1
              AND n.contact_id = $2
              AND c.id = n.contact_id
              AND c.user_id = $3
            "#,
        )
        .bind(id)
        .bind(contact_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
