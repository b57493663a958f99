/// Database models
///
/// - `user`: account credentials; owns contacts
/// - `contact`: a person the user keeps notes about; owns notes
/// - `note`: free-text note attached to a contact, plus input normalization
///
/// Ownership is enforced by the schema (`ON DELETE CASCADE`) and every
/// user-facing query filters by the owning user id.
///
/// # Example
///
/// ```no_run
/// use contactnotes_shared::models::contact::{Contact, CreateContact};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let contact = Contact::create(
///     &pool,
///     CreateContact {
///         user_id: 1,
///         name: "Ada Lovelace".to_string(),
///         email: Some("ada@example.com".to_string()),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod contact;
pub mod note;
pub mod user;
