/// Contact endpoints
///
/// Every query is scoped to the authenticated user; another user's contact
/// is reported as not found.
///
/// - `POST   /contacts`
/// - `GET    /contacts`
/// - `GET    /contacts/:contact_id`
/// - `PUT    /contacts/:contact_id`
/// - `DELETE /contacts/:contact_id` (removes the contact's notes too)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::present,
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    Json,
};
use contactnotes_shared::{
    auth::middleware::AuthContext,
    models::contact::{Contact, CreateContact, UpdateContact},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use validator::Validate;

pub(crate) const CONTACT_NOT_FOUND: &str = "Contact not found";
const NAME_REQUIRED: &str = "Name is required";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(
        required(message = "Name is required"),
        length(max = 80, message = "Name must be at most 80 characters")
    )]
    pub name: Option<String>,

    #[validate(length(max = 120, message = "Email must be at most 120 characters"))]
    pub email: Option<String>,
}

/// Partial update; an explicit `"email": null` clears the email
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 80, message = "Name must be between 1 and 80 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub email: Option<Option<String>>,
}

/// Distinguishes a missing field (`None`) from `null` (`Some(None)`)
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// True when the body carries a non-blank `name`; non-string names count
/// as present so the type error is reported instead
fn has_name(body: &Value) -> bool {
    match body.get("name") {
        None | Some(Value::Null) => false,
        Some(Value::String(name)) => !name.trim().is_empty(),
        Some(_) => true,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactResponse {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            email: contact.email,
        }
    }
}

pub async fn create_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let value = payload.ok().map(|Json(value)| value).unwrap_or(Value::Null);
    if !has_name(&value) {
        return Err(ApiError::BadRequest(NAME_REQUIRED.to_string()));
    }

    let req: CreateContactRequest = serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    let req = CreateContactRequest {
        name: present(req.name),
        email: req.email,
    };
    req.validate()?;

    let name = req
        .name
        .ok_or_else(|| ApiError::BadRequest(NAME_REQUIRED.to_string()))?;

    let contact = Contact::create(
        &state.db,
        CreateContact {
            user_id: auth.user_id,
            name,
            email: req.email,
        },
    )
    .await?;

    tracing::debug!(user_id = auth.user_id, contact_id = contact.id, "Contact created");

    Ok((StatusCode::CREATED, Json(contact.into())))
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ContactResponse>>> {
    let contacts = Contact::list_by_user(&state.db, auth.user_id).await?;

    Ok(Json(contacts.into_iter().map(Into::into).collect()))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
) -> ApiResult<Json<ContactResponse>> {
    let contact = Contact::find_for_user(&state.db, contact_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(CONTACT_NOT_FOUND.to_string()))?;

    Ok(Json(contact.into()))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
    payload: Result<Json<UpdateContactRequest>, JsonRejection>,
) -> ApiResult<Json<ContactResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let contact = Contact::update_for_user(
        &state.db,
        contact_id,
        auth.user_id,
        UpdateContact {
            name: req.name,
            email: req.email,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(CONTACT_NOT_FOUND.to_string()))?;

    Ok(Json(contact.into()))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !Contact::delete_for_user(&state.db, contact_id, auth.user_id).await? {
        return Err(ApiError::NotFound(CONTACT_NOT_FOUND.to_string()));
    }

    tracing::debug!(user_id = auth.user_id, contact_id, "Contact deleted");

    Ok(Json(json!({ "message": "Contact deleted successfully" })))
}
