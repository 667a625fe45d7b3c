//! Registration, login, and the authenticated profile.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use bson::doc;
use engine::user::User;
use mongodb::options::ReturnDocument;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{AuthUser, hash_password, mint_token, verify_password},
    error::{AppError, duplicate_key},
    state::AppState,
    utils::{normalize_email, sanitize_name, valid_email},
    views::UserView,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = sanitize_name(payload.name.as_deref().unwrap_or_default());
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    if !valid_email(&email) {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }

    let password = payload.password.unwrap_or_default();
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let user = User::new(&name, &email, hash_password(&password)?);

    // The unique index on email is the real guard; a racing duplicate comes
    // back as a write error.
    match state.users.insert_one(&user).await {
        Ok(_) => {}
        Err(e) if duplicate_key(&e) => {
            return Err(AppError::Conflict("email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    }

    info!("Registered {email}");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": UserView::from(&user) })),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    let user = state
        .users
        .find_one(doc! { "email": email.as_str() })
        .await?
        .filter(|user| verify_password(&password, &user.password_hash))
        .ok_or_else(|| AppError::Unauthorized("invalid email or password".into()))?;

    let token = mint_token(
        user.id,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    Ok(Json(json!({ "token": token, "user": UserView::from(&user) })))
}

pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    Ok(Json(json!({ "user": UserView::from(&user) })))
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    bio: Option<String>,
}

pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut changes = doc! {};

    if let Some(name) = payload.name {
        let name = sanitize_name(&name);
        if name.is_empty() {
            return Err(AppError::BadRequest("name cannot be blank".into()));
        }
        changes.insert("name", name);
    }
    if let Some(phone) = payload.phone {
        changes.insert("phone", phone.trim());
    }
    if let Some(bio) = payload.bio {
        changes.insert("bio", bio.trim());
    }

    if changes.is_empty() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }

    let user = state
        .users
        .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": changes })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    Ok(Json(json!({ "user": UserView::from(&user) })))
}
