//! Committee store accessor.
//!
//! The member list embedded in the committee document is the single source of
//! truth for membership. "My committees" is the query `members.userId == me`,
//! so there is no per-user membership list to keep in sync and nothing to
//! purge when a committee is deleted.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bson::{doc, oid::ObjectId};
use engine::committee::{Committee, CommitteeMember, CommitteeRole};
use futures::stream::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::AuthUser,
    error::{AppError, duplicate_key},
    state::AppState,
    utils::{normalize_email, sanitize_name},
    views::{CommitteeSummaryView, CommitteeView},
};

fn parse_committee_id(input: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(input).map_err(|_| AppError::BadRequest("invalid committee id".into()))
}

async fn load_committee(state: &AppState, id: ObjectId) -> Result<Committee, AppError> {
    state
        .committees
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("committee not found".into()))
}

/// Committee document plus member entries enriched from the users
/// collection.
async fn enriched_view(state: &AppState, committee: &Committee) -> Result<CommitteeView, AppError> {
    let member_ids: Vec<ObjectId> = committee.members.iter().map(|m| m.user_id).collect();

    let users = state
        .users
        .find(doc! { "_id": { "$in": member_ids } })
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    Ok(CommitteeView::enriched(committee, &users))
}

#[derive(Deserialize)]
pub struct CreateCommitteeRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub async fn create_committee_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateCommitteeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = sanitize_name(payload.name.as_deref().unwrap_or_default());
    if name.is_empty() {
        return Err(AppError::BadRequest("committee name is required".into()));
    }
    let description = payload.description.unwrap_or_default();

    let committee = Committee::new(&name, description.trim(), user_id);

    match state.committees.insert_one(&committee).await {
        Ok(_) => {}
        Err(e) if duplicate_key(&e) => {
            return Err(AppError::Conflict("committee name already in use".into()));
        }
        Err(e) => return Err(e.into()),
    }

    info!("Committee '{name}' created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "committee": enriched_view(&state, &committee).await? })),
    ))
}

pub async fn list_committees_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let committees = state
        .committees
        .find(doc! { "members.userId": user_id })
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    let views: Vec<CommitteeSummaryView> = committees.iter().map(Into::into).collect();

    Ok(Json(json!({ "committees": views })))
}

pub async fn get_committee_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let committee = load_committee(&state, parse_committee_id(&id)?).await?;

    Ok(Json(json!({ "committee": enriched_view(&state, &committee).await? })))
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

pub async fn add_member_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let committee_id = parse_committee_id(&id)?;

    let role = match payload.role.as_deref() {
        None | Some("") => CommitteeRole::Member,
        Some(input) => CommitteeRole::parse(input)
            .ok_or_else(|| AppError::BadRequest("role must be owner, chair, or member".into()))?,
    };

    let committee = load_committee(&state, committee_id).await?;

    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    let user = state
        .users
        .find_one(doc! { "email": email.as_str() })
        .await?
        .ok_or_else(|| AppError::NotFound("no user with that email".into()))?;

    if committee.member(user.id).is_some() {
        return Err(AppError::Conflict("already a member".into()));
    }

    let member = CommitteeMember::new(user.id, role);

    // The $ne guard makes a concurrent double-add a no-op instead of a
    // duplicate entry.
    state
        .committees
        .update_one(
            doc! { "_id": committee_id, "members.userId": { "$ne": user.id } },
            doc! { "$push": { "members": bson::to_bson(&member).map_err(AppError::internal)? } },
        )
        .await?;

    let committee = load_committee(&state, committee_id).await?;

    Ok(Json(json!({ "committee": enriched_view(&state, &committee).await? })))
}

#[derive(Deserialize)]
pub struct UpdateMemberRequest {
    #[serde(default)]
    role: Option<String>,
}

pub async fn update_member_role_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path((id, uid)): Path<(String, String)>,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let committee_id = parse_committee_id(&id)?;
    let member_id =
        ObjectId::parse_str(&uid).map_err(|_| AppError::BadRequest("invalid member id".into()))?;

    let role = CommitteeRole::parse(payload.role.as_deref().unwrap_or_default())
        .ok_or_else(|| AppError::BadRequest("role must be owner, chair, or member".into()))?;

    let committee = load_committee(&state, committee_id).await?;
    if committee.member(member_id).is_none() {
        return Err(AppError::NotFound("member not found".into()));
    }

    state
        .committees
        .update_one(
            doc! { "_id": committee_id },
            doc! { "$set": { "members.$[member].role": bson::to_bson(&role).map_err(AppError::internal)? } },
        )
        .array_filters(vec![doc! { "member.userId": member_id }])
        .await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn remove_member_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path((id, uid)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let committee_id = parse_committee_id(&id)?;
    let member_id =
        ObjectId::parse_str(&uid).map_err(|_| AppError::BadRequest("invalid member id".into()))?;

    let result = state
        .committees
        .update_one(
            doc! { "_id": committee_id },
            doc! { "$pull": { "members": { "userId": member_id } } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("committee not found".into()));
    }
    if result.modified_count == 0 {
        return Err(AppError::NotFound("member not found".into()));
    }

    Ok(Json(json!({ "success": true })))
}

pub async fn delete_committee_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let committee_id = parse_committee_id(&id)?;

    let result = state
        .committees
        .delete_one(doc! { "_id": committee_id })
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("committee not found".into()));
    }

    info!("Committee {committee_id} deleted");

    Ok(Json(json!({ "success": true })))
}
