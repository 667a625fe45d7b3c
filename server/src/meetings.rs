//! Meeting store accessor.
//!
//! Meetings are joined by a 6-character code, unique among active meetings.
//! The code is drawn at creation and re-drawn on collision a bounded number
//! of times; after the budget is spent the last draw is accepted and the
//! partial unique index has the final say.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bson::{DateTime, doc, oid::ObjectId};
use chrono::Utc;
use engine::{
    code::{CODE_RETRY_BUDGET, draw_code, normalize_code},
    meeting::{Meeting, Participant, ParticipantRole},
    motion::{DiscussionEntry, Stance},
};
use futures::stream::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    auth::AuthUser,
    error::AppError,
    state::AppState,
    utils::sanitize_name,
    views::{DiscussionView, MeetingView},
};

pub fn parse_meeting_id(input: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(input).map_err(|_| AppError::BadRequest("invalid meeting id".into()))
}

pub async fn load_meeting(state: &AppState, id: ObjectId) -> Result<Meeting, AppError> {
    state
        .meetings
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("meeting not found".into()))
}

async fn unique_code(state: &AppState) -> Result<String, AppError> {
    let mut code = draw_code(&mut rand::thread_rng());

    for _ in 0..CODE_RETRY_BUDGET {
        let taken = state
            .meetings
            .find_one(doc! { "code": code.as_str(), "active": true })
            .await?
            .is_some();
        if !taken {
            return Ok(code);
        }
        code = draw_code(&mut rand::thread_rng());
    }

    warn!("Join-code retry budget exhausted, accepting {code}");
    Ok(code)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    datetime: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    committee_ids: Option<Vec<String>>,
}

pub async fn create_meeting_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMeetingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = sanitize_name(payload.name.as_deref().unwrap_or_default());
    if name.is_empty() {
        return Err(AppError::BadRequest("meeting name is required".into()));
    }

    let scheduled_for = match payload.datetime.as_deref() {
        None | Some("") => None,
        Some(raw) => {
            let parsed = chrono::DateTime::parse_from_rfc3339(raw)
                .map_err(|_| AppError::BadRequest("datetime must be RFC 3339".into()))?;
            Some(DateTime::from_chrono(parsed.with_timezone(&Utc)))
        }
    };

    // Only keep references to committees that actually exist.
    let committee_ids = match payload.committee_ids {
        None => Vec::new(),
        Some(raw_ids) => {
            let parsed: Vec<ObjectId> = raw_ids
                .iter()
                .map(|raw| {
                    ObjectId::parse_str(raw)
                        .map_err(|_| AppError::BadRequest("invalid committee id".into()))
                })
                .collect::<Result<_, _>>()?;
            state
                .committees
                .find(doc! { "_id": { "$in": parsed } })
                .await?
                .try_collect::<Vec<_>>()
                .await?
                .into_iter()
                .map(|committee| committee.id)
                .collect()
        }
    };

    let code = unique_code(&state).await?;
    let mut meeting = Meeting::new(
        &name,
        payload.description.unwrap_or_default().trim(),
        scheduled_for,
        code,
        committee_ids,
        Some(user_id),
    );

    // The creator becomes the sole initial participant and presides.
    let creator = state.users.find_one(doc! { "_id": user_id }).await?;
    let creator_participant_id = creator.map(|user| {
        let participant = Participant::new(&user.name, Some(user.id), ParticipantRole::Chair);
        let participant_id = participant.id;
        meeting.participants.push(participant);
        meeting.presiding_participant = Some(participant_id);
        participant_id
    });

    state.meetings.insert_one(&meeting).await?;

    info!("Meeting '{name}' created with code {}", meeting.code);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "meetingId": meeting.id.to_hex(),
            "code": meeting.code,
            "creatorParticipantId": creator_participant_id.map(|id| id.to_hex()),
        })),
    ))
}

pub async fn list_meetings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let meetings = state
        .meetings
        .find(doc! { "active": true })
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    let views: Vec<MeetingView> = meetings.iter().map(Into::into).collect();

    Ok(Json(json!({ "meetings": views })))
}

pub async fn get_meeting_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meeting = load_meeting(&state, parse_meeting_id(&id)?).await?;

    Ok(Json(json!({ "meeting": MeetingView::from(&meeting) })))
}

pub async fn get_meeting_by_code_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meeting = state
        .meetings
        .find_one(doc! { "code": normalize_code(&code), "active": true })
        .await?
        .ok_or_else(|| AppError::NotFound("no active meeting with that code".into()))?;

    Ok(Json(json!({ "meeting": MeetingView::from(&meeting) })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingRequest {
    #[serde(default)]
    presiding_participant_id: Option<String>,
}

/// Chair reassignment. Every participant role is rewritten in one update so
/// the one-chair invariant cannot be violated by a partial write.
pub async fn update_meeting_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMeetingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meeting_id = parse_meeting_id(&id)?;

    let raw = payload
        .presiding_participant_id
        .ok_or_else(|| AppError::BadRequest("presidingParticipantId is required".into()))?;
    let participant_id = ObjectId::parse_str(&raw)
        .map_err(|_| AppError::BadRequest("invalid participant id".into()))?;

    let mut meeting = load_meeting(&state, meeting_id).await?;

    if !meeting.assign_chair(participant_id) {
        return Err(AppError::NotFound("participant not found".into()));
    }

    state
        .meetings
        .update_one(
            doc! { "_id": meeting_id },
            doc! { "$set": {
                "participants": bson::to_bson(&meeting.participants).map_err(AppError::internal)?,
                "presidingParticipant": participant_id,
            } },
        )
        .await?;

    Ok(Json(json!({ "meeting": MeetingView::from(&meeting) })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

pub async fn join_meeting_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meeting_id = parse_meeting_id(&id)?;

    let display_name = sanitize_name(payload.display_name.as_deref().unwrap_or_default());
    if display_name.is_empty() {
        return Err(AppError::BadRequest("display name is required".into()));
    }

    let user_id = match payload.user_id.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            ObjectId::parse_str(raw)
                .map_err(|_| AppError::BadRequest("invalid user id".into()))?,
        ),
    };

    let participant = Participant::new(&display_name, user_id, ParticipantRole::Member);

    let result = state
        .meetings
        .update_one(
            doc! { "_id": meeting_id, "active": true },
            doc! { "$push": { "participants": bson::to_bson(&participant).map_err(AppError::internal)? } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("no active meeting to join".into()));
    }

    Ok(Json(json!({ "participantId": participant.id.to_hex() })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    #[serde(default)]
    participant_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

pub async fn leave_meeting_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<LeaveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meeting_id = parse_meeting_id(&id)?;
    let mut meeting = load_meeting(&state, meeting_id).await?;

    // Leave by participant id, or by linked account for the signed-in case.
    let target = match (payload.participant_id.as_deref(), payload.user_id.as_deref()) {
        (Some(raw), _) if !raw.is_empty() => {
            let pid = ObjectId::parse_str(raw)
                .map_err(|_| AppError::BadRequest("invalid participant id".into()))?;
            meeting.participant(pid).map(|p| p.id)
        }
        (_, Some(raw)) if !raw.is_empty() => {
            let uid = ObjectId::parse_str(raw)
                .map_err(|_| AppError::BadRequest("invalid user id".into()))?;
            meeting.participant_by_user(uid).map(|p| p.id)
        }
        _ => {
            return Err(AppError::BadRequest(
                "participantId or userId is required".into(),
            ));
        }
    };

    let participant_id =
        target.ok_or_else(|| AppError::NotFound("participant not found".into()))?;
    meeting.remove_participant(participant_id);

    let update = match meeting.presiding_participant {
        Some(presiding) => doc! { "$set": {
            "participants": bson::to_bson(&meeting.participants).map_err(AppError::internal)?,
            "presidingParticipant": presiding,
        } },
        None => doc! {
            "$set": { "participants": bson::to_bson(&meeting.participants).map_err(AppError::internal)? },
            "$unset": { "presidingParticipant": "" },
        },
    };

    state
        .meetings
        .update_one(doc! { "_id": meeting_id }, update)
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDiscussRequest {
    #[serde(default)]
    participant_id: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    stance: Option<String>,
}

/// General discussion attached to the meeting rather than to any motion.
pub async fn discuss_meeting_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<MeetingDiscussRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meeting_id = parse_meeting_id(&id)?;
    let meeting = load_meeting(&state, meeting_id).await?;

    let participant_id = ObjectId::parse_str(payload.participant_id.as_deref().unwrap_or_default())
        .map_err(|_| AppError::BadRequest("invalid participant id".into()))?;
    let participant = meeting
        .participant(participant_id)
        .ok_or_else(|| AppError::NotFound("participant not found".into()))?;

    let comment = payload.comment.as_deref().unwrap_or_default().trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest("comment cannot be empty".into()));
    }

    let stance = match payload.stance.as_deref() {
        None | Some("") => Stance::Neutral,
        Some(input) => Stance::parse(input)
            .ok_or_else(|| AppError::BadRequest("stance must be pro, con, or neutral".into()))?,
    };

    let entry = DiscussionEntry::new(participant_id, &participant.display_name, comment, stance);

    state
        .meetings
        .update_one(
            doc! { "_id": meeting_id },
            doc! { "$push": { "discussion": bson::to_bson(&entry).map_err(AppError::internal)? } },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "entry": DiscussionView::from(&entry) })),
    ))
}
