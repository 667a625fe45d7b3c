//! Motion lifecycle and voting.
//!
//! All motion state lives inside the meeting document, so every mutation here
//! is a single-document update. The two update shapes that matter:
//!
//! - **Casting**: a $pull of the participant's old entry from all three vote
//!   lists followed by a $push of the new one. Concurrent casts by different
//!   participants never touch each other's entries.
//! - **Closing**: one $set guarded by an array filter on `status ==
//!   "voting"`. Two concurrent closes cannot both match; the loser sees a
//!   modified count of zero and reports the conflict instead of recomputing a
//!   result over a closed motion.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bson::{doc, oid::ObjectId};
use engine::{
    meeting::Meeting,
    motion::{DiscussionEntry, Motion, MotionResult, MotionStatus, MotionType, Stance, VoteChoice, VoteEntry},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::AppError,
    meetings::{load_meeting, parse_meeting_id},
    state::AppState,
    utils::sanitize_name,
    views::MotionView,
};

fn parse_motion_id(input: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(input).map_err(|_| AppError::BadRequest("invalid motion id".into()))
}

fn parse_participant_id(input: Option<&str>) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(input.unwrap_or_default())
        .map_err(|_| AppError::BadRequest("invalid participant id".into()))
}

fn motion_of<'a>(meeting: &'a Meeting, motion_id: ObjectId) -> Result<&'a Motion, AppError> {
    meeting
        .motion(motion_id)
        .ok_or_else(|| AppError::NotFound("motion not found".into()))
}

/// Re-reads the meeting and returns the motion's current view.
async fn reloaded_motion_view(
    state: &AppState,
    meeting_id: ObjectId,
    motion_id: ObjectId,
) -> Result<MotionView, AppError> {
    let meeting = load_meeting(state, meeting_id).await?;
    Ok(MotionView::from(motion_of(&meeting, motion_id)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMotionRequest {
    #[serde(default)]
    meeting_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    parent_motion_id: Option<String>,
    #[serde(default)]
    proposed: Option<bool>,
}

pub async fn create_motion_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMotionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meeting_id = parse_meeting_id(payload.meeting_id.as_deref().unwrap_or_default())?;

    let title = sanitize_name(payload.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return Err(AppError::BadRequest("motion title is required".into()));
    }

    let kind = match payload.kind.as_deref() {
        None | Some("") => MotionType::Main,
        Some(input) => MotionType::parse(input).ok_or_else(|| {
            AppError::BadRequest(
                "type must be main, procedural, amendment, postpone, special, or overturn".into(),
            )
        })?,
    };

    let parent_motion = match payload.parent_motion_id.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            ObjectId::parse_str(raw)
                .map_err(|_| AppError::BadRequest("invalid parent motion id".into()))?,
        ),
    };

    let motion = Motion::new(
        &title,
        payload.description.unwrap_or_default().trim(),
        kind,
        parent_motion,
        payload.proposed.unwrap_or(false),
    );

    let result = state
        .meetings
        .update_one(
            doc! { "_id": meeting_id },
            doc! { "$push": { "motions": bson::to_bson(&motion).map_err(AppError::internal)? } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("meeting not found".into()));
    }

    info!("Motion '{title}' opened on meeting {meeting_id}");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "motion": MotionView::from(&motion) })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    meeting_id: Option<String>,
    #[serde(default)]
    participant_id: Option<String>,
    #[serde(default)]
    vote: Option<String>,
}

pub async fn vote_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let motion_id = parse_motion_id(&id)?;
    let meeting_id = parse_meeting_id(payload.meeting_id.as_deref().unwrap_or_default())?;
    let participant_id = parse_participant_id(payload.participant_id.as_deref())?;

    let choice = VoteChoice::parse(payload.vote.as_deref().unwrap_or_default())
        .ok_or_else(|| AppError::BadRequest("vote must be yes, no, or abstain".into()))?;

    let meeting = load_meeting(&state, meeting_id).await?;
    let motion = motion_of(&meeting, motion_id)?;
    let participant = meeting
        .participant(participant_id)
        .ok_or_else(|| AppError::NotFound("participant not found".into()))?;

    if motion.status != MotionStatus::Voting {
        return Err(AppError::Conflict("voting is closed for this motion".into()));
    }

    // Supersede any earlier vote: drop the participant from all three lists.
    // Old documents may still carry the pre-rename `voterId` field, so both
    // spellings match until the migration has run.
    let owned_by = doc! { "$or": [
        { "participantId": participant_id },
        { "voterId": participant_id },
    ] };
    state
        .meetings
        .update_one(
            doc! { "_id": meeting_id },
            doc! { "$pull": {
                "motions.$[m].votes.yes": owned_by.clone(),
                "motions.$[m].votes.no": owned_by.clone(),
                "motions.$[m].votes.abstain": owned_by,
            } },
        )
        .array_filters(vec![doc! { "m.id": motion_id }])
        .await?;

    let entry = VoteEntry {
        participant_id,
        participant_name: participant.display_name.clone(),
        cast_at: bson::DateTime::now(),
    };

    // The status condition in the array filter re-checks the guard at write
    // time; a motion closed since the read matches nothing.
    let mut push = bson::Document::new();
    push.insert(
        format!("motions.$[m].votes.{}", choice.field()),
        bson::to_bson(&entry).map_err(AppError::internal)?,
    );
    let result = state
        .meetings
        .update_one(doc! { "_id": meeting_id }, doc! { "$push": push })
        .array_filters(vec![doc! { "m.id": motion_id, "m.status": "voting" }])
        .await?;

    if result.modified_count == 0 {
        return Err(AppError::Conflict("voting is closed for this motion".into()));
    }

    Ok(Json(json!({
        "motion": reloaded_motion_view(&state, meeting_id, motion_id).await?,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionDiscussRequest {
    #[serde(default)]
    meeting_id: Option<String>,
    #[serde(default)]
    participant_id: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    stance: Option<String>,
}

pub async fn discuss_motion_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<MotionDiscussRequest>,
) -> Result<impl IntoResponse, AppError> {
    let motion_id = parse_motion_id(&id)?;
    let meeting_id = parse_meeting_id(payload.meeting_id.as_deref().unwrap_or_default())?;
    let participant_id = parse_participant_id(payload.participant_id.as_deref())?;

    let meeting = load_meeting(&state, meeting_id).await?;
    motion_of(&meeting, motion_id)?;
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

    // Discussion stays open in every motion state.
    let entry = DiscussionEntry::new(participant_id, &participant.display_name, comment, stance);

    state
        .meetings
        .update_one(
            doc! { "_id": meeting_id },
            doc! { "$push": { "motions.$[m].discussion": bson::to_bson(&entry).map_err(AppError::internal)? } },
        )
        .array_filters(vec![doc! { "m.id": motion_id }])
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "motion": reloaded_motion_view(&state, meeting_id, motion_id).await?,
        })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMotionRequest {
    #[serde(default)]
    meeting_id: Option<String>,
    #[serde(default)]
    participant_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    chair_summary: Option<String>,
    #[serde(default)]
    pros: Option<Vec<String>>,
    #[serde(default)]
    cons: Option<Vec<String>>,
}

/// Chair-only state transitions: open a proposed motion for voting, complete
/// it, or postpone it. The result of a completed motion is computed here from
/// the recorded tallies; anything the client claims about the outcome is
/// ignored.
pub async fn update_motion_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMotionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let motion_id = parse_motion_id(&id)?;
    let meeting_id = parse_meeting_id(payload.meeting_id.as_deref().unwrap_or_default())?;
    let participant_id = parse_participant_id(payload.participant_id.as_deref())?;

    let meeting = load_meeting(&state, meeting_id).await?;
    let motion = motion_of(&meeting, motion_id)?;

    if !meeting.presides(participant_id) {
        return Err(AppError::Forbidden(
            "only the presiding chair may change motion state".into(),
        ));
    }

    match payload.status.as_deref() {
        Some("voting") => {
            if motion.status != MotionStatus::Proposed {
                return Err(AppError::Conflict("motion is not awaiting a vote".into()));
            }
            let result = state
                .meetings
                .update_one(
                    doc! { "_id": meeting_id },
                    doc! { "$set": { "motions.$[m].status": "voting" } },
                )
                .array_filters(vec![doc! { "m.id": motion_id, "m.status": "proposed" }])
                .await?;
            if result.modified_count == 0 {
                return Err(AppError::Conflict("motion is not awaiting a vote".into()));
            }
        }
        Some("completed") => {
            if motion.status != MotionStatus::Voting {
                return Err(AppError::Conflict("voting already closed".into()));
            }

            let outcome = motion.outcome();
            let summary = engine::motion::ChairSummary {
                text: payload.chair_summary.unwrap_or_default(),
                pros: payload.pros.unwrap_or_default(),
                cons: payload.cons.unwrap_or_default(),
            };

            // Conditional close: only a motion still in `voting` matches, so
            // a second concurrent close loses instead of double-writing.
            let result = state
                .meetings
                .update_one(
                    doc! { "_id": meeting_id },
                    doc! { "$set": {
                        "motions.$[m].status": "completed",
                        "motions.$[m].result": bson::to_bson(&outcome).map_err(AppError::internal)?,
                        "motions.$[m].chairSummary": bson::to_bson(&summary).map_err(AppError::internal)?,
                    } },
                )
                .array_filters(vec![doc! { "m.id": motion_id, "m.status": "voting" }])
                .await?;
            if result.modified_count == 0 {
                return Err(AppError::Conflict("voting already closed".into()));
            }

            info!("Motion {motion_id} completed: {outcome:?}");
        }
        Some("postponed") => {
            if motion.status != MotionStatus::Voting {
                return Err(AppError::Conflict("voting already closed".into()));
            }
            let result = state
                .meetings
                .update_one(
                    doc! { "_id": meeting_id },
                    doc! { "$set": {
                        "motions.$[m].status": "postponed",
                        "motions.$[m].result": bson::to_bson(&MotionResult::Postponed).map_err(AppError::internal)?,
                    } },
                )
                .array_filters(vec![doc! { "m.id": motion_id, "m.status": "voting" }])
                .await?;
            if result.modified_count == 0 {
                return Err(AppError::Conflict("voting already closed".into()));
            }
        }
        _ => {
            return Err(AppError::BadRequest(
                "status must be voting, completed, or postponed".into(),
            ));
        }
    }

    Ok(Json(json!({
        "motion": reloaded_motion_view(&state, meeting_id, motion_id).await?,
    })))
}

/// Full motion list for a meeting, in insertion order.
pub async fn list_motions_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meeting = load_meeting(&state, parse_meeting_id(&id)?).await?;

    let views: Vec<MotionView> = meeting.motions.iter().map(Into::into).collect();

    Ok(Json(json!({ "motions": views })))
}
