//! Response shapes.
//!
//! Documents are stored with ObjectIds and BSON dates; the API speaks plain
//! strings. Every resource the API returns goes through one of these views,
//! which is also where the password hash gets left behind.

use std::collections::HashMap;

use bson::{DateTime, oid::ObjectId};
use engine::{
    committee::{Committee, CommitteeMember, CommitteeRole},
    meeting::{Meeting, Participant, ParticipantRole},
    motion::{ChairSummary, DiscussionEntry, Motion, MotionResult, MotionStatus, MotionType, VoteEntry, VoteTallies},
    user::User,
};
use serde::Serialize;

fn iso(datetime: DateTime) -> String {
    datetime.try_to_rfc3339_string().unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            bio: user.bio.clone(),
            created_at: iso(user.created_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeMemberView {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: CommitteeRole,
    pub votes_cast: u32,
    pub pros: u32,
    pub cons: u32,
    pub added_at: String,
}

impl CommitteeMemberView {
    fn new(member: &CommitteeMember, users: &HashMap<ObjectId, &User>) -> Self {
        let (name, email) = users
            .get(&member.user_id)
            .map(|user| (user.name.clone(), user.email.clone()))
            .unwrap_or_default();

        Self {
            user_id: member.user_id.to_hex(),
            name,
            email,
            role: member.role,
            votes_cast: member.votes_cast,
            pros: member.pros,
            cons: member.cons,
            added_at: iso(member.added_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<CommitteeMemberView>,
    pub created_by: String,
    pub created_at: String,
}

impl CommitteeView {
    /// Member entries are enriched with name/email resolved from the users
    /// collection; a member whose account has disappeared keeps blank fields.
    pub fn enriched(committee: &Committee, users: &[User]) -> Self {
        let by_id: HashMap<ObjectId, &User> = users.iter().map(|user| (user.id, user)).collect();

        Self {
            id: committee.id.to_hex(),
            name: committee.name.clone(),
            description: committee.description.clone(),
            members: committee
                .members
                .iter()
                .map(|member| CommitteeMemberView::new(member, &by_id))
                .collect(),
            created_by: committee.created_by.to_hex(),
            created_at: iso(committee.created_at),
        }
    }
}

/// Listing view: no member enrichment, just enough for a dashboard row.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeSummaryView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub member_count: usize,
    pub created_at: String,
}

impl From<&Committee> for CommitteeSummaryView {
    fn from(committee: &Committee) -> Self {
        Self {
            id: committee.id.to_hex(),
            name: committee.name.clone(),
            description: committee.description.clone(),
            member_count: committee.members.len(),
            created_at: iso(committee.created_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub role: ParticipantRole,
    pub joined_at: String,
}

impl From<&Participant> for ParticipantView {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id.to_hex(),
            display_name: participant.display_name.clone(),
            user_id: participant.user_id.map(|id| id.to_hex()),
            role: participant.role,
            joined_at: iso(participant.joined_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEntryView {
    pub participant_id: String,
    pub participant_name: String,
    pub cast_at: String,
}

impl From<&VoteEntry> for VoteEntryView {
    fn from(entry: &VoteEntry) -> Self {
        Self {
            participant_id: entry.participant_id.to_hex(),
            participant_name: entry.participant_name.clone(),
            cast_at: iso(entry.cast_at),
        }
    }
}

#[derive(Serialize)]
pub struct VoteTalliesView {
    pub yes: Vec<VoteEntryView>,
    pub no: Vec<VoteEntryView>,
    pub abstain: Vec<VoteEntryView>,
}

impl From<&VoteTallies> for VoteTalliesView {
    fn from(tallies: &VoteTallies) -> Self {
        Self {
            yes: tallies.yes.iter().map(Into::into).collect(),
            no: tallies.no.iter().map(Into::into).collect(),
            abstain: tallies.abstain.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionView {
    pub participant_id: String,
    pub participant_name: String,
    pub comment: String,
    pub stance: engine::motion::Stance,
    pub posted_at: String,
}

impl From<&DiscussionEntry> for DiscussionView {
    fn from(entry: &DiscussionEntry) -> Self {
        Self {
            participant_id: entry.participant_id.to_hex(),
            participant_name: entry.participant_name.clone(),
            comment: entry.comment.clone(),
            stance: entry.stance,
            posted_at: iso(entry.posted_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionView {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MotionType,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_motion: Option<String>,
    pub status: MotionStatus,
    pub votes: VoteTalliesView,
    pub discussion: Vec<DiscussionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MotionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chair_summary: Option<ChairSummary>,
    pub created_at: String,
}

impl From<&Motion> for MotionView {
    fn from(motion: &Motion) -> Self {
        Self {
            id: motion.id.to_hex(),
            title: motion.title.clone(),
            description: motion.description.clone(),
            kind: motion.kind,
            threshold: motion.threshold,
            parent_motion: motion.parent_motion.map(|id| id.to_hex()),
            status: motion.status,
            votes: (&motion.votes).into(),
            discussion: motion.discussion.iter().map(Into::into).collect(),
            result: motion.result,
            chair_summary: motion.chair_summary.clone(),
            created_at: iso(motion.created_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingView {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<String>,
    pub code: String,
    pub active: bool,
    pub participants: Vec<ParticipantView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presiding_participant: Option<String>,
    pub motions: Vec<MotionView>,
    pub discussion: Vec<DiscussionView>,
    pub committee_ids: Vec<String>,
    pub created_at: String,
}

impl From<&Meeting> for MeetingView {
    fn from(meeting: &Meeting) -> Self {
        Self {
            id: meeting.id.to_hex(),
            name: meeting.name.clone(),
            description: meeting.description.clone(),
            scheduled_for: meeting.scheduled_for.map(iso),
            code: meeting.code.clone(),
            active: meeting.active,
            participants: meeting.participants.iter().map(Into::into).collect(),
            presiding_participant: meeting.presiding_participant.map(|id| id.to_hex()),
            motions: meeting.motions.iter().map(Into::into).collect(),
            discussion: meeting.discussion.iter().map(Into::into).collect(),
            committee_ids: meeting.committee_ids.iter().map(|id| id.to_hex()).collect(),
            created_at: iso(meeting.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_view_never_carries_the_hash() {
        let user = User::new("Ada", "ada@example.com", "$argon2id$...".into());
        let value = serde_json::to_value(UserView::from(&user)).unwrap();

        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "ada@example.com");
    }

    #[test]
    fn motion_view_uses_wire_names() {
        let motion = Motion::new("Adopt the budget", "", MotionType::Procedural, None, false);
        let value = serde_json::to_value(MotionView::from(&motion)).unwrap();

        assert_eq!(value["type"], "procedural");
        assert_eq!(value["status"], "voting");
        assert_eq!(value["threshold"], 0.67);
        assert!(value["votes"]["yes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn committee_enrichment_resolves_names() {
        let owner = User::new("Ada", "ada@example.com", "hash".into());
        let committee = Committee::new("Budget", "", owner.id);

        let view = CommitteeView::enriched(&committee, std::slice::from_ref(&owner));

        assert_eq!(view.members.len(), 1);
        assert_eq!(view.members[0].name, "Ada");
        assert_eq!(view.members[0].email, "ada@example.com");
    }

    #[test]
    fn committee_enrichment_tolerates_deleted_accounts() {
        let committee = Committee::new("Budget", "", ObjectId::new());

        let view = CommitteeView::enriched(&committee, &[]);

        assert_eq!(view.members[0].name, "");
        assert_eq!(view.members[0].email, "");
    }
}
