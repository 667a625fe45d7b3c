//! # Meetings
//!
//! A meeting is the unit of storage: participants, motions, and the
//! meeting-level discussion thread all live inside one document. Participants
//! join with the 6-character code and may or may not be linked to an account.
//!
//! At most one participant holds the chair role at a time. The invariant is
//! enforced by rewriting every role when the chair is reassigned, never by a
//! partial update.

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::motion::{DiscussionEntry, Motion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Chair,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ObjectId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ObjectId>,
    pub role: ParticipantRole,
    pub joined_at: DateTime,
}

impl Participant {
    pub fn new(display_name: &str, user_id: Option<ObjectId>, role: ParticipantRole) -> Self {
        Self {
            id: ObjectId::new(),
            display_name: display_name.to_string(),
            user_id,
            role,
            joined_at: DateTime::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime>,
    pub code: String,
    pub active: bool,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presiding_participant: Option<ObjectId>,
    #[serde(default)]
    pub motions: Vec<Motion>,
    #[serde(default)]
    pub discussion: Vec<DiscussionEntry>,
    #[serde(default)]
    pub committee_ids: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
    pub created_at: DateTime,
}

impl Meeting {
    pub fn new(
        name: &str,
        description: &str,
        scheduled_for: Option<DateTime>,
        code: String,
        committee_ids: Vec<ObjectId>,
        created_by: Option<ObjectId>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.to_string(),
            description: description.to_string(),
            scheduled_for,
            code,
            active: true,
            participants: Vec::new(),
            presiding_participant: None,
            motions: Vec::new(),
            discussion: Vec::new(),
            committee_ids,
            created_by,
            created_at: DateTime::now(),
        }
    }

    pub fn participant(&self, id: ObjectId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_by_user(&self, user_id: ObjectId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == Some(user_id))
    }

    pub fn motion(&self, id: ObjectId) -> Option<&Motion> {
        self.motions.iter().find(|m| m.id == id)
    }

    /// Whether the participant is the presiding chair of this meeting.
    pub fn presides(&self, participant_id: ObjectId) -> bool {
        self.presiding_participant == Some(participant_id)
            && self
                .participant(participant_id)
                .is_some_and(|p| p.role == ParticipantRole::Chair)
    }

    /// Removes a participant. If the presiding reference pointed at them and
    /// nobody left in the meeting holds the chair role, the reference is
    /// cleared.
    pub fn remove_participant(&mut self, id: ObjectId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        let removed = self.participants.remove(index);

        if self.presiding_participant == Some(removed.id)
            && !self
                .participants
                .iter()
                .any(|p| p.role == ParticipantRole::Chair)
        {
            self.presiding_participant = None;
        }

        Some(removed)
    }

    /// Makes the target participant the one chair: their role becomes chair,
    /// every other participant drops to member, and the presiding reference
    /// is updated. Returns false if the participant is not in the meeting.
    pub fn assign_chair(&mut self, participant_id: ObjectId) -> bool {
        if self.participant(participant_id).is_none() {
            return false;
        }

        for participant in &mut self.participants {
            participant.role = if participant.id == participant_id {
                ParticipantRole::Chair
            } else {
                ParticipantRole::Member
            };
        }
        self.presiding_participant = Some(participant_id);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting_with(names: &[&str]) -> Meeting {
        let mut meeting = Meeting::new("Budget session", "", None, "ABC123".into(), vec![], None);
        for name in names {
            meeting
                .participants
                .push(Participant::new(name, None, ParticipantRole::Member));
        }
        meeting
    }

    #[test]
    fn assign_chair_rewrites_every_role() {
        let mut meeting = meeting_with(&["Ada", "Grace", "Edsger"]);
        let first = meeting.participants[0].id;
        let second = meeting.participants[1].id;

        assert!(meeting.assign_chair(first));
        assert!(meeting.assign_chair(second));

        let chairs = meeting
            .participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Chair)
            .count();
        assert_eq!(chairs, 1);
        assert_eq!(meeting.presiding_participant, Some(second));
        assert!(meeting.presides(second));
        assert!(!meeting.presides(first));
    }

    #[test]
    fn assign_chair_rejects_unknown_participant() {
        let mut meeting = meeting_with(&["Ada"]);
        assert!(!meeting.assign_chair(ObjectId::new()));
        assert_eq!(meeting.presiding_participant, None);
    }

    #[test]
    fn removing_presiding_chair_clears_reference() {
        let mut meeting = meeting_with(&["Ada", "Grace"]);
        let chair = meeting.participants[0].id;
        meeting.assign_chair(chair);

        let removed = meeting.remove_participant(chair).expect("participant");

        assert_eq!(removed.id, chair);
        assert_eq!(meeting.presiding_participant, None);
        assert_eq!(meeting.participants.len(), 1);
    }

    #[test]
    fn removing_member_keeps_presiding_reference() {
        let mut meeting = meeting_with(&["Ada", "Grace"]);
        let chair = meeting.participants[0].id;
        let member = meeting.participants[1].id;
        meeting.assign_chair(chair);

        meeting.remove_participant(member);

        assert_eq!(meeting.presiding_participant, Some(chair));
    }

    #[test]
    fn remove_unknown_participant_is_none() {
        let mut meeting = meeting_with(&["Ada"]);
        assert!(meeting.remove_participant(ObjectId::new()).is_none());
        assert_eq!(meeting.participants.len(), 1);
    }

    #[test]
    fn participant_lookup_by_linked_user() {
        let mut meeting = meeting_with(&[]);
        let user = ObjectId::new();
        meeting
            .participants
            .push(Participant::new("Ada", Some(user), ParticipantRole::Member));

        assert!(meeting.participant_by_user(user).is_some());
        assert!(meeting.participant_by_user(ObjectId::new()).is_none());
    }
}
