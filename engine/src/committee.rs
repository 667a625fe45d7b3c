//! Committees and their member lists.
//!
//! The member list stored on the committee is the only record of membership.
//! "Which committees is this user in" is a query over `members.userId`, not a
//! second list kept on the user.

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitteeRole {
    Owner,
    Chair,
    Member,
}

impl CommitteeRole {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "chair" => Some(Self::Chair),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeMember {
    pub user_id: ObjectId,
    pub role: CommitteeRole,
    #[serde(default)]
    pub votes_cast: u32,
    #[serde(default)]
    pub pros: u32,
    #[serde(default)]
    pub cons: u32,
    pub added_at: DateTime,
}

impl CommitteeMember {
    pub fn new(user_id: ObjectId, role: CommitteeRole) -> Self {
        Self {
            user_id,
            role,
            votes_cast: 0,
            pros: 0,
            cons: 0,
            added_at: DateTime::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Committee {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<CommitteeMember>,
    pub created_by: ObjectId,
    pub created_at: DateTime,
}

impl Committee {
    /// A new committee always has exactly one member: its owner.
    pub fn new(name: &str, description: &str, owner: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.to_string(),
            description: description.to_string(),
            members: vec![CommitteeMember::new(owner, CommitteeRole::Owner)],
            created_by: owner,
            created_at: DateTime::now(),
        }
    }

    pub fn member(&self, user_id: ObjectId) -> Option<&CommitteeMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_committee_has_exactly_one_owner() {
        let owner = ObjectId::new();
        let committee = Committee::new("Budget", "annual budget", owner);

        assert_eq!(committee.members.len(), 1);
        assert_eq!(committee.members[0].user_id, owner);
        assert_eq!(committee.members[0].role, CommitteeRole::Owner);
        assert_eq!(committee.members[0].votes_cast, 0);
    }

    #[test]
    fn member_lookup() {
        let owner = ObjectId::new();
        let committee = Committee::new("Budget", "", owner);

        assert!(committee.member(owner).is_some());
        assert!(committee.member(ObjectId::new()).is_none());
    }

    #[test]
    fn parses_roles_case_insensitively() {
        assert_eq!(CommitteeRole::parse("Owner"), Some(CommitteeRole::Owner));
        assert_eq!(CommitteeRole::parse("CHAIR"), Some(CommitteeRole::Chair));
        assert_eq!(CommitteeRole::parse("member"), Some(CommitteeRole::Member));
        assert_eq!(CommitteeRole::parse("secretary"), None);
    }
}
