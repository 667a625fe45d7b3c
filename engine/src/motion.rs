//! # Motions
//!
//! The motion state machine and its vote bookkeeping.
//!
//! A motion starts in `proposed` or (the common case) directly in `voting`.
//! The chair moves it `proposed -> voting`, and closes it `voting ->
//! completed` or `voting -> postponed`. Completed and postponed are terminal.
//!
//! Votes are three ordered lists keyed by choice. A participant appears in at
//! most one list at a time; casting again supersedes the earlier entry.
//!
//! ## Thresholds
//!
//! Each motion type implies the fraction of cast votes (abstentions excluded)
//! that must be exceeded for the motion to pass:
//!
//! - main / amendment / postpone: simple majority (0.5)
//! - procedural / overturn: supermajority (0.67)
//! - special: unanimity (1.0)
//!
//! Comparisons are strict, so an exact 50/50 split under simple majority is a
//! tie, not a pass.

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

pub const SIMPLE_MAJORITY: f64 = 0.5;
pub const SUPERMAJORITY: f64 = 0.67;
pub const UNANIMITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionType {
    Main,
    Procedural,
    Amendment,
    Postpone,
    Special,
    Overturn,
}

impl MotionType {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "main" => Some(Self::Main),
            "procedural" => Some(Self::Procedural),
            "amendment" => Some(Self::Amendment),
            "postpone" => Some(Self::Postpone),
            "special" => Some(Self::Special),
            "overturn" => Some(Self::Overturn),
            _ => None,
        }
    }

    pub fn threshold(self) -> f64 {
        match self {
            Self::Procedural | Self::Overturn => SUPERMAJORITY,
            Self::Special => UNANIMITY,
            Self::Main | Self::Amendment | Self::Postpone => SIMPLE_MAJORITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionStatus {
    Proposed,
    Voting,
    Completed,
    Postponed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

impl VoteChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "abstain" => Some(Self::Abstain),
            _ => None,
        }
    }

    /// Field name of the matching list inside [`VoteTallies`].
    pub fn field(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Abstain => "abstain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Pro,
    Con,
    Neutral,
}

impl Stance {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "pro" => Some(Self::Pro),
            "con" => Some(Self::Con),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionResult {
    Passed,
    Failed,
    Tied,
    Postponed,
}

/// One recorded vote. `participantId` is the canonical ownership field; the
/// `voterId` alias keeps documents written before the rename readable until
/// the migration has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEntry {
    #[serde(alias = "voterId")]
    pub participant_id: ObjectId,
    pub participant_name: String,
    pub cast_at: DateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteTallies {
    #[serde(default)]
    pub yes: Vec<VoteEntry>,
    #[serde(default)]
    pub no: Vec<VoteEntry>,
    #[serde(default)]
    pub abstain: Vec<VoteEntry>,
}

impl VoteTallies {
    pub fn list(&self, choice: VoteChoice) -> &Vec<VoteEntry> {
        match choice {
            VoteChoice::Yes => &self.yes,
            VoteChoice::No => &self.no,
            VoteChoice::Abstain => &self.abstain,
        }
    }

    fn list_mut(&mut self, choice: VoteChoice) -> &mut Vec<VoteEntry> {
        match choice {
            VoteChoice::Yes => &mut self.yes,
            VoteChoice::No => &mut self.no,
            VoteChoice::Abstain => &mut self.abstain,
        }
    }

    /// Choice currently recorded for the participant, if any.
    pub fn choice_of(&self, participant_id: ObjectId) -> Option<VoteChoice> {
        for choice in [VoteChoice::Yes, VoteChoice::No, VoteChoice::Abstain] {
            if self
                .list(choice)
                .iter()
                .any(|entry| entry.participant_id == participant_id)
            {
                return Some(choice);
            }
        }
        None
    }

    /// Drops every entry owned by the participant, from all three lists.
    pub fn remove(&mut self, participant_id: ObjectId) {
        for list in [&mut self.yes, &mut self.no, &mut self.abstain] {
            list.retain(|entry| entry.participant_id != participant_id);
        }
    }

    /// Supersedes any earlier vote by this participant with the new choice.
    pub fn record(&mut self, participant_id: ObjectId, participant_name: &str, choice: VoteChoice) {
        self.remove(participant_id);
        self.list_mut(choice).push(VoteEntry {
            participant_id,
            participant_name: participant_name.to_string(),
            cast_at: DateTime::now(),
        });
    }

    /// Repairs tallies where a participant ended up in more than one list,
    /// keeping only the most recently cast entry. Used by the data migration.
    pub fn dedup_latest(&mut self) -> usize {
        let mut dropped = 0;
        let mut latest: Vec<(ObjectId, DateTime)> = Vec::new();

        for list in [&self.yes, &self.no, &self.abstain] {
            for entry in list {
                match latest.iter_mut().find(|(id, _)| *id == entry.participant_id) {
                    Some((_, at)) if *at < entry.cast_at => *at = entry.cast_at,
                    Some(_) => {}
                    None => latest.push((entry.participant_id, entry.cast_at)),
                }
            }
        }

        for list in [&mut self.yes, &mut self.no, &mut self.abstain] {
            list.retain(|entry| {
                let keep = latest
                    .iter()
                    .any(|(id, at)| *id == entry.participant_id && *at == entry.cast_at);
                if !keep {
                    dropped += 1;
                }
                keep
            });
        }

        dropped
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionEntry {
    pub participant_id: ObjectId,
    pub participant_name: String,
    pub comment: String,
    pub stance: Stance,
    pub posted_at: DateTime,
}

impl DiscussionEntry {
    pub fn new(
        participant_id: ObjectId,
        participant_name: &str,
        comment: &str,
        stance: Stance,
    ) -> Self {
        Self {
            participant_id,
            participant_name: participant_name.to_string(),
            comment: comment.to_string(),
            stance,
            posted_at: DateTime::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChairSummary {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motion {
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MotionType,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_motion: Option<ObjectId>,
    pub status: MotionStatus,
    #[serde(default)]
    pub votes: VoteTallies,
    #[serde(default)]
    pub discussion: Vec<DiscussionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MotionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chair_summary: Option<ChairSummary>,
    pub created_at: DateTime,
}

impl Motion {
    pub fn new(
        title: &str,
        description: &str,
        kind: MotionType,
        parent_motion: Option<ObjectId>,
        proposed: bool,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            title: title.to_string(),
            description: description.to_string(),
            kind,
            threshold: kind.threshold(),
            parent_motion,
            status: if proposed {
                MotionStatus::Proposed
            } else {
                MotionStatus::Voting
            },
            votes: VoteTallies::default(),
            discussion: Vec::new(),
            result: None,
            chair_summary: None,
            created_at: DateTime::now(),
        }
    }

    /// Outcome of closing this motion with the current tallies.
    pub fn outcome(&self) -> MotionResult {
        compute_result(self.votes.yes.len(), self.votes.no.len(), self.threshold)
    }
}

/// Pure threshold math for closing a vote.
///
/// Abstentions never enter the denominator. Both comparisons are strict: the
/// yes side must exceed the threshold to pass, the no side must exceed its
/// complement to fail, and anything else (including zero cast votes) is a
/// tie.
pub fn compute_result(yes: usize, no: usize, threshold: f64) -> MotionResult {
    let cast = yes + no;
    if cast == 0 {
        return MotionResult::Tied;
    }

    let yes_fraction = yes as f64 / cast as f64;
    let no_fraction = no as f64 / cast as f64;

    if yes_fraction > threshold {
        MotionResult::Passed
    } else if no_fraction > 1.0 - threshold {
        MotionResult::Failed
    } else {
        MotionResult::Tied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion() -> Motion {
        Motion::new("Adopt the budget", "", MotionType::Main, None, false)
    }

    #[test]
    fn thresholds_by_type() {
        assert_eq!(MotionType::Main.threshold(), SIMPLE_MAJORITY);
        assert_eq!(MotionType::Amendment.threshold(), SIMPLE_MAJORITY);
        assert_eq!(MotionType::Postpone.threshold(), SIMPLE_MAJORITY);
        assert_eq!(MotionType::Procedural.threshold(), SUPERMAJORITY);
        assert_eq!(MotionType::Overturn.threshold(), SUPERMAJORITY);
        assert_eq!(MotionType::Special.threshold(), UNANIMITY);
    }

    #[test]
    fn simple_majority_passes_and_fails() {
        assert_eq!(compute_result(6, 4, 0.5), MotionResult::Passed);
        assert_eq!(compute_result(4, 6, 0.5), MotionResult::Failed);
    }

    #[test]
    fn exact_split_is_tied_not_passed() {
        assert_eq!(compute_result(5, 5, 0.5), MotionResult::Tied);
    }

    #[test]
    fn only_abstentions_is_tied() {
        assert_eq!(compute_result(0, 0, 0.5), MotionResult::Tied);
    }

    #[test]
    fn supermajority_boundary() {
        // 7/10 = 0.7 clears 0.67, 6/10 = 0.6 does not.
        assert_eq!(compute_result(7, 3, SUPERMAJORITY), MotionResult::Passed);
        assert_eq!(compute_result(6, 4, SUPERMAJORITY), MotionResult::Tied);
    }

    #[test]
    fn unanimity_fails_on_any_no() {
        assert_eq!(compute_result(9, 1, UNANIMITY), MotionResult::Failed);
    }

    #[test]
    fn unanimity_all_yes_is_tied_under_strict_compare() {
        // 1.0 > 1.0 is false, and 0 > 0 is false.
        assert_eq!(compute_result(10, 0, UNANIMITY), MotionResult::Tied);
    }

    #[test]
    fn compute_result_is_pure() {
        for _ in 0..3 {
            assert_eq!(compute_result(7, 3, 0.67), MotionResult::Passed);
        }
    }

    #[test]
    fn recording_replaces_earlier_vote() {
        let mut motion = motion();
        let voter = ObjectId::new();

        motion.votes.record(voter, "Ada", VoteChoice::Yes);
        motion.votes.record(voter, "Ada", VoteChoice::No);

        assert!(motion.votes.yes.is_empty());
        assert_eq!(motion.votes.no.len(), 1);
        assert_eq!(motion.votes.choice_of(voter), Some(VoteChoice::No));
    }

    #[test]
    fn participant_is_in_at_most_one_list() {
        let mut motion = motion();
        let voter = ObjectId::new();
        let other = ObjectId::new();

        motion.votes.record(voter, "Ada", VoteChoice::Yes);
        motion.votes.record(other, "Grace", VoteChoice::Abstain);
        motion.votes.record(voter, "Ada", VoteChoice::Abstain);
        motion.votes.record(voter, "Ada", VoteChoice::Yes);

        let appearances = [&motion.votes.yes, &motion.votes.no, &motion.votes.abstain]
            .iter()
            .map(|list| {
                list.iter()
                    .filter(|entry| entry.participant_id == voter)
                    .count()
            })
            .sum::<usize>();
        assert_eq!(appearances, 1);
        assert_eq!(motion.votes.choice_of(voter), Some(VoteChoice::Yes));
        assert_eq!(motion.votes.choice_of(other), Some(VoteChoice::Abstain));
    }

    #[test]
    fn dedup_latest_keeps_newest_entry() {
        let mut tallies = VoteTallies::default();
        let voter = ObjectId::new();

        tallies.yes.push(VoteEntry {
            participant_id: voter,
            participant_name: "Ada".into(),
            cast_at: DateTime::from_millis(1_000),
        });
        tallies.no.push(VoteEntry {
            participant_id: voter,
            participant_name: "Ada".into(),
            cast_at: DateTime::from_millis(2_000),
        });

        let dropped = tallies.dedup_latest();

        assert_eq!(dropped, 1);
        assert!(tallies.yes.is_empty());
        assert_eq!(tallies.no.len(), 1);
    }

    #[test]
    fn legacy_voter_id_alias_still_decodes() {
        let json = r#"{
            "voterId": {"$oid": "65f000000000000000000001"},
            "participantName": "Ada",
            "castAt": {"$date": {"$numberLong": "0"}}
        }"#;

        let entry: VoteEntry = serde_json::from_str(json).expect("decode legacy entry");
        assert_eq!(
            entry.participant_id,
            ObjectId::parse_str("65f000000000000000000001").unwrap()
        );
    }

    #[test]
    fn vote_entry_serializes_canonical_field() {
        let entry = VoteEntry {
            participant_id: ObjectId::new(),
            participant_name: "Ada".into(),
            cast_at: DateTime::now(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("participantId").is_some());
        assert!(value.get("voterId").is_none());
    }

    #[test]
    fn new_motion_defaults_to_voting() {
        let motion = motion();
        assert_eq!(motion.status, MotionStatus::Voting);
        assert!(motion.votes.yes.is_empty());
        assert!(motion.discussion.is_empty());
        assert!(motion.result.is_none());
    }

    #[test]
    fn parses_choices_case_insensitively() {
        assert_eq!(VoteChoice::parse("YES"), Some(VoteChoice::Yes));
        assert_eq!(VoteChoice::parse("Abstain"), Some(VoteChoice::Abstain));
        assert_eq!(VoteChoice::parse("maybe"), None);
        assert_eq!(Stance::parse("Pro"), Some(Stance::Pro));
        assert_eq!(Stance::parse(""), None);
        assert_eq!(MotionType::parse("overturn"), Some(MotionType::Overturn));
        assert_eq!(MotionType::parse("rider"), None);
    }
}
