use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::id::ApiId,
    common::{
        date::{parse_date, to_local},
        election::{tally, ElectionKind, ElectionPhase, ElectionSchedule, Position, VoteTotal},
    },
    db::{
        election::{Election, NewElection},
        member::Member,
    },
    mongodb::Id,
};

/// An admin's request to create an election. Dates are `MM/DD/YYYY`, meaning
/// local midnight at the start of that day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub kind: ElectionKind,
    pub position: Position,
    #[serde(default)]
    pub description: String,
    pub nomination_start: String,
    pub nomination_end: String,
    pub vote_start: String,
    pub vote_end: String,
}

impl ElectionSpec {
    /// Parse the dates and check they are in order.
    pub fn into_election(self, local: FixedOffset) -> Result<NewElection> {
        let schedule = ElectionSchedule::new(
            parse_date(&self.nomination_start, local)?,
            parse_date(&self.nomination_end, local)?,
            parse_date(&self.vote_start, local)?,
            parse_date(&self.vote_end, local)?,
        )?;
        Ok(NewElection::new(
            self.kind,
            self.position,
            self.description,
            schedule,
        ))
    }
}

/// An API-friendly election description. Ballots are summarised, never listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionDescription {
    pub id: ApiId,
    pub kind: ElectionKind,
    pub position: Position,
    pub description: String,
    pub nominate_start: DateTime<FixedOffset>,
    pub nominate_end: DateTime<FixedOffset>,
    pub vote_start: DateTime<FixedOffset>,
    pub vote_end: DateTime<FixedOffset>,
    pub phase: ElectionPhase,
    pub cancelled: bool,
}

impl ElectionDescription {
    /// Describe the election as of `now`, with times in the local zone.
    pub fn new(election: &Election, now: DateTime<Utc>, local: FixedOffset) -> Self {
        let schedule = &election.schedule;
        Self {
            id: election.id.into(),
            kind: election.kind,
            position: election.position,
            description: election.description.clone(),
            nominate_start: to_local(schedule.nominate_start, local),
            nominate_end: to_local(schedule.nominate_end, local),
            vote_start: to_local(schedule.vote_start, local),
            vote_end: to_local(schedule.vote_end, local),
            phase: election.phase_at(now),
            cancelled: election.cancelled,
        }
    }
}

/// A member as shown on a ballot or nomination form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: ApiId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
}

impl From<&Member> for Candidate {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.into(),
            username: member.username.clone(),
            firstname: member.firstname.clone(),
            lastname: member.lastname.clone(),
        }
    }
}

/// An election currently taking nominations.
#[derive(Debug, Serialize)]
pub struct NominatingElection {
    pub election: ElectionDescription,
    /// Active members the viewer could nominate.
    pub eligible: Vec<Candidate>,
    pub nominees: Vec<Candidate>,
    pub has_nominated: bool,
    pub nominate_end: DateTime<FixedOffset>,
}

/// An election currently taking votes.
#[derive(Debug, Serialize)]
pub struct VotingElection {
    pub election: ElectionDescription,
    /// The nominees, who are the candidates.
    pub eligible: Vec<Candidate>,
    pub has_voted: bool,
    pub vote_end: DateTime<FixedOffset>,
}

/// A finished election and its results.
#[derive(Debug, Serialize)]
pub struct EndedElection {
    pub election: ElectionDescription,
    pub totals: Vec<VoteTotal>,
    pub total_votes: usize,
    pub vote_end: DateTime<FixedOffset>,
}

/// Everything on the elections page, from one member's point of view.
#[derive(Debug, Default, Serialize)]
pub struct ElectionsOverview {
    pub nominating: Vec<NominatingElection>,
    pub voting: Vec<VotingElection>,
    pub ended: Vec<EndedElection>,
}

impl ElectionsOverview {
    /// Sort elections into those taking nominations, those taking votes and
    /// those that are over, as seen by `viewer` at `now`.
    ///
    /// `directory` maps IDs to every member, active or not, so that
    /// deactivated nominees still show up. Elections between windows are
    /// left out.
    pub fn build(
        elections: &[Election],
        directory: &HashMap<Id, Member>,
        viewer: Id,
        now: DateTime<Utc>,
        local: FixedOffset,
    ) -> Self {
        let mut active: Vec<&Member> = directory.values().filter(|m| m.active).collect();
        active.sort_by(|a, b| a.username.cmp(&b.username));

        let lookup = |ids: &[Id]| -> Vec<Candidate> {
            ids.iter()
                .filter_map(|id| directory.get(id))
                .map(Candidate::from)
                .collect()
        };

        let mut overview = Self::default();
        for election in elections.iter().filter(|e| !e.cancelled) {
            let description = ElectionDescription::new(election, now, local);
            match description.phase {
                ElectionPhase::Nominating => overview.nominating.push(NominatingElection {
                    eligible: active
                        .iter()
                        .filter(|m| m.id != viewer && !election.is_nominee(m.id))
                        .map(|m| Candidate::from(*m))
                        .collect(),
                    nominees: lookup(&election.nominees),
                    has_nominated: election.has_nominated(viewer),
                    nominate_end: description.nominate_end,
                    election: description,
                }),
                ElectionPhase::Voting => overview.voting.push(VotingElection {
                    eligible: lookup(&election.nominees),
                    has_voted: election.has_voted(viewer),
                    vote_end: description.vote_end,
                    election: description,
                }),
                ElectionPhase::Ended => {
                    let usernames: HashMap<Id, String> = election
                        .nominees
                        .iter()
                        .chain(&election.votes)
                        .filter_map(|id| directory.get(id))
                        .map(|m| (m.id, m.username.clone()))
                        .collect();
                    overview.ended.push(EndedElection {
                        totals: tally(&election.votes, &usernames),
                        total_votes: election.votes.len(),
                        vote_end: description.vote_end,
                        election: description,
                    })
                }
                ElectionPhase::Pending => {}
            }
        }
        overview
    }
}

/// A member's nomination. Missing means nobody was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NominationRequest {
    /// Username of the member being nominated.
    #[serde(default)]
    pub nominee: Option<String>,
}

/// A member's ballot. Missing means nobody was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    /// Username of the nominee voted for.
    #[serde(default)]
    pub candidate: Option<String>,
}
