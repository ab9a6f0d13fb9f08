use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{ElectionKind, ElectionPhase, ElectionSchedule, Position},
    mongodb::Id,
};

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    pub kind: ElectionKind,
    pub position: Position,
    pub description: String,
    #[serde(flatten)]
    pub schedule: ElectionSchedule,
    /// Members nominated so far, in nomination order.
    pub nominees: Vec<Id>,
    /// Members who have made their nomination.
    pub nominators: Vec<Id>,
    /// Members who have cast their vote.
    pub voters: Vec<Id>,
    /// One entry per ballot: the nominee voted for. Kept apart from `voters`
    /// so ballots are not linked to who cast them.
    pub votes: Vec<Id>,
    /// Cleared instead of deleting the election.
    #[serde(default)]
    pub cancelled: bool,
}

impl ElectionCore {
    /// A new election with no nominations or votes.
    pub fn new(
        kind: ElectionKind,
        position: Position,
        description: String,
        schedule: ElectionSchedule,
    ) -> Self {
        Self {
            kind,
            position,
            description,
            schedule,
            nominees: Vec::new(),
            nominators: Vec::new(),
            voters: Vec::new(),
            votes: Vec::new(),
            cancelled: false,
        }
    }

    pub fn has_nominated(&self, member: Id) -> bool {
        self.nominators.contains(&member)
    }

    pub fn has_voted(&self, member: Id) -> bool {
        self.voters.contains(&member)
    }

    pub fn is_nominee(&self, member: Id) -> bool {
        self.nominees.contains(&member)
    }

    /// See [`ElectionSchedule::phase_at`].
    pub fn phase_at(&self, now: chrono::DateTime<chrono::Utc>) -> ElectionPhase {
        self.schedule.phase_at(now)
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ElectionCore {
        pub fn nominating_example() -> Self {
            Self::new(
                ElectionKind::Officer,
                Position::President,
                "Annual election for president".to_string(),
                ElectionSchedule::nominating_now(),
            )
        }

        pub fn voting_example() -> Self {
            Self::new(
                ElectionKind::Officer,
                Position::Treasurer,
                "Annual election for treasurer".to_string(),
                ElectionSchedule::voting_now(),
            )
        }

        pub fn ended_example() -> Self {
            Self::new(
                ElectionKind::Board,
                Position::BoardMember,
                "Open board seat".to_string(),
                ElectionSchedule::ended(),
            )
        }
    }
}
