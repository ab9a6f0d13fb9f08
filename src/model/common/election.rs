use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// The kinds of election the organisation runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionKind {
    /// Election of one of the officers.
    Officer,
    /// Election of a seat on the board.
    Board,
}

impl ElectionKind {
    pub const ALL: [ElectionKind; 2] = [ElectionKind::Officer, ElectionKind::Board];
}

impl Display for ElectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Officer => write!(f, "Officer Election"),
            Self::Board => write!(f, "Board Election"),
        }
    }
}

/// Positions that can be elected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    President,
    Treasurer,
    Secretary,
    #[serde(rename = "Board Member")]
    BoardMember,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::President,
        Position::Treasurer,
        Position::Secretary,
        Position::BoardMember,
    ];
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::President => write!(f, "President"),
            Self::Treasurer => write!(f, "Treasurer"),
            Self::Secretary => write!(f, "Secretary"),
            Self::BoardMember => write!(f, "Board Member"),
        }
    }
}

/// Where an election is in its lifecycle at a given instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionPhase {
    /// Not in either window: nominations have not opened, or voting has not
    /// opened yet after nominations closed.
    Pending,
    /// Members may nominate candidates.
    Nominating,
    /// Members may vote for a nominee.
    Voting,
    /// Voting has closed and results are public.
    Ended,
}

/// The nomination and voting windows of an election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSchedule {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub nominate_start: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub nominate_end: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub vote_start: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub vote_end: DateTime<Utc>,
}

impl ElectionSchedule {
    /// Create a schedule, checking that nominations open before they close,
    /// close no later than voting opens, and voting opens before it closes.
    pub fn new(
        nominate_start: DateTime<Utc>,
        nominate_end: DateTime<Utc>,
        vote_start: DateTime<Utc>,
        vote_end: DateTime<Utc>,
    ) -> Result<Self> {
        if !(nominate_start < nominate_end && nominate_end <= vote_start && vote_start < vote_end)
        {
            return Err(Error::bad_request("Dates are not in order."));
        }
        Ok(Self {
            nominate_start,
            nominate_end,
            vote_start,
            vote_end,
        })
    }

    /// Classify the election at the instant `now`. Window bounds are exclusive.
    pub fn phase_at(&self, now: DateTime<Utc>) -> ElectionPhase {
        if self.vote_end < now {
            ElectionPhase::Ended
        } else if self.nominate_start < now && now < self.nominate_end {
            ElectionPhase::Nominating
        } else if self.vote_start < now && now < self.vote_end {
            ElectionPhase::Voting
        } else {
            ElectionPhase::Pending
        }
    }
}

/// The number of votes one candidate received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteTotal {
    pub candidate: String,
    pub votes: u32,
}

/// Count the ballots per candidate, naming each candidate by username.
///
/// Candidates whose member record has gone are named by their ID. The result
/// is ordered by votes, most first, then by name.
pub fn tally(votes: &[Id], usernames: &HashMap<Id, String>) -> Vec<VoteTotal> {
    let mut counts: HashMap<Id, u32> = HashMap::new();
    for candidate in votes {
        *counts.entry(*candidate).or_default() += 1;
    }

    let mut totals: Vec<VoteTotal> = counts
        .into_iter()
        .map(|(id, votes)| VoteTotal {
            candidate: usernames
                .get(&id)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            votes,
        })
        .collect();
    totals.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.candidate.cmp(&b.candidate)));
    totals
}
