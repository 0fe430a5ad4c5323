// ********* Roster data structures ***********

use std::error::Error;
use std::fmt::Display;

pub type CandidateId = i64;
pub type VoterId = i64;

/// The two disjoint groups of options a voter ranks.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum CandidateClass {
    Cocktail,
    Dragon,
}

impl CandidateClass {
    /// Both classes, in the order they appear on a ballot and in a snapshot.
    pub const ALL: [CandidateClass; 2] = [CandidateClass::Cocktail, CandidateClass::Dragon];

    /// The label used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateClass::Cocktail => "cocktail",
            CandidateClass::Dragon => "dragon",
        }
    }
}

impl Display for CandidateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Cocktail {
    pub id: CandidateId,
    pub name: String,
    /// The dragon presenting this cocktail.
    pub presenter_name: String,
    /// Free text, as written on the menu.
    pub ingredients: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Dragon {
    pub id: CandidateId,
    pub name: String,
}

/// Something that can be ranked on a ballot.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Candidate {
    Cocktail(Cocktail),
    Dragon(Dragon),
}

impl Candidate {
    pub fn id(&self) -> CandidateId {
        match self {
            Candidate::Cocktail(c) => c.id,
            Candidate::Dragon(d) => d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Candidate::Cocktail(c) => &c.name,
            Candidate::Dragon(d) => &d.name,
        }
    }

    pub fn class(&self) -> CandidateClass {
        match self {
            Candidate::Cocktail(_) => CandidateClass::Cocktail,
            Candidate::Dragon(_) => CandidateClass::Dragon,
        }
    }
}

impl From<Cocktail> for Candidate {
    fn from(c: Cocktail) -> Self {
        Candidate::Cocktail(c)
    }
}

impl From<Dragon> for Candidate {
    fn from(d: Dragon) -> Self {
        Candidate::Dragon(d)
    }
}

// ********* Ballot data structures ***********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Voter {
    pub id: VoterId,
    pub given_name: String,
    pub family_name: String,
}

/// One ranked choice, as submitted by a voter.
///
/// The priority is kept as a raw integer: anything outside 1..=3 is
/// reported by the ballot checks rather than rejected at parse time.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Selection {
    pub class: CandidateClass,
    pub candidate_id: CandidateId,
    pub priority: i64,
}

/// A scored selection, ready to be written to the ledger.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRecord {
    pub class: CandidateClass,
    pub candidate_id: CandidateId,
    pub priority: u8,
    pub points: u32,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Standing {
    pub candidate: Candidate,
    pub points: u64,
}

/// The leaderboards of both classes, computed from the same ledger.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StandingsSnapshot {
    pub cocktails: Vec<Standing>,
    pub dragons: Vec<Standing>,
}

impl StandingsSnapshot {
    pub fn class(&self, class: CandidateClass) -> &[Standing] {
        match class {
            CandidateClass::Cocktail => &self.cocktails,
            CandidateClass::Dragon => &self.dragons,
        }
    }
}

// ******** Errors *********

/// A single reason why the selections of a class do not form a complete ranking.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotProblem {
    WrongSelectionCount(CandidateClass, usize),
    InvalidPriority(CandidateClass, i64),
    DuplicatePriority(CandidateClass, i64),
    MissingPriority(CandidateClass, u8),
    DuplicateCandidate(CandidateClass, CandidateId),
}

impl Display for BallotProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotProblem::WrongSelectionCount(class, n) => {
                write!(f, "{}: expected 3 selections, got {}", class, n)
            }
            BallotProblem::InvalidPriority(class, p) => {
                write!(f, "{}: priority {} is not 1, 2 or 3", class, p)
            }
            BallotProblem::DuplicatePriority(class, p) => {
                write!(f, "{}: priority {} used more than once", class, p)
            }
            BallotProblem::MissingPriority(class, p) => {
                write!(f, "{}: no choice for priority {}", class, p)
            }
            BallotProblem::DuplicateCandidate(class, cid) => {
                write!(f, "{}: candidate {} ranked more than once", class, cid)
            }
        }
    }
}

/// Errors that make a ballot unacceptable, independently of any storage.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotError {
    MissingIdentity,
    IncompleteBallot { problems: Vec<BallotProblem> },
    UnknownCandidate {
        class: CandidateClass,
        candidate_id: CandidateId,
    },
    InvalidVoteRecords { reason: String },
}

impl Error for BallotError {}

impl Display for BallotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotError::MissingIdentity => write!(f, "given name and family name are required"),
            BallotError::IncompleteBallot { problems } => {
                let msgs: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
                write!(f, "incomplete ballot: {}", msgs.join("; "))
            }
            BallotError::UnknownCandidate {
                class,
                candidate_id,
            } => write!(f, "invalid selection: no {} with id {}", class, candidate_id),
            BallotError::InvalidVoteRecords { reason } => {
                write!(f, "invalid vote records: {}", reason)
            }
        }
    }
}
