use log::debug;
use std::collections::HashSet;

pub use crate::config::*;
use crate::scoring::{points_for_priority, PRIORITIES, SELECTIONS_PER_CLASS};

/// A ballot whose identity and rankings are complete.
///
/// Construction runs the checks that do not need the roster. The roster check
/// and the scoring are separate steps, so that a caller can look up the roster
/// only for ballots that are otherwise well formed.
///
/// ```
/// use party_voting::ballot::Ballot;
/// use party_voting::{CandidateClass, Selection};
/// # use party_voting::BallotError;
///
/// let mut selections = Vec::new();
/// for class in CandidateClass::ALL {
///     for (idx, priority) in [1, 2, 3].iter().enumerate() {
///         selections.push(Selection {
///             class,
///             candidate_id: idx as i64 + 1,
///             priority: *priority,
///         });
///     }
/// }
///
/// let ballot = Ballot::new("Ada", "Lovelace", &selections)?;
/// let points: u32 = ballot.vote_records().iter().map(|r| r.points).sum();
/// assert_eq!(points, 18);
///
/// # Ok::<(), BallotError>(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    given_name: String,
    family_name: String,
    selections: Vec<Selection>,
}

impl Ballot {
    pub fn new(
        given_name: &str,
        family_name: &str,
        selections: &[Selection],
    ) -> Result<Ballot, BallotError> {
        // Whitespace-only names count as missing, but the names are kept verbatim.
        if given_name.trim().is_empty() || family_name.trim().is_empty() {
            return Err(BallotError::MissingIdentity);
        }

        let problems = ranking_problems(selections);
        if !problems.is_empty() {
            debug!(
                "Ballot::new: {} {}: rejected with {:?}",
                given_name, family_name, problems
            );
            return Err(BallotError::IncompleteBallot { problems });
        }

        Ok(Ballot {
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            selections: selections.to_vec(),
        })
    }

    pub fn given_name(&self) -> &str {
        &self.given_name
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Checks that every selection refers to a candidate of the roster.
    ///
    /// Reports the first unknown selection, in ballot order.
    pub fn check_roster(&self, roster: &[Candidate]) -> Result<(), BallotError> {
        let known: HashSet<(CandidateClass, CandidateId)> =
            roster.iter().map(|c| (c.class(), c.id())).collect();
        match self
            .selections
            .iter()
            .find(|s| !known.contains(&(s.class, s.candidate_id)))
        {
            Some(s) => Err(BallotError::UnknownCandidate {
                class: s.class,
                candidate_id: s.candidate_id,
            }),
            None => Ok(()),
        }
    }

    /// The ledger entries for this ballot, grouped by class then by priority.
    ///
    /// Points are always derived from the priority.
    pub fn vote_records(&self) -> Vec<VoteRecord> {
        let mut records: Vec<VoteRecord> = self
            .selections
            .iter()
            .map(|s| VoteRecord {
                class: s.class,
                candidate_id: s.candidate_id,
                // Checked by ranking_problems at construction.
                priority: s.priority as u8,
                points: points_for_priority(s.priority),
            })
            .collect();
        records.sort_by_key(|r| (r.class, r.priority));
        records
    }
}

// Everything that prevents the selections from being exactly one ranking
// 1, 2, 3 of distinct candidates in each class.
fn ranking_problems(selections: &[Selection]) -> Vec<BallotProblem> {
    let mut problems: Vec<BallotProblem> = Vec::new();
    for class in CandidateClass::ALL {
        let picks: Vec<&Selection> = selections.iter().filter(|s| s.class == class).collect();
        if picks.len() != SELECTIONS_PER_CLASS {
            problems.push(BallotProblem::WrongSelectionCount(class, picks.len()));
        }

        let mut seen_priorities: HashSet<i64> = HashSet::new();
        let mut seen_candidates: HashSet<CandidateId> = HashSet::new();
        for pick in picks {
            if points_for_priority(pick.priority) == 0 {
                problems.push(BallotProblem::InvalidPriority(class, pick.priority));
            } else if !seen_priorities.insert(pick.priority) {
                problems.push(BallotProblem::DuplicatePriority(class, pick.priority));
            }
            if !seen_candidates.insert(pick.candidate_id) {
                problems.push(BallotProblem::DuplicateCandidate(class, pick.candidate_id));
            }
        }

        for p in PRIORITIES {
            if !seen_priorities.contains(&(p as i64)) {
                problems.push(BallotProblem::MissingPriority(class, p));
            }
        }
    }
    problems
}

/// Checks the invariants of the ledger on a set of records about to be written
/// for one voter.
///
/// Unlike [`Ballot::new`], this does not require the ranking to be complete:
/// it only guards the uniqueness of priorities and candidates within a class,
/// and that each point value is the one of its priority.
pub fn validate_vote_records(records: &[VoteRecord]) -> Result<(), BallotError> {
    let mut priorities: HashSet<(CandidateClass, u8)> = HashSet::new();
    let mut candidates: HashSet<(CandidateClass, CandidateId)> = HashSet::new();
    for r in records {
        let expected = points_for_priority(r.priority as i64);
        if expected == 0 {
            return Err(BallotError::InvalidVoteRecords {
                reason: format!("{}: priority {} is not valid", r.class, r.priority),
            });
        }
        if r.points != expected {
            return Err(BallotError::InvalidVoteRecords {
                reason: format!(
                    "{}: candidate {} has {} points for priority {}, expected {}",
                    r.class, r.candidate_id, r.points, r.priority, expected
                ),
            });
        }
        if !priorities.insert((r.class, r.priority)) {
            return Err(BallotError::InvalidVoteRecords {
                reason: format!("{}: priority {} used more than once", r.class, r.priority),
            });
        }
        if !candidates.insert((r.class, r.candidate_id)) {
            return Err(BallotError::InvalidVoteRecords {
                reason: format!(
                    "{}: candidate {} ranked more than once",
                    r.class, r.candidate_id
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(class: CandidateClass, ids: &[CandidateId]) -> Vec<Selection> {
        ids.iter()
            .enumerate()
            .map(|(idx, cid)| Selection {
                class,
                candidate_id: *cid,
                priority: idx as i64 + 1,
            })
            .collect()
    }

    fn full_ballot() -> Vec<Selection> {
        let mut s = ranking(CandidateClass::Cocktail, &[1, 2, 3]);
        s.extend(ranking(CandidateClass::Dragon, &[10, 11, 12]));
        s
    }

    fn roster() -> Vec<Candidate> {
        let mut r: Vec<Candidate> = Vec::new();
        for id in 1..=4 {
            r.push(
                Cocktail {
                    id,
                    name: format!("cocktail {}", id),
                    presenter_name: "Smaug".to_string(),
                    ingredients: "".to_string(),
                }
                .into(),
            );
        }
        for id in 10..=12 {
            r.push(
                Dragon {
                    id,
                    name: format!("dragon {}", id),
                }
                .into(),
            );
        }
        r
    }

    fn problems_of(selections: &[Selection]) -> Vec<BallotProblem> {
        match Ballot::new("Ada", "Lovelace", selections) {
            Err(BallotError::IncompleteBallot { problems }) => problems,
            x => panic!("expected an incomplete ballot, got {:?}", x),
        }
    }

    #[test]
    fn complete_ballot() {
        let ballot = Ballot::new("Ada", "Lovelace", &full_ballot()).unwrap();
        assert_eq!(ballot.given_name(), "Ada");
        assert_eq!(ballot.family_name(), "Lovelace");
        assert_eq!(ballot.check_roster(&roster()), Ok(()));
    }

    #[test]
    fn missing_identity_comes_first() {
        // Both the identity and the rankings are wrong: identity is reported.
        assert_eq!(
            Ballot::new("", "Lovelace", &[]),
            Err(BallotError::MissingIdentity)
        );
        assert_eq!(
            Ballot::new("Ada", "   ", &full_ballot()),
            Err(BallotError::MissingIdentity)
        );
    }

    #[test]
    fn names_are_kept_verbatim() {
        let ballot = Ballot::new(" Ada", "Lovelace ", &full_ballot()).unwrap();
        assert_eq!(ballot.given_name(), " Ada");
        assert_eq!(ballot.family_name(), "Lovelace ");
    }

    #[test]
    fn too_few_selections() {
        let mut s = ranking(CandidateClass::Cocktail, &[1, 2]);
        s.extend(ranking(CandidateClass::Dragon, &[10, 11, 12]));
        assert_eq!(
            problems_of(&s),
            vec![
                BallotProblem::WrongSelectionCount(CandidateClass::Cocktail, 2),
                BallotProblem::MissingPriority(CandidateClass::Cocktail, 3),
            ]
        );
    }

    #[test]
    fn missing_class() {
        let s = ranking(CandidateClass::Cocktail, &[1, 2, 3]);
        let problems = problems_of(&s);
        assert_eq!(
            problems[0],
            BallotProblem::WrongSelectionCount(CandidateClass::Dragon, 0)
        );
        assert_eq!(problems.len(), 4);
    }

    #[test]
    fn repeated_candidate() {
        let mut s = ranking(CandidateClass::Cocktail, &[1, 2, 3]);
        s.extend(ranking(CandidateClass::Dragon, &[10, 10, 12]));
        assert_eq!(
            problems_of(&s),
            vec![BallotProblem::DuplicateCandidate(CandidateClass::Dragon, 10)]
        );
    }

    #[test]
    fn repeated_and_invalid_priorities() {
        let mut s = full_ballot();
        s[1].priority = 1;
        s[2].priority = 7;
        assert_eq!(
            problems_of(&s),
            vec![
                BallotProblem::DuplicatePriority(CandidateClass::Cocktail, 1),
                BallotProblem::InvalidPriority(CandidateClass::Cocktail, 7),
                BallotProblem::MissingPriority(CandidateClass::Cocktail, 2),
                BallotProblem::MissingPriority(CandidateClass::Cocktail, 3),
            ]
        );
    }

    #[test]
    fn unknown_candidate() {
        let mut s = full_ballot();
        s[4].candidate_id = 99;
        let ballot = Ballot::new("Ada", "Lovelace", &s).unwrap();
        assert_eq!(
            ballot.check_roster(&roster()),
            Err(BallotError::UnknownCandidate {
                class: CandidateClass::Dragon,
                candidate_id: 99
            })
        );
    }

    #[test]
    fn candidate_of_the_other_class_is_unknown() {
        let mut s = full_ballot();
        // 4 is a cocktail, not a dragon.
        s[5].candidate_id = 4;
        let ballot = Ballot::new("Ada", "Lovelace", &s).unwrap();
        assert!(matches!(
            ballot.check_roster(&roster()),
            Err(BallotError::UnknownCandidate {
                class: CandidateClass::Dragon,
                candidate_id: 4
            })
        ));
    }

    #[test]
    fn scoring_ignores_selection_order() {
        let mut s = full_ballot();
        s.reverse();
        let ballot = Ballot::new("Ada", "Lovelace", &s).unwrap();
        let records = ballot.vote_records();
        let summary: Vec<(CandidateClass, CandidateId, u8, u32)> = records
            .iter()
            .map(|r| (r.class, r.candidate_id, r.priority, r.points))
            .collect();
        assert_eq!(
            summary,
            vec![
                (CandidateClass::Cocktail, 1, 1, 5),
                (CandidateClass::Cocktail, 2, 2, 3),
                (CandidateClass::Cocktail, 3, 3, 1),
                (CandidateClass::Dragon, 10, 1, 5),
                (CandidateClass::Dragon, 11, 2, 3),
                (CandidateClass::Dragon, 12, 3, 1),
            ]
        );
        assert_eq!(validate_vote_records(&records), Ok(()));
    }

    #[test]
    fn records_with_forged_points() {
        let mut records = Ballot::new("Ada", "Lovelace", &full_ballot())
            .unwrap()
            .vote_records();
        records[2].points = 100;
        assert!(matches!(
            validate_vote_records(&records),
            Err(BallotError::InvalidVoteRecords { .. })
        ));
    }

    #[test]
    fn records_with_repeated_priority() {
        let records = vec![
            VoteRecord {
                class: CandidateClass::Dragon,
                candidate_id: 10,
                priority: 1,
                points: 5,
            },
            VoteRecord {
                class: CandidateClass::Dragon,
                candidate_id: 11,
                priority: 1,
                points: 5,
            },
        ];
        assert!(validate_vote_records(&records).is_err());
        // The same priority in two different classes is fine.
        let mut ok = records.clone();
        ok[1].class = CandidateClass::Cocktail;
        assert_eq!(validate_vote_records(&ok), Ok(()));
    }

    #[test]
    fn problems_are_readable() {
        let err = BallotError::IncompleteBallot {
            problems: vec![
                BallotProblem::WrongSelectionCount(CandidateClass::Dragon, 2),
                BallotProblem::MissingPriority(CandidateClass::Dragon, 3),
            ],
        };
        assert_eq!(
            err.to_string(),
            "incomplete ballot: dragon: expected 3 selections, got 2; dragon: no choice for priority 3"
        );
    }
}
