mod config;
use log::debug;

use std::collections::HashMap;

pub use crate::config::*;

pub mod ballot;
pub mod manual;
pub mod scoring;

/// Ranks the candidates of one class by their total points.
///
/// Arguments:
/// * `candidates` the roster of the class
/// * `totals` the sum of points per candidate, as read from the ledger. Candidates
/// without an entry have 0 points. Entries that do not belong to the roster are ignored.
///
/// Every candidate of the roster appears exactly once in the output, points
/// descending. Candidates with the same total are ordered by name, then by id.
///
/// ```
/// use std::collections::HashMap;
/// use party_voting::{compute_standings, Candidate, Dragon};
///
/// let roster: Vec<Candidate> = ["Norbert", "Smaug", "Toothless"]
///     .iter()
///     .enumerate()
///     .map(|(idx, name)| Dragon { id: idx as i64 + 1, name: name.to_string() }.into())
///     .collect();
/// let totals: HashMap<i64, u64> = [(2, 8), (3, 10)].into_iter().collect();
///
/// let standings = compute_standings(&roster, &totals);
/// let names: Vec<&str> = standings.iter().map(|s| s.candidate.name()).collect();
/// assert_eq!(names, vec!["Toothless", "Smaug", "Norbert"]);
/// ```
pub fn compute_standings(
    candidates: &[Candidate],
    totals: &HashMap<CandidateId, u64>,
) -> Vec<Standing> {
    let mut standings: Vec<Standing> = candidates
        .iter()
        .map(|c| Standing {
            candidate: c.clone(),
            points: totals.get(&c.id()).cloned().unwrap_or(0),
        })
        .collect();

    for cid in totals.keys() {
        if !candidates.iter().any(|c| c.id() == *cid) {
            debug!("compute_standings: ignoring points of unknown candidate {}", cid);
        }
    }

    standings.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| a.candidate.name().cmp(b.candidate.name()))
            .then_with(|| a.candidate.id().cmp(&b.candidate.id()))
    });
    standings
}
