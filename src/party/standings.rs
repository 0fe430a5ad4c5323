use crate::party::store::BallotStore;
use crate::party::*;

/// The leaderboard of one class, read fresh from the ledger.
pub async fn class_standings(
    store: &BallotStore,
    class: CandidateClass,
) -> PartyResult<Vec<Standing>> {
    let (candidates, totals) = tokio::try_join!(
        store.list_candidates(class),
        store.sum_points_by_candidate(class)
    )?;
    Ok(compute_standings(&candidates, &totals))
}

/// Both leaderboards, computed independently.
pub async fn standings_snapshot(store: &BallotStore) -> PartyResult<StandingsSnapshot> {
    let (cocktails, dragons) = tokio::try_join!(
        class_standings(store, CandidateClass::Cocktail),
        class_standings(store, CandidateClass::Dragon)
    )?;
    debug!(
        "standings_snapshot: {} cocktails, {} dragons",
        cocktails.len(),
        dragons.len()
    );
    Ok(StandingsSnapshot { cocktails, dragons })
}
