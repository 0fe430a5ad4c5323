use party_voting::ballot::Ballot;
use party_voting::scoring::points_for_priority;
use serde::{Deserialize, Serialize};

use crate::party::channel::StandingsChannel;
use crate::party::store::BallotStore;
use crate::party::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Cocktail,
    Dragon,
}

impl From<ClassLabel> for CandidateClass {
    fn from(c: ClassLabel) -> Self {
        match c {
            ClassLabel::Cocktail => CandidateClass::Cocktail,
            ClassLabel::Dragon => CandidateClass::Dragon,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(alias = "type")]
    pub class: ClassLabel,
    #[serde(rename = "candidateId", alias = "optionId")]
    pub candidate_id: CandidateId,
    pub priority: i64,
    // Older clients send the points they expect. Never used.
    #[serde(default)]
    pub points: Option<i64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotRequest {
    #[serde(rename = "givenName", alias = "name", default)]
    pub given_name: Option<String>,
    #[serde(rename = "familyName", alias = "surname", default)]
    pub family_name: Option<String>,
    #[serde(alias = "votes", default)]
    pub selections: Vec<SelectionRequest>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoterCheckRequest {
    #[serde(rename = "givenName", alias = "name", default)]
    pub given_name: Option<String>,
    #[serde(rename = "familyName", alias = "surname", default)]
    pub family_name: Option<String>,
}

fn to_selections(request: &BallotRequest) -> Vec<Selection> {
    let mut selections: Vec<Selection> = Vec::new();
    for s in request.selections.iter() {
        if let Some(p) = s.points {
            if p != points_for_priority(s.priority) as i64 {
                debug!(
                    "to_selections: discarding {} points sent for {} {} at priority {}",
                    p,
                    CandidateClass::from(s.class),
                    s.candidate_id,
                    s.priority
                );
            }
        }
        selections.push(Selection {
            class: s.class.into(),
            candidate_id: s.candidate_id,
            priority: s.priority,
        });
    }
    selections
}

/// Validates, scores and records a ballot, then pushes the new standings.
///
/// Nothing is written unless every check passed. The standings push happens
/// after the commit and its failure does not fail the submission.
pub async fn submit_ballot(
    store: &BallotStore,
    channel: &StandingsChannel,
    request: &BallotRequest,
) -> PartyResult<Voter> {
    let given_name = request.given_name.as_deref().unwrap_or("");
    let family_name = request.family_name.as_deref().unwrap_or("");
    let selections = to_selections(request);

    let ballot = Ballot::new(given_name, family_name, &selections).context(InvalidBallotSnafu {})?;

    let (mut roster, dragons) = tokio::try_join!(
        store.list_candidates(CandidateClass::Cocktail),
        store.list_candidates(CandidateClass::Dragon)
    )?;
    roster.extend(dragons);
    ballot.check_roster(&roster).context(InvalidBallotSnafu {})?;

    let records = ballot.vote_records();
    let voter = match store
        .create_voter_and_ballot(ballot.given_name(), ballot.family_name(), &records)
        .await
    {
        Ok(v) => v,
        Err(e) => {
            info!("Ballot of {} {} rejected: {}", given_name, family_name, e);
            return Err(e);
        }
    };
    info!(
        "Accepted ballot of {} {} (voter {})",
        voter.given_name, voter.family_name, voter.id
    );

    match channel.publish().await {
        Ok(n) => debug!("submit_ballot: standings pushed to {} viewers", n),
        Err(e) => warn!(
            "Standings not pushed after the ballot of voter {}: {}",
            voter.id, e
        ),
    }
    Ok(voter)
}

/// Whether a ballot was already recorded for these names. Advisory only: the
/// final word belongs to [`submit_ballot`].
pub async fn voter_exists(store: &BallotStore, request: &VoterCheckRequest) -> PartyResult<bool> {
    let given_name = request.given_name.as_deref().unwrap_or("");
    let family_name = request.family_name.as_deref().unwrap_or("");
    if given_name.trim().is_empty() || family_name.trim().is_empty() {
        return Err(BallotError::MissingIdentity).context(InvalidBallotSnafu {});
    }
    Ok(store.find_voter(given_name, family_name).await?.is_some())
}
