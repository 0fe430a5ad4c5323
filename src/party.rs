use log::{debug, info, warn};

use party_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use axum::extract::rejection::JsonRejection;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod channel;
pub mod roster_reader;
pub mod server;
pub mod standings;
pub mod store;
pub mod submit;

use crate::party::roster_reader::*;
use crate::party::store::BallotStore;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PartyError {
    #[snafu(display("{source}"))]
    InvalidBallot { source: BallotError },

    #[snafu(display("Malformed request: {source}"))]
    MalformedRequest { source: JsonRejection },

    #[snafu(display("{given_name} {family_name} has already voted"))]
    DuplicateVoter {
        given_name: String,
        family_name: String,
    },

    #[snafu(display("Storage error: {source}"))]
    Storage { source: sqlx::Error },

    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("The standings channel is closed"))]
    ChannelClosed {},

    #[snafu(display("Error serving on {address}"))]
    Serving {
        source: std::io::Error,
        address: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type PartyResult<T> = Result<T, PartyError>;

impl PartyError {
    /// A stable name for the error, used in the responses of the API.
    pub fn kind(&self) -> &'static str {
        match self {
            PartyError::InvalidBallot { source } => match source {
                BallotError::MissingIdentity => "missingIdentity",
                BallotError::IncompleteBallot { .. } => "incompleteBallot",
                BallotError::UnknownCandidate { .. } => "unknownCandidate",
                BallotError::InvalidVoteRecords { .. } => "invalidVoteRecords",
            },
            PartyError::MalformedRequest { .. } => "badRequest",
            PartyError::DuplicateVoter { .. } => "duplicateVoter",
            PartyError::Storage { .. } => "storage",
            PartyError::ChannelClosed {} => "unavailable",
            _ => "internal",
        }
    }
}

pub fn cocktail_to_json(c: &Cocktail) -> JSValue {
    json!({
        "id": c.id,
        "name": c.name,
        "presenterName": c.presenter_name,
        "ingredients": c.ingredients,
    })
}

pub fn dragon_to_json(d: &Dragon) -> JSValue {
    json!({"id": d.id, "name": d.name})
}

fn standings_to_json(standings: &[Standing]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for s in standings.iter() {
        let mut js = match &s.candidate {
            Candidate::Cocktail(c) => cocktail_to_json(c),
            Candidate::Dragon(d) => dragon_to_json(d),
        };
        js["points"] = json!(s.points);
        l.push(js);
    }
    l
}

pub fn snapshot_to_json(snapshot: &StandingsSnapshot) -> JSValue {
    json!({
        "cocktails": standings_to_json(&snapshot.cocktails),
        "dragons": standings_to_json(&snapshot.dragons),
    })
}

pub async fn run_seed(database: &str, roster_path: &str) -> PartyResult<()> {
    let roster = read_roster(roster_path)?;
    let store = BallotStore::connect(database).await?;
    store.seed_roster(&roster).await?;
    info!(
        "Loaded {} cocktails and {} dragons into {}",
        roster.cocktails.len(),
        roster.dragons.len(),
        database
    );
    Ok(())
}

async fn build_summary_js(store: &BallotStore) -> PartyResult<JSValue> {
    let snapshot = standings::standings_snapshot(store).await?;
    let voters = store.count_voters().await?;
    let mut js = snapshot_to_json(&snapshot);
    js["voters"] = json!(voters);
    Ok(js)
}

pub async fn run_standings(
    database: &str,
    out: Option<String>,
    check_summary_path: Option<String>,
) -> PartyResult<()> {
    let store = BallotStore::connect(database).await?;
    let result_js = build_summary_js(&store).await?;
    debug!("run_standings: summary: {:?}", result_js);

    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    match out.as_deref() {
        None | Some("stdout") | Some("") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingOutputSnafu { path })?;
            info!("Standings written to {}", path);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_json(&summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference standings {}", summary_p);
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between current standings and reference standings")
        }
        info!("Standings match the reference {}", summary_p);
    }

    Ok(())
}
