use crate::party::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RosterCocktail {
    pub id: CandidateId,
    pub name: String,
    #[serde(rename = "presenterName", alias = "dragon_name")]
    pub presenter_name: String,
    #[serde(default)]
    pub ingredients: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RosterDragon {
    pub id: CandidateId,
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub cocktails: Vec<RosterCocktail>,
    #[serde(default)]
    pub dragons: Vec<RosterDragon>,
}

/// The candidates of the party, checked and ready to be stored.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Roster {
    pub cocktails: Vec<Cocktail>,
    pub dragons: Vec<Dragon>,
}

pub fn read_json(path: &str) -> PartyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

pub fn read_roster(path: &str) -> PartyResult<Roster> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    info!("Reading roster {}", path);
    parse_roster(&contents)
}

pub fn parse_roster(contents: &str) -> PartyResult<Roster> {
    let rf: RosterFile = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    debug!("parse_roster: {:?}", rf);
    validate_roster(&rf)
}

fn validate_roster(rf: &RosterFile) -> PartyResult<Roster> {
    let mut cocktail_ids: HashSet<CandidateId> = HashSet::new();
    let mut cocktails: Vec<Cocktail> = Vec::new();
    for c in rf.cocktails.iter() {
        if c.name.trim().is_empty() {
            whatever!("Cocktail {} has no name", c.id)
        }
        if !cocktail_ids.insert(c.id) {
            whatever!("Cocktail id {} is used more than once", c.id)
        }
        cocktails.push(Cocktail {
            id: c.id,
            name: c.name.clone(),
            presenter_name: c.presenter_name.clone(),
            ingredients: c.ingredients.clone(),
        });
    }

    let mut dragon_ids: HashSet<CandidateId> = HashSet::new();
    let mut dragons: Vec<Dragon> = Vec::new();
    for d in rf.dragons.iter() {
        if d.name.trim().is_empty() {
            whatever!("Dragon {} has no name", d.id)
        }
        if !dragon_ids.insert(d.id) {
            whatever!("Dragon id {} is used more than once", d.id)
        }
        dragons.push(Dragon {
            id: d.id,
            name: d.name.clone(),
        });
    }

    if cocktails.is_empty() || dragons.is_empty() {
        warn!(
            "validate_roster: roster has {} cocktails and {} dragons",
            cocktails.len(),
            dragons.len()
        );
    }
    Ok(Roster { cocktails, dragons })
}
