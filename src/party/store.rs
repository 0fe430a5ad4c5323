//! The ballot ledger, stored in SQLite.
//!
//! - `cocktails`, `dragons`: the roster, written by seeding only.
//! - `voters`: one row per ballot. `(given_name, family_name)` is unique, which
//!   is what rejects a second ballot, even when two arrive at the same time.
//! - `votes`: append-only, one row per ranked choice.
//!
//! A voter and its votes are always written in the same transaction.
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use party_voting::ballot::validate_vote_records;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::party::*;

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS cocktails (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        presenter_name TEXT NOT NULL,
        ingredients TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS dragons (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS voters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        given_name TEXT NOT NULL,
        family_name TEXT NOT NULL,
        UNIQUE (given_name, family_name)
    )",
    "CREATE TABLE IF NOT EXISTS votes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        voter_id INTEGER NOT NULL REFERENCES voters (id),
        vote_type TEXT NOT NULL CHECK (vote_type IN ('cocktail', 'dragon')),
        option_id INTEGER NOT NULL,
        priority INTEGER NOT NULL CHECK (priority BETWEEN 1 AND 3),
        points INTEGER NOT NULL,
        UNIQUE (voter_id, vote_type, priority),
        UNIQUE (voter_id, vote_type, option_id)
    )",
    "CREATE INDEX IF NOT EXISTS votes_by_option ON votes (vote_type, option_id)",
];

const SUM_COCKTAIL_POINTS: &str = "SELECT c.id, COALESCE(SUM(v.points), 0)
    FROM cocktails c
    LEFT JOIN votes v ON c.id = v.option_id AND v.vote_type = 'cocktail'
    GROUP BY c.id";

const SUM_DRAGON_POINTS: &str = "SELECT d.id, COALESCE(SUM(v.points), 0)
    FROM dragons d
    LEFT JOIN votes v ON d.id = v.option_id AND v.vote_type = 'dragon'
    GROUP BY d.id";

/// A handle on the ledger. Cloning it shares the same connection pool.
#[derive(Debug, Clone)]
pub struct BallotStore {
    pool: SqlitePool,
}

impl BallotStore {
    /// Opens (and creates if needed) the database at `url`, e.g. `sqlite://party.db`.
    pub async fn connect(url: &str) -> PartyResult<BallotStore> {
        let options = SqliteConnectOptions::from_str(url)
            .context(StorageSnafu {})?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context(StorageSnafu {})?;
        info!("Connected to {}", url);
        BallotStore::init(pool).await
    }

    /// A fresh database that lives as long as the store.
    pub async fn in_memory() -> PartyResult<BallotStore> {
        // Every connection to an in-memory database sees its own database:
        // keep exactly one connection, forever.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context(StorageSnafu {})?;
        BallotStore::init(pool).await
    }

    async fn init(pool: SqlitePool) -> PartyResult<BallotStore> {
        for statement in SCHEMA.iter() {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context(StorageSnafu {})?;
        }
        Ok(BallotStore { pool })
    }

    /// Inserts or updates the candidates of the roster, by id.
    pub async fn seed_roster(&self, roster: &Roster) -> PartyResult<()> {
        let mut tx = self.pool.begin().await.context(StorageSnafu {})?;
        for c in roster.cocktails.iter() {
            sqlx::query(
                "INSERT INTO cocktails (id, name, presenter_name, ingredients) VALUES (?, ?, ?, ?)
                 ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    presenter_name = excluded.presenter_name,
                    ingredients = excluded.ingredients",
            )
            .bind(c.id)
            .bind(&c.name)
            .bind(&c.presenter_name)
            .bind(&c.ingredients)
            .execute(&mut *tx)
            .await
            .context(StorageSnafu {})?;
        }
        for d in roster.dragons.iter() {
            sqlx::query(
                "INSERT INTO dragons (id, name) VALUES (?, ?)
                 ON CONFLICT (id) DO UPDATE SET name = excluded.name",
            )
            .bind(d.id)
            .bind(&d.name)
            .execute(&mut *tx)
            .await
            .context(StorageSnafu {})?;
        }
        tx.commit().await.context(StorageSnafu {})?;
        debug!(
            "seed_roster: {} cocktails, {} dragons",
            roster.cocktails.len(),
            roster.dragons.len()
        );
        Ok(())
    }

    pub async fn list_cocktails(&self) -> PartyResult<Vec<Cocktail>> {
        let rows: Vec<(CandidateId, String, String, String)> = sqlx::query_as(
            "SELECT id, name, presenter_name, ingredients FROM cocktails ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context(StorageSnafu {})?;
        Ok(rows
            .into_iter()
            .map(|(id, name, presenter_name, ingredients)| Cocktail {
                id,
                name,
                presenter_name,
                ingredients,
            })
            .collect())
    }

    pub async fn list_dragons(&self) -> PartyResult<Vec<Dragon>> {
        let rows: Vec<(CandidateId, String)> =
            sqlx::query_as("SELECT id, name FROM dragons ORDER BY name ASC, id ASC")
                .fetch_all(&self.pool)
                .await
                .context(StorageSnafu {})?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Dragon { id, name })
            .collect())
    }

    /// The candidates of a class, by name.
    pub async fn list_candidates(&self, class: CandidateClass) -> PartyResult<Vec<Candidate>> {
        Ok(match class {
            CandidateClass::Cocktail => self
                .list_cocktails()
                .await?
                .into_iter()
                .map(Candidate::from)
                .collect(),
            CandidateClass::Dragon => self
                .list_dragons()
                .await?
                .into_iter()
                .map(Candidate::from)
                .collect(),
        })
    }

    /// Looks up a voter by exact name.
    pub async fn find_voter(
        &self,
        given_name: &str,
        family_name: &str,
    ) -> PartyResult<Option<Voter>> {
        let row: Option<(VoterId, String, String)> = sqlx::query_as(
            "SELECT id, given_name, family_name FROM voters WHERE given_name = ? AND family_name = ?",
        )
        .bind(given_name)
        .bind(family_name)
        .fetch_optional(&self.pool)
        .await
        .context(StorageSnafu {})?;
        Ok(row.map(|(id, given_name, family_name)| Voter {
            id,
            given_name,
            family_name,
        }))
    }

    pub async fn count_voters(&self) -> PartyResult<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM voters")
            .fetch_one(&self.pool)
            .await
            .context(StorageSnafu {})?;
        Ok(n)
    }

    /// Records a voter and all its votes, or nothing.
    ///
    /// The duplicate check is the unique constraint on the voter names, inside the
    /// transaction: there is no window between checking and inserting.
    pub async fn create_voter_and_ballot(
        &self,
        given_name: &str,
        family_name: &str,
        records: &[VoteRecord],
    ) -> PartyResult<Voter> {
        validate_vote_records(records).context(InvalidBallotSnafu {})?;

        let mut tx = self.pool.begin().await.context(StorageSnafu {})?;
        let inserted = sqlx::query("INSERT INTO voters (given_name, family_name) VALUES (?, ?)")
            .bind(given_name)
            .bind(family_name)
            .execute(&mut *tx)
            .await;
        let voter_id: VoterId = match inserted {
            Ok(res) => res.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!(
                    "create_voter_and_ballot: {} {} already exists",
                    given_name, family_name
                );
                // Dropping the transaction rolls it back.
                return DuplicateVoterSnafu {
                    given_name,
                    family_name,
                }
                .fail();
            }
            Err(e) => return Err(e).context(StorageSnafu {}),
        };

        for r in records.iter() {
            sqlx::query(
                "INSERT INTO votes (voter_id, vote_type, option_id, priority, points) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(voter_id)
            .bind(r.class.as_str())
            .bind(r.candidate_id)
            .bind(r.priority as i64)
            .bind(r.points as i64)
            .execute(&mut *tx)
            .await
            .context(StorageSnafu {})?;
        }
        tx.commit().await.context(StorageSnafu {})?;

        Ok(Voter {
            id: voter_id,
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
        })
    }

    /// Total points per candidate of a class. Candidates without votes have 0.
    pub async fn sum_points_by_candidate(
        &self,
        class: CandidateClass,
    ) -> PartyResult<HashMap<CandidateId, u64>> {
        let sql = match class {
            CandidateClass::Cocktail => SUM_COCKTAIL_POINTS,
            CandidateClass::Dragon => SUM_DRAGON_POINTS,
        };
        let rows: Vec<(CandidateId, i64)> = sqlx::query_as(sql)
            .fetch_all(&self.pool)
            .await
            .context(StorageSnafu {})?;
        Ok(rows
            .into_iter()
            .map(|(cid, points)| (cid, points.max(0) as u64))
            .collect())
    }
}
