use clap::{Parser, Subcommand};

/// Live voting for the cocktails and the dragons of a party.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serves the voting API and the live standings.
    Serve(ServeArgs),
    /// Loads the cocktails and the dragons of a roster file into the database.
    Seed(SeedArgs),
    /// Prints the current standings, and optionally compares them with a previous export.
    Standings(StandingsArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// (database url) The SQLite database holding the roster and the ballots. Created if missing.
    #[clap(
        short,
        long,
        value_parser,
        env = "PARTYVOTE_DATABASE",
        default_value = "sqlite://partyvote.db"
    )]
    pub database: String,

    /// (file path, optional) A roster file to load before accepting ballots.
    /// See the manual for the format.
    #[clap(short, long, value_parser, env = "PARTYVOTE_ROSTER")]
    pub roster: Option<String>,

    /// (address) The address to listen on.
    #[clap(long, value_parser, env = "PARTYVOTE_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// (port) The port to listen on.
    #[clap(short, long, value_parser, env = "PARTYVOTE_PORT", default_value = "3000")]
    pub port: u16,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SeedArgs {
    /// (database url) The SQLite database to load the roster into. Created if missing.
    #[clap(
        short,
        long,
        value_parser,
        env = "PARTYVOTE_DATABASE",
        default_value = "sqlite://partyvote.db"
    )]
    pub database: String,

    /// (file path) The roster file.
    #[clap(short, long, value_parser, env = "PARTYVOTE_ROSTER")]
    pub roster: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct StandingsArgs {
    /// (database url) The SQLite database holding the ballots.
    #[clap(
        short,
        long,
        value_parser,
        env = "PARTYVOTE_DATABASE",
        default_value = "sqlite://partyvote.db"
    )]
    pub database: String,

    /// (file path, 'stdout' or empty) Where to write the standings in JSON format. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A previous export of the standings. If provided, partyvote will check that the
    /// current standings match it, and print the differences otherwise.
    #[clap(long, value_parser)]
    pub reference: Option<String>,
}
