mod args;
mod party;

use clap::Parser;
use env_logger::Env;
use log::warn;
use snafu::ErrorCompat;

use crate::args::{Args, Command};
use crate::party::PartyResult;

async fn run(args: &Args) -> PartyResult<()> {
    match &args.command {
        Command::Serve(serve) => party::server::run_server(serve).await,
        Command::Seed(seed) => party::run_seed(&seed.database, &seed.roster).await,
        Command::Standings(standings) => {
            party::run_standings(
                &standings.database,
                standings.out.clone(),
                standings.reference.clone(),
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if let Err(e) = run(&args).await {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
