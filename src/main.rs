// src/main.rs — convogen entry point

use clap::Parser;

use convogen::cli::{run::RunArgs, Cli, Commands};
use convogen::infra::config::Config;
use convogen::infra::logger;

#[tokio::main]
async fn main() {
    // Respects RUST_LOG when set
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Run {
            start_date,
            end_date,
            agent,
            model,
            requested_by,
            db,
            csv_out,
        } => {
            convogen::cli::run::run_generation(
                RunArgs {
                    start_date,
                    end_date,
                    agent,
                    model,
                    requested_by,
                    db,
                    csv_out,
                },
                &config,
            )
            .await
        }
        Commands::Schedule {
            start_date,
            end_date,
        } => convogen::cli::schedule::show_schedule(start_date, end_date),
        Commands::Export { db, output } => {
            convogen::cli::export::run_export(&db, output.as_ref())
        }
    }
}
