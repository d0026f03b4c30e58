//! db-inquire - Ask questions of a PostgreSQL database in plain language.

use db_inquire::app::{save_feedback, Inquirer};
use db_inquire::cli::{Cli, Command};
use db_inquire::config::Config;
use db_inquire::error::{InquireError, Result};
use db_inquire::logging::init_stderr_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config)?;

    if let Command::Feedback {
        question,
        sql,
        good,
        bad,
    } = &cli.command
    {
        return record_feedback(&config, question, sql, *good, *bad);
    }

    let inquirer = Inquirer::connect(&config).await?;
    let outcome = dispatch(&inquirer, &cli.command).await;
    inquirer.close().await?;
    outcome
}

async fn dispatch(inquirer: &Inquirer, command: &Command) -> Result<()> {
    match command {
        Command::Ask {
            question,
            refine,
            json,
        } => {
            let answer = inquirer.ask(question, refine.refinement().as_ref()).await?;
            if *json {
                let body = serde_json::to_string_pretty(&answer)
                    .map_err(|e| InquireError::internal(format!("Failed to encode answer: {e}")))?;
                println!("{body}");
            } else {
                println!("{}\n", answer.analysis);
                println!("{}\n", answer.sql_query);
                print!("{}", answer.data_table());
                if answer.was_truncated {
                    println!("(showing the first {} rows)", answer.data.len());
                }
            }
        }
        Command::Sql { question, refine } => {
            let query = inquirer
                .generate_sql(question, refine.refinement().as_ref())
                .await?;
            println!("{query}");
        }
        Command::Schema => println!("{}", inquirer.schema().await?),
        Command::Feedback { .. } => {}
    }
    Ok(())
}

/// Saves good pairs to the example pool. Needs no database connection.
fn record_feedback(
    config: &Config,
    question: &str,
    sql: &str,
    good: bool,
    bad: bool,
) -> Result<()> {
    match (good, bad) {
        (true, _) => {
            save_feedback(config, question, sql)?;
            println!("Saved to {}", config.generation.examples_path.display());
        }
        (false, true) => {
            info!(question, "Negative feedback recorded; example pool unchanged");
            println!(
                "Not saved. Re-run `inquire ask` with --previous-sql and --feedback to refine it."
            );
        }
        (false, false) => {
            return Err(InquireError::config("Pass --good or --bad"));
        }
    }
    Ok(())
}
