use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mosaic_match::config::{load_settings, save_settings, Settings};
use mosaic_match::{HttpAgentClient, InterestProfile, NegotiationSession, TurnScheduler};

#[derive(Parser)]
#[command(name = "mosaic_match", about = "Negotiate an icebreaker question between two interest profiles")]
struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one negotiation and print the agreed question.
    Negotiate {
        #[arg(long)]
        a: String,
        #[arg(long)]
        b: String,
        #[arg(long)]
        max_rounds: Option<u32>,
    },

    /// Check that the configured model endpoint answers.
    Check,

    /// Write default settings to the config path.
    InitConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Command::InitConfig = cli.command {
        let path = save_settings(&Settings::default(), cli.config.as_deref())?;
        println!("Wrote {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let settings = load_settings(cli.config.as_deref())?;
    let client = Arc::new(HttpAgentClient::new(&settings.agent)?);

    match cli.command {
        Command::Check => match client.list_models().await {
            Ok(count) => {
                println!("Connected ({} models available)", count);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                println!("Connection failed: {}", e);
                Ok(ExitCode::FAILURE)
            }
        },

        Command::Negotiate { a, b, max_rounds } => {
            let scheduler = TurnScheduler::from_settings(client, &settings);
            let mut session = NegotiationSession::new(
                InterestProfile::new(a),
                InterestProfile::new(b),
                max_rounds.unwrap_or(settings.negotiation.max_rounds),
                settings.negotiation.goal.clone(),
            );

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, cancelling negotiation");
                    on_interrupt.cancel();
                }
            });

            let outcome = session.run(&scheduler, &cancel).await;
            info!(session_id = %session.id(), turns = session.transcript().len(), "done");

            match outcome.into_result() {
                Ok(question) => {
                    println!("{}", question);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{} ({})", e, e.category());
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::InitConfig => Ok(ExitCode::SUCCESS),
    }
}
