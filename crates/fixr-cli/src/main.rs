mod app;
mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fixr_client::{ApiClient, DEFAULT_API_URL};
use fixr_core::random::{from_entropy, seeded};
use fixr_core::{ArenaConfig, RunInput, UserDetails};
use tracing::Level;

use crate::app::{App, Notice};

#[derive(Parser)]
#[command(
    name = "fixr",
    version,
    about = "Upload a loan offer and watch AI agents negotiate it down"
)]
struct Cli {
    /// Arena configuration file (JSON); missing keys keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Animation speed multiplier (2 plays twice as fast).
    #[arg(long, global = true, default_value_t = 1.0)]
    speed: f64,

    /// Seed for a reproducible run.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print the agent board after every round.
    #[arg(long, global = true)]
    board: bool,

    /// Log more to stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a loan offer document and negotiate it.
    Negotiate {
        /// PDF or Word document, at most 10 MB.
        file: PathBuf,

        #[arg(long, env = "FIXR_API_URL", default_value = DEFAULT_API_URL)]
        api_url: String,

        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        #[command(flatten)]
        contact: Contact,
    },
    /// Play a negotiation offline, without a backend.
    Simulate {
        #[arg(long)]
        original_amount: Option<i64>,
        #[arg(long)]
        new_amount: Option<i64>,
        #[arg(long)]
        savings_percentage: Option<f64>,
        #[arg(long, default_value = "loan-offer.pdf")]
        file_name: String,
    },
}

/// Contact details to submit once the result is in.
#[derive(Args)]
struct Contact {
    #[arg(long, requires_all = ["email", "mobile"])]
    name: Option<String>,
    #[arg(long, requires_all = ["name", "mobile"])]
    email: Option<String>,
    #[arg(long, requires_all = ["name", "email"])]
    mobile: Option<String>,
}

impl Contact {
    fn into_details(self) -> Option<UserDetails> {
        match (self.name, self.email, self.mobile) {
            (Some(name), Some(email), Some(mobile)) => Some(UserDetails {
                name,
                email,
                mobile,
            }),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
    tracing::info!("fixr v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?.scaled(cli.speed)?;
    let source = match cli.seed {
        Some(seed) => seeded(seed),
        None => from_entropy(),
    };
    let show_board = cli.board;

    match cli.command {
        Command::Negotiate {
            file,
            api_url,
            timeout,
            contact,
        } => {
            let details = contact.into_details();
            if let Some(details) = &details {
                details.validate().context("checking contact details")?;
            }

            let document = match app::load_document(&file).await {
                Ok(document) => document,
                Err(err) => return notice_or_error(err),
            };
            let client = ApiClient::with_timeout(api_url, Duration::from_secs(timeout))?;
            let mut app = App::new(client, config);

            println!(
                "Uploading {} ({})...",
                document.file_name,
                document.size_label()
            );
            let input = match app.upload(&document).await {
                Ok(input) => input,
                Err(err) => return notice_or_error(err),
            };

            let outcome = app
                .negotiate(&input, source, interrupted(), |event| {
                    display::print_event(event, show_board)
                })
                .await?;
            let Some(result) = outcome else {
                println!("\nNegotiation cancelled.");
                return Ok(ExitCode::from(130));
            };
            display::print_result_card(&result);

            if let Some(details) = details {
                let notice = app.submit_details(&details).await?;
                display::print_notice(&notice);
                if notice == Notice::DetailsFailed {
                    return Ok(ExitCode::FAILURE);
                }
            }
            tracing::debug!(stage = app.session().stage().name(), "session finished");
        }
        Command::Simulate {
            original_amount,
            new_amount,
            savings_percentage,
            file_name,
        } => {
            let input = RunInput {
                original_amount,
                new_amount,
                savings_percentage,
                ..RunInput::new(file_name)
            };
            let outcome = app::play(&input, &config, source, interrupted(), |event| {
                display::print_event(event, show_board)
            })
            .await?;
            let Some(result) = outcome else {
                println!("\nNegotiation cancelled.");
                return Ok(ExitCode::from(130));
            };
            display::print_result_card(&result);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Show a user notice and fail, or pass any other error on.
fn notice_or_error(err: anyhow::Error) -> anyhow::Result<ExitCode> {
    let notice = err.downcast::<Notice>()?;
    display::print_notice(&notice);
    Ok(ExitCode::FAILURE)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ArenaConfig> {
    let Some(path) = path else {
        return Ok(ArenaConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    ArenaConfig::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        futures::future::pending::<()>().await;
    }
}
