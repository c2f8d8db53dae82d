use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod dialog;
mod error;
mod forms;
mod listing;
mod models;
mod render;
mod schema;
mod session;
mod stats;
#[cfg(test)]
mod testing;
mod validation;

use api::ApiClient;
use commands::activities::ActivityCommand;
use commands::documents::DocumentCommand;
use commands::exams::ExamCommand;
use commands::points::PointsCommand;
use commands::ratings::RatingCommand;
use commands::surveys::SurveyCommand;
use commands::users::UserCommand;
use commands::Context;
use config::Settings;
use error::AdminError;
use session::{Session, SessionState};

#[derive(Parser)]
#[command(name = "youth-admin")]
#[command(about = "Admin console for the youth organization backend", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange credentials for a session token
    Login {
        #[arg(long, env = "YOUTH_ADMIN_USERNAME")]
        username: String,
        #[arg(long, env = "YOUTH_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Activities and attendance
    #[command(subcommand)]
    Activities(ActivityCommand),
    #[command(subcommand)]
    Documents(DocumentCommand),
    #[command(subcommand)]
    Exams(ExamCommand),
    /// Leaderboard and point adjustments
    #[command(subcommand)]
    Points(PointsCommand),
    /// Rating periods and self-rating reviews
    #[command(subcommand)]
    Ratings(RatingCommand),
    #[command(subcommand)]
    Surveys(SurveyCommand),
    #[command(subcommand)]
    Users(UserCommand),
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("youth_admin=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.settings.log_json);

    let store = cli.settings.token_store();
    let token_file = store.path().display().to_string();
    let session = Session::restore(store)
        .with_context(|| format!("failed to read token file {token_file}"))?;
    let mut session_events = session.subscribe();
    let client =
        ApiClient::new(&cli.settings.api_url, session).context("failed to build the HTTP client")?;
    let ctx = Context {
        client,
        settings: cli.settings,
    };

    match dispatch(&ctx, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::warn!(error = %err, retryable = err.is_retryable(), "command failed");
            eprintln!("{}", render::notice(&err));
            if session_events.has_changed().unwrap_or(false)
                && *session_events.borrow_and_update() == SessionState::Invalidated
            {
                tracing::info!(%token_file, "stored token was cleared, run `login` again");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<(), AdminError> {
    match command {
        Commands::Login { username, password } => {
            ctx.client.login(&username, &password).await?;
            println!("Signed in as {username}");
            Ok(())
        }
        Commands::Logout => {
            let session = ctx.client.session();
            if session.state() != SessionState::SignedIn {
                println!("Not signed in");
                return Ok(());
            }
            session.sign_out()?;
            println!("Signed out");
            Ok(())
        }
        Commands::Activities(command) => commands::activities::run(ctx, command).await,
        Commands::Documents(command) => commands::documents::run(ctx, command).await,
        Commands::Exams(command) => commands::exams::run(ctx, command).await,
        Commands::Points(command) => commands::points::run(ctx, command).await,
        Commands::Ratings(command) => commands::ratings::run(ctx, command).await,
        Commands::Surveys(command) => commands::surveys::run(ctx, command).await,
        Commands::Users(command) => commands::users::run(ctx, command).await,
    }
}
