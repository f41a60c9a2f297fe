mod api;
mod application;
mod config;
mod directory;
mod error;
mod models;
mod notify;
mod session;
mod telemetry;
mod tui;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use api::{AdminBackend, HttpClient, JobsBackend};
use application::ApplicationForm;
use config::AppConfig;
use directory::{DeleteOutcome, UserDirectory, ViewFilter};
use models::{FactValue, ListKind, RowKey};
use notify::{AssumeYes, Confirm, ConsoleNotifier, Notifier, PromptConfirm, ToastQueue};
use session::{LocalStorage, Session, TOKEN_KEY};

#[derive(Parser)]
#[command(name = "hirex")]
#[command(about = "Hiring platform console - manage users and apply to jobs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and manage candidates and recruiters
    Users {
        /// Which users to show
        #[arg(short, long, value_enum)]
        view: Option<ViewFilter>,

        /// Filter by name or email
        #[arg(short, long)]
        query: Option<String>,

        #[command(subcommand)]
        command: Option<UserCommands>,
    },

    /// Open the application form for a job link
    Apply {
        /// Job link ID
        link_id: String,
    },

    /// Show a job's details
    Job {
        /// Job link ID
        link_id: String,
    },

    /// Store an admin token for later runs
    Login {
        /// Token issued by the backend
        #[arg(long)]
        token: String,
    },

    /// Forget the stored token
    Logout,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Print users as a table
    List,

    /// Delete a candidate or recruiter
    Delete {
        /// Collection the user belongs to
        #[arg(value_enum)]
        kind: KindArg,

        /// User ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Candidate,
    Recruiter,
}

impl From<KindArg> for ListKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Candidate => ListKind::Candidate,
            KindArg::Recruiter => ListKind::Recruiter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("Invalid configuration")?;
    let log_path = telemetry::init(&config.log_level, &config.data_dir)?;
    tracing::debug!("logging to {}", log_path.display());

    let mut storage = LocalStorage::open(&config.data_dir).context("Failed to open local storage")?;
    let override_token = config.token.as_deref();

    let connect = |storage: &LocalStorage| -> Result<Arc<HttpClient>> {
        let session = Session::resolve(override_token, storage);
        let client = HttpClient::new(&config.api_base, session, config.timeout)
            .context("Failed to build HTTP client")?;
        Ok(Arc::new(client))
    };

    match cli.command {
        Commands::Users { view, query, command } => {
            if !Session::resolve(override_token, &storage).is_authenticated() {
                eprintln!("warning: no token stored; run `hirex login --token <TOKEN>` first");
            }
            let client = connect(&storage)?;
            let view = view.unwrap_or_default();
            match command {
                None => {
                    let api_base = client.api_base().to_string();
                    tui::run_users(client, &api_base, view, query).await?;
                }

                Some(UserCommands::List) => {
                    let mut users = UserDirectory::new();
                    users.load(client.as_ref()).await;
                    if let Some(error) = users.error() {
                        bail!("{}", error);
                    }
                    let entries = users.search(view, query.as_deref().unwrap_or(""));
                    if entries.is_empty() {
                        println!("No users found.");
                    } else {
                        println!("{:<10} {:<26} {:<26} {:<32}", "KIND", "ID", "NAME", "EMAIL");
                        println!("{}", "-".repeat(96));
                        for entry in &entries {
                            println!(
                                "{:<10} {:<26} {:<26} {:<32}",
                                entry.list.label(),
                                truncate(&entry.record.id, 24),
                                truncate(&entry.record.display_name(), 24),
                                truncate(&entry.record.email, 30)
                            );
                        }
                    }
                    let hidden = users.unknown_count();
                    if hidden > 0 {
                        println!("\n{} record(s) with an unrecognized role not shown.", hidden);
                    }
                }

                Some(UserCommands::Delete { kind, id, yes }) => {
                    let key = RowKey::new(kind.into(), id);
                    let confirm: &dyn Confirm = if yes { &AssumeYes } else { &PromptConfirm };
                    match delete_user(client.as_ref(), &key, confirm, &ConsoleNotifier).await? {
                        DeleteOutcome::Cancelled => println!("Cancelled."),
                        DeleteOutcome::AlreadyDeleting => println!("Delete already in progress."),
                        DeleteOutcome::Deleted | DeleteOutcome::Failed => {}
                    }
                }
            }
        }

        Commands::Apply { link_id } => {
            let client = connect(&storage)?;
            let form = ApplicationForm::new(client, link_id.clone(), None).on_submitted(move || {
                tracing::info!("submitted application for {}", link_id);
            });
            tui::run_apply(form, ToastQueue::new()).await?;
        }

        Commands::Job { link_id } => {
            let client = connect(&storage)?;
            let job = client
                .fetch_job(&link_id)
                .await
                .with_context(|| format!("Failed to load job {}", link_id))?;

            println!("{}", job.title().unwrap_or_else(|| "Untitled job".to_string()));
            if let Some(company) = job.company() {
                println!("Company: {}", company);
            }
            let cards = job.fact_cards();
            if !cards.is_empty() {
                println!();
            }
            for card in cards {
                let value = match card.value {
                    FactValue::Text(text) => text,
                    FactValue::Items(items) => items.join(", "),
                };
                let options = textwrap::Options::new(80)
                    .initial_indent("")
                    .subsequent_indent("                    ");
                println!("{}", textwrap::fill(&format!("{:<20}{}", card.label, value), options));
            }
        }

        Commands::Login { token } => {
            if token.trim().is_empty() {
                bail!("Token cannot be empty");
            }
            storage.set(TOKEN_KEY, token.trim()).context("Failed to save token")?;
            println!("Token saved to {}", storage.path().display());
        }

        Commands::Logout => {
            if storage.remove(TOKEN_KEY).context("Failed to update local storage")? {
                println!("Token removed.");
            } else {
                println!("No token stored.");
            }
        }
    }

    Ok(())
}

/// Loads the directory so the prompt can name the user, then deletes.
async fn delete_user<B: AdminBackend>(
    backend: &B,
    key: &RowKey,
    confirm: &dyn Confirm,
    notifier: &dyn Notifier,
) -> Result<DeleteOutcome> {
    let mut users = UserDirectory::new();
    users.load(backend).await;
    if let Some(error) = users.error() {
        bail!("{}", error);
    }
    if users.find(key).is_none() {
        bail!("No {} with ID {}", key.list.label(), key.id);
    }
    match users.delete(backend, key, confirm, notifier).await {
        DeleteOutcome::Failed => bail!("Failed to delete {}", key.list.label()),
        outcome => Ok(outcome),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
