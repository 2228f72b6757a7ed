use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tradedesk::agents::AgentRole;
use tradedesk::models::{SupervisorState, TradedeskConfig};
use tradedesk::store::SessionStore;
use tradedesk::Desk;

const DEFAULT_CONFIG: &str = "config/tradedesk.toml";

#[derive(Parser, Debug)]
#[command(
    name = "tradedesk",
    about = "Dispatch finance and trade-execution agent tasks against a persisted supervisor session"
)]
struct Cli {
    /// Path to configuration file [default: config/tradedesk.toml, if present]
    #[arg(short, long)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assign a task to an agent and run it
    Run {
        /// finance | trade
        #[arg(short, long)]
        role: AgentRole,

        #[arg(short, long)]
        task: String,

        /// User query for a new session (defaults to the task)
        #[arg(short, long)]
        query: Option<String>,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<Uuid>,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print a persisted session state
    Show {
        #[arg(short, long)]
        session: Uuid,

        #[arg(long)]
        pretty: bool,
    },
    /// List recently updated sessions
    Sessions {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// List the tools bound to each agent
    Tools {
        #[arg(short, long)]
        role: Option<AgentRole>,
    },
}

fn init_tracing(json: bool) {
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn resolve_config(path: Option<&str>) -> Result<TradedeskConfig> {
    match path {
        Some(path) => tradedesk::load_config(path),
        None if Path::new(DEFAULT_CONFIG).exists() => tradedesk::load_config(DEFAULT_CONFIG),
        None => {
            tracing::info!("No config file found, using defaults");
            Ok(TradedeskConfig::default())
        }
    }
}

fn open_store(config: &TradedeskConfig) -> Result<SessionStore> {
    SessionStore::from_config(&config.store)
        .with_context(|| format!("Failed to open session DB: {}", config.store.sqlite_path))
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            role,
            task,
            query,
            session,
            pretty,
        } => {
            let desk = Desk::from_config(&config)?;
            let store = open_store(&config)?;

            let mut state = match session {
                Some(id) => {
                    if query.is_some() {
                        tracing::warn!(session = %id, "--query ignored for an existing session");
                    }
                    match store.load(id).await? {
                        Some(state) => state,
                        None => bail!("Unknown session: {id}"),
                    }
                }
                None => SupervisorState::new(query.unwrap_or_else(|| task.clone())),
            };

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received shutdown signal");
                on_signal.cancel();
            });

            let result = desk.dispatch(&store, &mut state, role, &task, &cancel).await;
            println!("{}", to_json(&state, pretty)?);
            result?;
        }
        Command::Show { session, pretty } => {
            let store = open_store(&config)?;
            let Some(state) = store.load(session).await? else {
                bail!("Unknown session: {session}");
            };
            println!("{}", to_json(&state, pretty)?);
        }
        Command::Sessions { limit } => {
            let store = open_store(&config)?;
            for row in store.recent(limit)? {
                println!("{}\t{}\t{}", row.session_id, row.updated_at, row.user_query);
            }
        }
        Command::Tools { role } => {
            let desk = Desk::from_config(&config)?;
            let roles = match role {
                Some(role) => vec![role],
                None => AgentRole::ALL.to_vec(),
            };
            let mut listing = serde_json::Map::new();
            for role in roles {
                let specs = desk.tool_specs(role).await?;
                listing.insert(role.tool_set_key().to_string(), serde_json::to_value(specs)?);
            }
            println!("{}", to_json(&listing, true)?);
        }
    }

    Ok(())
}
