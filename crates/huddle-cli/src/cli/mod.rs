//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use huddle_core::config::{self, Config};
use huddle_core::{
    Api, ApiClient, ApiError, FileTokenStore, GuardOutcome, Navigator, Route, SessionHandle,
    logging,
};

mod commands;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(version)]
#[command(about = "Group chat from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides HUDDLE_API_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out and forget saved tokens
    Logout,
    /// Show the logged-in user
    Whoami,

    /// Manage your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Browse, create and join groups
    Groups {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Read and send group messages
    Messages {
        #[command(subcommand)]
        command: MessageCommands,
    },
    /// Interactive chat in a group
    Chat {
        #[arg(value_name = "GROUP_ID")]
        group_id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Update name, email and password
    Update {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Upload a new profile picture
    Avatar {
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,
    },
}

#[derive(clap::Subcommand)]
enum GroupCommands {
    /// Groups you belong to
    List,
    /// Public groups
    Public,
    /// Create a group
    Create {
        #[arg(value_name = "NAME")]
        name: String,
        /// Create a private group
        #[arg(long)]
        private: bool,
    },
    /// Join a public group
    Join {
        #[arg(value_name = "GROUP_ID")]
        id: String,
    },
    /// Show a group with its admin and members
    Show {
        #[arg(value_name = "GROUP_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum MessageCommands {
    /// List messages in a group
    List {
        #[arg(value_name = "GROUP_ID")]
        group_id: String,
    },
    /// Send a message to a group
    Send {
        #[arg(value_name = "GROUP_ID")]
        group_id: String,
        #[arg(value_name = "CONTENT")]
        content: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Save the backend base URL
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("load config")?;
    let _log_guard = match logging::init(&config, &config::paths::logs_dir()) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let Cli { command, api_url } = cli;

    // config commands work without a backend or a session
    let command = match command {
        Commands::Config { command } => return run_config(command),
        other => other,
    };

    let api = connect(&config, api_url.as_deref())?;
    enter(&api, &route_for(&command))?;

    match command {
        Commands::Login { email, password } => {
            commands::auth::login(&api, &email, password).await
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::auth::register(&api, &name, &email, password).await,
        Commands::Logout => commands::auth::logout(&api).await,
        Commands::Whoami => commands::auth::whoami(&api).await,

        Commands::Profile { command } => match command {
            ProfileCommands::Update {
                name,
                email,
                password,
            } => commands::profile::update(&api, &name, &email, password).await,
            ProfileCommands::Avatar { file } => commands::profile::avatar(&api, &file).await,
        },

        Commands::Groups { command } => match command {
            GroupCommands::List => commands::groups::list(&api).await,
            GroupCommands::Public => commands::groups::public(&api).await,
            GroupCommands::Create { name, private } => {
                commands::groups::create(&api, &name, private).await
            }
            GroupCommands::Join { id } => commands::groups::join(&api, &id).await,
            GroupCommands::Show { id } => commands::groups::show(&api, &id).await,
        },

        Commands::Messages { command } => match command {
            MessageCommands::List { group_id } => commands::messages::list(&api, &group_id).await,
            MessageCommands::Send { group_id, content } => {
                commands::messages::send(&api, &group_id, &content).await
            }
        },

        Commands::Chat { group_id } => commands::chat::run(&api, &group_id).await,

        Commands::Config { command } => run_config(command),
    }
}

fn run_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
    }
}

/// Builds the API stack from persisted tokens and configuration.
fn connect(config: &Config, api_url: Option<&str>) -> Result<Api> {
    let base_url = config.resolve_api_url(api_url)?;
    let store = Arc::new(FileTokenStore::default_location());
    let session = SessionHandle::restore(store.as_ref()).context("load saved session")?;

    tracing::debug!(base_url = %base_url, logged_in = session.is_logged_in(), "connecting");

    let client = ApiClient::builder(base_url, session)
        .config(config)
        .token_store(store)
        .navigator(Arc::new(CliNavigator))
        .build()
        .context("build HTTP client")?;

    Ok(Api::new(client))
}

/// Route a command renders, for guard purposes.
fn route_for(command: &Commands) -> Route {
    match command {
        Commands::Login { .. } => Route::Login,
        Commands::Register { .. } => Route::Register,
        Commands::Profile { .. } => Route::Profile,
        Commands::Groups {
            command: GroupCommands::Create { .. },
        } => Route::CreateGroup,
        Commands::Groups {
            command: GroupCommands::Join { id } | GroupCommands::Show { id },
        }
        | Commands::Messages {
            command:
                MessageCommands::List { group_id: id } | MessageCommands::Send { group_id: id, .. },
        }
        | Commands::Chat { group_id: id } => Route::Group {
            name: "group".to_string(),
            id: id.clone(),
        },
        Commands::Logout
        | Commands::Whoami
        | Commands::Groups { .. }
        | Commands::Config { .. } => Route::App,
    }
}

/// Applies the route's guard; a redirect stops the command.
fn enter(api: &Api, route: &Route) -> Result<()> {
    match route.resolve(api.session()) {
        GuardOutcome::Render => Ok(()),
        GuardOutcome::Redirect(target) => {
            let reason = if target == Route::UNAUTHENTICATED_ENTRY {
                "Not logged in"
            } else {
                "Already logged in"
            };
            CliNavigator.redirect(target);
            anyhow::bail!("{reason}")
        }
    }
}

/// Turns API failures into user-facing errors.
///
/// Server-reported failures show the server's message; transport and decode
/// failures keep their full chain.
pub(crate) fn user_error(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Network(_) | ApiError::Decode { .. } | ApiError::Storage(_) => {
            anyhow::Error::new(err)
        }
        other => anyhow::anyhow!(other.user_message()),
    }
}

/// Prints where the user should go next.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect(&self, route: Route) {
        tracing::info!(route = %route, "redirect");
        match route {
            Route::Login => eprintln!("Run `huddle login --email <EMAIL>` to sign in."),
            Route::App => eprintln!("Run `huddle logout` first to switch accounts."),
            other => eprintln!("Continue at {other}"),
        }
    }
}
