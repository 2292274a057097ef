//! CareLink Gateway CLI - chat through prioritized AI providers and inspect usage

use anyhow::{bail, Context, Result};
use carelink_gateway::{
    api::{available_models, Message, ProviderKind},
    config::{FileSecretStore, GatewaySettings, ProviderProfile, DEFAULT_PRIORITY},
    orchestrator::Gateway,
    tui::{renderer::TerminalRenderer, spinner::WaitingSpinner, ChatShell},
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "carelink-gateway")]
#[command(about = "Chat through prioritized AI providers with automatic failover")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Settings file (default: ~/.config/carelink-gateway/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message, or start an interactive chat when none is given
    Chat {
        /// Message to send
        message: Option<String>,

        /// System prompt sent before the conversation
        #[arg(short, long)]
        system: Option<String>,
    },

    /// Send a test message through the configured providers
    Test,

    /// Manage provider profiles
    #[command(subcommand)]
    Providers(ProviderCommands),

    /// Inspect and prune recorded usage
    #[command(subcommand)]
    Usage(UsageCommands),

    /// Manage gateway settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ProviderCommands {
    /// List profiles in failover order
    List,

    /// Show one profile
    Show { id: String },

    /// Add a profile, or replace the one with the same id
    Add {
        /// Provider kind (basic, openai, anthropic, google, local)
        kind: String,

        /// Model id (default: first known model for the kind)
        #[arg(short, long)]
        model: Option<String>,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// API key (default: OPENAI_API_KEY, ANTHROPIC_API_KEY or GOOGLE_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Base URL override
        #[arg(long)]
        endpoint: Option<String>,

        /// Higher is tried first
        #[arg(short, long, default_value_t = DEFAULT_PRIORITY, allow_hyphen_values = true)]
        priority: i32,

        /// Explicit id, replaces an existing profile with that id
        #[arg(long)]
        id: Option<String>,

        /// Add the profile disabled
        #[arg(long)]
        inactive: bool,
    },

    /// Remove a profile
    Remove { id: String },

    /// Include a profile in failover
    Enable { id: String },

    /// Exclude a profile from failover
    Disable { id: String },

    /// Change a profile's priority
    Priority {
        id: String,

        #[arg(allow_hyphen_values = true)]
        value: i32,
    },

    /// List known models
    Models {
        /// Only this kind
        kind: Option<String>,
    },
}

#[derive(Subcommand)]
enum UsageCommands {
    /// Aggregated usage per provider kind
    Stats {
        /// Window in days (default from settings)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Most recent attempts, newest first
    History {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete records older than the retention window
    Cleanup {
        /// Days to keep (default from settings)
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a settings file with defaults
    Init {
        /// Overwrite existing settings
        #[arg(long)]
        force: bool,
    },

    /// Show effective settings
    Show,

    /// Show settings file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings_path = cli.config.unwrap_or_else(GatewaySettings::default_path);

    match cli.command {
        Commands::Config(cmd) => run_config_command(cmd, settings_path)?,
        Commands::Providers(ProviderCommands::Models { kind }) => show_models(kind)?,
        command => {
            let settings = GatewaySettings::load_from(settings_path)?;
            settings.validate()?;
            run_gateway_command(command, settings).await?;
        }
    }

    Ok(())
}

async fn run_gateway_command(command: Commands, settings: GatewaySettings) -> Result<()> {
    let secrets = FileSecretStore::new(&settings.secret_store_path);
    let gateway = Gateway::from_settings(&settings)?;
    let loaded = gateway.load_profiles(&secrets).await;
    debug!("{} provider profiles loaded", loaded);

    match command {
        Commands::Chat { message: Some(message), system } => {
            run_chat_once(&gateway, message, system).await;
        }
        Commands::Chat { message: None, system } => {
            ChatShell::new(&gateway, settings.stats_days)
                .with_system(system)
                .run()
                .await;
        }
        Commands::Test => run_test(&gateway).await,
        Commands::Providers(cmd) => run_provider_command(cmd, &gateway, &secrets).await?,
        Commands::Usage(cmd) => run_usage_command(cmd, &gateway, &settings).await?,
        Commands::Config(_) => bail!("config commands run without a gateway"),
    }

    gateway.recorder().flush().await;
    Ok(())
}

async fn run_chat_once(gateway: &Gateway, message: String, system: Option<String>) {
    let renderer = TerminalRenderer::new();

    let mut messages = Vec::new();
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(message));

    let mut spinner = WaitingSpinner::new();
    spinner.start("Waiting for a provider...");
    let response = gateway.chat(&messages).await;
    spinner.stop();

    if response.success {
        renderer.render_reply(response.content.as_deref().unwrap_or(""));
        if let Some(usage) = &response.usage {
            renderer.render_usage_line(usage);
        }
    } else {
        renderer.render_failure(response.error.as_deref().unwrap_or("unknown error"));
    }
}

async fn run_test(gateway: &Gateway) {
    let renderer = TerminalRenderer::new();

    match gateway.primary_profile().await {
        Some(profile) => renderer.render_info(&format!("Testing from {}", profile.label())),
        None => {
            renderer.render_failure("no active provider");
            return;
        }
    }

    let mut spinner = WaitingSpinner::new();
    spinner.start("Testing connection...");
    let (ok, error) = gateway.test_connection().await;
    spinner.stop();

    if ok {
        renderer.render_success("Connection OK");
    } else {
        renderer.render_failure(error.as_deref().unwrap_or("unknown error"));
    }
}

async fn run_provider_command(
    cmd: ProviderCommands,
    gateway: &Gateway,
    secrets: &FileSecretStore,
) -> Result<()> {
    let renderer = TerminalRenderer::new();

    match cmd {
        ProviderCommands::List => {
            renderer.render_profiles(&gateway.list().await);
            return Ok(());
        }
        ProviderCommands::Show { id } => {
            let profile = gateway
                .get(&id)
                .await
                .with_context(|| format!("no profile with id {}", id))?;
            renderer.render_profile_detail(&profile);
            return Ok(());
        }
        ProviderCommands::Add {
            kind,
            model,
            name,
            api_key,
            endpoint,
            priority,
            id,
            inactive,
        } => {
            let kind: ProviderKind = kind.parse().map_err(anyhow::Error::msg)?;
            let model = match model {
                Some(model) => model,
                None => available_models(kind)
                    .first()
                    .map(|m| m.id.to_string())
                    .with_context(|| format!("no default model for {}", kind))?,
            };

            let mut profile = ProviderProfile::new(kind, model)
                .with_priority(priority)
                .with_active(!inactive);
            if let Some(id) = id {
                profile = profile.with_id(id);
            }
            if let Some(name) = name {
                profile = profile.with_name(name);
            }
            if let Some(key) = api_key.or_else(|| credential_from_env(kind)) {
                profile = profile.with_credential(key);
            }
            if let Some(endpoint) = endpoint {
                profile = profile.with_endpoint(endpoint);
            }
            if kind.requires_credential() && profile.credential().is_none() {
                renderer.render_system(&format!(
                    "No API key given, {} calls will fail until one is set",
                    kind
                ));
            }

            let id = gateway.add_or_replace(profile).await;
            renderer.render_success(&format!("Saved profile {}", id));
        }
        ProviderCommands::Remove { id } => {
            if !gateway.remove(&id).await {
                bail!("no profile with id {}", id);
            }
            renderer.render_success(&format!("Removed profile {}", id));
        }
        ProviderCommands::Enable { id } => {
            if !gateway.set_active(&id, true).await {
                bail!("no profile with id {}", id);
            }
            renderer.render_success(&format!("Enabled profile {}", id));
        }
        ProviderCommands::Disable { id } => {
            if !gateway.set_active(&id, false).await {
                bail!("no profile with id {}", id);
            }
            renderer.render_success(&format!("Disabled profile {}", id));
        }
        ProviderCommands::Priority { id, value } => {
            if !gateway.set_priority(&id, value).await {
                bail!("no profile with id {}", id);
            }
            renderer.render_success(&format!("Profile {} priority set to {}", id, value));
        }
        ProviderCommands::Models { kind } => return show_models(kind),
    }

    gateway.save_profiles(secrets).await?;
    Ok(())
}

fn credential_from_env(kind: ProviderKind) -> Option<String> {
    let var = match kind {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::Google => "GOOGLE_API_KEY",
        ProviderKind::Offline | ProviderKind::Local => return None,
    };
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn show_models(kind: Option<String>) -> Result<()> {
    let renderer = TerminalRenderer::new();

    let kinds = match kind {
        Some(kind) => vec![kind.parse::<ProviderKind>().map_err(anyhow::Error::msg)?],
        None => ProviderKind::ALL.to_vec(),
    };
    for kind in kinds {
        renderer.render_models(kind, available_models(kind));
    }

    Ok(())
}

async fn run_usage_command(
    cmd: UsageCommands,
    gateway: &Gateway,
    settings: &GatewaySettings,
) -> Result<()> {
    let renderer = TerminalRenderer::new();
    let recorder = gateway.recorder();

    match cmd {
        UsageCommands::Stats { days } => {
            let days = days.unwrap_or(settings.stats_days);
            let stats = recorder.stats(days).await?;
            renderer.render_stats(days, &stats);
        }
        UsageCommands::History { limit } => {
            let records = recorder
                .history(limit.unwrap_or(settings.history_limit))
                .await?;
            renderer.render_history(&records);
        }
        UsageCommands::Cleanup { days } => {
            let days = days.unwrap_or(settings.retention_days);
            let deleted = recorder.cleanup(days).await?;
            renderer.render_success(&format!(
                "Deleted {} records older than {} days",
                deleted, days
            ));
        }
    }

    Ok(())
}

fn run_config_command(cmd: ConfigCommands, path: PathBuf) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => config_init(path, force)?,
        ConfigCommands::Show => config_show(path)?,
        ConfigCommands::Path => config_path(&path),
    }
    Ok(())
}

fn config_init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Settings file already exists at: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    GatewaySettings::default().save_to(path.clone())?;

    println!("Settings file created at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  carelink-gateway providers add basic");
    println!("  carelink-gateway providers add openai --api-key sk-... --priority 90");
    println!("  carelink-gateway test");

    Ok(())
}

fn config_show(path: PathBuf) -> Result<()> {
    let settings = GatewaySettings::load_from(path)?;
    println!("{}", toml::to_string_pretty(&settings)?);

    println!("--- Environment Variables ---");
    for var in [
        "CARELINK_TIMEOUT_SECS",
        "CARELINK_USAGE_LOG",
        "CARELINK_SECRET_STORE",
        "OPENAI_API_KEY",
        "ANTHROPIC_API_KEY",
        "GOOGLE_API_KEY",
    ] {
        let state = if std::env::var(var).is_ok() { "set" } else { "not set" };
        println!("{}: {}", var, state);
    }

    Ok(())
}

fn config_path(path: &Path) {
    println!("{}", path.display());

    if path.exists() {
        println!("(file exists)");
    } else {
        println!("(file does not exist - run 'config init' to create)");
    }
}
