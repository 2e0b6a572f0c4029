mod db_commands;
mod pairing_commands;
#[cfg(feature = "tailscale")]
mod tailscale_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chatgate", about = "Chatgate — multi-channel conversational gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Custom config directory (overrides default ~/.config/chatgate/).
    #[arg(long, global = true, env = "CHATGATE_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "CHATGATE_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway (default when no subcommand is given): boot every
    /// subsystem, serve HTTP/WS until SIGINT/SIGTERM, then shut down in
    /// reverse order (§4.4).
    Gateway,
    /// Persistent store maintenance (§6.4).
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
    /// Pairing/trust administration out of band from a chat channel (§4.2).
    Pairing {
        #[command(subcommand)]
        action: pairing_commands::PairingAction,
    },
    /// Tailscale peer-identity lookups (§4.2 `checkAutoApprove`).
    #[cfg(feature = "tailscale")]
    Tailscale {
        #[command(subcommand)]
        action: tailscale_commands::TailscaleAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true).with_thread_ids(false)).init();
    } else {
        registry.with(fmt::layer().with_target(false).with_thread_ids(false).with_ansi(true)).init();
    }
}

async fn run_gateway(cli: &Cli) -> anyhow::Result<()> {
    if let Some(dir) = &cli.config_dir {
        chatgate_config::set_config_dir(dir.clone());
    }
    if let Some(dir) = &cli.data_dir {
        chatgate_config::set_data_dir(dir.clone());
    }

    let mut config = chatgate_config::discover_and_load();
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let config_path = Some(chatgate_config::find_or_default_config_path());
    let gateway = chatgate_gateway::boot(config, config_path.as_deref(), chatgate_gateway::collaborators::Collaborators::default()).await?;

    info!(version = env!("CARGO_PKG_VERSION"), "chatgate gateway started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, tearing down");
    chatgate_gateway::shutdown(gateway).await;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Gateway) => run_gateway(&cli).await,
        Some(Commands::Db { action }) => db_commands::handle_db(action).await,
        Some(Commands::Pairing { action }) => pairing_commands::handle_pairing(action).await,
        #[cfg(feature = "tailscale")]
        Some(Commands::Tailscale { action }) => tailscale_commands::handle_tailscale(action).await,
    }
}
