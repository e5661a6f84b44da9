use anyhow::Result;
use clap::{Parser, Subcommand};
use hostlink::config::{Config, Endpoint};
use hostlink::host::{run_host, AcceptAll, CookieValueVerifier, Verifier};
use hostlink::plugin::PluginClient;
use hostlink::protocol::PluginInfo;
use hostlink::stats::ProcfsSampler;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hostlink")]
#[command(about = "Plugin lifecycle host and demo plugin over local IPC")]
#[command(version)]
struct Cli {
    /// Endpoint base path (defaults to HOSTLINK_ENDPOINT or the temp dir)
    #[arg(long, global = true)]
    endpoint: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the host until interrupted, then dump the registry
    Host {
        /// Require registrations to present this cookie value
        #[arg(long)]
        cookie_value: Option<String>,
    },
    /// Register as a plugin and heartbeat until interrupted
    Plugin {
        /// Application name reported at registration
        #[arg(long, default_value = "hostlink-demo")]
        app_name: String,

        /// Identity token for this plugin instance
        #[arg(long)]
        cookie_key: String,

        /// Credential presented to the host's verifier
        #[arg(long, default_value = "")]
        cookie_value: String,

        /// Heartbeat interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Probe the host's lifecycle socket once
    Ping,
}

fn build_config(endpoint: Option<PathBuf>) -> Config {
    let mut config = Config::from_env();
    if let Some(base) = endpoint {
        config.endpoint = Endpoint::new(base);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = build_config(cli.endpoint);

    match cli.command {
        Command::Host { cookie_value } => run_host_command(config, cookie_value).await,
        Command::Plugin {
            app_name,
            cookie_key,
            cookie_value,
            interval,
        } => run_plugin_command(config, app_name, cookie_key, cookie_value, interval).await,
        Command::Ping => {
            let client = PluginClient::connect(config).await?;
            let ack = client.ping().await?;
            println!("{} @ {}", ack.message, ack.timestamp);
            Ok(())
        }
    }
}

async fn run_host_command(config: Config, cookie_value: Option<String>) -> Result<()> {
    let verifier: Arc<dyn Verifier> = match cookie_value {
        Some(expected) => Arc::new(CookieValueVerifier::new(expected)),
        None => Arc::new(AcceptAll),
    };

    let handle = run_host(&config, verifier).await?;
    info!(endpoint = %config.endpoint.base().display(), "host running; ctrl-c to stop");

    tokio::signal::ctrl_c().await?;

    println!("{}", handle.plugins_json().await?);
    handle.shutdown().await;
    Ok(())
}

async fn run_plugin_command(
    mut config: Config,
    app_name: String,
    cookie_key: String,
    cookie_value: String,
    interval: Option<u64>,
) -> Result<()> {
    if let Some(secs) = interval {
        config = config.with_heartbeat_interval(Duration::from_secs(secs));
    }

    let client = PluginClient::connect(config).await?;
    client.ping().await?;

    let info = PluginInfo::for_current_process(app_name, cookie_key.clone(), cookie_value);
    client.register(info).await?;
    info!(cookie_key = %cookie_key, "registered; heartbeating until ctrl-c");

    let heartbeat = client
        .start_heartbeat(cookie_key, Arc::new(ProcfsSampler::new()))
        .await?;

    tokio::signal::ctrl_c().await?;
    let exit = heartbeat.stop().await;
    info!(?exit, "heartbeat sender stopped");
    Ok(())
}
