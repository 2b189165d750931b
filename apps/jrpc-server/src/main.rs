use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use rpc_ingress::RpcIngress;
use rpckit_bootstrap::{AppConfig, AppConfigProvider, CliArgs};

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod api;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// JRPC Server - schema-validated remote procedures over HTTP
#[derive(Parser)]
#[command(name = "jrpc-server")]
#[command(about = "JRPC Server - schema-validated remote procedures over HTTP")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and the API tree, then exit
    Check,
    /// Print the generated Python client
    Client,
    /// Print the introspection document as JSON
    Document,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        port: cli.port,
        verbose: cli.verbose,
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (JRPC__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let command = cli.command.unwrap_or(Commands::Run);

    // Keep stdout clean for commands that print artifacts.
    if matches!(command, Commands::Run | Commands::Check) {
        let logging_config = config.logging.clone().unwrap_or_default();
        rpckit_bootstrap::init_logging(&logging_config, &config.home_dir());
    }

    let ingress = build_ingress(&config)?;

    match command {
        Commands::Run => run_server(&config, ingress).await,
        Commands::Check => check(&config, &ingress),
        Commands::Client => {
            print!("{}", ingress.python_client()?);
            Ok(())
        }
        Commands::Document => {
            println!("{}", serde_json::to_string_pretty(ingress.document())?);
            Ok(())
        }
    }
}

fn build_ingress(config: &AppConfig) -> Result<RpcIngress> {
    let root = Arc::new(api::build());
    let provider = AppConfigProvider::new(config.clone());
    let base_url = format!("http://{}:{}", config.server.host, config.server.port);
    RpcIngress::from_provider(root, &provider, &base_url)
}

async fn run_server(config: &AppConfig, ingress: RpcIngress) -> Result<()> {
    tracing::info!("JRPC Server starting");
    let addr = resolve_bind_addr(config)?;

    let cancel = CancellationToken::new();
    let signals = rpckit_bootstrap::cancel_on_shutdown(cancel.clone());

    let result = ingress.serve(addr, cancel).await;
    signals.abort();

    tracing::info!("JRPC Server stopped");
    result
}

fn check(config: &AppConfig, ingress: &RpcIngress) -> Result<()> {
    tracing::info!("Checking configuration…");
    resolve_bind_addr(config)?;

    for endpoint in ingress.dispatcher().root().walk_endpoints() {
        endpoint
            .input()
            .compile()
            .and_then(|_| endpoint.output().compile())
            .with_context(|| format!("endpoint '{}' has an invalid schema", endpoint.name()))?;
    }
    ingress
        .python_client()
        .context("Python client generation failed")?;

    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn resolve_bind_addr(config: &AppConfig) -> Result<SocketAddr> {
    let host = config.server.host.as_str();
    (host, config.server.port)
        .to_socket_addrs()
        .with_context(|| format!("Invalid bind address '{host}:{}'", config.server.port))?
        .next()
        .with_context(|| format!("No address found for '{host}'"))
}
