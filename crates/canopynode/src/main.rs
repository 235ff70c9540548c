use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use canopynode::config::{Config, LoggingConfig};
use canopynode::serial;
use canopynode::{Controller, Deployment};

#[derive(Parser, Debug)]
#[command(name = "canopynode")]
#[command(about = "Run a simulated Canopy sensor tree", long_about = None)]
struct Args {
    /// Path to the deployment file
    #[arg(short, long, env = "CANOPY_CONFIG")]
    config: Option<PathBuf>,

    /// Write a default deployment file and exit
    #[arg(long)]
    init: bool,

    /// Stop after this many seconds (run until Ctrl+C otherwise)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Log level (overrides the deployment file; RUST_LOG overrides both)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.init {
        let config = Config::create_default(args.config)?;
        println!(
            "Deployment written to {}",
            config.config_path().display()
        );
        return Ok(());
    }

    let config = Config::load(args.config)?;
    init_logging(&config.logging, args.log_level.as_deref())?;

    info!(
        config = %config.config_path().display(),
        nodes = config.nodes.len(),
        "Starting Canopy deployment"
    );

    let mut deployment = Deployment::launch(&config)
        .await
        .context("Failed to launch deployment")?;
    let mut events = deployment
        .take_events()
        .context("Gateway event stream unavailable")?;
    let mut controller = config
        .controller
        .enabled
        .then(|| Controller::new(config.controller.clone()));

    let mut operator_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let duration = args.duration;
    let deadline = async move {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                println!("{}", serial::server_line(&event));

                if let Some(controller) = controller.as_mut() {
                    for command in controller.on_event(&event) {
                        deployment.gateway()?.operator(command).await?;
                    }
                }
            }
            line = operator_lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(command) = serial::client_line(&line) {
                            deployment.gateway()?.operator(command).await?;
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Failed to read operator input: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C signal");
                break;
            }
            _ = &mut deadline => {
                info!("Run duration elapsed");
                break;
            }
        }
    }

    for snapshot in deployment.snapshots().await? {
        info!(
            node = %snapshot.address,
            role = %snapshot.role,
            in_network = snapshot.in_network,
            children = snapshot.children.len(),
            color = snapshot.color,
            "Final state"
        );
    }

    deployment.shutdown().await?;
    Ok(())
}

fn init_logging(logging: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&logging.level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
