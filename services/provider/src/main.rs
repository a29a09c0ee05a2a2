//! vSphere infrastructure provider
//!
//! Provisions vSphere VMs for the orchestrator's machine requests and reports
//! each VM's machine UUID in the form its agent will present after boot.
//!
//! ## Commands
//!
//! - **check-config**: Loads and validates the connection settings
//! - **translate-uuid**: Converts a vSphere BIOS UUID to the agent's form
//! - **provision**: Runs the provisioning flow for one request file and
//!   prints the resulting status (in-memory hypervisor for now)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vsp_provider::{
    Config, ConnectionParams, MockHypervisor, ProvisioningRequest, Provisioner, RequestContext,
};
use vsp_reconcile::{RetryTracker, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WINDOW};

/// vSphere infrastructure provider.
#[derive(Debug, Parser)]
#[command(name = "vsphere-provider")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, env = "VSPHERE_PROVIDER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the config file and check required connection settings.
    CheckConfig {
        /// Path to the YAML config file.
        #[arg(long, env = "VSPHERE_PROVIDER_CONFIG")]
        config: PathBuf,
    },

    /// Convert a vSphere BIOS UUID to the form the booted machine reports.
    TranslateUuid {
        /// UUID as shown by vSphere.
        uuid: String,
    },

    /// Provision the machine described by a request file.
    Provision {
        /// Path to the YAML config file.
        #[arg(long, env = "VSPHERE_PROVIDER_CONFIG")]
        config: PathBuf,

        /// Path to the machine request (JSON).
        #[arg(long)]
        request: PathBuf,

        /// Path to the join config to embed in the VM.
        #[arg(long)]
        join_config: Option<PathBuf>,

        /// Extra kernel argument (repeatable).
        #[arg(long = "kernel-arg")]
        kernel_args: Vec<String>,

        /// Retries for retryable failures.
        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
        max_retries: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level.as_str().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::CheckConfig { config } => check_config(config),
        Commands::TranslateUuid { uuid } => translate_uuid(&uuid),
        Commands::Provision {
            config,
            request,
            join_config,
            kernel_args,
            max_retries,
        } => provision(config, request, join_config, kernel_args, max_retries).await,
    }
}

fn load_config(path: PathBuf) -> Result<Config> {
    let config = Config::load_validated(&path)
        .with_context(|| format!("Invalid configuration in {:?}", path))?;

    info!(
        uri = %config.vsphere.uri,
        user = %config.vsphere.user,
        insecure_skip_verify = config.vsphere.insecure_skip_verify,
        "Configuration loaded"
    );

    Ok(config)
}

fn check_config(path: PathBuf) -> Result<()> {
    load_config(path)?;
    println!("configuration ok");
    Ok(())
}

fn translate_uuid(uuid: &str) -> Result<()> {
    let agent = vsp_id::translate_to_agent_format(uuid)?;
    println!("{agent}");
    Ok(())
}

async fn provision(
    config: PathBuf,
    request: PathBuf,
    join_config: Option<PathBuf>,
    kernel_args: Vec<String>,
    max_retries: u32,
) -> Result<()> {
    // Incomplete connection settings are fatal before any request is touched.
    load_config(config)?;

    let contents = std::fs::read_to_string(&request)
        .with_context(|| format!("Failed to read request from {:?}", request))?;
    let request: ProvisioningRequest = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse request from {:?}", request))?;

    let join_config = match join_config {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read join config from {:?}", path))?,
        None => String::new(),
    };

    // TODO: swap in a vCenter-backed Hypervisor once the API client lands.
    let hypervisor = Arc::new(MockHypervisor::new());
    let provisioner = Provisioner::new(hypervisor);

    let mut ctx = RequestContext::from_request(
        request,
        ConnectionParams {
            join_config,
            kernel_args,
        },
    );
    let mut retries = RetryTracker::new(max_retries, DEFAULT_RETRY_WINDOW);

    let outcome = provisioner
        .provision_with_retries(&mut ctx, &mut retries)
        .await?;
    info!(
        moref = %outcome.instance.moref,
        vsphere_uuid = %outcome.hypervisor_uuid,
        machine_uuid = %outcome.machine_uuid,
        "Provisioning complete"
    );

    println!("{}", serde_json::to_string_pretty(ctx.status())?);
    Ok(())
}
