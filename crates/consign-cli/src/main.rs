use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use consign::config::{self, FileConfig};
use consign::engine::{self, Reporter};
use consign::portal::{DEFAULT_BASE_URL, PortalClient};
use consign::store::DeploymentStore;
use consign::types::{Publication, PublishOptions, PublishingType};

#[derive(Parser, Debug)]
#[command(name = "consign", version)]
#[command(about = "Bundle build artifacts and track their registry deployment lifecycle")]
struct Cli {
    /// Path to the config file.
    #[arg(long, default_value = "consign.toml")]
    config: PathBuf,

    /// Publisher API base URL (overrides the config file).
    #[arg(long)]
    base_url: Option<String>,

    /// Directory for the persisted deployment ledger (default: .consign)
    #[arg(long, default_value = ".consign")]
    state_dir: PathBuf,

    /// Directory for staging output and bundle archives (default: .consign/work)
    #[arg(long, default_value = ".consign/work")]
    work_dir: PathBuf,

    /// Publishing mode: automatic or user-managed.
    #[arg(long)]
    publishing_type: Option<String>,

    /// Extra digest algorithm beyond MD5/SHA-1 (repeatable), e.g. SHA-256.
    #[arg(long = "algorithm")]
    algorithms: Vec<String>,

    /// Registry username (overrides CONSIGN_USERNAME and the config file).
    #[arg(long)]
    username: Option<String>,

    /// Registry password (overrides CONSIGN_PASSWORD and the config file).
    #[arg(long)]
    password: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage, digest and archive a publication without uploading.
    Bundle {
        /// Publication manifest (JSON: coordinates plus artifact list).
        manifest: PathBuf,
    },
    /// Bundle a publication and upload it to the registry.
    Upload {
        /// Publication manifest (JSON: coordinates plus artifact list).
        manifest: PathBuf,
    },
    /// Refresh tracked deployments from the registry and print their status.
    Check {
        /// Restrict to a single deployment id.
        #[arg(long)]
        deployment_id: Option<String>,
    },
    /// Publish one deployment by id.
    Publish {
        #[arg(long)]
        deployment_id: String,
    },
    /// Drop one deployment by id and stop tracking it.
    Drop {
        #[arg(long)]
        deployment_id: String,
    },
    /// Refresh, then drop every tracked deployment the registry reports as failed.
    DropFailed,
    /// Refresh, then publish every tracked deployment the registry reports as validated.
    PublishValidated,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let file_config = config::load_config(&cli.config)?;
    let mut reporter = CliReporter;

    match &cli.cmd {
        Commands::Bundle { manifest } => {
            let publication = load_publication(manifest)?;
            let opts = publish_options(&cli, file_config.as_ref())?;
            let bundle = engine::run_bundle(&publication, &opts, &mut reporter)?;
            println!("{}", bundle.display());
        }
        Commands::Upload { manifest } => {
            let publication = load_publication(manifest)?;
            let opts = publish_options(&cli, file_config.as_ref())?;
            let client = portal_client(&cli, file_config.as_ref())?;
            let store = DeploymentStore::in_dir(&cli.state_dir);
            let id = engine::run_upload(&publication, &opts, &client, &store, &mut reporter)?;
            println!("{id}");
        }
        Commands::Check { deployment_id } => {
            let client = portal_client(&cli, file_config.as_ref())?;
            let store = DeploymentStore::in_dir(&cli.state_dir);
            engine::check_deployments(&client, &store, deployment_id.as_deref(), &mut reporter)?;
        }
        Commands::Publish { deployment_id } => {
            let client = portal_client(&cli, file_config.as_ref())?;
            let store = DeploymentStore::in_dir(&cli.state_dir);
            engine::publish_deployment(&client, &store, deployment_id, &mut reporter)?;
        }
        Commands::Drop { deployment_id } => {
            let client = portal_client(&cli, file_config.as_ref())?;
            let store = DeploymentStore::in_dir(&cli.state_dir);
            engine::drop_deployment(&client, &store, deployment_id, &mut reporter)?;
        }
        Commands::DropFailed => {
            let client = portal_client(&cli, file_config.as_ref())?;
            let store = DeploymentStore::in_dir(&cli.state_dir);
            engine::drop_failed_deployments(&client, &store, &mut reporter)?;
        }
        Commands::PublishValidated => {
            let client = portal_client(&cli, file_config.as_ref())?;
            let store = DeploymentStore::in_dir(&cli.state_dir);
            engine::publish_validated_deployments(&client, &store, &mut reporter)?;
        }
    }

    Ok(())
}

fn load_publication(path: &PathBuf) -> Result<Publication> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read publication manifest {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse publication manifest {}", path.display()))
}

fn publish_options(cli: &Cli, file_config: Option<&FileConfig>) -> Result<PublishOptions> {
    let publishing_type = match &cli.publishing_type {
        Some(raw) => parse_publishing_type(raw)?,
        None => file_config
            .and_then(|c| c.publishing_type)
            .unwrap_or(PublishingType::Automatic),
    };
    let extra_algorithms = if cli.algorithms.is_empty() {
        file_config
            .map(|c| c.extra_algorithms.clone())
            .unwrap_or_default()
    } else {
        cli.algorithms.clone()
    };

    Ok(PublishOptions {
        publishing_type,
        extra_algorithms,
        work_dir: cli.work_dir.clone(),
    })
}

fn parse_publishing_type(raw: &str) -> Result<PublishingType> {
    match raw.to_lowercase().replace('-', "_").as_str() {
        "automatic" => Ok(PublishingType::Automatic),
        "user_managed" => Ok(PublishingType::UserManaged),
        other => bail!("invalid publishing type {other:?} (expected automatic or user-managed)"),
    }
}

fn portal_client(cli: &Cli, file_config: Option<&FileConfig>) -> Result<PortalClient> {
    let base_url = cli
        .base_url
        .clone()
        .or_else(|| file_config.and_then(|c| c.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let mut credentials = config::resolve_credentials(file_config);
    if let Some(username) = &cli.username {
        credentials.username = username.clone();
    }
    if let Some(password) = &cli.password {
        credentials.password = password.clone();
    }

    Ok(PortalClient::new(&base_url, credentials)?)
}
