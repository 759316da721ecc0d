use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pyxis_provider_trove::TroveProvider;
use pyxis_state::{LocalBackend, ResourceKind, ResourceRecord, StateBackend, StateFile};

mod manifest;

use manifest::Manifest;

#[derive(Parser)]
#[command(name = "pyxis")]
#[command(about = "Declarative management of OpenStack Trove database resources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest file
    Validate {
        /// Path to the manifest
        #[arg(default_value = "pyxis.toml")]
        file: PathBuf,
    },
    /// Create every declared object that does not exist yet
    Apply {
        /// Path to the manifest
        #[arg(default_value = "pyxis.toml")]
        file: PathBuf,
    },
    /// Refresh recorded objects against the remote service
    Status {
        /// Path to the manifest
        #[arg(default_value = "pyxis.toml")]
        file: PathBuf,
    },
    /// Delete every recorded object
    Destroy {
        /// Path to the manifest
        #[arg(default_value = "pyxis.toml")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Apply { file } => run_apply(&file).await,
        Commands::Status { file } => run_status(&file).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Completions { shell } => run_completions(shell),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_validate(file: &Path) -> anyhow::Result<()> {
    let manifest = Manifest::load(file)?;
    manifest.validate().map_err(anyhow::Error::msg)?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            manifest.resource_count()
        )
        .green()
        .bold()
    );
    Ok(())
}

fn run_completions(shell: Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

// =========================================================================
// Apply
// =========================================================================

async fn run_apply(file: &Path) -> anyhow::Result<()> {
    let manifest = Manifest::load(file)?;
    manifest.validate().map_err(anyhow::Error::msg)?;

    if manifest.resource_count() == 0 {
        println!("{}", "No resources defined in manifest.".yellow());
        return Ok(());
    }

    let config = manifest.provider.trove_config()?;
    let provider = TroveProvider::new(&config)?;
    let backend = LocalBackend::new(&manifest.state.path);
    backend.init().await?;
    let mut state = backend.read_state().await?.unwrap_or_default();

    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let lock = backend.acquire_lock("apply").await?;
    let result = apply_changes(&provider, &backend, &mut state, &manifest).await;
    let release = backend.release_lock(&lock).await;
    let (created, unchanged) = result?;
    release?;

    println!();
    println!(
        "{}",
        format!("Apply complete! {created} created, {unchanged} unchanged.")
            .green()
            .bold()
    );
    Ok(())
}

/// Create declared objects in dependency order: instances and configuration
/// groups first, then databases and users, which resolve their parent through
/// the state records. Every successful create is persisted immediately so a
/// failure partway through never loses an already-recorded ID.
async fn apply_changes(
    provider: &TroveProvider,
    backend: &LocalBackend,
    state: &mut StateFile,
    manifest: &Manifest,
) -> anyhow::Result<(usize, usize)> {
    let mut created = 0;
    let mut unchanged = 0;

    for config in &manifest.instances {
        let existing = match state.find_record(ResourceKind::Instance, &config.name) {
            Some(record) => provider.read_instance(&record.id).await?,
            None => None,
        };
        if existing.is_some() {
            println!("  {} instance.{} unchanged", "·".dimmed(), config.name);
            unchanged += 1;
            continue;
        }

        let instance = provider
            .create_instance(config)
            .await
            .with_context(|| format!("failed to create instance.{}", config.name))?;
        record_success(
            backend,
            state,
            ResourceRecord::new(ResourceKind::Instance, &config.name, &instance.id),
        )
        .await?;
        println!(
            "  {} instance.{} created (id: {})",
            "✓".green(),
            config.name,
            instance.id
        );
        created += 1;
    }

    for config in &manifest.configuration_groups {
        let existing = match state.find_record(ResourceKind::ConfigurationGroup, &config.name) {
            Some(record) => provider.read_config_group(&record.id).await?,
            None => None,
        };
        if existing.is_some() {
            println!(
                "  {} configuration_group.{} unchanged",
                "·".dimmed(),
                config.name
            );
            unchanged += 1;
            continue;
        }

        let group = provider
            .create_config_group(config)
            .await
            .with_context(|| format!("failed to create configuration_group.{}", config.name))?;
        record_success(
            backend,
            state,
            ResourceRecord::new(ResourceKind::ConfigurationGroup, &config.name, &group.id),
        )
        .await?;
        println!(
            "  {} configuration_group.{} created (id: {})",
            "✓".green(),
            config.name,
            group.id
        );
        created += 1;
    }

    for config in &manifest.databases {
        let parent_id = resolve_instance_id(state, "database", &config.name, &config.instance)?;

        if provider.read_database(&parent_id, &config.name).await?.is_some() {
            if state.find_record(ResourceKind::Database, &config.name).is_none() {
                record_success(
                    backend,
                    state,
                    ResourceRecord::new(ResourceKind::Database, &config.name, &parent_id)
                        .with_instance(&config.instance),
                )
                .await?;
            }
            println!("  {} database.{} unchanged", "·".dimmed(), config.name);
            unchanged += 1;
            continue;
        }

        let mut resolved = config.clone();
        resolved.instance = parent_id.clone();
        provider
            .create_database(&resolved)
            .await
            .with_context(|| format!("failed to create database.{}", config.name))?;
        record_success(
            backend,
            state,
            ResourceRecord::new(ResourceKind::Database, &config.name, &parent_id)
                .with_instance(&config.instance),
        )
        .await?;
        println!("  {} database.{} created", "✓".green(), config.name);
        created += 1;
    }

    for config in &manifest.users {
        let parent_id = resolve_instance_id(state, "user", &config.name, &config.instance)?;

        if provider.read_user(&parent_id, &config.name).await?.is_some() {
            if state.find_record(ResourceKind::User, &config.name).is_none() {
                record_success(
                    backend,
                    state,
                    ResourceRecord::new(ResourceKind::User, &config.name, &parent_id)
                        .with_instance(&config.instance),
                )
                .await?;
            }
            println!("  {} user.{} unchanged", "·".dimmed(), config.name);
            unchanged += 1;
            continue;
        }

        let mut resolved = config.clone();
        resolved.instance = parent_id.clone();
        provider
            .create_user(&resolved)
            .await
            .with_context(|| format!("failed to create user.{}", config.name))?;
        record_success(
            backend,
            state,
            ResourceRecord::new(ResourceKind::User, &config.name, &parent_id)
                .with_instance(&config.instance),
        )
        .await?;
        println!("  {} user.{} created", "✓".green(), config.name);
        created += 1;
    }

    Ok((created, unchanged))
}

/// Persist a record the moment its object is confirmed.
async fn record_success(
    backend: &LocalBackend,
    state: &mut StateFile,
    record: ResourceRecord,
) -> anyhow::Result<()> {
    state.upsert_record(record);
    state.increment_serial();
    backend.write_state(state).await?;
    Ok(())
}

fn resolve_instance_id(
    state: &StateFile,
    kind: &str,
    name: &str,
    instance: &str,
) -> anyhow::Result<String> {
    match state.find_record(ResourceKind::Instance, instance) {
        Some(record) => Ok(record.id.clone()),
        None => bail!(
            "{kind}.{name}: instance \"{instance}\" has no recorded ID; apply the instance first"
        ),
    }
}

// =========================================================================
// Status
// =========================================================================

async fn run_status(file: &Path) -> anyhow::Result<()> {
    let manifest = Manifest::load(file)?;
    let backend = LocalBackend::new(&manifest.state.path);
    backend.init().await?;

    let Some(mut state) = backend.read_state().await? else {
        println!("{}", "No state file; nothing is being managed.".yellow());
        return Ok(());
    };
    if state.resources.is_empty() {
        println!("{}", "State is empty; nothing is being managed.".yellow());
        return Ok(());
    }

    let config = manifest.provider.trove_config()?;
    let provider = TroveProvider::new(&config)?;

    let lock = backend.acquire_lock("status").await?;
    let result = refresh_records(&provider, &backend, &mut state).await;
    let release = backend.release_lock(&lock).await;
    let dropped = result?;
    release?;

    if dropped > 0 {
        println!();
        println!(
            "{}",
            format!("{dropped} records dropped for objects that no longer exist.").yellow()
        );
    }
    Ok(())
}

/// Query every recorded object and drop records whose object has disappeared
/// out-of-band. Returns the number of dropped records.
async fn refresh_records(
    provider: &TroveProvider,
    backend: &LocalBackend,
    state: &mut StateFile,
) -> anyhow::Result<usize> {
    let mut dropped = 0;

    for record in state.resources.clone() {
        let status = match record.kind {
            ResourceKind::Instance => provider
                .read_instance(&record.id)
                .await?
                .map(|i| i.status),
            ResourceKind::ConfigurationGroup => {
                provider.read_config_group(&record.id).await?.map(|group| {
                    match group.description {
                        Some(description) => format!("present ({description})"),
                        None => "present".to_string(),
                    }
                })
            }
            ResourceKind::Database => provider
                .read_database(&record.id, &record.name)
                .await?
                .map(|db| match db.character_set {
                    Some(charset) => format!("present ({charset})"),
                    None => "present".to_string(),
                }),
            ResourceKind::User => {
                provider.read_user(&record.id, &record.name).await?.map(|user| {
                    let grants: Vec<&str> =
                        user.databases.iter().map(|db| db.name.as_str()).collect();
                    if grants.is_empty() {
                        "present".to_string()
                    } else {
                        format!("present (grants: {})", grants.join(", "))
                    }
                })
            }
        };

        match status {
            Some(status) => {
                println!("  {} {}.{} {}", "✓".green(), record.kind, record.name, status);
            }
            None => {
                println!("  {} {}.{} missing", "✗".red(), record.kind, record.name);
                state.remove_record(record.kind, &record.name);
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        state.increment_serial();
        backend.write_state(state).await?;
    }
    Ok(dropped)
}

// =========================================================================
// Destroy
// =========================================================================

async fn run_destroy(file: &Path, auto_approve: bool) -> anyhow::Result<()> {
    let manifest = Manifest::load(file)?;
    let backend = LocalBackend::new(&manifest.state.path);
    backend.init().await?;

    let Some(mut state) = backend.read_state().await? else {
        println!("{}", "No state file; nothing to destroy.".yellow());
        return Ok(());
    };

    let order = destroy_order(&state);
    if order.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for record in &order {
        println!("  {} {}.{}", "-".red().bold(), record.kind, record.name);
    }
    println!();
    println!("Plan: {} to destroy.", order.len().to_string().red());
    println!();

    if !auto_approve {
        println!(
            "{}",
            "Do you really want to destroy all resources?"
                .yellow()
                .bold()
        );
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    let config = manifest.provider.trove_config()?;
    let provider = TroveProvider::new(&config)?;

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let lock = backend.acquire_lock("destroy").await?;
    let result = destroy_all(&provider, &backend, &mut state, order).await;
    let release = backend.release_lock(&lock).await;
    let (succeeded, failed) = result?;
    release?;

    println!();
    if failed == 0 {
        println!(
            "{}",
            format!("Destroy complete! {succeeded} resources destroyed.")
                .green()
                .bold()
        );
        Ok(())
    } else {
        bail!("destroy failed: {succeeded} succeeded, {failed} failed")
    }
}

/// Children first, parents last: users, databases, configuration groups,
/// then instances.
fn destroy_order(state: &StateFile) -> Vec<ResourceRecord> {
    let mut order = Vec::new();
    for kind in [
        ResourceKind::User,
        ResourceKind::Database,
        ResourceKind::ConfigurationGroup,
        ResourceKind::Instance,
    ] {
        order.extend(state.records_of_kind(kind).cloned());
    }
    order
}

/// Delete recorded objects one by one, removing each record only after the
/// service confirms the object is gone. Failures are reported and skipped so
/// one stuck object does not block the rest.
async fn destroy_all(
    provider: &TroveProvider,
    backend: &LocalBackend,
    state: &mut StateFile,
    order: Vec<ResourceRecord>,
) -> anyhow::Result<(usize, usize)> {
    let mut succeeded = 0;
    let mut failed = 0;

    for record in order {
        let result = match record.kind {
            ResourceKind::User => provider.delete_user(&record.id, &record.name).await,
            ResourceKind::Database => provider.delete_database(&record.id, &record.name).await,
            ResourceKind::ConfigurationGroup => provider.delete_config_group(&record.id).await,
            ResourceKind::Instance => provider.delete_instance(&record.id).await,
        };

        match result {
            Ok(()) => {
                state.remove_record(record.kind, &record.name);
                state.increment_serial();
                backend.write_state(state).await?;
                println!("  {} {}.{}", "✓".green(), record.kind, record.name);
                succeeded += 1;
            }
            Err(e) => {
                println!("  {} {}.{} - {}", "✗".red(), record.kind, record.name, e);
                failed += 1;
            }
        }
    }

    Ok((succeeded, failed))
}
