//! Property editor - backup inspection and offline session tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use property_editor::SessionRegistry;
use property_model::{DocumentId, PropertyFields, PropertyType};
use std::path::{Path, PathBuf};
use store::{BackupManager, FileBackupStorage, SettingsManager};
use sync::{MemoryRemote, RetryPolicy, SaveCoordinator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "property-editor")]
#[command(about = "Inspect local property backups and run offline editing sessions")]
struct Cli {
    /// Directory holding settings.json and the backup directory
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
    /// Open a document against an in-memory remote, add a property and save
    Demo {
        document_id: String,
        #[arg(long, default_value = "Color")]
        property: String,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Print the backup for a document
    Show {
        document_id: String,
        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the backup for a document
    Discard { document_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut settings_manager = SettingsManager::new(cli.data_dir.clone());
    let settings = settings_manager
        .load_sync()
        .with_context(|| format!("Failed to load settings from '{}'", cli.data_dir.display()))?
        .clone();
    tracing::debug!("Data directory: {:?}", cli.data_dir);

    let backups = BackupManager::new(FileBackupStorage::new(
        backup_dir(&cli.data_dir, &settings.backup.directory),
    ))
    .with_enabled(settings.backup.enabled);

    match cli.command {
        Command::Backup { action } => match action {
            BackupAction::Show { document_id, json } => {
                show_backup(&backups, &parse_document_id(&document_id)?, json).await
            }
            BackupAction::Discard { document_id } => {
                let document_id = parse_document_id(&document_id)?;
                backups.discard(&document_id).await?;
                println!("Discarded backup for {}", document_id);
                Ok(())
            }
        },
        Command::Demo {
            document_id,
            property,
        } => {
            let coordinator = SaveCoordinator::new(MemoryRemote::new(), backups)
                .with_policy(RetryPolicy::from(&settings.sync));
            run_demo(SessionRegistry::new(coordinator), parse_document_id(&document_id)?, &property).await
        }
    }
}

fn backup_dir(data_dir: &Path, directory: &Path) -> PathBuf {
    if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        data_dir.join(directory)
    }
}

fn parse_document_id(raw: &str) -> Result<DocumentId> {
    DocumentId::new(raw).with_context(|| format!("'{}' is not a document id", raw))
}

async fn show_backup(
    backups: &BackupManager<FileBackupStorage>,
    document_id: &DocumentId,
    json: bool,
) -> Result<()> {
    let Some(record) = backups.load(document_id).await? else {
        println!("No backup for {}", document_id);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let state = &record.state;
    println!("Backup for {} ({})", record.document_id, record.age_description());
    println!("  properties:         {}", state.properties.len());
    println!("  options:            {}", state.options.len());
    println!("  deleted properties: {}", state.deleted_property_ids.len());
    println!("  deleted options:    {}", state.deleted_option_ids.len());
    println!("  unsaved changes:    {}", record.has_unsaved_changes());
    Ok(())
}

async fn run_demo(
    registry: SessionRegistry<MemoryRemote, FileBackupStorage>,
    document_id: DocumentId,
    property: &str,
) -> Result<()> {
    let handle = registry.open(document_id.clone()).await?;
    {
        let session = handle.lock().await;
        if let Some(offer) = session.recovery_offer() {
            println!("Ignoring backup from {}", offer.age_description());
        }
        session
            .edit(|store| {
                store.add_property(PropertyFields::named("en", property, PropertyType::default()))
            })
            .await;
        let outcome = session.save().await;
        println!("Save outcome: {:?}", outcome);
    }
    drop(handle);
    registry.close(&document_id).await;
    Ok(())
}
