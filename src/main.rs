use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use study_scheduler::cli::{handle_backup_command, handle_record_command};
use study_scheduler::config::{paths::StudyPaths, settings::Settings};
use study_scheduler::storage::Storage;

/// Environment variable holding the log filter (e.g. `debug`, `study_scheduler=info`)
const LOG_ENV: &str = "STUDY_SCHEDULER_LOG";

#[derive(Parser)]
#[command(
    name = "study-scheduler",
    version,
    about = "Backup, export and restore for the study scheduler's local store",
    long_about = "Exports every collection of the study scheduler's local store to a \
                  dated JSON snapshot, validates snapshots, and restores them \
                  collection by collection with a per-collection report."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Backup(study_scheduler::cli::BackupCommands),

    /// Record maintenance commands
    #[command(subcommand)]
    Record(study_scheduler::cli::RecordCommands),

    /// Initialize a new store
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = StudyPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            let storage = Storage::open(paths)?;
            handle_backup_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Record(cmd)) => {
            let storage = Storage::open(paths)?;
            handle_record_command(&storage, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing study scheduler store at: {}", paths.base_dir().display());
            let storage = Storage::open(paths.clone())?;
            storage.save_all()?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Run 'study-scheduler stats' to see the collections.");
        }
        Some(Commands::Config) => {
            println!("Study Scheduler Configuration");
            println!("=============================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Export directory: {}", paths.export_dir().display());
            println!("Activity log:     {}", paths.activity_log().display());
            println!();
            println!("Settings:");
            println!("  Export prefix:         {}", settings.export_prefix);
            println!("  Max import size:       {} bytes", settings.max_import_bytes);
            println!("  Pretty export:         {}", settings.pretty_export);
            println!(
                "  Safety export on import: {}",
                settings.safety_export_before_restore
            );
        }
        None => {
            println!("study-scheduler - backup and restore for the study scheduler store");
            println!();
            println!("Run 'study-scheduler --help' for usage information.");
        }
    }

    Ok(())
}
