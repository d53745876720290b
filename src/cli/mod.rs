use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::store::NoteStore;

pub mod commands;

use self::commands::{EditArgs, IndexArgs, NewArgs};

#[derive(Parser, Debug)]
#[command(
    name = "richnotes",
    version,
    about = "Local notes with bold, italic, underline and font sizes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over RICHNOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over RICHNOTES_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the note list (default)
    List,
    /// Create a note
    New(NewArgs),
    /// Print one note with its style runs
    Show(IndexArgs),
    /// Retitle a note or append styled text to it
    Edit(EditArgs),
    /// Delete a note
    Delete(IndexArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let config = loader.load_or_init()?;

    let mut store = NoteStore::open(&config.storage).context("opening note store")?;
    store
        .bootstrap_default()
        .context("writing first-launch note")?;
    store.load().context("loading notes")?;

    let command = cli.command.unwrap_or(Commands::List);
    let result = match command {
        Commands::List => commands::list_notes(&config, &store),
        Commands::New(args) => commands::new_note(&config, &mut store, args),
        Commands::Show(args) => commands::show_note(&store, args),
        Commands::Edit(args) => commands::edit_note(&mut store, args),
        Commands::Delete(args) => commands::delete_note(&mut store, args),
    };

    let stats = store.close()?;
    if stats.failed > 0 {
        tracing::warn!(failed = stats.failed, "some note writes did not reach the database");
    }
    result
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
