mod extension;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::extension::config::Config;
use crate::ui::prelude::*;

/// crxsync main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use a config file other than the default one
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON events instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install all extensions that aren't already installed
    Install,
    /// Update all installed extensions
    Update,
    /// List all extensions and their current status
    List,
    /// Remove all extensions that are installed but not listed
    Remove,
    /// Scan for installed unlisted extensions and add them to the config file
    Scan,
    /// Clean up (i.e. remove) backed up extension files
    Clean,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, true);
    ui::set_debug_mode(cli.debug);

    if let Err(e) = run(cli).await {
        emit(
            Level::Error,
            "fatal",
            &format!("{} {e:#}", char::from(NerdFont::CrossCircle)),
            None,
        );
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config)?;

    match cli.command {
        Commands::Install => extension::engine::install(Arc::new(config)).await,
        Commands::Update => extension::engine::update(Arc::new(config)).await,
        Commands::List => extension::engine::list(&config),
        Commands::Remove => extension::engine::remove(&config),
        Commands::Scan => extension::engine::scan(&mut config),
        Commands::Clean => extension::engine::clean(&config),
    }
}
