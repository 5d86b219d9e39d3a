//! Schematic CLI - Inspect the schema of SQLite and SQL Server databases

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use schematic::config::{self, ConnectionProfile};
use schematic::ui;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "schematic")]
#[command(version)]
#[command(about = "Relational database schema introspection for SQLite and SQL Server")]
#[command(long_about = r#"
Schematic reads the catalog of a live database (or a saved snapshot) and shows
its tables, views, keys, indexes, triggers, sequences, synonyms and routines.

Example usage:
  schematic init
  schematic --sqlite app.db tables
  schematic -c warehouse describe sales.orders
  schematic -c warehouse snapshot --output warehouse.json
  schematic --format json describe users
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./schematic.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Connection profile from the config file
    #[arg(short, long, global = true)]
    connection: Option<String>,

    /// Inspect a SQLite file directly, bypassing the config
    #[arg(long, global = true, conflicts_with = "connection")]
    sqlite: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter schematic.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// List tables
    Tables,

    /// List views
    Views,

    /// List sequences
    Sequences,

    /// List synonyms
    Synonyms,

    /// List stored procedures and functions
    Routines,

    /// Show everything known about one object
    Describe {
        /// Object name, optionally qualified (`schema.name`)
        name: String,
    },

    /// Show the comments on one object and its children
    Comments {
        /// Object name, optionally qualified (`schema.name`)
        name: String,
    },

    /// Capture every object and comment into a JSON snapshot
    Snapshot {
        /// File to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show database-level pragmas of a SQLite schema
    Pragmas {
        /// Schema to inspect
        #[arg(long, default_value = "main")]
        schema: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Tables => "tables",
            Commands::Views => "views",
            Commands::Sequences => "sequences",
            Commands::Synonyms => "synonyms",
            Commands::Routines => "routines",
            Commands::Describe { .. } => "describe",
            Commands::Comments { .. } => "comments",
            Commands::Snapshot { .. } => "snapshot",
            Commands::Pragmas { .. } => "pragmas",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a successful result as a JSON envelope
pub fn emit_success(command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn emit_error(output_mode: OutputMode, command: &str, err: &anyhow::Error) {
    if output_mode.is_human() {
        ui::error(&format!("{:#}", err));
        return;
    }
    let envelope = serde_json::json!({
        "ok": false,
        "command": command,
        "error": format!("{:#}", err),
    });
    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("{:#}", err),
    }
}

/// Profile from `--sqlite`, or from the config file
fn target_profile(cli: &Cli) -> anyhow::Result<ConnectionProfile> {
    if let Some(path) = &cli.sqlite {
        return Ok(ConnectionProfile::Sqlite {
            path: path.clone(),
            attach: Default::default(),
        });
    }

    let Some(config) = config::load_config(cli.config.as_deref())? else {
        anyhow::bail!("no schematic.toml found (run `schematic init` or pass --sqlite <path>)");
    };
    let (name, profile) = config.profile(cli.connection.as_deref())?;
    tracing::debug!(connection = name, kind = profile.kind(), "using connection profile");
    Ok(profile.clone())
}

async fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    if let Commands::Init { force } = &cli.command {
        let path = cli.config.clone().unwrap_or_else(config::default_config_path);
        return commands::run_init(&path, *force, output_mode);
    }

    let profile = target_profile(&cli)?;
    if let Commands::Pragmas { schema } = &cli.command {
        return commands::run_pragmas(&profile, schema, output_mode).await;
    }

    let connected = schematic::connect::connect(&profile).await?;
    match cli.command {
        Commands::Tables => commands::run_list(&connected, commands::Listing::Tables, output_mode).await,
        Commands::Views => commands::run_list(&connected, commands::Listing::Views, output_mode).await,
        Commands::Sequences => {
            commands::run_list(&connected, commands::Listing::Sequences, output_mode).await
        }
        Commands::Synonyms => commands::run_list(&connected, commands::Listing::Synonyms, output_mode).await,
        Commands::Routines => commands::run_list(&connected, commands::Listing::Routines, output_mode).await,
        Commands::Describe { name } => commands::run_describe(&connected, &name, output_mode).await,
        Commands::Comments { name } => commands::run_comments(&connected, &name, output_mode).await,
        Commands::Snapshot { output } => commands::run_snapshot(&connected, &output, output_mode).await,
        Commands::Init { .. } | Commands::Pragmas { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = match cli.format {
        Format::Text => OutputMode::Human,
        Format::Json => OutputMode::Json,
    };
    let command = cli.command.name();

    if let Err(err) = run(cli, output_mode).await {
        emit_error(output_mode, command, &err);
        std::process::exit(1);
    }
}
