//! mysql_schema CLI - schema dumps and unsigned-aware column DDL for MySQL

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mysql_schema::config::{self, Config};
use mysql_schema::schema::decoder::cast_default;
use mysql_schema::schema::types::{ColumnOptions, ColumnType};
use mysql_schema::utils::logging;
use mysql_schema::{dump_snapshot, SchemaClient, SchemaEncoder, Snapshot, TypeCatalog};

#[derive(Parser)]
#[command(name = "mysql_schema")]
#[command(about = "Unsigned-aware MySQL DDL and schema dumps")]
#[command(version)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "mysql_schema.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the schema of the configured database or of a snapshot file
    Dump {
        /// Read metadata from a JSON/YAML snapshot instead of the database
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Write the dump here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save the live schema metadata to a JSON/YAML snapshot file
    Snapshot {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Add a column
    AddColumn(ColumnArgs),

    /// Redefine a column, keeping its current default unless one is given
    ChangeColumn {
        #[command(flatten)]
        column: ColumnArgs,

        /// Look the current default up in a snapshot instead of the database
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ColumnArgs {
    table: String,
    column: String,
    /// Abstract column type, e.g. integer, string, decimal
    column_type: String,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    precision: Option<u32>,

    #[arg(long)]
    scale: Option<u32>,

    #[arg(long)]
    default: Option<String>,

    #[arg(long)]
    not_null: bool,

    #[arg(long)]
    unsigned: bool,

    /// Print the statement instead of executing it
    #[arg(long)]
    print: bool,
}

impl ColumnArgs {
    fn column_type(&self) -> anyhow::Result<ColumnType> {
        Ok(self.column_type.parse()?)
    }

    fn options(&self, column_type: ColumnType) -> anyhow::Result<ColumnOptions> {
        let mut options = ColumnOptions {
            limit: self.limit,
            precision: self.precision,
            scale: self.scale,
            default: None,
            null: if self.not_null { Some(false) } else { None },
            unsigned: self.unsigned,
        };

        if let Some(raw) = &self.default {
            let literal = cast_default(Some(raw.as_str()), Some(column_type), true)
                .ok_or_else(|| anyhow!("Invalid {} default '{}'", column_type, raw))?;
            options.default = Some(literal);
        }

        Ok(options)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("Config path is not valid UTF-8"))?;
    Ok(config::load_from_file(path_str)?)
}

fn load_snapshot(path: &Path, config: &Config) -> anyhow::Result<Snapshot> {
    let snapshot = Snapshot::load(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    Ok(snapshot.with_emulate_booleans(config.types.emulate_booleans))
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init_logging(&config.logging)?;

    let catalog = TypeCatalog::from_config(&config.types)?;

    match cli.command {
        Commands::Dump { snapshot, output } => {
            let dump = match snapshot {
                Some(path) => dump_snapshot(&load_snapshot(&path, &config)?, &catalog, &config)?,
                None => SchemaClient::new(config).await?.dump().await?,
            };

            match output {
                Some(path) => std::fs::write(&path, dump)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{}", dump),
            }
        }
        Commands::Snapshot { output } => {
            let client = SchemaClient::new(config).await?;
            let snapshot = client.snapshot().await?;
            snapshot.save(&output)?;
            tracing::info!(path = %output.display(), tables = snapshot.tables.len(), "Snapshot saved");
        }
        Commands::AddColumn(args) => {
            let column_type = args.column_type()?;
            let options = args.options(column_type)?;

            if args.print {
                let sql = SchemaEncoder::new(catalog).add_column(
                    &args.table,
                    &args.column,
                    column_type,
                    &options,
                )?;
                println!("{};", sql);
            } else {
                let client = SchemaClient::new(config).await?;
                client
                    .migrations()
                    .add_column(&args.table, &args.column, column_type, &options)
                    .await?;
            }
        }
        Commands::ChangeColumn { column: args, snapshot } => {
            let column_type = args.column_type()?;
            let options = args.options(column_type)?;

            if args.print {
                let snapshot = match snapshot {
                    Some(path) => load_snapshot(&path, &config)?,
                    None => SchemaClient::new(config).await?.snapshot().await?,
                };
                let sql = SchemaEncoder::new(catalog).change_column(
                    &snapshot,
                    &args.table,
                    &args.column,
                    column_type,
                    &options,
                )?;
                println!("{};", sql);
            } else {
                let client = SchemaClient::new(config).await?;
                let snapshot = match snapshot {
                    Some(path) => load_snapshot(&path, client.config())?,
                    None => client.snapshot().await?,
                };
                client
                    .migrations()
                    .change_column(&snapshot, &args.table, &args.column, column_type, &options)
                    .await?;
            }
        }
    }

    Ok(())
}
