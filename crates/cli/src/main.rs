//! BioFile Finder CLI - browse, group and export file metadata

use std::path::PathBuf;

use anyhow::Result;
use biofile_finder::config::Config;
use clap::{Parser, Subcommand};

mod commands;
mod format;
mod logging;

use commands::{
  Context, QueryArgs, cmd_annotations, cmd_config_init, cmd_config_show, cmd_count, cmd_dataset_create,
  cmd_dataset_list, cmd_dataset_snippet, cmd_export, cmd_files, cmd_group, cmd_ids, cmd_provenance, cmd_values,
};
use logging::init_cli_logging;

#[derive(Parser)]
#[command(name = "bff")]
#[command(about = "Browse, group and export file metadata from the file-explorer service")]
#[command(after_help = "\
QUICK START:
  bff annotations                           # List annotations
  bff count --filter Gene=LMNB1             # Count matching files
  bff files --filter Gene=LMNB1 --limit 20  # Show the first 20 files
  bff group --by \"Cell line\" --by Gene      # Folder view with file counts

OFFLINE:
  bff --source files.json files             # Browse a JSON export instead of the service")]
struct Cli {
  /// Browse a local JSON file list instead of the metadata service
  #[arg(long, global = true, value_name = "FILE")]
  source: Option<PathBuf>,

  /// Service root URL (overrides config and BFF_BASE_URL)
  #[arg(long, global = true, value_name = "URL")]
  base_url: Option<String>,

  /// Output as JSON
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `bff dataset`
#[derive(Subcommand)]
pub enum DatasetCommand {
  /// Create a dataset from every file matching a query
  Create {
    /// Dataset name
    name: String,
    /// Annotations to capture as dataset columns
    #[arg(short, long, value_delimiter = ',')]
    annotations: Vec<String>,
    /// Expiration date (YYYY-MM-DD)
    #[arg(long)]
    expiration: Option<String>,
    /// Re-evaluate the query on every load instead of snapshotting the files
    #[arg(long)]
    dynamic: bool,
    #[command(flatten)]
    query: QueryArgs,
  },
  /// List datasets
  List,
  /// Print Python code that loads a dataset
  Snippet {
    /// Dataset name
    name: String,
    /// Dataset version (default: latest)
    #[arg(long)]
    version: Option<u32>,
  },
}

/// Subcommands for `bff config`
#[derive(Subcommand)]
pub enum ConfigCommand {
  /// Show current effective configuration
  #[command(long_about = "Show the current effective configuration.\n\n\
    Displays which config file is being used and its contents as TOML.")]
  Show,

  /// Write a commented config template
  #[command(long_about = "Write a commented configuration template.\n\n\
    Creates ./biofile-finder.toml, or the user config with --user.")]
  Init {
    /// Write the user config instead of the project config
    #[arg(long)]
    user: bool,
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// List annotations
  Annotations,
  /// List the distinct values of an annotation
  Values {
    /// Annotation name
    annotation: String,
  },
  /// Show a window of matching files
  #[command(after_help = "\
EXAMPLES:
  bff files --filter Gene=LMNB1 --filter Gene=TOMM20
  bff files --include Dye --sort file_size:desc --limit 50
  bff files --offset 1000 --limit 20 --columns file_name,Gene")]
  Files {
    #[command(flatten)]
    query: QueryArgs,
    /// First row to show
    #[arg(long, default_value = "0")]
    offset: usize,
    /// Number of rows to show
    #[arg(short, long, default_value = "20")]
    limit: usize,
    /// Annotations to show as columns
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
  },
  /// Count matching files
  Count {
    #[command(flatten)]
    query: QueryArgs,
  },
  /// Print every matching file id
  Ids {
    #[command(flatten)]
    query: QueryArgs,
  },
  /// Group matching files into folders by annotation values
  #[command(after_help = "\
EXAMPLES:
  bff group --by \"Cell line\" --by Gene
  bff group --by Objective --depth 1 --include Dye")]
  Group {
    /// Annotations to group by, outermost first
    #[arg(long = "by", required = true)]
    by: Vec<String>,
    /// Expand at most this many levels
    #[arg(long)]
    depth: Option<usize>,
    #[command(flatten)]
    query: QueryArgs,
  },
  /// Export matching files as a CSV manifest
  Export {
    #[command(flatten)]
    query: QueryArgs,
    /// Annotations to write as columns (default: file_name, file_path, file_size)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Value written for missing annotations
    #[arg(long)]
    missing_value: Option<String>,
    /// Separator between multiple values of one annotation
    #[arg(long)]
    separator: Option<String>,
    /// Omit the header row
    #[arg(long)]
    no_header: bool,
    /// Write raw values instead of display-formatted ones
    #[arg(long)]
    raw: bool,
  },
  /// Manage datasets
  Dataset {
    #[command(subcommand)]
    command: DatasetCommand,
  },
  /// Show provenance relationships between annotation values
  #[command(after_help = "\
EXAMPLES:
  bff provenance --edge \"Raw file:Segmentation:segmented from\"
  bff provenance --edge \"Plate:Well:contains\" --value P123")]
  Provenance {
    /// Edge definition as PARENT:CHILD:RELATIONSHIP (annotation names)
    #[arg(long = "edge", required = true)]
    edges: Vec<String>,
    /// Show ancestors and descendants of this value
    #[arg(long)]
    value: Option<String>,
    #[command(flatten)]
    query: QueryArgs,
  },
  /// Manage configuration
  #[command(after_help = "\
CONFIG LOCATIONS:
  Project: ./biofile-finder.toml
  User:    ~/.config/biofile-finder/config.toml")]
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
  let (config, config_source) = Config::load_with_source(&cwd);
  let _guard = init_cli_logging(&config.logging);

  if let Commands::Config { command } = &cli.command {
    return match command {
      ConfigCommand::Show => cmd_config_show(&cwd, &config, config_source.as_deref(), cli.json),
      ConfigCommand::Init { user, force } => cmd_config_init(&cwd, *user, *force),
    };
  }

  let ctx = Context::new(config, cli.source.as_deref(), cli.base_url, cli.json).await?;

  match cli.command {
    Commands::Annotations => cmd_annotations(&ctx).await,
    Commands::Values { annotation } => cmd_values(&ctx, &annotation).await,
    Commands::Files {
      query,
      offset,
      limit,
      columns,
    } => cmd_files(&ctx, &query, offset, limit, &columns).await,
    Commands::Count { query } => cmd_count(&ctx, &query).await,
    Commands::Ids { query } => cmd_ids(&ctx, &query).await,
    Commands::Group { by, depth, query } => cmd_group(&ctx, &by, depth, &query).await,
    Commands::Export {
      query,
      columns,
      output,
      missing_value,
      separator,
      no_header,
      raw,
    } => {
      cmd_export(
        &ctx,
        &query,
        &columns,
        output.as_deref(),
        missing_value,
        separator,
        no_header,
        raw,
      )
      .await
    }

    // Dataset subcommands
    Commands::Dataset { command } => match command {
      DatasetCommand::Create {
        name,
        annotations,
        expiration,
        dynamic,
        query,
      } => cmd_dataset_create(&ctx, &name, annotations, expiration, !dynamic, &query).await,
      DatasetCommand::List => cmd_dataset_list(&ctx).await,
      DatasetCommand::Snippet { name, version } => cmd_dataset_snippet(&ctx, &name, version).await,
    },

    Commands::Provenance { edges, value, query } => cmd_provenance(&ctx, &edges, value.as_deref(), &query).await,
    Commands::Config { .. } => Ok(()),
  }
}
