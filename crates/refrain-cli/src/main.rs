use anyhow::Result;
use clap::Parser;
use refrain_search::Config;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "refrain", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ~/.config/refrain/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Search the catalog and estimate what kind of entity the query means
    ///
    /// The query is encoded into character n-grams against each entity
    /// type's vocabulary and sent to that type's index collection. All
    /// entity types are searched concurrently; one failing does not stop
    /// the others.
    ///
    /// Output:
    /// - Entity types ranked by how clearly their top hit stands out
    /// - The results for each entity type, best first
    /// - Any entity types whose retrieval failed
    ///
    /// With --merged, prints a single deduplicated list instead.
    Search {
        /// Free-text query
        query: String,

        /// Restrict to these entity types (track, album, artist, playlist, combined)
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        types: Vec<String>,

        /// Results per entity type (default from config)
        #[arg(long, short = 'k')]
        top_k: Option<usize>,

        /// Pick entity types from keywords in the query
        #[arg(long, conflicts_with = "types")]
        route: bool,

        /// Print one merged, deduplicated list
        #[arg(long)]
        merged: bool,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a query encodes against one entity type's vocabulary
    Encode {
        /// Free-text query
        query: String,

        /// Entity type whose vocabulary to use
        #[arg(long = "type", short = 't', default_value = "track")]
        entity_type: String,
    },
    /// Show index health and the configured collections
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the current effective configuration
    Show,
    /// Print a config value, or the whole file if no key is given
    Get {
        /// Dotted key, e.g. index.url
        key: Option<String>,
    },
    /// Set a config value in the config file
    Set {
        /// Dotted key, e.g. search.top_k
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(refrain_search::config::config_file_path);

    let config = load_config(cli.config.as_ref())?;
    twyg::setup(config.logging.clone())
        .map_err(|e| anyhow::anyhow!("Failed to set up logging: {e}"))?;

    match cli.command {
        Commands::Search {
            query,
            types,
            top_k,
            route,
            merged,
            json,
        } => {
            let options = commands::search::SearchOptions {
                types,
                top_k,
                route,
                merged,
                json,
            };
            commands::run_search(&config, &query, options).await?;
        }
        Commands::Encode { query, entity_type } => {
            commands::run_encode(&config, &query, &entity_type)?;
        }
        Commands::Status => {
            commands::show_status(&config).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config, &config_path)?,
            ConfigAction::Get { key } => commands::config::get_config(&config, &config_path, key)?,
            ConfigAction::Set { key, value } => {
                commands::config::set_config(&config_path, &key, &value)?;
            }
            ConfigAction::Path => commands::config::show_path(&config_path),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config(&config_path)?,
        },
    }

    Ok(())
}
