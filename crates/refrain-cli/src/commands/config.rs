use anyhow::{Context, Result};
use refrain_search::{config, Config};
use std::path::Path;
use toml_edit::{DocumentMut, Item, Table, Value};

/// Show the current effective configuration.
pub fn show_config(config: &Config, config_path: &Path) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Index:");
    println!("  index.url: {}", config.index.url);
    println!(
        "  index.api_key: {}",
        if config.index.api_key.is_some() { "<set>" } else { "<not set>" }
    );
    println!("  index.timeout_secs: {}", config.index.timeout_secs);
    println!("  index.vector_name: {}", config.index.vector_name);
    println!("  index.max_retries: {}", config.index.max_retries);

    println!("\nEncoder:");
    println!(
        "  encoder.ngram_min / ngram_max: {} / {}",
        config.encoder.ngram_min, config.encoder.ngram_max
    );
    println!("  encoder.lowercase: {}", config.encoder.lowercase);
    println!("  encoder.trim: {}", config.encoder.trim);

    println!("\nSearch:");
    println!("  search.top_k: {}", config.search.top_k);
    println!("  search.task_timeout_ms: {}", config.search.task_timeout_ms);

    println!("\nCollections:");
    for (entity_type, collection) in &config.collections {
        println!(
            "  {entity_type}: {} (vocabulary: {})",
            collection.collection,
            collection.vocab_path.display()
        );
    }

    println!("\nLogging:");
    println!("  {}", serde_json::to_string(&config.logging)?);

    println!("\nPriority: ENV vars (REFRAIN_*) > Config file > Defaults");

    Ok(())
}

/// Print one effective config value by dotted key, or the config file
/// contents when no key is given.
pub fn get_config(config: &Config, config_path: &Path, key: Option<String>) -> Result<()> {
    let Some(key) = key else {
        if config_path.exists() {
            let contents =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            print!("{contents}");
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'refrain config init' to create it.");
        }
        return Ok(());
    };

    let tree = serde_json::to_value(config)?;
    let value = lookup(&tree, &key)
        .with_context(|| format!("Unknown config key: {key}"))?;

    match value {
        serde_json::Value::String(s) => println!("{s}"),
        serde_json::Value::Null => println!("<not set>"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }

    Ok(())
}

fn lookup<'a>(tree: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    key.split('.')
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}

/// Set a config value by dotted key, keeping the file's comments and
/// layout. The edit is rolled back if the result no longer loads.
pub fn set_config(config_path: &Path, key: &str, value: &str) -> Result<()> {
    config::ensure_config_file(config_path)?;

    let original = std::fs::read_to_string(config_path).context("Failed to read config file")?;
    let mut document: DocumentMut = original
        .parse()
        .context("Config file is not valid TOML")?;

    set_dotted(&mut document, key, parse_value(value))?;

    std::fs::write(config_path, document.to_string()).context("Failed to write config file")?;

    if let Err(e) = Config::load_from(config_path) {
        std::fs::write(config_path, original).context("Failed to restore config file")?;
        anyhow::bail!("Rejected {key} = {value}: {e:#}");
    }

    println!("✓ Updated {key} = {value}");
    println!("  in {}", config_path.display());

    Ok(())
}

fn set_dotted(document: &mut DocumentMut, key: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = key.split('.').collect();
    let Some((last, tables)) = segments.split_last() else {
        anyhow::bail!("Empty config key");
    };
    if segments.iter().any(|segment| segment.is_empty()) {
        anyhow::bail!("Invalid config key: {key}");
    }

    let mut table: &mut Table = document.as_table_mut();
    for segment in tables {
        let entry = table
            .entry(segment)
            .or_insert(Item::Table(Table::new()));
        table = entry
            .as_table_mut()
            .with_context(|| format!("{segment} in {key} is not a table"))?;
    }

    table[*last] = Item::Value(value);
    Ok(())
}

/// Interpret a command-line value as a TOML bool, integer, or float,
/// falling back to a string.
fn parse_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        Value::from(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::from(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::from(f)
    } else {
        Value::from(raw)
    }
}

/// Show the config file path.
pub fn show_path(config_path: &Path) {
    println!("{}", config_path.display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize the config file with defaults.
pub fn init_config(config_path: &Path) -> Result<()> {
    if config::ensure_config_file(config_path)? {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to point refrain at your index and vocabularies.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
