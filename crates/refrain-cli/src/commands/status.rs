use anyhow::Result;
use refrain_core::Vocabulary;
use refrain_search::{Config, QdrantClient};

/// Show index health and, per configured entity type, the collection
/// and vocabulary it would search.
pub async fn show_status(config: &Config) -> Result<()> {
    let client = QdrantClient::new(&config.index)?;

    println!("\n📊 Refrain Status\n");
    println!("  Index: {}", config.index.url);
    match client.health().await {
        Ok(message) => println!("  Health: ✓ {message}"),
        Err(e) => println!("  Health: ✗ {e}"),
    }

    println!(
        "  Encoder: n-grams [{}, {}), lowercase={}, trim={}",
        config.encoder.ngram_min,
        config.encoder.ngram_max,
        config.encoder.lowercase,
        config.encoder.trim
    );

    println!("\n  Collections:");
    for (entity_type, collection) in &config.collections {
        let points = match client.collection_info(&collection.collection).await {
            Ok(info) => format!(
                "{} points ({})",
                info.points_count
                    .map_or_else(|| "?".to_string(), |count| count.to_string()),
                info.status
            ),
            Err(e) => format!("unavailable: {e}"),
        };
        let vocab = match Vocabulary::load(&collection.vocab_path) {
            Ok(vocab) => format!("{} tokens", vocab.len()),
            Err(e) => format!("✗ {e}"),
        };

        println!("    {entity_type:<9} {}", collection.collection);
        println!("              index: {points}");
        println!("              vocabulary: {vocab}");
    }

    if config.collections.is_empty() {
        println!("    <none configured>");
        println!("\n  Run `refrain config init` and add [collections.<type>] entries");
    }

    Ok(())
}
