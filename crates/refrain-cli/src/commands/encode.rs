use anyhow::{Context, Result};
use refrain_core::{EntityType, Vocabulary};
use refrain_search::Config;

/// Print the sparse vector `query` encodes to for one entity type.
///
/// Useful for checking that the encoder settings match the vocabulary: a
/// query that should match but shows mostly out-of-vocabulary n-grams
/// usually means a case-folding or n-gram range mismatch.
pub fn run_encode(config: &Config, query: &str, entity_type: &str) -> Result<()> {
    let entity_type: EntityType = entity_type.parse()?;
    let collection = config
        .collections
        .get(&entity_type)
        .with_context(|| format!("No collection configured for {entity_type}"))?;

    let encoder = config.encoder.encoder()?;
    let vocabulary = Vocabulary::load(&collection.vocab_path)?;
    let vector = encoder.encode(query, &vocabulary);
    let coverage = encoder.coverage(query, &vocabulary);

    println!("Query: {:?}", query);
    println!(
        "Encoder: n-grams [{}, {}), vocabulary {} ({} tokens)",
        encoder.range().min(),
        encoder.range().max(),
        entity_type,
        vocabulary.len()
    );
    println!(
        "N-grams: {} total, {} matched, {} out of vocabulary",
        coverage.total,
        coverage.matched,
        coverage.out_of_vocabulary()
    );

    if vector.is_empty() {
        println!("\nSparse vector: <empty> (no matchable terms)");
        return Ok(());
    }

    println!("\nSparse vector ({} dimensions):", vector.len());
    for (index, value) in vector.iter() {
        println!("  {index:>8}: {value}");
    }

    Ok(())
}
