use anyhow::{Context, Result};
use refrain_core::{EntityType, Field, SearchResult};
use refrain_search::{suggest_search_types, Config, SearchOrchestrator, SearchResponse};

/// Flags accepted by `refrain search`.
#[derive(Debug, Default)]
pub struct SearchOptions {
    pub types: Vec<String>,
    pub top_k: Option<usize>,
    pub route: bool,
    pub merged: bool,
    pub json: bool,
}

/// Run one search and print the outcome.
pub async fn run_search(config: &Config, query: &str, options: SearchOptions) -> Result<()> {
    let orchestrator =
        SearchOrchestrator::from_config(config).context("Failed to initialise retrievers")?;

    let entity_types: Option<Vec<EntityType>> = if options.route {
        let routed = suggest_search_types(query);
        log::info!("Routed {:?} to {:?}", query, routed);
        Some(routed)
    } else if options.types.is_empty() {
        None
    } else {
        Some(SearchOrchestrator::parse_entity_types(&options.types)?)
    };
    let top_k = options.top_k.unwrap_or(orchestrator.default_top_k());

    if options.merged {
        let merged = orchestrator
            .search_merged(query, entity_types.as_deref(), top_k)
            .await?;

        if options.json {
            println!("{}", serde_json::to_string_pretty(&merged)?);
        } else {
            println!("\n🔎 Top results for {:?}\n", query);
            if merged.is_empty() {
                println!("  No matches");
            }
            for (rank, tagged) in merged.iter().enumerate() {
                println!(
                    "  {:>2}. [{}] {}",
                    rank + 1,
                    tagged.entity_type,
                    describe(&tagged.result)
                );
            }
        }
        return Ok(());
    }

    let response = orchestrator
        .search(query, entity_types.as_deref(), top_k)
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &SearchResponse) {
    println!("\n🔎 Results for {:?}\n", response.query);

    println!("  Likely intent: {}", response.predicted_intent);
    for score in response.intent.iter() {
        println!("    {:<9} {:.3}", score.entity_type, score.confidence);
    }

    for (entity_type, results) in response.raw_results.iter() {
        println!("\n  {} ({})", entity_type, results.len());
        for (rank, result) in results.iter().enumerate() {
            println!("    {:>2}. {}", rank + 1, describe(result));
        }
    }

    if !response.failed.is_empty() {
        let failed: Vec<&str> = response.failed.iter().map(|ty| ty.as_str()).collect();
        eprintln!("\n  ✗ Failed: {}", failed.join(", "));
    }
}

/// One-line rendering of a result: its name fields and score.
fn describe(result: &SearchResult) -> String {
    let names: Vec<&str> = [
        Field::TrackName,
        Field::AlbumName,
        Field::PlaylistName,
        Field::ArtistName,
    ]
    .into_iter()
    .filter_map(|field| result.field(field))
    .collect();

    let label = if names.is_empty() {
        "<unnamed>".to_string()
    } else {
        names.join(" - ")
    };
    format!("{label} (score: {:.4})", result.score)
}
