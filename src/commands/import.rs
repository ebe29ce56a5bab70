use std::path::Path;

use anyhow::{Context, Result};
use barweek_core::backend::LocalBackend;
use barweek_core::{Bar, Event};
use owo_colors::OwoColorize;
use serde::Deserialize;

use crate::render::pluralize;

/// Catalog file layout: `{ "events": [...], "bars": [...] }`.
#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    bars: Vec<Bar>,
}

pub async fn run(backend: &LocalBackend, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let catalog: CatalogFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid catalog file", path.display()))?;

    let tba = catalog.events.iter().filter(|e| e.is_tba()).count();
    let events = catalog.events.len();
    let bars = catalog.bars.len();

    backend.import_catalog(catalog.events, catalog.bars).await?;

    println!(
        "{} Imported {} and {}",
        "✓".green(),
        pluralize("event", events),
        pluralize("bar", bars)
    );
    if tba > 0 {
        println!("  {}", format!("{} still TBA", pluralize("event", tba)).dimmed());
    }

    Ok(())
}
