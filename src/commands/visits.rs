use anyhow::Result;
use barweek_core::Planner;
use barweek_core::backend::{Backend, LocalBackend};
use owo_colors::OwoColorize;

pub async fn toggle(planner: &mut Planner, backend: &LocalBackend, bar_id: &str) -> Result<()> {
    let bars = backend.bars().await?;
    let name = bars
        .iter()
        .find(|b| b.id == bar_id)
        .map_or(bar_id, |b| b.name.as_str());

    if planner.toggle_visit(bar_id).await? {
        println!("{} Visited {}", "✓".green(), name);
    } else {
        println!("{} Unmarked {}", "○".dimmed(), name);
    }
    Ok(())
}

pub async fn list(planner: &Planner, backend: &LocalBackend) -> Result<()> {
    let bars = backend.bars().await?;
    let visits = planner.visits();

    for bar in &bars {
        let visited = visits.view().get(&bar.id).copied().unwrap_or(false);
        let rank = bar.rank_2025.map(|r| format!("#{r}")).unwrap_or_default();
        if visited {
            println!("{} {:>4} {} {}", "✓".green(), rank, bar.name, bar.city.dimmed());
        } else {
            println!("  {:>4} {} {}", rank.dimmed(), bar.name.dimmed(), bar.city.dimmed());
        }
    }

    println!();
    println!(
        "{} of {} bars visited ({}%)",
        visits.visited_count(),
        bars.len(),
        visits.visited_percentage(bars.len())
    );
    Ok(())
}
