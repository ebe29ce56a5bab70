use anyhow::Result;
use barweek_core::stats::AdminStats;
use barweek_core::{BarweekError, Identity};
use owo_colors::OwoColorize;

const TOP_N: usize = 10;

pub async fn run(stats: &AdminStats, identity: &Identity) -> Result<()> {
    let predictions = match stats.top_predictions(identity).await {
        Err(BarweekError::Unauthorized) => {
            anyhow::bail!("Statistics are only available to admin accounts");
        }
        other => other?,
    };

    println!("{}", "Top predictions".bold());
    for p in predictions.iter().take(TOP_N) {
        println!("  {:>4}  {} {}", p.prediction_count, p.bar_name, p.city.dimmed());
    }

    println!();
    println!("{}", "Most visited bars".bold());
    for v in stats.bar_visit_stats(identity).await?.iter().take(TOP_N) {
        println!("  {:>4}  {} {}", v.total_visits, v.bar_name, v.city.dimmed());
    }

    println!();
    println!("{}", "Most popular events".bold());
    for e in stats.event_agenda_stats(identity).await?.iter().take(TOP_N) {
        let date = e.date.as_deref().unwrap_or("TBA");
        println!("  {:>4}  {} {}", e.total_users_added, e.event_name, date.dimmed());
    }

    Ok(())
}
