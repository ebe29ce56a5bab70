use anyhow::Result;
use barweek_core::Planner;
use owo_colors::OwoColorize;

pub async fn run(planner: &mut Planner, bar_ids: Vec<String>) -> Result<()> {
    if bar_ids.is_empty() {
        let current = planner.predictions().view();
        if current.is_empty() {
            println!("{}", "No predictions yet".dimmed());
        }
        for (i, bar_id) in current.iter().enumerate() {
            println!("{}. {}", i + 1, bar_id);
        }
        return Ok(());
    }

    planner.save_predictions(bar_ids).await?;
    println!("{} Predictions saved", "✓".green());
    Ok(())
}
