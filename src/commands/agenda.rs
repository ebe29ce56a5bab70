use anyhow::Result;
use barweek_core::Planner;
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn list(planner: &Planner) -> Result<()> {
    let itinerary = planner.agenda().itinerary();

    if itinerary.is_empty() {
        println!("{}", "Your agenda is empty".dimmed());
        return Ok(());
    }

    let mut current_date: Option<&str> = None;
    for (event, arrival) in itinerary {
        let date = event.date.as_deref().unwrap_or("TBA");
        if current_date != Some(date) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date.bold());
            current_date = Some(date);
        }
        println!("  {} {} {}", arrival, event.name, event.venue.dimmed());
    }

    if planner.identity().is_guest() {
        println!();
        println!(
            "{}",
            "Saved on this device only. Run `barweek signup` to keep it.".dimmed()
        );
    }

    Ok(())
}

pub async fn add(planner: &mut Planner, event_id: &str, arrival: Option<&str>) -> Result<()> {
    let outcome = planner.add_to_agenda(event_id, arrival).await;
    println!("{}", outcome.render());
    Ok(())
}

pub async fn change_arrival(planner: &mut Planner, event_id: &str, arrival: &str) -> Result<()> {
    let outcome = planner.change_arrival(event_id, arrival).await;
    println!("{}", outcome.render());
    Ok(())
}

pub async fn remove(planner: &mut Planner, event_id: &str) -> Result<()> {
    planner.remove_from_agenda(event_id).await?;
    println!("{} Removed {}", "✓".green(), event_id);
    Ok(())
}
