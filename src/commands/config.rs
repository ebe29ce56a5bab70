use anyhow::Result;
use barweek_core::BarweekConfig;
use owo_colors::OwoColorize;

/// Show config paths and settings, saving any changes first.
pub fn run(
    config: &mut BarweekConfig,
    event_version: Option<String>,
    add_admin: Option<String>,
) -> Result<()> {
    let mut changed = false;
    if let Some(version) = event_version {
        config.event_version = (!version.is_empty()).then_some(version);
        changed = true;
    }
    if let Some(email) = add_admin {
        changed |= config.add_admin(&email);
    }
    if changed {
        config.save()?;
        println!("{} Config saved", "✓".green());
    }

    println!("{}", "Paths".bold());
    println!("  Config:  {}", BarweekConfig::config_path()?.display());
    println!("  Data:    {}", config.data_path().display());
    println!();
    println!("{}", "Settings".bold());
    println!(
        "  Event version:  {}",
        config.event_version.as_deref().unwrap_or("all")
    );
    if config.admin_emails.is_empty() {
        println!("  Admins:         {}", "none".dimmed());
    } else {
        println!("  Admins:         {}", config.admin_emails.join(", "));
    }

    Ok(())
}
