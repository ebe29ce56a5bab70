use std::io::{self, Write};

use anyhow::{Context, Result};
use barweek_core::Planner;
use barweek_core::backend::Credentials;
use owo_colors::OwoColorize;

use crate::render::Render;

pub async fn sign_up(planner: &mut Planner) -> Result<()> {
    let summary = planner.guest().summary();
    if summary.has_any_data {
        println!("Guest data to carry over: {}\n", summary.render());
    }

    let credentials = prompt_credentials()?;
    let result = planner.sign_up(&credentials).await?;

    if let Some(account) = planner.identity().account() {
        println!("{} Signed up as {}", "✓".green(), account.email);
    }
    println!("{}", result.render());
    Ok(())
}

pub async fn sign_in(planner: &mut Planner) -> Result<()> {
    let summary = planner.guest().summary();
    let credentials = prompt_credentials()?;
    let account = planner.sign_in(&credentials).await?;

    println!("{} Signed in as {}", "✓".green(), account.email);
    if summary.has_any_data {
        println!(
            "{}",
            format!(
                "Guest data on this device ({}) is only migrated on sign-up",
                summary.render()
            )
            .dimmed()
        );
    }
    Ok(())
}

pub fn sign_out(planner: &mut Planner) {
    if planner.identity().is_guest() {
        println!("{}", "Not signed in".dimmed());
        return;
    }
    planner.sign_out();
    println!("Signed out");
}

pub fn who_am_i(planner: &Planner) {
    match planner.identity().account() {
        Some(account) => println!("{}", account.email),
        None => println!("guest {}", planner.guest().session_id().dimmed()),
    }
}

/// Show or discard data stored for the guest session.
pub fn guest(planner: &Planner, clear: bool, json: bool) -> Result<()> {
    if clear {
        planner.guest().clear()?;
        println!("Guest data cleared");
        return Ok(());
    }

    if json {
        let snapshot = planner.guest().snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", planner.guest().summary().render());
    Ok(())
}

fn prompt_credentials() -> Result<Credentials> {
    print!("Email: ");
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;

    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    Ok(Credentials {
        email: email.trim().to_string(),
        password,
    })
}
