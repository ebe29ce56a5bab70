mod commands;
mod logging;
mod render;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use barweek_core::BarweekConfig;
use barweek_core::stats::AdminStats;
use clap::{Parser, Subcommand};
use session::App;

#[derive(Parser)]
#[command(name = "barweek")]
#[command(about = "Plan your awards-week agenda, tick off bars and make predictions")]
struct Cli {
    /// Log what barweek is doing to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load events and bars from a JSON catalog file
    Import { file: PathBuf },
    /// List events
    Events {
        /// Only events at this location
        #[arg(short, long)]
        location: Option<String>,

        /// Only events on this date or month (YYYY-MM-DD or YYYY-MM)
        #[arg(short, long)]
        date: Option<String>,

        /// Search event names, venues and featured bars
        #[arg(short, long)]
        search: Option<String>,

        /// Sort by date, name or venue
        #[arg(long, default_value = "date")]
        sort: String,
    },
    /// Show the arrival times offered for an event
    Slots { event: String },
    /// Show or change your agenda
    Agenda {
        #[command(subcommand)]
        action: Option<AgendaAction>,
    },
    /// Mark a bar visited, or unmark it
    Visit { bar: String },
    /// List bars and which ones you have visited
    Visits,
    /// Save your predicted bars, or show them when none are given
    Predict { bars: Vec<String> },
    /// Create an account, carrying over guest data
    Signup,
    Signin,
    Signout,
    Whoami,
    /// Show or discard data saved for the guest session
    Guest {
        #[arg(long)]
        clear: bool,

        /// Print the guest data as JSON
        #[arg(long, conflicts_with = "clear")]
        json: bool,
    },
    /// Aggregate statistics (admin accounts only)
    Stats,
    /// Show config paths and settings
    Config {
        /// Only load events from this catalog version (empty for all)
        #[arg(long)]
        event_version: Option<String>,

        /// Allow this account to run `barweek stats`
        #[arg(long)]
        add_admin: Option<String>,
    },
}

#[derive(Subcommand)]
enum AgendaAction {
    List,
    Add {
        event: String,

        /// Arrival time (HH:mm), defaults to the event start
        #[arg(short, long)]
        arrival: Option<String>,
    },
    Remove {
        event: String,
    },
    /// Change the arrival time of an agenda entry
    Move {
        event: String,
        arrival: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = BarweekConfig::load()?;
    let mut app = App::open(config).await?;
    let planner = &mut app.planner;

    match cli.command {
        Commands::Import { file } => commands::import::run(&app.backend, &file).await?,
        Commands::Events {
            location,
            date,
            search,
            sort,
        } => commands::events::run(planner, location, date, search, &sort)?,
        Commands::Slots { event } => commands::events::slots(planner, &event)?,
        Commands::Agenda { action } => match action.unwrap_or(AgendaAction::List) {
            AgendaAction::List => commands::agenda::list(planner)?,
            AgendaAction::Add { event, arrival } => {
                commands::agenda::add(planner, &event, arrival.as_deref()).await?
            }
            AgendaAction::Remove { event } => commands::agenda::remove(planner, &event).await?,
            AgendaAction::Move { event, arrival } => {
                commands::agenda::change_arrival(planner, &event, &arrival).await?
            }
        },
        Commands::Visit { bar } => commands::visits::toggle(planner, &app.backend, &bar).await?,
        Commands::Visits => commands::visits::list(planner, &app.backend).await?,
        Commands::Predict { bars } => commands::predictions::run(planner, bars).await?,
        Commands::Signup => commands::account::sign_up(planner).await?,
        Commands::Signin => commands::account::sign_in(planner).await?,
        Commands::Signout => commands::account::sign_out(planner),
        Commands::Whoami => commands::account::who_am_i(planner),
        Commands::Guest { clear, json } => commands::account::guest(planner, clear, json)?,
        Commands::Stats => {
            let stats = AdminStats::new(app.backend.clone(), &app.config.admin_emails);
            commands::stats::run(&stats, planner.identity()).await?
        }
        Commands::Config {
            event_version,
            add_admin,
        } => commands::config::run(&mut app.config, event_version, add_admin)?,
    }

    app.save_session()
}
