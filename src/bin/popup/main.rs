//! Popup Rewards CLI
//!
//! Operator interface for mission sets, answers, claims and redemptions.

mod commands;
mod style;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use popup_rewards::{Config, RewardError, RewardsApp};
use style::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "popup-rewards")]
#[command(version)]
#[command(about = "Popup Rewards - Missions, reward claims and staff redemption", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config.toml
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Database URL (postgres://..., sqlite://path or sqlite::memory:)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage mission sets
    #[command(subcommand)]
    Set(SetCommand),

    /// Manage missions
    #[command(subcommand)]
    Mission(MissionCommand),

    /// Manage reward options
    #[command(subcommand, name = "option")]
    RewardOption(OptionCommand),

    /// Submit an answer to a mission
    #[command(visible_alias = "a")]
    Answer {
        #[arg(short, long)]
        mission: Uuid,
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        answer: String,
    },

    /// Claim a reward for a cleared mission set
    Claim {
        #[arg(short, long)]
        set: Uuid,
        #[arg(short, long)]
        option: Uuid,
        #[arg(short, long)]
        user: String,
    },

    /// Redeem an issued reward with the staff PIN
    Redeem {
        #[arg(short, long)]
        set: Uuid,
        #[arg(short, long)]
        user: String,
        #[arg(short, long, env = "STAFF_PIN", hide_env_values = true)]
        pin: String,
    },

    /// Show a user's progress in a mission set
    #[command(visible_alias = "st")]
    Status {
        #[arg(short, long)]
        set: Uuid,
        #[arg(short, long)]
        user: String,
        /// Print progress as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a user's rewards
    Rewards {
        #[arg(short, long)]
        user: String,
        /// Print rewards as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SetCommand {
    /// Create a mission set
    Create(CreateSetArgs),

    /// Set or rotate the staff PIN
    Pin {
        #[arg(short, long)]
        set: Uuid,
        #[arg(short, long, env = "STAFF_PIN", hide_env_values = true)]
        pin: String,
    },

    /// Show missions and remaining stock
    Show {
        #[arg(short, long)]
        set: Uuid,
    },
}

#[derive(Args)]
struct CreateSetArgs {
    /// Popup the set belongs to
    #[arg(long)]
    popup: String,
    #[arg(long)]
    title: String,
    /// Successful missions needed to claim a reward
    #[arg(long)]
    required: i32,
    #[arg(long, env = "STAFF_PIN", hide_env_values = true)]
    staff_pin: Option<String>,
}

#[derive(Subcommand)]
enum MissionCommand {
    /// Add a mission to a set
    Add {
        #[arg(short, long)]
        set: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        answer: String,
    },
}

#[derive(Subcommand)]
enum OptionCommand {
    /// Add a reward option to a set
    Add {
        #[arg(short, long)]
        set: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        stock: i32,
    },

    /// Change the total stock of an option
    Restock {
        #[arg(short, long)]
        option: Uuid,
        #[arg(long)]
        total: i32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<RewardError>() {
            Some(err) => print_error(&format!("{} ({})", err.public_message(), err.code())),
            None => print_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_from(&cli.config)?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    let app = RewardsApp::connect(&config).await?;

    match cli.command {
        Commands::Set(SetCommand::Create(args)) => {
            commands::admin::create_set(
                &app,
                &args.popup,
                &args.title,
                args.required,
                args.staff_pin.as_deref(),
            )
            .await
        }
        Commands::Set(SetCommand::Pin { set, pin }) => {
            commands::admin::set_pin(&app, set, &pin).await
        }
        Commands::Set(SetCommand::Show { set }) => commands::admin::show_set(&app, set).await,
        Commands::Mission(MissionCommand::Add {
            set,
            title,
            description,
            answer,
        }) => commands::admin::add_mission(&app, set, &title, &description, &answer).await,
        Commands::RewardOption(OptionCommand::Add { set, name, stock }) => {
            commands::admin::add_option(&app, set, &name, stock).await
        }
        Commands::RewardOption(OptionCommand::Restock { option, total }) => {
            commands::admin::restock(&app, option, total).await
        }
        Commands::Answer {
            mission,
            user,
            answer,
        } => commands::mission::answer(&app, mission, &user, &answer).await,
        Commands::Claim { set, option, user } => {
            commands::reward::claim(&app, set, option, &user).await
        }
        Commands::Redeem { set, user, pin } => {
            commands::reward::redeem(&app, set, &user, &pin).await
        }
        Commands::Status { set, user, json } => {
            commands::status::run(&app, set, &user, json).await
        }
        Commands::Rewards { user, json } => commands::reward::list(&app, &user, json).await,
    }
}
