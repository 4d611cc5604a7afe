use clap::Parser;
use scrub::{
    cli::{commands, Cli, Commands},
    config::Settings,
    Result,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    // Silently ignore if file doesn't exist
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scrub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;
    settings.validate()?;

    // Handle commands
    match cli.command {
        Commands::Clean {
            file,
            policy,
            output,
        } => commands::clean(
            &settings,
            file.as_deref(),
            policy.as_deref(),
            output.as_deref(),
        ),
        Commands::Escape { file } => commands::escape(&settings, file.as_deref()),
        Commands::CheckPolicy { path } => commands::check_policy(&path),
        Commands::ShowPolicy { policy, format } => commands::show_policy(policy.as_deref(), format),
    }
}
