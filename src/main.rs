use clap::Parser;
use voicebatch::cli::{Cli, Commands};
use voicebatch::config::Config;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voicebatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = Config::load(cli.config.as_deref())?;
            voicebatch::commands::run_pipeline(&config)
        }
        Commands::Status => {
            let config = Config::load(cli.config.as_deref())?;
            voicebatch::commands::show_status(&config)
        }
        Commands::Init => voicebatch::commands::init_config(),
    }
}
