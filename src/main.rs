use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yatube::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatube=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path, name }) => {
            yatube::cli::init::run(path, name).await?;
        }
        Some(Commands::Serve { host, port }) => {
            yatube::cli::serve::run(&cli.config, host, port).await?;
        }
        Some(Commands::Migrate) => {
            yatube::cli::migrate::run(&cli.config).await?;
        }
        Some(Commands::User { command }) => {
            yatube::cli::user::run(&cli.config, command).await?;
        }
        Some(Commands::Group { command }) => {
            yatube::cli::group::run(&cli.config, command).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
