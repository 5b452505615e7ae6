mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tex_outline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Outline {
            file,
            view,
            format,
            title,
            no_refs,
            no_envs,
        } => {
            cli::outline(&file, config, view, &format, title, no_refs, no_envs)?;
        }
        Commands::Locate {
            root,
            file,
            offset,
            view,
        } => {
            cli::locate(&root, file.as_deref(), config, offset, view)?;
        }
        Commands::Aux { file, format } => {
            cli::aux(&file, config, &format)?;
        }
        Commands::Envs { file } => {
            cli::envs(&file)?;
        }
        Commands::Watch { file, view } => {
            cli::watch(&file, config, view).await?;
        }
    }

    Ok(())
}
