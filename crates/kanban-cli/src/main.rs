mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use tracing_subscriber::EnvFilter;

fn init_tracing() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("KANBAN_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cmd = match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "kanban", &mut std::io::stdout());
            return Ok(());
        }
        cmd => cmd,
    };

    let file_path = cli
        .file
        .ok_or_else(|| anyhow::anyhow!("--file is required for CLI operations"))?;

    let ctx = CliContext::load(&file_path).await?;

    match cmd {
        Commands::Board(board_cmd) => handlers::board::handle(&ctx, board_cmd.action).await?,
        Commands::List(list_cmd) => handlers::list::handle(&ctx, list_cmd.action).await?,
        Commands::Card(card_cmd) => handlers::card::handle(&ctx, card_cmd.action).await?,
        Commands::Sweep { watch } => handlers::sweep::handle(&ctx, watch).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::debug!("command failed: {:#}", err);
        output::output_failure(&err);
    }

    Ok(())
}
