use clap::Parser;
use tracing_subscriber::EnvFilter;

use agent_workbench::cli::{self, Args};
use agent_workbench::{console, web};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = cli::effective_config(&args)?;

    if args.web {
        web::serve(&cfg).await?;
        return Ok(());
    }

    console::run(&cfg).await
}
