mod cmd;
mod config;
mod error;

use clap::Parser;
use config::{Cli, Commands, Effective};
use error::ServerError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    match cli.command {
        Commands::Serve(args) => cmd::serve::run(Effective::new(&cli.global, args.port)?).await,
        Commands::Topics => cmd::topics::list(&Effective::new(&cli.global, None)?).await,
        Commands::Create { topic } => cmd::topics::create(&Effective::new(&cli.global, None)?, &topic).await,
        Commands::Send { topic, message } => {
            cmd::topics::send(&Effective::new(&cli.global, None)?, &topic, &message).await
        }
    }
}
