use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

use deque_demo::cli::Cli;
use deque_demo::runner;
use deque_demo::types::Environment;
use sqs_deque::SqsDeque;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let environment = Environment::from_env();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    // JSON logs for staging/production, regular format for development
    if environment.json_logs() {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    info!("Starting deque demo in {:?} environment", environment);

    let config = environment.aws_config().await;
    let deque = match SqsDeque::connect(&config, &cli.queue, cli.create_if_missing).await {
        Ok(deque) => deque,
        Err(e) => {
            error!("Failed to open queue {}: {}", cli.queue, e);
            return Err(e.into());
        }
    };

    let mut stdout = std::io::stdout();
    runner::run(cli.command, &deque, &mut stdout).await
}
