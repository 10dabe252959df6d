use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = deferred_args::cli::run().await {
        if let deferred_args::Error::Cli(err) = &e {
            err.exit();
        }
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
