use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod io;
mod output;
mod shutdown;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = args::Cli::parse();
    output::init(cli.json);
    init_tracing(cli.verbose, cli.json);

    cmd::dispatch(cli).await
}

/// Logs go to stderr so stdout only carries the run summary.
/// `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!json)
        .with_target(verbose)
        .init();
}
