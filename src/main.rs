use clap::Parser;
use ruletrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ruletrader=warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    run(Cli::parse())
}
