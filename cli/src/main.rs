use clap::Parser;
use covpilot_cli::Cli;
use covpilot_cli::exit_code_for;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".bright_red());
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}
