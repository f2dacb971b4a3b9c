use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(
    name = "gopawn",
    version,
    about = "Lower Go-like sources into trees a plugin scripting target can express"
)]
struct Cli {
    /// Log every rewrite (same as RUST_LOG=gopawn=debug)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Settings file (default: nearest gopawn.toml above each input)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lower source files and print the result
    Lower(cli::lower::LowerArgs),
    /// Check that source files use only supported constructs
    Check(cli::check::CheckArgs),
    /// Print the token stream of a source file
    Tokens(cli::tokens::TokensArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "gopawn=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Command::Lower(args) => cli::lower::cmd_lower(args, config),
        Command::Check(args) => cli::check::cmd_check(args, config),
        Command::Tokens(args) => cli::tokens::cmd_tokens(args, config),
    }
}
