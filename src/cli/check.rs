use std::path::{Path, PathBuf};
use std::process;

use clap::Args;
use rayon::prelude::*;

use super::{load_config, read_source, render_all};

#[derive(Args)]
pub struct CheckArgs {
    /// Source files to check
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

fn check_one(input: &Path, config_path: Option<&Path>) -> Result<(), String> {
    let config = load_config(config_path, input)?;
    let source = read_source(input)?;
    gopawn::check(&source, &config).map_err(|errors| render_all(&errors, &input.display().to_string(), &source))
}

pub fn cmd_check(args: CheckArgs, config_path: Option<&Path>) {
    let results: Vec<Result<(), String>> = args
        .inputs
        .par_iter()
        .map(|input| check_one(input, config_path))
        .collect();

    let mut failed = false;
    for (input, result) in args.inputs.iter().zip(&results) {
        match result {
            Ok(()) => eprintln!("OK: {}", input.display()),
            Err(report) => {
                eprint!("{}", report);
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}
