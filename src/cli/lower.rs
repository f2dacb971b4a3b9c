use std::path::{Path, PathBuf};
use std::process;

use clap::Args;
use rayon::prelude::*;

use super::{load_config, read_source, render_all};

#[derive(Args)]
pub struct LowerArgs {
    /// Source files to lower
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Directory for lowered files (default: print to stdout)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Outcome of lowering one file.
struct Report {
    input: PathBuf,
    lowered: Option<String>,
    diagnostics: String,
}

fn lower_one(input: &Path, config_path: Option<&Path>) -> Report {
    let filename = input.display().to_string();
    let loaded = load_config(config_path, input).and_then(|config| Ok((config, read_source(input)?)));
    let (config, source) = match loaded {
        Ok(loaded) => loaded,
        Err(message) => {
            return Report {
                input: input.to_path_buf(),
                lowered: None,
                diagnostics: format!("{}\n", message),
            }
        }
    };
    match gopawn::lower_source(&source, &config) {
        Ok(lowered) => Report {
            input: input.to_path_buf(),
            diagnostics: render_all(&lowered.warnings, &filename, &source),
            lowered: Some(lowered.print()),
        },
        Err(errors) => Report {
            input: input.to_path_buf(),
            lowered: None,
            diagnostics: render_all(&errors, &filename, &source),
        },
    }
}

fn write_output(dir: &Path, report: &Report, text: &str) -> Result<(), String> {
    let Some(name) = report.input.file_name() else {
        return Err(format!("error: '{}' has no file name", report.input.display()));
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("error: cannot create '{}': {}", dir.display(), e))?;
    let path = dir.join(name);
    std::fs::write(&path, text).map_err(|e| format!("error: cannot write '{}': {}", path.display(), e))
}

pub fn cmd_lower(args: LowerArgs, config_path: Option<&Path>) {
    let LowerArgs { inputs, output } = args;
    let reports: Vec<Report> = inputs
        .par_iter()
        .map(|input| lower_one(input, config_path))
        .collect();

    let mut failed = false;
    for report in &reports {
        eprint!("{}", report.diagnostics);
        let Some(text) = &report.lowered else {
            failed = true;
            continue;
        };
        match &output {
            Some(dir) => match write_output(dir, report, text) {
                Ok(()) => eprintln!("OK: {}", report.input.display()),
                Err(message) => {
                    eprintln!("{}", message);
                    failed = true;
                }
            },
            None => print!("{}", text),
        }
    }
    if failed {
        process::exit(1);
    }
}
