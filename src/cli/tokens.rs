use std::path::{Path, PathBuf};
use std::process;

use clap::Args;

use super::{load_config, read_source, render_all};

#[derive(Args)]
pub struct TokensArgs {
    /// Source file to scan
    pub input: PathBuf,
}

/// 1-based line of a byte offset.
fn line_of(source: &str, offset: u32) -> usize {
    let end = (offset as usize).min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

pub fn cmd_tokens(args: TokensArgs, config_path: Option<&Path>) {
    let loaded = load_config(config_path, &args.input).and_then(|config| Ok((config, read_source(&args.input)?)));
    let (config, source) = match loaded {
        Ok(loaded) => loaded,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };
    match gopawn::tokenize(&source, config.scan) {
        Ok(tokens) => {
            for token in &tokens {
                println!(
                    "{:>4}  {:<14} {}",
                    line_of(&source, token.span.start),
                    format!("{:?}", token.kind),
                    token.lexeme
                );
            }
        }
        Err(errors) => {
            eprint!("{}", render_all(&errors, &args.input.display().to_string(), &source));
            process::exit(1);
        }
    }
}
