pub mod check;
pub mod lower;
pub mod tokens;

use std::path::Path;

use gopawn::config::Config;
use gopawn::diagnostic::Diagnostic;

/// Settings for `input`: the `--config` file when given, else the nearest
/// gopawn.toml above the input, else defaults.
pub fn load_config(explicit: Option<&Path>, input: &Path) -> Result<Config, String> {
    let loaded = match explicit {
        Some(path) => Config::load(path),
        None => Config::discover(input.parent().unwrap_or(Path::new("."))),
    };
    match loaded {
        Ok(config) => {
            if let Some(source) = &config.source {
                tracing::debug!(path = %source.display(), "loaded settings");
            }
            Ok(config)
        }
        Err(e) => Err(format!("error: {}", e.message)),
    }
}

pub fn read_source(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("error: cannot read '{}': {}", path.display(), e))
}

/// Render diagnostics for one file into a single block of text so parallel
/// runs can print each file's report in one piece.
pub fn render_all(diagnostics: &[Diagnostic], filename: &str, source: &str) -> String {
    diagnostics
        .iter()
        .map(|d| d.render_to_string(filename, source))
        .collect()
}
