use std::path::{Path, PathBuf};

use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::lexer::ScanOptions;
use crate::lower::LowerOptions;
use crate::span::Span;

/// File name searched for next to the inputs.
pub const CONFIG_FILE: &str = "gopawn.toml";

/// Settings from gopawn.toml. Missing keys keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub lower: LowerOptions,
    pub scan: ScanOptions,
    /// Where the settings came from; `None` for defaults.
    pub source: Option<PathBuf>,
}

fn config_error(path: &Path, line: usize, message: String) -> Diagnostic {
    Diagnostic::error(
        ErrorKind::Config,
        format!("{}:{}: {}", path.display(), line, message),
        Span::dummy(),
    )
}

/// `"text"` → `text`. Bare words are accepted as-is.
fn parse_string(value: &str) -> Option<String> {
    let value = value.trim();
    let unquoted = match value.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"')?,
        None => value,
    };
    if unquoted.is_empty() {
        return None;
    }
    Some(unquoted.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Drop a trailing `# comment` that is not inside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

impl Config {
    /// Load settings from a gopawn.toml file.
    pub fn load(path: &Path) -> Result<Config, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                ErrorKind::Config,
                format!("cannot read '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        let mut config = Config::parse(&content, path)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Section-aware minimal TOML parsing. `path` only labels errors.
    pub fn parse(content: &str, path: &Path) -> Result<Config, Diagnostic> {
        let mut config = Config::default();
        let mut section = String::new();

        for (index, line) in content.lines().enumerate() {
            let number = index + 1;
            let trimmed = strip_comment(line).trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(config_error(path, number, format!("expected 'key = value', found '{}'", trimmed)));
            };
            let key = key.trim().trim_matches('"');

            match (section.as_str(), key) {
                ("lower", "container_get" | "container_set" | "discard_prefix") => {
                    let Some(text) = parse_string(value) else {
                        return Err(config_error(path, number, format!("'{}' must be a non-empty string", key)));
                    };
                    match key {
                        "container_get" => config.lower.container_get = text,
                        "container_set" => config.lower.container_set = text,
                        _ => config.lower.discard_prefix = text,
                    }
                }
                ("scan", "strict_literals") => {
                    let Some(flag) = parse_bool(value) else {
                        return Err(config_error(path, number, "'strict_literals' must be true or false".to_string()));
                    };
                    config.scan.strict_literals = flag;
                }
                ("lower" | "scan", _) => {
                    return Err(config_error(path, number, format!("unknown key '{}' in [{}]", key, section)));
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Try to find a gopawn.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Settings for inputs under `start_dir`: the nearest gopawn.toml, or
    /// defaults when there is none.
    pub fn discover(start_dir: &Path) -> Result<Config, Diagnostic> {
        match Config::find(start_dir) {
            Some(path) => Config::load(&path),
            None => Ok(Config::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"# plugin build settings
[lower]
container_get = "MapGetCell"
container_set = "MapSetCell"   # host natives
discard_prefix = "_skip"

[scan]
strict_literals = false
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.lower.container_get, "MapGetCell");
        assert_eq!(config.lower.container_set, "MapSetCell");
        assert_eq!(config.lower.discard_prefix, "_skip");
        assert!(!config.scan.strict_literals);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = Config::parse("[lower]\ncontainer_get = \"Get\"\n", Path::new("x")).unwrap();
        assert_eq!(config.lower.container_get, "Get");
        assert_eq!(config.lower.container_set, LowerOptions::default().container_set);
        assert!(config.scan.strict_literals);
        assert!(config.source.is_none());
    }

    #[test]
    fn test_other_sections_ignored() {
        let config = Config::parse("[package]\nname = \"demo\"\n", Path::new("x")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = Config::parse("[scan]\nstrict_literals = maybe\n", Path::new("g.toml")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.starts_with("g.toml:2:"), "{}", err.message);

        let err = Config::parse("[lower]\ncontainer_get = \"\"\n", Path::new("g.toml")).unwrap_err();
        assert!(err.message.contains("non-empty"));

        let err = Config::parse("[lower]\nmystery = 1\n", Path::new("g.toml")).unwrap_err();
        assert!(err.message.contains("unknown key 'mystery'"));

        let err = Config::parse("[lower]\njust words\n", Path::new("g.toml")).unwrap_err();
        assert!(err.message.contains("key = value"));
    }

    #[test]
    fn test_find_walks_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("plugins").join("arena");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(Config::find(&nested), None);

        fs::write(dir.path().join(CONFIG_FILE), "[lower]\n").unwrap();
        assert_eq!(Config::find(&nested), Some(dir.path().join(CONFIG_FILE)));
        let config = Config::discover(&nested).unwrap();
        assert!(config.source.is_some());
    }

    #[test]
    fn test_strip_comment_respects_quotes() {
        assert_eq!(strip_comment("a = \"x#y\" # note"), "a = \"x#y\" ");
        assert_eq!(strip_comment("# all"), "");
    }
}
