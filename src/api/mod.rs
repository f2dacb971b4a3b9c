//! Library entry points: source text in; tokens, trees or printed output
//! out.
//!
//! The `*_silent` functions and [`lower_source`] return diagnostics without
//! printing them, for callers that render on their own (the CLI renders
//! per file when lowering in parallel). [`parse_source`] and [`transpile`]
//! render to stderr before returning.

use crate::ast::display::format_file;
use crate::ast::File;
use crate::config::Config;
use crate::diagnostic::{render_diagnostics, Diagnostic};
use crate::lexeme::Token;
use crate::lexer::{self, ScanOptions};
use crate::lower;
use crate::parser::Parser;
use crate::typecheck::ScopeResolver;

#[cfg(test)]
mod tests;

/// A lowered tree and the warnings produced while lowering it.
#[derive(Clone, Debug)]
pub struct Lowered {
    pub file: File,
    pub warnings: Vec<Diagnostic>,
}

impl Lowered {
    /// The lowered tree in source-grammar syntax.
    pub fn print(&self) -> String {
        format_file(&self.file)
    }
}

/// Scan one buffer. Comments never reach the token stream.
pub fn tokenize(source: &str, options: ScanOptions) -> Result<Vec<Token>, Vec<Diagnostic>> {
    lexer::tokenize(source, 0, options)
}

pub fn parse_source_silent(source: &str, options: ScanOptions) -> Result<File, Vec<Diagnostic>> {
    let tokens = tokenize(source, options)?;
    Parser::new(tokens, 0).parse_file()
}

/// Parse one buffer, rendering any diagnostics to stderr.
pub fn parse_source(source: &str, filename: &str, options: ScanOptions) -> Result<File, Vec<Diagnostic>> {
    parse_source_silent(source, options).map_err(|errors| {
        render_diagnostics(&errors, filename, source);
        errors
    })
}

/// Scan, parse and lower one buffer with the bundled scope resolver.
pub fn lower_source(source: &str, config: &Config) -> Result<Lowered, Vec<Diagnostic>> {
    let mut file = parse_source_silent(source, config.scan)?;
    let resolver = ScopeResolver::new(&file);
    let warnings = lower::lower_file(&mut file, &resolver, &config.lower).map_err(|error| vec![error])?;
    Ok(Lowered { file, warnings })
}

/// Scan, parse, lower and print one buffer. Errors and warnings are
/// rendered to stderr.
pub fn transpile(source: &str, filename: &str, config: &Config) -> Result<String, Vec<Diagnostic>> {
    match lower_source(source, config) {
        Ok(lowered) => {
            render_diagnostics(&lowered.warnings, filename, source);
            Ok(lowered.print())
        }
        Err(errors) => {
            render_diagnostics(&errors, filename, source);
            Err(errors)
        }
    }
}

/// Legality check only: scan, parse and run the sieve without rewriting.
pub fn check(source: &str, config: &Config) -> Result<(), Vec<Diagnostic>> {
    let file = parse_source_silent(source, config.scan)?;
    lower::check_file(&file).map_err(|error| vec![error])
}
