//! gopawn: lowers a Go-like source grammar into a tree that a plugin
//! scripting target can express.
//!
//! The pipeline is scan → parse → sieve → lower → print. Each stage lives
//! in its own module; [`api`] strings them together.

pub mod api;
pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod lower;
pub mod syntax;
pub mod typecheck;

// Re-exports: the syntax stages keep short `crate::X` paths
pub use syntax::lexeme;
pub use syntax::lexer;
pub use syntax::parser;
pub use syntax::span;

pub use api::*;
