pub mod project;

pub use project::{Config, CONFIG_FILE};
