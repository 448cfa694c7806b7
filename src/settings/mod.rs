//! Layered configuration: a TOML file overlaid by `BACKOFFICE__*` environment variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
