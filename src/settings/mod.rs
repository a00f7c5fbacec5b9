//! Layered configuration: TOML file first, then `DIRAUTH_*` environment
//! overrides. See `bin/settings_demo.rs` for a manual check.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
