//! Engine wiring for the CLI
//!
//! - `config`: `AppConfig` and its sections
//! - `loader`: layered configuration loading
//! - `init`: builds the router and session from configuration
//! - `sim`: simulated arm, primitives and file-backed checkpoints

pub mod config;
pub mod init;
pub mod loader;
pub mod sim;

pub use config::AppConfig;
pub use loader::load_config;
