//! Subcommand implementations.

pub mod nonce;
pub mod policy;
pub mod reports;
pub mod serve;

use crate::app::App;
use crate::error::CliResult;
use std::path::Path;

/// Load settings through every layer and build the app.
pub async fn load_app(config: Option<&Path>) -> CliResult<App> {
    let settings = mcd_config::load_settings(config)?;
    App::from_settings(settings).await
}
