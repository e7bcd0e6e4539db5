//! Nonce command - issue a signed beacon URL for a user.

use super::load_app;
use crate::error::CliResult;
use colored::Colorize;
use mcd_beacon::NONCE_ACTION;
use mcd_nonce::UserId;
use std::path::Path;

pub async fn run(config: Option<&Path>, user: u64) -> CliResult<()> {
    let app = load_app(config).await?;
    let nonce = app.nonces.create_nonce(NONCE_ACTION, UserId(user));

    println!("{} {}", "Nonce:".bright_white().bold(), nonce);
    println!(
        "{} {}",
        "Report URI:".bright_white().bold(),
        mcd_policy::beacon_report_uri(&app.settings.site_url, &nonce)
    );
    Ok(())
}
