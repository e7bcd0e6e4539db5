//! Policy command - print the policy header.

use super::load_app;
use crate::error::CliResult;
use mcd_nonce::UserId;
use std::path::Path;

/// Print `Name: value`. With a user, the report-uri is signed for them.
pub async fn run(config: Option<&Path>, user: Option<u64>) -> CliResult<()> {
    let app = load_app(config).await?;
    let report_uri = user.map(|user| app.report_uri(UserId(user)));

    let (name, value) = app.policy.header(report_uri.as_deref());
    println!("{}: {}", name, value);
    Ok(())
}
