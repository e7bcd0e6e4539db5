//! Serve command - run the beacon server.

use crate::app::{App, log_config};
use crate::error::CliResult;
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

pub async fn run(config: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut settings = mcd_config::load_settings(config)?;
    if let Some(port) = port {
        settings.port = port;
    }

    let _guard = log_config(&settings)?.init()?;

    let app = App::from_settings(settings).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], app.settings.port));

    info!(
        site_url = %app.settings.site_url,
        store = %app.settings.store_backend,
        report_only = app.policy.is_report_only(),
        "starting beacon"
    );

    app.server().listen(addr).await?;
    Ok(())
}
