//! Reports command - list stored reports.

use super::load_app;
use crate::error::CliResult;
use mcd_beacon::{ReportHandler, ReportListView};
use std::path::Path;

pub async fn run(config: Option<&Path>, limit: usize, json: bool) -> CliResult<()> {
    let app = load_app(config).await?;
    let records = app.store.list_reports(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let view = ReportListView::new(&ReportHandler::report_type(), &records);
    print!("{}", view.to_text());
    Ok(())
}
