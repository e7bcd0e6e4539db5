//! Admin list columns for stored reports.

use crate::escape::{esc_html, esc_url, strip_all_tags};
use crate::post_type::ReportType;
use crate::report::{RecordId, ReportField, ReportRecord};
use serde::{Deserialize, Serialize};

/// Placeholder for cells with nothing to show.
pub const NOT_AVAILABLE: &str = "N/A";

const TITLE_COLUMN: &str = "title";
const DATE_COLUMN: &str = "date";

/// Report columns in display order.
pub const REPORT_COLUMNS: [(ReportField, &str); 5] = [
    (ReportField::BlockedUri, "Blocked URI"),
    (ReportField::DocumentUri, "Document URI"),
    (ReportField::Referrer, "Referrer"),
    (ReportField::ViolatedDirective, "Violated Directive"),
    (ReportField::OriginalPolicy, "Original Policy"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Columns every content list starts with.
pub fn default_columns() -> Vec<Column> {
    vec![Column::new(TITLE_COLUMN, "Title"), Column::new(DATE_COLUMN, "Date")]
}

/// Drop the title column and append the report columns.
pub fn manage_columns(mut columns: Vec<Column>) -> Vec<Column> {
    columns.retain(|c| c.key != TITLE_COLUMN);

    for (field, label) in REPORT_COLUMNS {
        columns.retain(|c| c.key != field.as_str());
        columns.push(Column::new(field.as_str(), label));
    }

    columns
}

/// Render one cell. Unknown columns render nothing.
pub fn render_column(column: &str, record: &ReportRecord) -> String {
    let rendered = match ReportField::from_key(column) {
        Some(ReportField::BlockedUri) => esc_url(&record.title),
        Some(field @ (ReportField::DocumentUri | ReportField::Referrer)) => {
            esc_url(&meta_text(record, field))
        }
        Some(field @ (ReportField::ViolatedDirective | ReportField::OriginalPolicy)) => {
            esc_html(&strip_all_tags(&meta_text(record, field)))
        }
        None if column == DATE_COLUMN => {
            record.created_at.format("%Y/%m/%d %H:%M").to_string()
        }
        Some(ReportField::StatusCode) | None => return String::new(),
    };

    if rendered.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        rendered
    }
}

fn meta_text(record: &ReportRecord, field: ReportField) -> String {
    record
        .meta(field.as_str())
        .map(|value| value.to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: RecordId,
    pub cells: Vec<String>,
}

/// The admin list of stored reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportListView {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<ReportRow>,
    pub empty_message: String,
}

impl ReportListView {
    pub fn new(report_type: &ReportType, records: &[ReportRecord]) -> Self {
        let columns = manage_columns(default_columns());

        let rows = records
            .iter()
            .map(|record| ReportRow {
                id: record.id,
                cells: columns
                    .iter()
                    .map(|column| render_column(&column.key, record))
                    .collect(),
            })
            .collect();

        Self {
            title: report_type.labels.all_items.clone(),
            columns,
            rows,
            empty_message: report_type.labels.not_found.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text table, one tab-separated line per row.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n", self.title);

        if self.rows.is_empty() {
            out.push_str(&self.empty_message);
            out.push('\n');
            return out;
        }

        let header: Vec<&str> = self.columns.iter().map(|c| c.label.as_str()).collect();
        out.push_str("ID\t");
        out.push_str(&header.join("\t"));
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format!("{}\t{}\n", row.id, row.cells.join("\t")));
        }

        out
    }
}
