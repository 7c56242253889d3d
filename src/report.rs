//! Weekly usage report.
//!
//! Despite the name, the report lists every redeemed code ever issued, not
//! just the last week's: the redeemed log carries no timestamps.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{info, warn};

use crate::mail::{Email, MailTransport};
use crate::model::RedeemedCode;
use crate::settings::SettingsService;
use crate::storage::{CodeStore, Result};

pub const REPORT_SUBJECT: &str = "Report Settimanale dei Codici Utilizzati";

/// Body sent when the redeemed log is empty.
pub const EMPTY_REPORT_MESSAGE: &str = "Nessun codice utilizzato questa settimana.";

const CELL_STYLE: &str = "border: 1px solid #ddd; padding: 8px;";

const COLUMNS: [&str; 5] = ["ID", "Codice", "Codice Editore", "Titolo Prodotto", "ISBN"];

/// Render the report body for a set of redeemed codes, in the given order.
pub fn render_report(redeemed: &[RedeemedCode]) -> String {
    if redeemed.is_empty() {
        return EMPTY_REPORT_MESSAGE.to_string();
    }

    let mut html = String::new();
    let _ = write!(html, "<h2>{REPORT_SUBJECT}</h2>");
    html.push_str(r#"<table style="border-collapse: collapse; width: 100%;">"#);

    html.push_str("<thead><tr>");
    for column in COLUMNS {
        let _ = write!(html, r#"<th style="{CELL_STYLE}">{column}</th>"#);
    }
    html.push_str("</tr></thead><tbody>");

    for record in redeemed {
        html.push_str("<tr>");
        for value in [
            record.id.to_string(),
            escape_html(&record.code),
            escape_html(&record.publisher_code),
            escape_html(&record.product_title),
            escape_html(&record.isbn),
        ] {
            let _ = write!(html, r#"<td style="{CELL_STYLE}">{value}</td>"#);
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table>");
    html
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Mails the redeemed-code report to the notification address.
#[derive(Clone)]
pub struct WeeklyReporter {
    codes: Arc<dyn CodeStore>,
    settings: SettingsService,
    mailer: Arc<dyn MailTransport>,
}

impl WeeklyReporter {
    pub fn new(
        codes: Arc<dyn CodeStore>,
        settings: SettingsService,
        mailer: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            codes,
            settings,
            mailer,
        }
    }

    /// Build and send the report. Returns the number of rows reported.
    ///
    /// Reading the log can fail; sending cannot (failures are logged).
    pub async fn send_report(&self) -> Result<usize> {
        let redeemed = self.codes.list_redeemed().await?;
        let current = self.settings.load().await;
        let to = current.admin_destination(self.settings.defaults()).to_string();

        let email = Email::html(&to, REPORT_SUBJECT, render_report(&redeemed));
        match self.mailer.send(email).await {
            Ok(()) => info!(to = %to, rows = redeemed.len(), "sent usage report"),
            Err(e) => warn!(to = %to, error = %e, "failed to send usage report"),
        }

        Ok(redeemed.len())
    }
}
