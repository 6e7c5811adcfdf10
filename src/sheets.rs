//! Triage log — one appended spreadsheet row per processed message.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use crate::auth::GoogleAuth;
use crate::error::SheetError;

/// Fixed status column value for replied messages.
pub const STATUS_AUTO_REPLY: &str = "Auto-Reply Sent";

/// Body preview length cap for the log row.
const PREVIEW_CHARS: usize = 500;

// ── Log row ─────────────────────────────────────────────────────────

/// One append-only spreadsheet row. Column order is fixed: timestamp,
/// sender, subject, preview, category, reply, status, thread id.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub timestamp: String,
    pub sender: String,
    pub subject: String,
    pub preview: String,
    pub category: String,
    pub reply: String,
    pub status: String,
    pub thread_id: String,
}

impl LogRow {
    /// Build a row for a replied message, stamped with the current local
    /// time and the truncated body preview.
    pub fn replied(
        sender: &str,
        subject: &str,
        cleaned_body: &str,
        category: &str,
        reply: &str,
        thread_id: &str,
    ) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            preview: body_preview(cleaned_body),
            category: category.to_string(),
            reply: reply.to_string(),
            status: STATUS_AUTO_REPLY.to_string(),
            thread_id: thread_id.to_string(),
        }
    }

    /// The 8 cell values in column order.
    pub fn into_values(self) -> Vec<String> {
        vec![
            self.timestamp,
            self.sender,
            self.subject,
            self.preview,
            self.category,
            self.reply,
            self.status,
            self.thread_id,
        ]
    }
}

/// Truncate a cleaned body to the preview cap, appending an ellipsis.
/// Bodies at or under the cap pass through unchanged.
pub fn body_preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        let truncated: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        body.to_string()
    }
}

// ── SheetLog trait ──────────────────────────────────────────────────

/// Narrow spreadsheet capability the pipeline depends on.
#[async_trait]
pub trait SheetLog: Send + Sync {
    /// Append one row to the fixed range.
    async fn append(&self, row: LogRow) -> Result<(), SheetError>;
}

// ── Sheets client ───────────────────────────────────────────────────

/// Google Sheets REST client, bound to one spreadsheet and sheet tab.
pub struct SheetsClient {
    auth: Arc<GoogleAuth>,
    client: reqwest::Client,
    spreadsheet_id: String,
    sheet_name: String,
}

impl SheetsClient {
    pub fn new(auth: Arc<GoogleAuth>, spreadsheet_id: String, sheet_name: String) -> Self {
        Self {
            auth,
            client: reqwest::Client::new(),
            spreadsheet_id,
            sheet_name,
        }
    }

    fn append_url(&self) -> String {
        // 8 columns, A:H
        format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}!A:H:append?valueInputOption=RAW",
            self.spreadsheet_id, self.sheet_name
        )
    }
}

#[async_trait]
impl SheetLog for SheetsClient {
    async fn append(&self, row: LogRow) -> Result<(), SheetError> {
        let resp = self
            .client
            .post(self.append_url())
            .bearer_auth(self.auth.bearer().await?)
            .json(&serde_json::json!({ "values": [row.into_values()] }))
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(SheetError::Api { status, body })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_body_unchanged() {
        assert_eq!(body_preview("Need help"), "Need help");
    }

    #[test]
    fn preview_exactly_at_cap_unchanged() {
        let body = "x".repeat(500);
        assert_eq!(body_preview(&body), body);
    }

    #[test]
    fn preview_long_body_truncated_with_ellipsis() {
        let body = "y".repeat(501);
        let preview = body_preview(&body);
        assert_eq!(preview.chars().count(), 503);
        assert_eq!(preview, format!("{}...", "y".repeat(500)));
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        let body = "é".repeat(501);
        let preview = body_preview(&body);
        assert!(preview.starts_with(&"é".repeat(500)));
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn log_row_has_eight_columns_in_order() {
        let row = LogRow::replied(
            "alice@example.com",
            "Help",
            "Need help",
            "Support",
            "On it.",
            "t-1",
        );
        let values = row.into_values();
        assert_eq!(values.len(), 8);
        assert_eq!(values[1], "alice@example.com");
        assert_eq!(values[2], "Help");
        assert_eq!(values[3], "Need help");
        assert_eq!(values[4], "Support");
        assert_eq!(values[5], "On it.");
        assert_eq!(values[6], STATUS_AUTO_REPLY);
        assert_eq!(values[7], "t-1");
    }
}
