//! Gmail access — reading unread mail and sending threaded replies.
//!
//! Talks to the Gmail REST API directly over `reqwest` with a bearer token
//! from the shared [`GoogleAuth`] handle. The pipeline sees only the narrow
//! [`Mailbox`] trait so it can run against fakes in tests.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::auth::GoogleAuth;
use crate::error::MailError;

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

// ── Wire types ──────────────────────────────────────────────────────

/// One entry from a message list: enough to fetch the full content.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

/// A message part as Gmail returns it — recursive for multipart payloads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagePayload {
    pub mime_type: String,
    pub headers: Vec<Header>,
    pub body: PartBody,
    pub parts: Vec<MessagePayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartBody {
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    id: String,
    thread_id: String,
    #[serde(default)]
    payload: MessagePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    #[serde(default)]
    email_address: String,
}

// ── Domain message ──────────────────────────────────────────────────

/// A fetched message with headers extracted and the body decoded, but not
/// yet cleaned.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    /// `From` header, lower-cased. Empty if absent.
    pub sender: String,
    /// `Subject` header, verbatim. Empty if absent.
    pub subject: String,
    /// Raw decoded body (HTML or plain text).
    pub body: String,
}

// ── Mailbox trait ───────────────────────────────────────────────────

/// Narrow mail capability the pipeline depends on.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List up to `limit` unread message references. No pagination.
    async fn list_unread(&self, limit: u32) -> Result<Vec<MessageRef>, MailError>;

    /// Fetch full content for one message.
    async fn fetch(&self, id: &str) -> Result<Message, MailError>;

    /// Send `body` as a reply on `thread_id`, subject `Re: ` + the original.
    /// Returns the sent message id.
    async fn send_reply(
        &self,
        thread_id: &str,
        to: &str,
        original_subject: &str,
        body: &str,
    ) -> Result<String, MailError>;

    /// Clear the unread flag. The sole guard against reprocessing.
    async fn mark_read(&self, id: &str) -> Result<(), MailError>;
}

// ── Gmail client ────────────────────────────────────────────────────

/// Gmail REST client.
pub struct GmailClient {
    auth: Arc<GoogleAuth>,
    client: reqwest::Client,
}

impl GmailClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            client: reqwest::Client::new(),
        }
    }

    /// Resolve the authenticated account's own address, lower-cased.
    /// Used downstream to keep self-mail from triggering a reply loop.
    pub async fn profile_address(&self) -> Result<String, MailError> {
        let resp = self
            .client
            .get(format!("{GMAIL_API}/profile"))
            .bearer_auth(self.auth.bearer().await?)
            .send()
            .await?;
        let profile: ProfileResponse = read_json(resp).await?;
        Ok(profile.email_address.to_lowercase())
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_unread(&self, limit: u32) -> Result<Vec<MessageRef>, MailError> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(format!("{GMAIL_API}/messages"))
            .query(&[("labelIds", "UNREAD"), ("maxResults", limit.as_str())])
            .bearer_auth(self.auth.bearer().await?)
            .send()
            .await?;
        let list: MessageListResponse = read_json(resp).await?;
        Ok(list.messages)
    }

    async fn fetch(&self, id: &str) -> Result<Message, MailError> {
        let resp = self
            .client
            .get(format!("{GMAIL_API}/messages/{id}"))
            .query(&[("format", "full")])
            .bearer_auth(self.auth.bearer().await?)
            .send()
            .await?;
        let msg: MessageResponse = read_json(resp).await?;

        let sender = header_value(&msg.payload, "From").to_lowercase();
        let subject = header_value(&msg.payload, "Subject");
        let body = extract_body(&msg.payload)?;

        Ok(Message {
            id: msg.id,
            thread_id: msg.thread_id,
            sender,
            subject,
            body,
        })
    }

    async fn send_reply(
        &self,
        thread_id: &str,
        to: &str,
        original_subject: &str,
        body: &str,
    ) -> Result<String, MailError> {
        let raw = URL_SAFE.encode(reply_mime(to, original_subject, body));
        let resp = self
            .client
            .post(format!("{GMAIL_API}/messages/send"))
            .bearer_auth(self.auth.bearer().await?)
            .json(&serde_json::json!({ "raw": raw, "threadId": thread_id }))
            .send()
            .await?;
        let sent: SendResponse = read_json(resp).await?;
        tracing::debug!(id = %sent.id, to = %to, "Reply sent");
        Ok(sent.id)
    }

    async fn mark_read(&self, id: &str) -> Result<(), MailError> {
        let resp = self
            .client
            .post(format!("{GMAIL_API}/messages/{id}/modify"))
            .bearer_auth(self.auth.bearer().await?)
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

/// Deserialize a response body, mapping non-success statuses into
/// `MailError::Api` with the error body as the reason.
async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, MailError> {
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, MailError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(MailError::Api { status, body })
}

// ── Body extraction ─────────────────────────────────────────────────

/// Extract a header value from the payload. Empty string if absent.
pub fn header_value(payload: &MessagePayload, name: &str) -> String {
    payload
        .headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

/// Extract the raw body from a payload.
///
/// Multipart: prefer a `text/html` part (searched through nested parts),
/// fall back to `text/plain`. Single part: decode the payload body directly.
/// A part with no data yields an empty string.
pub fn extract_body(payload: &MessagePayload) -> Result<String, MailError> {
    if payload.parts.is_empty() {
        return match payload.body.data.as_deref() {
            Some(data) => decode_body(data),
            None => Ok(String::new()),
        };
    }

    let data = payload
        .parts
        .iter()
        .find_map(|p| find_part_data(p, "text/html"))
        .or_else(|| {
            payload
                .parts
                .iter()
                .find_map(|p| find_part_data(p, "text/plain"))
        });

    match data {
        Some(data) => decode_body(data),
        None => Ok(String::new()),
    }
}

/// Depth-first search for the first part of the given MIME type that
/// carries data.
fn find_part_data<'a>(part: &'a MessagePayload, mime: &str) -> Option<&'a str> {
    if part.mime_type == mime
        && let Some(data) = part.body.data.as_deref()
    {
        return Some(data);
    }
    part.parts.iter().find_map(|p| find_part_data(p, mime))
}

/// Decode base64-url part data (Gmail emits both padded and unpadded)
/// as UTF-8 text.
pub fn decode_body(data: &str) -> Result<String, MailError> {
    let bytes = URL_SAFE
        .decode(data.trim())
        .or_else(|_| URL_SAFE_NO_PAD.decode(data.trim()))
        .map_err(|e| MailError::Decode(format!("base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| MailError::Decode(format!("utf-8: {e}")))
}

// ── Cleaning ────────────────────────────────────────────────────────

/// Strip HTML tags from content (basic character scan).
fn strip_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
}

/// Clean a raw body for classification, archival, and logging: strip
/// markup, collapse all whitespace runs (including newlines) to single
/// spaces, trim. Lossy and one-way.
pub fn clean_body(raw: &str) -> String {
    strip_tags(raw).split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Outbound MIME ───────────────────────────────────────────────────

/// Build the RFC 2822 text for a reply. Subject is `Re: ` + the original
/// verbatim — existing `Re:` prefixes are not de-duplicated.
pub fn reply_mime(to: &str, original_subject: &str, body: &str) -> String {
    format!(
        "To: {to}\r\nSubject: Re: {original_subject}\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n\r\n{body}"
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> MessagePayload {
        serde_json::from_value(value).unwrap()
    }

    fn b64(text: &str) -> String {
        URL_SAFE.encode(text)
    }

    // ── Cleaning ────────────────────────────────────────────────────

    #[test]
    fn clean_body_strips_tags() {
        assert_eq!(clean_body("<p>Need help</p>"), "Need help");
    }

    #[test]
    fn clean_body_nested_tags() {
        assert_eq!(
            clean_body("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
    }

    #[test]
    fn clean_body_tag_attributes() {
        assert_eq!(
            clean_body(r#"<a href="https://example.com">Link</a>"#),
            "Link"
        );
    }

    #[test]
    fn clean_body_collapses_whitespace_runs() {
        assert_eq!(clean_body("Hello\n\n  World\t!"), "Hello World !");
    }

    #[test]
    fn clean_body_trims() {
        assert_eq!(clean_body("  padded  "), "padded");
    }

    #[test]
    fn clean_body_plain_text_passthrough() {
        assert_eq!(clean_body("No HTML here"), "No HTML here");
    }

    #[test]
    fn clean_body_empty() {
        assert_eq!(clean_body(""), "");
    }

    // ── Decoding ────────────────────────────────────────────────────

    #[test]
    fn decode_body_padded() {
        assert_eq!(decode_body(&URL_SAFE.encode("hi there")).unwrap(), "hi there");
    }

    #[test]
    fn decode_body_unpadded() {
        let unpadded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("hi there");
        assert_eq!(decode_body(&unpadded).unwrap(), "hi there");
    }

    #[test]
    fn decode_body_rejects_garbage() {
        assert!(matches!(decode_body("!!not base64!!"), Err(MailError::Decode(_))));
    }

    // ── Header extraction ───────────────────────────────────────────

    #[test]
    fn header_value_found_and_missing() {
        let p = payload(serde_json::json!({
            "mimeType": "text/plain",
            "headers": [
                {"name": "From", "value": "Alice <Alice@Example.com>"},
                {"name": "Subject", "value": "Help"}
            ]
        }));
        assert_eq!(header_value(&p, "Subject"), "Help");
        assert_eq!(header_value(&p, "From"), "Alice <Alice@Example.com>");
        assert_eq!(header_value(&p, "Cc"), "");
    }

    // ── Body extraction ─────────────────────────────────────────────

    #[test]
    fn extract_body_single_part() {
        let p = payload(serde_json::json!({
            "mimeType": "text/plain",
            "body": {"data": b64("plain body")}
        }));
        assert_eq!(extract_body(&p).unwrap(), "plain body");
    }

    #[test]
    fn extract_body_single_part_no_data() {
        let p = payload(serde_json::json!({"mimeType": "text/plain"}));
        assert_eq!(extract_body(&p).unwrap(), "");
    }

    #[test]
    fn extract_body_prefers_html_part() {
        let p = payload(serde_json::json!({
            "mimeType": "multipart/alternative",
            "parts": [
                {"mimeType": "text/plain", "body": {"data": b64("plain")}},
                {"mimeType": "text/html", "body": {"data": b64("<p>html</p>")}}
            ]
        }));
        assert_eq!(extract_body(&p).unwrap(), "<p>html</p>");
    }

    #[test]
    fn extract_body_falls_back_to_plain_part() {
        let p = payload(serde_json::json!({
            "mimeType": "multipart/mixed",
            "parts": [
                {"mimeType": "application/pdf", "body": {}},
                {"mimeType": "text/plain", "body": {"data": b64("plain only")}}
            ]
        }));
        assert_eq!(extract_body(&p).unwrap(), "plain only");
    }

    #[test]
    fn extract_body_searches_nested_parts() {
        let p = payload(serde_json::json!({
            "mimeType": "multipart/mixed",
            "parts": [{
                "mimeType": "multipart/alternative",
                "parts": [
                    {"mimeType": "text/html", "body": {"data": b64("<b>nested</b>")}}
                ]
            }]
        }));
        assert_eq!(extract_body(&p).unwrap(), "<b>nested</b>");
    }

    #[test]
    fn extract_body_no_text_parts() {
        let p = payload(serde_json::json!({
            "mimeType": "multipart/mixed",
            "parts": [{"mimeType": "image/png", "body": {}}]
        }));
        assert_eq!(extract_body(&p).unwrap(), "");
    }

    // ── Outbound MIME ───────────────────────────────────────────────

    #[test]
    fn reply_mime_prefixes_subject() {
        let mime = reply_mime("alice@example.com", "Help", "On it.");
        assert!(mime.contains("To: alice@example.com\r\n"));
        assert!(mime.contains("Subject: Re: Help\r\n"));
        assert!(mime.ends_with("\r\n\r\nOn it."));
    }

    #[test]
    fn reply_mime_does_not_dedup_re_prefix() {
        let mime = reply_mime("a@b.c", "Re: Help", "body");
        assert!(mime.contains("Subject: Re: Re: Help\r\n"));
    }

    // ── List deserialization ────────────────────────────────────────

    #[test]
    fn message_list_empty_response() {
        // Gmail omits "messages" entirely when there are no results.
        let list: MessageListResponse = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(list.messages.is_empty());
    }

    #[test]
    fn message_list_with_refs() {
        let list: MessageListResponse = serde_json::from_str(
            r#"{"messages": [{"id": "m1", "threadId": "t1"}]}"#,
        )
        .unwrap();
        assert_eq!(list.messages.len(), 1);
        assert_eq!(list.messages[0].id, "m1");
        assert_eq!(list.messages[0].thread_id, "t1");
    }
}
