//! Triage pipeline — classify, reply, archive, log.
//!
//! One message is processed start to finish before the next begins:
//!
//! 1. Fetch full content; skip (and mark read) if self-sent
//! 2. Clean the body
//! 3. Archive a local plain-text copy
//! 4. Classify → category, compose → reply
//! 5. Send the threaded reply
//! 6. Append the log row (failure is a warning, not an abort)
//! 7. Clear the unread flag
//!
//! Failures on individual messages are logged and do not abort the rest
//! of the cycle.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::archive::Archive;
use crate::error::PipelineError;
use crate::gmail::{Mailbox, MessageRef, clean_body};
use crate::llm::TextGenerator;
use crate::sheets::{LogRow, SheetLog};

/// Category substituted when classification yields nothing.
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

/// Acknowledgement substituted when reply composition yields nothing.
pub const FALLBACK_REPLY: &str = "Thank you for your email. We will get back to you shortly.";

// ── Classifier / composer ───────────────────────────────────────────

/// Classifier and reply composer over a generation provider.
///
/// One request per call, no caching, no retry — an empty result is
/// replaced by the fixed fallback, anything else is trimmed and accepted.
pub struct Triage {
    llm: Arc<dyn TextGenerator>,
}

impl Triage {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Classify a cleaned body into a short free-text category label.
    pub async fn classify(&self, text: &str) -> Result<String, PipelineError> {
        let output = self.llm.generate(&classification_prompt(text)).await?;
        let trimmed = output.trim();
        Ok(if trimmed.is_empty() {
            FALLBACK_CATEGORY.to_string()
        } else {
            trimmed.to_string()
        })
    }

    /// Compose a short professional reply for a cleaned body and category.
    pub async fn compose(&self, text: &str, category: &str) -> Result<String, PipelineError> {
        let output = self.llm.generate(&reply_prompt(text, category)).await?;
        let trimmed = output.trim();
        Ok(if trimmed.is_empty() {
            FALLBACK_REPLY.to_string()
        } else {
            trimmed.to_string()
        })
    }
}

/// Fixed instruction template for classification.
fn classification_prompt(text: &str) -> String {
    format!(
        "Classify the following email into a category like 'Support', 'Sales', \
         'Personal', 'Job Application', 'Spam', etc. Only output the category name.\n\n{text}"
    )
}

/// Fixed instruction template for reply composition.
fn reply_prompt(text: &str, category: &str) -> String {
    format!(
        "You are an AI email assistant for a professional organization. Draft a concise, \
         clear, and courteous reply to the email below.\n\
         The reply should:\n\
         - Start with Dear Customer.\n\
         - Maintain a professional and respectful tone.\n\
         - Directly address the sender's concerns or requests.\n\
         - Provide clear next steps or acknowledgement if no immediate action is required.\n\
         - Keep the length between 3 to 6 sentences.\n\n\
         Email Category: {category}\n\
         Email Content:\n{text}\n\n\
         Reply:"
    )
}

// ── Pipeline ────────────────────────────────────────────────────────

/// Counts from one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub replied: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Replied,
    SkippedSelf,
}

/// End-to-end triage pipeline over the external service capabilities.
pub struct Pipeline {
    mailbox: Arc<dyn Mailbox>,
    sheet: Arc<dyn SheetLog>,
    triage: Triage,
    archive: Archive,
    own_address: String,
    max_messages: u32,
}

impl Pipeline {
    pub fn new(
        mailbox: Arc<dyn Mailbox>,
        sheet: Arc<dyn SheetLog>,
        llm: Arc<dyn TextGenerator>,
        archive: Archive,
        own_address: String,
        max_messages: u32,
    ) -> Self {
        Self {
            mailbox,
            sheet,
            triage: Triage::new(llm),
            archive,
            own_address: own_address.to_lowercase(),
            max_messages,
        }
    }

    /// Run one full pass over the unread messages, sequentially, in
    /// listing order.
    pub async fn run_cycle(&self) -> Result<CycleSummary, PipelineError> {
        let refs = self.mailbox.list_unread(self.max_messages).await?;

        if refs.is_empty() {
            info!("No new unread emails");
            return Ok(CycleSummary::default());
        }

        debug!(count = refs.len(), "Fetched unread emails");

        let mut summary = CycleSummary::default();
        for msg_ref in &refs {
            match self.process_message(msg_ref).await {
                Ok(Outcome::Replied) => summary.replied += 1,
                Ok(Outcome::SkippedSelf) => summary.skipped += 1,
                Err(e) => {
                    error!(id = %msg_ref.id, error = %e, "Failed to process message");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Process a single message start to finish.
    async fn process_message(&self, msg_ref: &MessageRef) -> Result<Outcome, PipelineError> {
        let msg = self.mailbox.fetch(&msg_ref.id).await?;

        // Self-loop prevention: clear the flag, produce nothing else.
        if !self.own_address.is_empty() && msg.sender.contains(&self.own_address) {
            info!(sender = %msg.sender, "Skipping email from self");
            self.mailbox.mark_read(&msg.id).await?;
            return Ok(Outcome::SkippedSelf);
        }

        let cleaned = clean_body(&msg.body);

        let archived = self.archive.store(&msg.sender, &msg.subject, &cleaned)?;
        debug!(path = %archived.display(), "Archived email");

        let category = self.triage.classify(&cleaned).await?;
        let reply = self.triage.compose(&cleaned, &category).await?;

        self.mailbox
            .send_reply(&msg.thread_id, &msg.sender, &msg.subject, &reply)
            .await?;

        // Reply is already out; a logging failure must not abort the cycle.
        let row = LogRow::replied(
            &msg.sender,
            &msg.subject,
            &cleaned,
            &category,
            &reply,
            &msg.thread_id,
        );
        if let Err(e) = self.sheet.append(row).await {
            warn!(error = %e, "Failed to log to sheet");
        }

        self.mailbox.mark_read(&msg.id).await?;

        info!(sender = %msg.sender, category = %category, "Replied and logged");
        Ok(Outcome::Replied)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "canned".into(),
                reason: "boom".into(),
            })
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn classify_trims_output() {
        let triage = Triage::new(Arc::new(CannedGenerator("  Support\n")));
        assert_eq!(triage.classify("body").await.unwrap(), "Support");
    }

    #[tokio::test]
    async fn classify_empty_output_falls_back() {
        let triage = Triage::new(Arc::new(CannedGenerator("   \n")));
        assert_eq!(triage.classify("body").await.unwrap(), FALLBACK_CATEGORY);
    }

    #[tokio::test]
    async fn compose_empty_output_falls_back() {
        let triage = Triage::new(Arc::new(CannedGenerator("")));
        assert_eq!(
            triage.compose("body", "Support").await.unwrap(),
            FALLBACK_REPLY
        );
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let triage = Triage::new(Arc::new(FailingGenerator));
        assert!(triage.classify("body").await.is_err());
        assert!(triage.compose("body", "Support").await.is_err());
    }

    #[test]
    fn prompts_carry_the_inputs() {
        let p = classification_prompt("Need help");
        assert!(p.contains("Only output the category name"));
        assert!(p.ends_with("Need help"));

        let r = reply_prompt("Need help", "Support");
        assert!(r.contains("Email Category: Support"));
        assert!(r.contains("Need help"));
    }
}
