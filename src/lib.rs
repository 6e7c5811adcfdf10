//! Inbox Triage — auto-reply agent for a Gmail inbox.
//!
//! Polls for unread mail, classifies each message with a generative model,
//! sends a threaded reply, archives a plain-text copy, and appends a
//! summary row to a Google Sheet.

pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod gmail;
pub mod llm;
pub mod pipeline;
pub mod scheduler;
pub mod sheets;
