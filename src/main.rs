use std::sync::Arc;
use std::time::Duration;

use inbox_triage::archive::Archive;
use inbox_triage::auth::GoogleAuth;
use inbox_triage::config::Config;
use inbox_triage::gmail::GmailClient;
use inbox_triage::llm::{LlmConfig, create_generator};
use inbox_triage::pipeline::Pipeline;
use inbox_triage::scheduler::spawn_triage_loop;
use inbox_triage::sheets::SheetsClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export GEMINI_API_KEY=... TRIAGE_SPREADSHEET_ID=...");
        std::process::exit(1);
    });

    eprintln!("📬 Inbox Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Spreadsheet: {} ({})", config.spreadsheet_id, config.sheet_name);
    eprintln!("   Archive: {}", config.archive_dir.display());
    eprintln!(
        "   Polling every {}s, up to {} messages per cycle\n",
        config.poll_interval_secs, config.max_messages
    );

    // ── Credentials ──────────────────────────────────────────────────
    // Interactive authorization on first run; silent refresh afterwards.
    // Any failure here is fatal.
    let auth = Arc::new(
        GoogleAuth::acquire(&config.client_secret, &config.token_cache)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Google authorization failed: {e}");
                std::process::exit(1);
            }),
    );

    let mailbox = GmailClient::new(Arc::clone(&auth));
    let own_address = mailbox.profile_address().await.unwrap_or_else(|e| {
        eprintln!("Error: Failed to resolve account address: {e}");
        std::process::exit(1);
    });
    eprintln!("   Authenticated as {own_address}\n");

    let sheet = SheetsClient::new(
        Arc::clone(&auth),
        config.spreadsheet_id.clone(),
        config.sheet_name.clone(),
    );

    // ── Generator ────────────────────────────────────────────────────
    let llm = create_generator(&LlmConfig {
        api_key: config.gemini_api_key.clone(),
        model: config.model.clone(),
    })?;

    // ── Archive ──────────────────────────────────────────────────────
    let archive = Archive::new(&config.archive_dir);
    archive.ensure_dir()?;

    // ── Pipeline + scheduler ─────────────────────────────────────────
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(mailbox),
        Arc::new(sheet),
        llm,
        archive,
        own_address,
        config.max_messages,
    ));

    let (handle, _shutdown) = spawn_triage_loop(
        pipeline,
        Duration::from_secs(config.poll_interval_secs),
    );

    // Runs until externally killed.
    handle.await?;
    Ok(())
}
