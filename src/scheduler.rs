//! Fixed-interval poll loop.
//!
//! Strictly sequential: one cycle completes before the sleep and the next
//! begins, so passes never overlap even when a pass outlasts the interval.
//! The single-pass [`Pipeline::run_cycle`] stays callable on its own; this
//! module only wraps it in the forever-loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::pipeline::Pipeline;

/// Spawn the polling task. Returns a `JoinHandle` and a shutdown flag;
/// set the flag to stop polling after the current tick.
pub fn spawn_triage_loop(
    pipeline: Arc<Pipeline>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Triage loop started — polling every {}s", interval.as_secs());

        let mut tick = tokio::time::interval(interval);

        // First tick fires immediately; each later tick follows the
        // blocking sleep semantics of interval().
        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Triage loop shutting down");
                return;
            }

            info!("Running email check");
            match pipeline.run_cycle().await {
                Ok(summary) => {
                    if summary.replied + summary.skipped + summary.failed > 0 {
                        info!(
                            replied = summary.replied,
                            skipped = summary.skipped,
                            failed = summary.failed,
                            "Poll cycle complete"
                        );
                    }
                }
                Err(e) => {
                    error!("Poll cycle failed: {e}");
                }
            }
        }
    });

    (handle, shutdown_flag)
}
