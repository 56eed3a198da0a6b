//! Optional idle watchdog.
//!
//! A session with two healthy legs can still be abandoned (a browser tab
//! left open on an untouched desktop). When an idle timeout is configured,
//! this watchdog observes the shared activity clock and cancels the session
//! once neither leg has moved a byte for the whole window. Disabled by
//! default; an idle VNC session is legitimate in most deployments.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::registry::SessionStats;

/// Outcome of the watchdog task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogResult {
    /// No activity for the configured window; the session was cancelled.
    IdleTimedOut,
    /// The session ended on its own first.
    Cancelled,
}

/// Watch the activity clock and cancel the session when it goes idle.
///
/// Polls at a quarter of the timeout (floor 250 ms) so an idle session is
/// noticed within a bounded delay of crossing the threshold.
pub async fn run_idle_watchdog(
    stats: Arc<SessionStats>,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> WatchdogResult {
    let poll = (idle_timeout / 4).max(Duration::from_millis(250));
    let mut ticker = time::interval(poll);
    // The first tick completes immediately; skip it.
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if stats.idle_for() >= idle_timeout {
                    cancel.cancel();
                    return WatchdogResult::IdleTimedOut;
                }
            }
            () = cancel.cancelled() => return WatchdogResult::Cancelled,
        }
    }
}
