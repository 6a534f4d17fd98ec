//! Asynchronous identity resolution with a bounded fallback window.
//!
//! If the synchronous passes come up empty the detector subscribes to
//! page mutations and re-scans each revision. One task owns the whole
//! race: resolution, timeout, and cancellation are mutually exclusive,
//! and the mutation subscription ends the moment any of them fires.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::identity::{scan_page, IdentitySource};

/// Detector lifecycle, in order. Resolution is terminal for the page's
/// lifetime; only logout re-enters `ScanningSelectors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    ScanningSelectors,
    ScanningHeuristic,
    Observing,
    Resolved,
    FallbackGuest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityOutcome {
    pub name: String,
    pub source: IdentitySource,
}

impl IdentityOutcome {
    pub fn is_fallback(&self) -> bool {
        self.source == IdentitySource::Fallback
    }
}

/// Resolve the signed-in user's identity from the initial page and a
/// stream of page revisions, within `timeout`.
///
/// Returns `None` only when cancelled (logout or page teardown); every
/// other path resolves exactly once: to a detected name, or to
/// `fallback_name` when the window elapses.
pub async fn resolve_identity(
    initial_html: String,
    mut mutations: mpsc::Receiver<String>,
    timeout: Duration,
    cancel: CancellationToken,
    fallback_name: String,
) -> Option<IdentityOutcome> {
    if let Some((name, source)) = scan_page(&initial_html) {
        debug!(name = %name, ?source, "Identity resolved on initial scan");
        return Some(IdentityOutcome { name, source });
    }

    debug!(
        timeout_ms = timeout.as_millis() as u64,
        "No identity in initial page, observing mutations"
    );

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let mut mutations_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Identity detection cancelled");
                return None;
            }
            _ = &mut deadline => {
                debug!(fallback = %fallback_name, "Detection window elapsed, resolving to fallback identity");
                return Some(IdentityOutcome {
                    name: fallback_name,
                    source: IdentitySource::Fallback,
                });
            }
            revision = mutations.recv(), if mutations_open => {
                match revision {
                    Some(html) => {
                        if let Some((name, source)) = scan_page(&html) {
                            debug!(name = %name, ?source, "Identity resolved from page mutation");
                            return Some(IdentityOutcome { name, source });
                        }
                    }
                    None => {
                        // Host stopped feeding revisions; wait out the timer.
                        mutations_open = false;
                    }
                }
            }
        }
    }
}
