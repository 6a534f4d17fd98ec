pub mod identify;
pub mod reset;
pub mod run_cmd;
pub mod status;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::PathBuf;
use tracing::debug;

/// Watch a host page file and hand each new revision to `deliver`. The
/// returned watcher stops on drop.
pub fn spawn_page_watcher<F>(
    page: PathBuf,
    deliver: F,
) -> anyhow::Result<notify::RecommendedWatcher>
where
    F: Fn(String) + Send + 'static,
{
    let watched = page.clone();
    let mut watcher =
        notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
            let Ok(event) = result else {
                return;
            };
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            match std::fs::read_to_string(&watched) {
                Ok(html) => deliver(html),
                Err(e) => debug!(error = %e, "Host page unreadable after change"),
            }
        })?;
    watcher.watch(&page, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
