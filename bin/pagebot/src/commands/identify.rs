use anyhow::Context;
use pagebot_core::{Config, Paths};
use pagebot_page::observe::resolve_identity;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub async fn run(page: PathBuf, watch: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;

    let html = std::fs::read_to_string(&page)
        .with_context(|| format!("Failed to read host page {}", page.display()))?;

    let (mutations_tx, mutations_rx) = mpsc::channel(16);
    let watcher = if watch {
        println!(
            "Watching {} for up to {} ms...",
            page.display(),
            config.detection.timeout_ms
        );
        Some(super::spawn_page_watcher(page.clone(), move |html| {
            let _ = mutations_tx.blocking_send(html);
        })?)
    } else {
        None
    };

    let outcome = resolve_identity(
        html,
        mutations_rx,
        Duration::from_millis(config.detection.timeout_ms),
        CancellationToken::new(),
        config.detection.fallback_name.clone(),
    )
    .await;
    drop(watcher);

    match outcome {
        Some(outcome) => {
            println!("Identity: {}", outcome.name);
            println!("Source:   {:?}", outcome.source);
        }
        None => println!("Detection cancelled."),
    }
    Ok(())
}
