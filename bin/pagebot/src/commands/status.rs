use chrono::{DateTime, Local};
use pagebot_core::{Config, Paths, WidgetPosition};
use pagebot_storage::SnapshotStore;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("pagebot status");
    println!("==============");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:   {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (defaults)" }
    );

    let config = Config::load_or_default(&paths)?;
    println!("Backend:  {}", config.backend.endpoint);

    let snapshot_path = paths.snapshot_file();
    println!(
        "Snapshot: {} {}",
        snapshot_path.display(),
        if snapshot_path.exists() { "✓" } else { "✗ (not found)" }
    );

    if let Ok(metadata) = std::fs::metadata(&snapshot_path) {
        if let Ok(modified) = metadata.modified() {
            let modified: DateTime<Local> = modified.into();
            println!("Saved:    {}", modified.format("%Y-%m-%d %H:%M:%S"));
        }
    }
    println!();

    let snapshot = SnapshotStore::new(paths).load();
    println!("Widget:   {}", if snapshot.is_open { "open" } else { "closed" });
    println!("User:     {}", snapshot.user.as_deref().unwrap_or("(not resolved)"));
    println!("Messages: {}", snapshot.messages.len());
    match snapshot.position {
        WidgetPosition::Absolute { top, left } => {
            println!("Position: top {:.0}, left {:.0}", top, left);
        }
        WidgetPosition::Anchored { bottom, right } => {
            println!("Position: {:.0} from bottom, {:.0} from right", bottom, right);
        }
    }
    Ok(())
}
