use pagebot_core::Paths;
use pagebot_storage::SnapshotStore;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();
    let store = SnapshotStore::new(paths);
    store.clear()?;
    println!("Snapshot cleared.");
    Ok(())
}
