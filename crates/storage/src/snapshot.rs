use pagebot_core::{Paths, Result, Snapshot};
use tracing::{debug, warn};

/// Durable, install-scoped persistence for the widget snapshot.
///
/// The snapshot is written and read as one unit; other readers never see
/// a partially updated field set. There is no locking: when several pages
/// or tabs share an install, the last writer wins. Concurrent-writer
/// behavior beyond that is undefined.
pub struct SnapshotStore {
    paths: Paths,
}

impl SnapshotStore {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Load the saved snapshot, or the default for a fresh install.
    /// A corrupt file is reported and treated as absent; the widget must
    /// come up interactive no matter what is on disk.
    pub fn load(&self) -> Snapshot {
        let path = self.paths.snapshot_file();

        if !path.exists() {
            debug!(path = %path.display(), "No snapshot on disk, starting fresh");
            return Snapshot::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Snapshot>(&content) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Snapshot file corrupt, using defaults");
                    Snapshot::default()
                }
            },
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read snapshot, using defaults");
                Snapshot::default()
            }
        }
    }

    /// Overwrite the entire snapshot.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.paths.snapshot_file();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Remove the persisted snapshot entirely (logout/reset).
    pub fn clear(&self) -> Result<()> {
        let path = self.paths.snapshot_file();
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagebot_core::{Message, WidgetPosition};

    fn store_in(dir: &tempfile::TempDir) -> SnapshotStore {
        SnapshotStore::new(Paths::with_base(dir.path().to_path_buf()))
    }

    #[test]
    fn test_load_missing_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let snap = store_in(&dir).load();
        assert!(!snap.is_open);
        assert!(snap.messages.is_empty());
        assert!(snap.user.is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut snap = Snapshot::default();
        snap.is_open = true;
        snap.user = Some("Anita".to_string());
        snap.messages.push(Message::user("hello"));
        snap.messages.push(Message::bot("hi there"));
        snap.position = WidgetPosition::Absolute { top: 40.0, left: 60.0 };
        store.save(&snap).unwrap();

        let loaded = store.load();
        assert!(loaded.is_open);
        assert_eq!(loaded.user.as_deref(), Some("Anita"));
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.position, WidgetPosition::Absolute { top: 40.0, left: 60.0 });
    }

    #[test]
    fn test_corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(dir.path().join("snapshot.json"), "{not json").unwrap();

        let snap = store.load();
        assert!(snap.messages.is_empty());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&Snapshot::default()).unwrap();
        assert!(dir.path().join("snapshot.json").exists());

        store.clear().unwrap();
        assert!(!dir.path().join("snapshot.json").exists());
        // Clearing an already-missing snapshot is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_save_is_whole_unit() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut first = Snapshot::default();
        first.user = Some("Anita".to_string());
        first.messages.push(Message::user("one"));
        store.save(&first).unwrap();

        // A later writer with fewer fields replaces everything.
        let second = Snapshot::default();
        store.save(&second).unwrap();

        let loaded = store.load();
        assert!(loaded.user.is_none());
        assert!(loaded.messages.is_empty());
    }
}
