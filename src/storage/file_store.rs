use std::{fs::File, path::PathBuf};

use anyhow::{bail, Context, Result};

use crate::fs::operations::{read_locked, try_lock_exclusive, write_atomic};

use super::DurableStore;

const LOCK_FILE: &str = ".lock";

/// The main realization of [DurableStore]. Every key is a JSON file inside `store_dir`.
///
/// A store owns its directory: it holds an exclusive lock on `store_dir/.lock` for as long as it
/// lives, so a second process opening the same directory is refused instead of overwriting the
/// first one's state.
pub struct FileStore {
    store_dir: PathBuf,
    _lock: File,
}

impl FileStore {
    pub fn new(store_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&store_dir)?;

        let lock = try_lock_exclusive(&store_dir.join(LOCK_FILE))
            .with_context(|| format!("Ledger in {store_dir:?} is in use by a running session"))?;

        Ok(Self {
            store_dir,
            _lock: lock,
        })
    }

    fn record_path(&self, key: &str) -> Result<PathBuf> {
        // Keys are file names, they must not reach outside of the directory.
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("Illegal store key {key:?}");
        }
        Ok(self.store_dir.join(format!("{key}.json")))
    }
}

impl DurableStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_path(key)?;
        Ok(read_locked(&path)?)
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        let path = self.record_path(key)?;
        write_atomic(&path, blob.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use tempfile::tempdir;

    use crate::{
        ledger::SessionLedger,
        storage::{load_state, DurableStore},
        utils::clock::{test_clock::ManualClock, Clock},
    };

    use super::FileStore;

    #[test]
    fn test_file_store_basic() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path().join("store"))?;

        assert_eq!(store.load("ledger")?, None);

        store.save("ledger", "{\"balance\": 1}")?;
        store.save("ledger", "{\"balance\": 2}")?;

        assert_eq!(store.load("ledger")?.as_deref(), Some("{\"balance\": 2}"));
        assert!(dir.path().join("store/ledger.json").exists());
        Ok(())
    }

    #[test]
    fn test_file_store_rejects_paths() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path().to_path_buf())?;

        assert!(store.save("../outside", "x").is_err());
        assert!(store.load("").is_err());
        Ok(())
    }

    #[test]
    fn test_second_store_on_same_dir_is_refused() -> Result<()> {
        let dir = tempdir()?;
        let store_dir = dir.path().join("store");

        let first = FileStore::new(store_dir.clone())?;
        let error = FileStore::new(store_dir.clone()).err().unwrap();
        assert!(error.to_string().contains("in use"));

        drop(first);
        assert!(FileStore::new(store_dir).is_ok());
        Ok(())
    }

    #[test]
    fn test_running_session_keeps_its_state() -> Result<()> {
        let dir = tempdir()?;
        let store_dir = dir.path().join("store");
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());

        let mut miner = SessionLedger::open(FileStore::new(store_dir.clone())?, clock.clone());
        miner.toggle();
        miner.on_tick();

        // A spender started next to the miner can't open the ledger, so it can't write a state
        // that the miner's next tick would silently overwrite.
        assert!(FileStore::new(store_dir.clone()).is_err());
        miner.on_tick();
        drop(miner);

        let store = FileStore::new(store_dir)?;
        assert_eq!(load_state(&store, clock.today()).elapsed_seconds, 2);
        Ok(())
    }
}
