use std::{
    fs::File,
    io::{self, ErrorKind, Read, Write},
    path::Path,
};

use fs4::fs_std::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replaces the contents of `path` without ever exposing a half written file. Every call writes
/// into its own temp file next to `path` and renames it over `path`, so concurrent writers never
/// share a scratch file and the last rename wins.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "Path has no parent directory"))?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} bytes into {path:?}", contents.len());
    Ok(())
}

/// Reads the whole file under a shared lock. A missing file isn't an error.
pub fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    fn read(path: &Path) -> Result<String, io::Error> {
        let mut file = File::open(path)?;
        FileExt::lock_shared(&file)?;
        let mut contents = String::new();
        let result = file.read_to_string(&mut contents);
        FileExt::unlock(&file)?;
        result.map(|_| contents)
    }

    match read(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Opens (creating if needed) `path` and takes an exclusive lock on it without waiting. The lock
/// lives as long as the returned file.
pub fn try_lock_exclusive(path: &Path) -> Result<File, io::Error> {
    let file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    FileExt::try_lock_exclusive(&file)?;
    Ok(file)
}
