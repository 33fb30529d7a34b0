//! Persistent tier: one file per key, named by the hex fingerprint

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::key::CacheKey;
use crate::error::{Error, Result};
use crate::types::AudioBlob;

/// Directory of content-addressed audio files.
///
/// Presence of the file is the only index.
#[derive(Debug, Clone)]
pub struct DiskTier {
    dir: PathBuf,
}

impl DiskTier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    pub fn read(&self, key: &CacheKey) -> Result<Option<AudioBlob>> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(AudioBlob::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(cache_io("read", key, e)),
        }
    }

    /// Write through a uniquely named temp file in the cache directory and
    /// rename it into place, so a torn write never sits under a valid key and
    /// concurrent writers of one key never share a temp file.
    pub fn write(&self, key: &CacheKey, blob: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| cache_io("create dir for", key, e))?;

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|e| cache_io("stage", key, e))?;
        temp.write_all(blob).map_err(|e| cache_io("write", key, e))?;
        temp.persist(self.path_for(key))
            .map_err(|e| cache_io("commit", key, e.error))?;
        Ok(())
    }

    /// Remove every cached file; returns how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::CacheIo(format!("list {:?}: {}", self.dir, e))),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path)
                    .map_err(|e| Error::CacheIo(format!("remove {:?}: {}", path, e)))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Number of committed blobs on disk.
    pub fn count(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| {
                        e.file_name()
                            .to_str()
                            .and_then(CacheKey::from_hex)
                            .is_some()
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

fn cache_io(action: &str, key: &CacheKey, e: std::io::Error) -> Error {
    Error::CacheIo(format!("{} {}: {}", action, key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::Voice;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path().join("audio"));
        let key = CacheKey::new("hello", Voice::Alloy);

        assert!(tier.read(&key).unwrap().is_none());
        tier.write(&key, b"ID3 mp3 bytes").unwrap();

        assert_eq!(tier.read(&key).unwrap().unwrap().as_ref(), b"ID3 mp3 bytes");
        assert!(tier.path_for(&key).exists());
        assert_eq!(tier.count(), 1);
        assert_eq!(fs::read_dir(tier.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_clear_removes_files() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path());
        tier.write(&CacheKey::new("a", Voice::Echo), b"1").unwrap();
        tier.write(&CacheKey::new("b", Voice::Echo), b"2").unwrap();

        assert_eq!(tier.clear().unwrap(), 2);
        assert_eq!(tier.count(), 0);
    }

    #[test]
    fn test_clear_missing_dir_is_ok() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path().join("never-created"));
        assert_eq!(tier.clear().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_writers_of_one_key_all_commit() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path());
        let key = CacheKey::new("repeated sentence", Voice::Nova);

        std::thread::scope(|scope| {
            for writer in 0..8u8 {
                let tier = &tier;
                let key = &key;
                scope.spawn(move || {
                    let payload = vec![writer; 256 * 1024];
                    for _ in 0..20 {
                        tier.write(key, &payload).unwrap();
                    }
                });
            }
        });

        let stored = tier.read(&key).unwrap().unwrap();
        assert_eq!(stored.len(), 256 * 1024);
        assert!(stored.iter().all(|b| *b == stored[0]));
        assert_eq!(fs::read_dir(tier.dir()).unwrap().count(), 1);
    }
}
