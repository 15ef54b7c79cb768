//! Filesystem backend: each key is a file below a root directory.
//!
//! Writes go to `<file>.tmp` first and are renamed into place, which is atomic
//! on the same filesystem, so a crash mid-write leaves the previous value.
//! With `fsync` enabled the temp file is synced before the rename and the
//! containing directory after it, so a renamed key survives power loss.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{BackendError, KvBackend};

const TMP_SUFFIX: &str = ".tmp";

/// Stores keys as files under `root`.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
    fsync: bool,
}

impl FsBackend {
    /// Opens (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, fsync: bool) -> Result<Self, BackendError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| BackendError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root, fsync })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BackendError> {
        let valid = !key.is_empty()
            && !key.ends_with(TMP_SUFFIX)
            && key
                .split('/')
                .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\'));
        if !valid {
            return Err(BackendError::InvalidKey(key.to_string()));
        }
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }

    fn write_atomic(&self, path: &Path, value: &[u8]) -> io::Result<()> {
        let parent = path.parent().unwrap_or(self.root.as_path());
        let created = !parent.exists();
        if created {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value)?;
        if self.fsync {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&tmp, path)?;

        if self.fsync {
            sync_dir(parent)?;
            if created {
                // New directories are only durable once their own parents are.
                for dir in parent.ancestors().skip(1) {
                    sync_dir(dir)?;
                    if dir == self.root.as_path() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.collect_keys(&path, prefix, out)?;
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !key.ends_with(TMP_SUFFIX) && key.starts_with(prefix) {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl KvBackend for FsBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        self.write_atomic(&path, value).map_err(|source| BackendError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BackendError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let mut out = Vec::new();
        self.collect_keys(&self.root, prefix, &mut out)
            .map_err(|source| BackendError::Io {
                key: prefix.to_string(),
                source,
            })?;
        out.sort();
        Ok(out)
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        let io_err = |source: io::Error| BackendError::Io {
            key: key.to_string(),
            source,
        };
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(io_err(source)),
        }
        if self.fsync {
            sync_dir(path.parent().unwrap_or(self.root.as_path())).map_err(io_err)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), BackendError> {
        if !self.fsync {
            return Ok(());
        }
        sync_dir(&self.root).map_err(|source| BackendError::Io {
            key: self.root.display().to_string(),
            source,
        })
    }
}

/// Makes directory entries (renames, creations, removals) durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn files_round_trip_and_list_sorted() {
        let dir = TempDir::new().unwrap();
        let kv = FsBackend::open(dir.path().join("db"), false).unwrap();

        kv.put("series/MSFT/chain", b"m").unwrap();
        kv.put("series/AAPL/versions/00000000000000000001", b"v1").unwrap();
        kv.put("series/AAPL/chain", b"a").unwrap();
        kv.put("series/AAPL/chain", b"a2").unwrap();

        assert_eq!(kv.get("series/AAPL/chain").unwrap(), Some(b"a2".to_vec()));
        assert_eq!(kv.get("series/NVDA/chain").unwrap(), None);
        assert_eq!(
            kv.list_keys("series/").unwrap(),
            vec![
                "series/AAPL/chain",
                "series/AAPL/versions/00000000000000000001",
                "series/MSFT/chain"
            ]
        );

        kv.delete("series/MSFT/chain").unwrap();
        kv.delete("series/MSFT/chain").unwrap();
        assert_eq!(kv.list_keys("series/MSFT/").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn listing_a_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let kv = FsBackend::open(dir.path(), true).unwrap();
        assert!(kv.list_keys("series/").unwrap().is_empty());
    }

    #[test]
    fn synced_writes_deletes_and_flush_succeed() {
        let dir = TempDir::new().unwrap();
        let kv = FsBackend::open(dir.path().join("db"), true).unwrap();
        kv.put("series/AAPL/versions/00000000000000000000", b"seg").unwrap();
        kv.put("series/AAPL/chain", b"ptr").unwrap();
        kv.put("series/AAPL/chain", b"ptr2").unwrap();
        kv.delete("series/AAPL/versions/00000000000000000000").unwrap();
        kv.flush().unwrap();

        assert_eq!(kv.get("series/AAPL/chain").unwrap(), Some(b"ptr2".to_vec()));
        assert_eq!(kv.list_keys("").unwrap(), vec!["series/AAPL/chain"]);
    }

    #[test]
    fn path_escapes_are_rejected() {
        let dir = TempDir::new().unwrap();
        let kv = FsBackend::open(dir.path(), false).unwrap();
        for key in ["", "../x", "a//b", "/abs", "a/./b", "x.tmp"] {
            assert!(matches!(kv.put(key, b"x"), Err(BackendError::InvalidKey(_))), "{key}");
        }
    }
}
