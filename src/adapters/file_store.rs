//! Directory-backed channel store shared by both processes.
//!
//! Layout: one JSON document per key (`<dir>/<key>.json`) holding the
//! value and its absolute expiry. Writes go to a temporary file in the same
//! directory and are renamed into place, so readers never observe a
//! partial document. `set_nx_ex` stages the document the same way and
//! publishes it with an exclusive hard link.
//!
//! Expired documents are left on disk and treated as absent; they are
//! replaced by the next write to the same key.
//!
//! Lists live in a single document too, so `push_trim` reads and rewrites
//! the whole list on every push. The trim keeps the document at
//! `capacity` entries; at the default capacity of 7200 short samples that
//! is roughly 100 KiB written once per telemetry record.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, warn};

use crate::app::ports::{ChannelStore, Clock};
use crate::error::StoreError;

use super::entry::{StoredEntry, expiry};

/// Suffix counter for temporary file names within this process.
static TMP_SEQ: AtomicU32 = AtomicU32::new(0);

pub struct FileStore<C: Clock> {
    dir: PathBuf,
    clock: C,
}

fn io_err(key: &str) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl<C: Clock> FileStore<C> {
    /// Open (and create if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        debug!("File store at {}", dir.display());
        Ok(Self { dir, clock })
    }

    fn file_stem(key: &str) -> String {
        key.chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect()
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::file_stem(key)))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{seq}.tmp",
            Self::file_stem(key),
            std::process::id()
        ))
    }

    fn parse(key: &str, raw: &str) -> Result<StoredEntry, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read an entry regardless of expiry.
    fn read_any(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(raw) => Self::parse(key, &raw).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    fn read_live(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        let now = self.clock.now_millis();
        Ok(self.read_any(key)?.filter(|e| e.is_live(now)))
    }

    fn write(&self, key: &str, entry: &StoredEntry) -> Result<(), StoreError> {
        let doc = serde_json::to_vec(entry).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let tmp = self.tmp_path(key);
        let result = fs::write(&tmp, &doc).and_then(|()| fs::rename(&tmp, self.path(key)));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.map_err(io_err(key))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    /// Move a dead (expired or corrupt) document out of the way so that
    /// exclusive creation can succeed. Returns `false` if the document
    /// turned out to be live after all; it is then put back.
    fn reclaim_dead(&self, key: &str) -> Result<bool, StoreError> {
        let tomb = self.tmp_path(key);
        match fs::rename(self.path(key), &tomb) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(io_err(key)(e)),
        }
        let now = self.clock.now_millis();
        let live = fs::read_to_string(&tomb)
            .ok()
            .and_then(|raw| Self::parse(key, &raw).ok())
            .is_some_and(|e| e.is_live(now));
        if live {
            // Another process refreshed it between our read and the rename.
            if let Err(e) = fs::rename(&tomb, self.path(key)) {
                warn!("Could not restore live entry {key}: {e}");
            }
            return Ok(false);
        }
        let _ = fs::remove_file(&tomb);
        Ok(true)
    }
}

impl<C: Clock> ChannelStore for FileStore<C> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read_live(key)?.map(|e| e.into_text(key)).transpose()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write(key, &StoredEntry::text(value, None))
    }

    fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let at = expiry(self.clock.now_millis(), ttl_secs);
        self.write(key, &StoredEntry::text(value, Some(at)))
    }

    fn set_nx_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let now = self.clock.now_millis();
        match self.read_any(key) {
            Ok(Some(entry)) if entry.is_live(now) => return Ok(false),
            Ok(None) => {}
            Ok(Some(_)) | Err(StoreError::Corrupt { .. }) => {
                if !self.reclaim_dead(key)? {
                    return Ok(false);
                }
            }
            Err(e) => return Err(e),
        }

        let entry = StoredEntry::text(value, Some(expiry(now, ttl_secs)));
        let doc = serde_json::to_vec(&entry).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        // The document is complete before it becomes visible; the exclusive
        // link decides the race between simultaneous starters.
        let tmp = self.tmp_path(key);
        let staged = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .and_then(|mut file| file.write_all(&doc));
        if let Err(e) = staged {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(key)(e));
        }
        let linked = fs::hard_link(&tmp, self.path(key));
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    fn delete(&mut self, key: &str) -> Result<bool, StoreError> {
        let was_live = match self.read_live(key) {
            Ok(entry) => entry.is_some(),
            Err(StoreError::Corrupt { .. }) => false,
            Err(e) => return Err(e),
        };
        self.remove(key)?;
        Ok(was_live)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read_live(key)?.is_some())
    }

    fn expire(&mut self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        match self.read_live(key)? {
            Some(mut entry) => {
                entry.expires_at_ms = Some(expiry(self.clock.now_millis(), ttl_secs));
                self.write(key, &entry)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whole-document rewrite, `O(capacity)` per push.
    fn push_trim(&mut self, key: &str, value: &str, capacity: usize) -> Result<(), StoreError> {
        let existing = self.read_live(key)?;
        let entry = StoredEntry::pushed(existing, key, value, capacity)?;
        self.write(key, &entry)
    }

    fn list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.read_live(key)? {
            Some(entry) => entry.into_list(key),
            None => Ok(Vec::new()),
        }
    }
}
