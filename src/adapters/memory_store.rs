//! In-process channel store.
//!
//! Same TTL semantics as the file store, driven by an injected [`Clock`].
//! Used by tests and by single-process simulations.

use std::collections::HashMap;

use crate::app::ports::{ChannelStore, Clock};
use crate::error::StoreError;

use super::entry::{StoredEntry, StoredValue, expiry};

pub struct MemoryStore<C: Clock> {
    entries: HashMap<String, StoredEntry>,
    clock: C,
}

impl<C: Clock> MemoryStore<C> {
    pub fn new(clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    fn live(&self, key: &str) -> Option<&StoredEntry> {
        let now = self.clock.now_millis();
        self.entries.get(key).filter(|e| e.is_live(now))
    }

    fn take_live(&mut self, key: &str) -> Option<StoredEntry> {
        let now = self.clock.now_millis();
        self.entries.remove(key).filter(|e| e.is_live(now))
    }
}

impl<C: Clock> ChannelStore for MemoryStore<C> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.live(key)
            .cloned()
            .map(|e| e.into_text(key))
            .transpose()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), StoredEntry::text(value, None));
        Ok(())
    }

    fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let at = expiry(self.clock.now_millis(), ttl_secs);
        self.entries
            .insert(key.to_string(), StoredEntry::text(value, Some(at)));
        Ok(())
    }

    fn set_nx_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        if self.live(key).is_some() {
            return Ok(false);
        }
        self.set_ex(key, value, ttl_secs)?;
        Ok(true)
    }

    fn delete(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.take_live(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live(key).is_some())
    }

    fn expire(&mut self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let at = expiry(self.clock.now_millis(), ttl_secs);
        match self.take_live(key) {
            Some(mut entry) => {
                entry.expires_at_ms = Some(at);
                self.entries.insert(key.to_string(), entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn push_trim(&mut self, key: &str, value: &str, capacity: usize) -> Result<(), StoreError> {
        let existing = self.take_live(key);
        let kept = existing.clone();
        match StoredEntry::pushed(existing, key, value, capacity) {
            Ok(entry) => {
                self.entries.insert(key.to_string(), entry);
                Ok(())
            }
            Err(e) => {
                if let Some(entry) = kept {
                    self.entries.insert(key.to_string(), entry);
                }
                Err(e)
            }
        }
    }

    fn list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.live(key) {
            Some(StoredEntry {
                value: StoredValue::List(items),
                ..
            }) => Ok(items.clone()),
            Some(_) => Err(StoreError::WrongKind(key.to_string())),
            None => Ok(Vec::new()),
        }
    }
}
