//! Liveness lease: exclusive ownership of one serial device.
//!
//! The lease is a store key with a short TTL whose value is the owner's
//! uptime in seconds. It is created at start, refreshed on every complete
//! record and deleted on shutdown. A crashed owner's lease simply expires.

use std::time::Instant;

use log::{info, warn};

use crate::app::ports::ChannelStore;
use crate::config::LeaseAcquire;
use crate::error::{Error, OwnershipConflict, StoreError};
use crate::keys;

pub struct LivenessLease {
    key: String,
    ttl_secs: u64,
    mode: LeaseAcquire,
    started: Instant,
}

impl LivenessLease {
    pub fn new(device: &str, ttl_secs: u64, mode: LeaseAcquire) -> Self {
        Self {
            key: keys::lease(device),
            ttl_secs,
            mode,
            started: Instant::now(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn uptime(&self) -> String {
        self.started.elapsed().as_secs().to_string()
    }

    /// Take the lease, failing with [`OwnershipConflict`] if another
    /// process holds it.
    pub fn acquire(&self, store: &mut impl ChannelStore) -> Result<(), Error> {
        let taken = match self.mode {
            LeaseAcquire::Atomic => store.set_nx_ex(&self.key, &self.uptime(), self.ttl_secs)?,
            LeaseAcquire::CheckThenSet => {
                if store.exists(&self.key)? {
                    false
                } else {
                    store.set_ex(&self.key, &self.uptime(), self.ttl_secs)?;
                    true
                }
            }
        };
        if !taken {
            warn!("Lease {} is held by another instance", self.key);
            return Err(OwnershipConflict {
                key: self.key.clone(),
            }
            .into());
        }
        info!("Lease {} acquired", self.key);
        Ok(())
    }

    /// Extend the lease by another TTL.
    pub fn refresh(&self, store: &mut impl ChannelStore) -> Result<(), StoreError> {
        store.set_ex(&self.key, &self.uptime(), self.ttl_secs)
    }

    pub fn release(&self, store: &mut impl ChannelStore) -> Result<(), StoreError> {
        store.delete(&self.key)?;
        info!("Lease {} released", self.key);
        Ok(())
    }
}
