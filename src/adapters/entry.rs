//! Stored representation shared by the store adapters.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredValue {
    Text(String),
    /// Newest first.
    List(Vec<String>),
}

/// One key: its value and optional absolute expiry (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: StoredValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<i64>,
}

impl StoredEntry {
    pub fn text(value: &str, expires_at_ms: Option<i64>) -> Self {
        Self {
            value: StoredValue::Text(value.to_string()),
            expires_at_ms,
        }
    }

    /// Expiry is exclusive: an entry expiring at `now_ms` is gone.
    pub fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_none_or(|at| at > now_ms)
    }

    pub fn into_text(self, key: &str) -> Result<String, StoreError> {
        match self.value {
            StoredValue::Text(s) => Ok(s),
            StoredValue::List(_) => Err(StoreError::WrongKind(key.to_string())),
        }
    }

    pub fn into_list(self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.value {
            StoredValue::List(items) => Ok(items),
            StoredValue::Text(_) => Err(StoreError::WrongKind(key.to_string())),
        }
    }

    /// Prepend `value` to a list entry (or start one) and keep the newest
    /// `capacity` items. Expiry is preserved.
    pub fn pushed(existing: Option<Self>, key: &str, value: &str, capacity: usize) -> Result<Self, StoreError> {
        let (mut items, expires_at_ms) = match existing {
            Some(entry) => {
                let expires = entry.expires_at_ms;
                (entry.into_list(key)?, expires)
            }
            None => (Vec::new(), None),
        };
        items.insert(0, value.to_string());
        items.truncate(capacity);
        Ok(Self {
            value: StoredValue::List(items),
            expires_at_ms,
        })
    }
}

/// Absolute expiry `ttl_secs` from `now_ms`.
pub fn expiry(now_ms: i64, ttl_secs: u64) -> i64 {
    now_ms.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX).saturating_mul(1000))
}
