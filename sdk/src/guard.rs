//! One outstanding submission per action key.
//!
//! A second "Claim" while the first is still being signed or confirmed fails
//! fast with [`Error::InFlight`] instead of racing it on chain.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of a submission; releases its key on drop.
#[derive(Debug)]
pub struct InFlightTicket {
    key:  String,
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: impl Into<String>) -> Result<InFlightTicket> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        if !keys.insert(key.clone()) {
            return Err(Error::InFlight(key));
        }
        Ok(InFlightTicket { key, keys: Arc::clone(&self.keys) })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys.lock().unwrap_or_else(|p| p.into_inner()).contains(key)
    }
}

impl InFlightTicket {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.keys.lock().unwrap_or_else(|p| p.into_inner()).remove(&self.key);
    }
}
