//! Persistent `{Locked, Unlocked}` gate for the hidden "secret mode".
//!
//! State is read once at startup and written only after a validated answer.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use solana_sdk::hash::hash;
use tracing::{debug, info};

use crate::error::Result;

const UNLOCKED_MARKER: &str = "unlocked";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone)]
pub struct SecretGate {
    path:        PathBuf,
    answer_hash: String,
    state:       GateState,
}

/// Hex SHA-256 of the normalised answer (trimmed, lowercase).
pub fn answer_hash(answer: &str) -> String {
    hash(answer.trim().to_lowercase().as_bytes()).to_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

impl SecretGate {
    /// Read the persisted flag; a missing file means `Locked`.
    pub fn load(path: impl AsRef<Path>, answer_hash: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read_to_string(&path) {
            Ok(s) if s.trim() == UNLOCKED_MARKER => GateState::Unlocked,
            Ok(_) => GateState::Locked,
            Err(e) if e.kind() == ErrorKind::NotFound => GateState::Locked,
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), ?state, "secret gate loaded");
        Ok(Self { path, answer_hash: answer_hash.into().to_lowercase(), state })
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    /// Validate `answer`; on a match, transition to `Unlocked` and persist.
    /// Returns whether the gate is unlocked afterwards.
    pub fn try_unlock(&mut self, answer: &str) -> Result<bool> {
        if self.is_unlocked() {
            return Ok(true);
        }
        if answer_hash(answer) != self.answer_hash {
            return Ok(false);
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, UNLOCKED_MARKER)?;
        self.state = GateState::Unlocked;
        info!(path = %self.path.display(), "secret mode unlocked");
        Ok(true)
    }

    /// Return to `Locked` and forget the persisted flag.
    pub fn lock(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.state = GateState::Locked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_locked_without_storage() {
        let dir = tempfile::tempdir().unwrap();
        let gate = SecretGate::load(dir.path().join("secret"), answer_hash("dlan")).unwrap();
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[test]
    fn wrong_answer_leaves_state_and_storage_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        let mut gate = SecretGate::load(&path, answer_hash("dlan")).unwrap();

        assert!(!gate.try_unlock("nope").unwrap());
        assert!(!gate.is_unlocked());
        assert!(!path.exists());
    }

    #[test]
    fn right_answer_unlocks_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secret");
        let mut gate = SecretGate::load(&path, answer_hash("dlan")).unwrap();

        assert!(gate.try_unlock("  DLAN ").unwrap());
        assert!(gate.is_unlocked());

        let reloaded = SecretGate::load(&path, answer_hash("dlan")).unwrap();
        assert_eq!(reloaded.state(), GateState::Unlocked);
    }

    #[test]
    fn lock_clears_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        let mut gate = SecretGate::load(&path, answer_hash("dlan")).unwrap();
        gate.try_unlock("dlan").unwrap();

        gate.lock().unwrap();
        assert!(!gate.is_unlocked());
        assert!(!path.exists());
        gate.lock().unwrap();
    }

    #[test]
    fn hash_is_normalised_hex() {
        let h = answer_hash("Dlan");
        assert_eq!(h.len(), 64);
        assert_eq!(h, answer_hash(" dlan\n"));
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
