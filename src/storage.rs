//! Durable credential slot.
//!
//! A single named slot holds the bearer credential. Both the session store and
//! the request authorizer write to it independently; writes are last-writer-wins
//! and only ever "set" or "clear".

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Name of the credential slot.
pub const CREDENTIAL_KEY: &str = "token";

pub trait CredentialStorage: Send + Sync {
    /// Current credential, `None` when the slot is empty.
    fn get(&self) -> Option<String>;
    fn set(&self, credential: &str);
    fn clear(&self);
}

/// In-process slot. Clones share the same slot, so a rebuilt session store
/// sees whatever an earlier one (or the authorizer) left behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<RwLock<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn with_credential(credential: &str) -> Self {
        let s = Self::default();
        s.set(credential);
        s
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self) -> Option<String> {
        self.slot.read().clone().filter(|t| !t.is_empty())
    }

    fn set(&self, credential: &str) {
        *self.slot.write() = Some(credential.to_string()).filter(|t| !t.is_empty());
    }

    fn clear(&self) {
        *self.slot.write() = None;
    }
}

/// Slot persisted as `<dir>/token`, surviving process restarts.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self { Self { path: path.as_ref().to_path_buf() } }

    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self { Self::new(dir.as_ref().join(CREDENTIAL_KEY)) }

    pub fn path(&self) -> &Path { &self.path }
}

impl CredentialStorage for FileStorage {
    fn get(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Some(s.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(target: "vecdesk::storage", "read {} failed: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, credential: &str) {
        if credential.is_empty() {
            self.clear();
            return;
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(target: "vecdesk::storage", "create {} failed: {}", parent.display(), e);
                return;
            }
        }
        match fs::write(&self.path, credential) {
            Ok(()) => debug!(target: "vecdesk::storage", "credential saved to {}", self.path.display()),
            Err(e) => warn!(target: "vecdesk::storage", "write {} failed: {}", self.path.display(), e),
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(target: "vecdesk::storage", "credential removed from {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(target: "vecdesk::storage", "remove {} failed: {}", self.path.display(), e),
        }
    }
}

impl<T: CredentialStorage + ?Sized> CredentialStorage for Arc<T> {
    fn get(&self) -> Option<String> { (**self).get() }
    fn set(&self, credential: &str) { (**self).set(credential) }
    fn clear(&self) { (**self).clear() }
}

/// Short, log-safe view of a credential.
pub fn credential_prefix(credential: &str) -> String {
    credential.chars().take(10).collect()
}
