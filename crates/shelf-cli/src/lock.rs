//! Cross-process exclusion for one ledger file.
//!
//! Every `shelf` run loads the whole snapshot, applies its command and
//! writes the snapshot back. The lock is held across that whole span so
//! two runs never decide against the same stale copy of the ledger.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use fs2::FileExt;

/// Exclusive advisory lock on `<ledger>.lock`, released on drop.
pub struct LedgerLock {
    file: File,
}

impl LedgerLock {
    /// Block until no other run holds the ledger at `ledger`.
    pub fn acquire(ledger: &Path) -> anyhow::Result<Self> {
        let path = lock_path(ledger);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to open lock file {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("failed to lock {}", path.display()))?;
        tracing::debug!(path = %path.display(), "ledger lock acquired");
        Ok(Self { file })
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path(ledger: &Path) -> PathBuf {
    let mut name = OsString::from(ledger.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}
