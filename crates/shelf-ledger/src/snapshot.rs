//! Portable, checksummed dump of an [`InMemoryLedger`].

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::memory::{InMemoryLedger, LedgerState};
use crate::records::{BookCopy, CheckoutRecord};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub copies: Vec<BookCopy>,
    pub records: Vec<CheckoutRecord>,
    /// Hex BLAKE3 digest of the version, copies, and records.
    pub checksum: String,
}

#[derive(Serialize)]
struct ChecksumInput<'a> {
    version: u32,
    copies: &'a [BookCopy],
    records: &'a [CheckoutRecord],
}

impl LedgerSnapshot {
    pub fn seal(copies: Vec<BookCopy>, records: Vec<CheckoutRecord>) -> Result<Self, LedgerError> {
        let checksum = compute_checksum(SNAPSHOT_VERSION, &copies, &records)?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            copies,
            records,
            checksum,
        })
    }

    pub fn verify(&self) -> Result<(), LedgerError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(LedgerError::Serialization(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        let computed = compute_checksum(self.version, &self.copies, &self.records)?;
        if computed != self.checksum {
            return Err(LedgerError::ChecksumMismatch {
                expected: self.checksum.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Parse and verify a snapshot.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    /// Write to `path` atomically via a sibling temp file.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LedgerError::Io(e.error))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

fn compute_checksum(
    version: u32,
    copies: &[BookCopy],
    records: &[CheckoutRecord],
) -> Result<String, LedgerError> {
    let encoded = serde_json::to_vec(&ChecksumInput {
        version,
        copies,
        records,
    })
    .map_err(|e| LedgerError::Serialization(e.to_string()))?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(b"shelf-snapshot-v1:");
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

impl InMemoryLedger {
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.read_state()?;
        LedgerSnapshot::seal(state.copies_in_order(), state.records_in_order())
    }

    /// Rebuild a ledger from a verified snapshot.
    ///
    /// Catalog rules are re-applied, and every copy pointer must name a
    /// record of that copy.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        snapshot.verify()?;

        let mut state = LedgerState::default();
        for copy in snapshot.copies {
            state.insert_copy(copy)?;
        }
        for record in snapshot.records {
            state.insert_record(record);
        }
        for copy in state.copies_in_order() {
            if let Some(current) = copy.current {
                match state.record_copy(current) {
                    Some(owner) if owner == copy.id => {}
                    Some(_) => {
                        return Err(LedgerError::IntegrityViolation {
                            reason: format!("copy {} points at another copy's record", copy.id),
                        })
                    }
                    None => return Err(LedgerError::RecordNotFound(current)),
                }
            }
        }

        Ok(Self::from_state(state))
    }
}
