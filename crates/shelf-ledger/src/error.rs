use shelf_types::{CopyId, RecordId};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("book copy {0} not found")]
    CopyNotFound(CopyId),

    #[error("checkout record {0} not found")]
    RecordNotFound(RecordId),

    #[error("duplicate copy: {0}")]
    DuplicateCopy(String),

    #[error("invalid copy: {0}")]
    InvalidCopy(String),

    #[error("current record of copy {copy} changed concurrently (expected {expected:?}, found {found:?})")]
    StaleCurrentRecord {
        copy: CopyId,
        expected: Option<RecordId>,
        found: Option<RecordId>,
    },

    #[error("record {record}: {reason}")]
    TimestampRegression { record: RecordId, reason: String },

    #[error("loan policy: {0}")]
    InvalidPolicy(String),

    #[error("integrity violation: {reason}")]
    IntegrityViolation { reason: String },

    #[error("snapshot checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub(crate) fn poisoned(which: &str) -> Self {
        Self::IntegrityViolation {
            reason: format!("ledger {which} lock poisoned"),
        }
    }
}
