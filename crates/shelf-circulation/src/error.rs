use shelf_ledger::LedgerError;
use shelf_types::{CopyId, RecordId, UserId};

/// Errors reported by circulation operations.
#[derive(Debug, thiserror::Error)]
pub enum CirculationError {
    /// The copy is held or reserved by someone else.
    #[error("copy {copy} is not available to {user}")]
    NotAvailable { copy: CopyId, user: UserId },

    /// A return was attempted on a copy that is not on loan.
    #[error("copy {copy} is not on loan")]
    NotBorrowed { copy: CopyId },

    /// The reader already holds the maximum number of current checkouts.
    #[error("{user} already holds {held} current checkouts (limit {limit})")]
    TooManyCheckouts {
        user: UserId,
        held: usize,
        limit: usize,
    },

    /// A record reached a state the status taxonomy does not cover.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("book copy {0} not found")]
    CopyNotFound(CopyId),

    #[error("checkout record {0} not found")]
    RecordNotFound(RecordId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("circulation lock poisoned")]
    LockPoisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for CirculationError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::CopyNotFound(copy) => Self::CopyNotFound(copy),
            LedgerError::RecordNotFound(record) => Self::RecordNotFound(record),
            other => Self::Ledger(other),
        }
    }
}

pub type CirculationResult<T> = Result<T, CirculationError>;
