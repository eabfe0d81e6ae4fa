//! Checkout ledger for Shelf.
//!
//! This crate holds the circulation history of every book copy. It provides:
//! - `BookCopy` and `CheckoutRecord`, with the copy's current record held as
//!   an optional `RecordId`
//! - `LedgerWriter` / `LedgerReader` trait boundaries with compare-and-set
//!   semantics on the current-record pointer
//! - `InMemoryLedger` implementation for tests and embedding
//! - `LoanPolicy`: the is-current rule, reservation expiry, and fines
//! - Statistics over the retained history
//! - Whole-ledger validation and checksummed JSON snapshots

pub mod error;
pub mod memory;
pub mod policy;
pub mod records;
pub mod snapshot;
pub mod statistics;
pub mod traits;
pub mod validation;

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use policy::{LoanPolicy, MAX_FINE_PER_DAY, MAX_LOAN_PERIOD_DAYS};
pub use records::{BookCopy, CheckoutKind, CheckoutRecord, NewCopy, MAX_POSITION_LEN};
pub use snapshot::{LedgerSnapshot, SNAPSHOT_VERSION};
pub use statistics::{BorrowCount, BranchLateness, FineLine, Statistics};
pub use traits::{LedgerReader, LedgerWriter};
pub use validation::{LedgerValidator, ValidationReport, Violation, ViolationKind};
