//! Availability and status resolution for a single copy.
//!
//! Everything here is a pure decision over the copy's current record and
//! the clock. Detaching a lapsed record is left to the desk. Only a record
//! that closed at or before the query instant counts as lapsed, so the
//! detach is safe without the transition locks: a record stamped later
//! than the query still governs the copy.

use std::fmt;

use serde::{Deserialize, Serialize};
use shelf_ledger::{CheckoutRecord, LoanPolicy};
use shelf_types::{Timestamp, UserId};

use crate::error::{CirculationError, CirculationResult};

/// What a copy looks like to one reader at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    Available,
    /// The reader's own live reservation; they may still borrow it.
    ReservedMine,
    ReservedOther,
    BorrowedMine,
    BorrowedOther,
}

impl CopyStatus {
    /// Whether this reader may borrow or reserve the copy.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available | Self::ReservedMine)
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::ReservedMine => write!(f, "reserved (mine)"),
            Self::ReservedOther => write!(f, "reserved"),
            Self::BorrowedMine => write!(f, "borrowed (mine)"),
            Self::BorrowedOther => write!(f, "borrowed"),
        }
    }
}

/// How the copy's current record bears on a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assessment {
    /// The copy has no current record.
    Vacant,
    /// The copy still points at a record that closed at or before the
    /// query instant.
    Lapsed(CheckoutRecord),
    /// The requester's own live reservation, not yet borrowed.
    OwnReservation(CheckoutRecord),
    /// A live record that blocks the requester.
    Held(CheckoutRecord),
}

impl Assessment {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Held(_))
    }

    /// The record still governing the copy, if any.
    pub fn governing(&self) -> Option<&CheckoutRecord> {
        match self {
            Self::Vacant | Self::Lapsed(_) => None,
            Self::OwnReservation(record) | Self::Held(record) => Some(record),
        }
    }
}

/// Resolves availability and status under a loan policy.
#[derive(Clone, Copy, Debug)]
pub struct CopyState<'a> {
    policy: &'a LoanPolicy,
}

impl<'a> CopyState<'a> {
    pub fn new(policy: &'a LoanPolicy) -> Self {
        Self { policy }
    }

    pub fn is_current(&self, record: &CheckoutRecord, now: Timestamp) -> bool {
        self.policy.is_current(record, now)
    }

    /// Classify the copy's current record for `user` at `now`.
    pub fn assess(
        &self,
        current: Option<CheckoutRecord>,
        user: &UserId,
        now: Timestamp,
    ) -> Assessment {
        match current {
            None => Assessment::Vacant,
            Some(record) if self.policy.has_lapsed(&record, now) => Assessment::Lapsed(record),
            Some(record) if &record.user == user && record.is_reservation() => {
                Assessment::OwnReservation(record)
            }
            Some(record) => Assessment::Held(record),
        }
    }

    /// Status of an assessed copy as seen by `user`.
    ///
    /// A blocking record that carries neither a borrow nor a reserve stamp
    /// is a broken ledger, reported as [`CirculationError::InvariantViolation`].
    pub fn status(&self, assessment: &Assessment, user: &UserId) -> CirculationResult<CopyStatus> {
        match assessment {
            Assessment::Vacant | Assessment::Lapsed(_) => Ok(CopyStatus::Available),
            Assessment::OwnReservation(_) => Ok(CopyStatus::ReservedMine),
            Assessment::Held(record) if record.borrowed_at.is_some() => {
                if &record.user == user {
                    Ok(CopyStatus::BorrowedMine)
                } else {
                    Ok(CopyStatus::BorrowedOther)
                }
            }
            Assessment::Held(record) if record.reserved_at.is_some() => {
                Ok(CopyStatus::ReservedOther)
            }
            Assessment::Held(record) => Err(CirculationError::InvariantViolation(format!(
                "current record {} of copy {} has neither a borrow nor a reserve stamp",
                record.id, record.copy
            ))),
        }
    }
}
