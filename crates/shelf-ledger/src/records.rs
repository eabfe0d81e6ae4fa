use std::fmt;

use serde::{Deserialize, Serialize};
use shelf_types::{BookId, BranchId, CopyId, Money, RecordId, Timestamp, UserId};

use crate::error::LedgerError;
use crate::policy::LoanPolicy;

/// Longest shelf position label accepted by the catalog.
pub const MAX_POSITION_LEN: usize = 6;

/// Request to register a physical copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCopy {
    pub book: BookId,
    pub branch: BranchId,
    pub copy_number: u32,
    pub position: String,
}

/// One physical, shelvable instance of a book at one branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCopy {
    pub id: CopyId,
    pub book: BookId,
    pub branch: BranchId,
    pub copy_number: u32,
    pub position: String,
    /// The checkout record presently governing this copy, if any.
    pub current: Option<RecordId>,
}

/// Which timestamp a reserve or borrow transition writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutKind {
    Reserve,
    Borrow,
}

impl fmt::Display for CheckoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserve => write!(f, "reserve"),
            Self::Borrow => write!(f, "borrow"),
        }
    }
}

/// One circulation event for one copy and one user.
///
/// Records are created by the first reserve or borrow of a copy, stamped in
/// place as the checkout progresses, and kept forever once returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    pub id: RecordId,
    pub user: UserId,
    pub copy: CopyId,
    pub branch: BranchId,
    pub book: BookId,
    pub reserved_at: Option<Timestamp>,
    pub borrowed_at: Option<Timestamp>,
    pub returned_at: Option<Timestamp>,
}

impl CheckoutRecord {
    /// A fresh record for `copy` carrying a single timestamp.
    pub fn open(user: UserId, copy: &BookCopy, kind: CheckoutKind, at: Timestamp) -> Self {
        let mut record = Self {
            id: RecordId::new(),
            user,
            copy: copy.id,
            branch: copy.branch.clone(),
            book: copy.book.clone(),
            reserved_at: None,
            borrowed_at: None,
            returned_at: None,
        };
        record.stamp(kind, at);
        record
    }

    pub fn stamp(&mut self, kind: CheckoutKind, at: Timestamp) {
        match kind {
            CheckoutKind::Reserve => self.reserved_at = Some(at),
            CheckoutKind::Borrow => self.borrowed_at = Some(at),
        }
    }

    /// Reserved and not yet borrowed.
    pub fn is_reservation(&self) -> bool {
        self.reserved_at.is_some() && self.borrowed_at.is_none()
    }

    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Whether reserve ≤ borrow ≤ return holds for the timestamps present.
    pub fn timestamps_monotonic(&self) -> bool {
        let stamps = [self.reserved_at, self.borrowed_at, self.returned_at];
        let present: Vec<Timestamp> = stamps.into_iter().flatten().collect();
        present.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Fine owed at `now` under `policy`.
    pub fn fine(&self, policy: &LoanPolicy, now: Timestamp) -> Result<Option<Money>, LedgerError> {
        policy.fine(self, now)
    }

    /// One-line summary of the three timestamps, `-` where absent.
    pub fn summary(&self) -> String {
        fn day(ts: Option<Timestamp>) -> String {
            ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".into())
        }
        format!(
            "reserved {} / borrowed {} / returned {}",
            day(self.reserved_at),
            day(self.borrowed_at),
            day(self.returned_at)
        )
    }
}
