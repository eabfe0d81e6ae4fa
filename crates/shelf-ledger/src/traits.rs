use shelf_types::{BookId, BranchId, CopyId, RecordId, Timestamp, UserId};

use crate::error::LedgerError;
use crate::records::{BookCopy, CheckoutKind, CheckoutRecord, NewCopy};

/// Write boundary for the checkout ledger.
///
/// Every method that touches a copy's current-record pointer takes the
/// pointer value the caller observed and fails with
/// [`LedgerError::StaleCurrentRecord`] if it has moved since. Record and
/// pointer changes of one call are applied together or not at all.
pub trait LedgerWriter: Send + Sync {
    /// Add a copy to the catalog.
    fn register_copy(&self, copy: NewCopy) -> Result<BookCopy, LedgerError>;

    /// Create a record carrying a single `kind` stamp and make it the copy's
    /// current record. The copy must currently point at `expected_current`.
    fn open_record(
        &self,
        copy: CopyId,
        expected_current: Option<RecordId>,
        user: &UserId,
        kind: CheckoutKind,
        at: Timestamp,
    ) -> Result<CheckoutRecord, LedgerError>;

    /// Stamp the copy's current record in place.
    fn stamp_record(
        &self,
        copy: CopyId,
        record: RecordId,
        kind: CheckoutKind,
        at: Timestamp,
    ) -> Result<CheckoutRecord, LedgerError>;

    /// Set the return stamp of the copy's current record and clear the
    /// copy's pointer. The record is kept as history.
    fn close_record(
        &self,
        copy: CopyId,
        record: RecordId,
        at: Timestamp,
    ) -> Result<CheckoutRecord, LedgerError>;

    /// Clear the copy's pointer if it still names `record`.
    ///
    /// Returns `Ok(false)` when the pointer had already moved.
    fn detach_current(&self, copy: CopyId, record: RecordId) -> Result<bool, LedgerError>;
}

/// Read boundary for catalog and history queries.
pub trait LedgerReader: Send + Sync {
    fn copy(&self, id: CopyId) -> Result<Option<BookCopy>, LedgerError>;

    /// All copies in registration order.
    fn copies(&self) -> Result<Vec<BookCopy>, LedgerError>;

    fn record(&self, id: RecordId) -> Result<Option<CheckoutRecord>, LedgerError>;

    /// All records in creation order.
    fn records(&self) -> Result<Vec<CheckoutRecord>, LedgerError>;

    fn records_for_user(&self, user: &UserId) -> Result<Vec<CheckoutRecord>, LedgerError>;

    fn records_for_copy(&self, copy: CopyId) -> Result<Vec<CheckoutRecord>, LedgerError>;

    fn record_count(&self) -> Result<u64, LedgerError>;

    /// The record the copy's pointer names, if any.
    fn current_record(&self, copy: CopyId) -> Result<Option<CheckoutRecord>, LedgerError> {
        let copy = self.copy(copy)?.ok_or(LedgerError::CopyNotFound(copy))?;
        match copy.current {
            Some(id) => self
                .record(id)?
                .ok_or(LedgerError::RecordNotFound(id))
                .map(Some),
            None => Ok(None),
        }
    }

    fn copies_in_branch(&self, branch: &BranchId) -> Result<Vec<BookCopy>, LedgerError> {
        Ok(self
            .copies()?
            .into_iter()
            .filter(|c| &c.branch == branch)
            .collect())
    }

    fn copies_of_book(&self, book: &BookId) -> Result<Vec<BookCopy>, LedgerError> {
        Ok(self
            .copies()?
            .into_iter()
            .filter(|c| &c.book == book)
            .collect())
    }

    fn records_for_branch(&self, branch: &BranchId) -> Result<Vec<CheckoutRecord>, LedgerError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| &r.branch == branch)
            .collect())
    }

    /// Distinct branches that hold at least one copy, sorted.
    fn branches(&self) -> Result<Vec<BranchId>, LedgerError> {
        let mut branches: Vec<BranchId> = self.copies()?.into_iter().map(|c| c.branch).collect();
        branches.sort();
        branches.dedup();
        Ok(branches)
    }
}
