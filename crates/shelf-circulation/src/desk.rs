use std::sync::Arc;

use shelf_ledger::{
    BookCopy, CheckoutKind, CheckoutRecord, LedgerError, LedgerReader, LedgerWriter, NewCopy,
};
use shelf_types::{CopyId, Money, RecordId, Timestamp, UserId};

use crate::config::CirculationConfig;
use crate::error::{CirculationError, CirculationResult};
use crate::locks::LockTable;
use crate::state::{Assessment, CopyState, CopyStatus};

// ---------------------------------------------------------------------------
// CirculationDesk
// ---------------------------------------------------------------------------

/// The only path by which copies change hands.
///
/// Queries resolve a copy's status for one reader at one instant. Transitions
/// (borrow, reserve, return) lock the copy and the reader, re-check
/// availability, then apply a single ledger write. Several desks may share
/// one ledger; the ledger's compare-and-set on the current-record pointer
/// keeps them from both taking the same copy.
pub struct CirculationDesk<L> {
    ledger: Arc<L>,
    config: CirculationConfig,
    locks: LockTable,
}

impl<L: LedgerReader + LedgerWriter> CirculationDesk<L> {
    pub fn new(ledger: Arc<L>, config: CirculationConfig) -> Self {
        Self {
            ledger,
            config,
            locks: LockTable::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &CirculationConfig {
        &self.config
    }

    fn copy_state(&self) -> CopyState<'_> {
        CopyState::new(&self.config.loan)
    }

    /// Add a copy to the catalog.
    pub fn register_copy(&self, copy: NewCopy) -> CirculationResult<BookCopy> {
        let copy = self.ledger.register_copy(copy)?;
        tracing::info!(
            copy = %copy.id,
            book = %copy.book,
            branch = %copy.branch,
            position = %copy.position,
            "copy registered"
        );
        Ok(copy)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Assess the copy's current record, detaching it if it has lapsed.
    fn settle(&self, copy: CopyId, user: &UserId, now: Timestamp) -> CirculationResult<Assessment> {
        let current = self.ledger.current_record(copy)?;
        let assessment = self.copy_state().assess(current, user, now);
        if let Assessment::Lapsed(record) = &assessment {
            if self.ledger.detach_current(copy, record.id)? {
                tracing::debug!(%copy, record = %record.id, "lapsed record detached");
            }
        }
        Ok(assessment)
    }

    /// Whether `user` may borrow or reserve `copy` at `now`.
    pub fn is_available(
        &self,
        copy: CopyId,
        user: &UserId,
        now: Timestamp,
    ) -> CirculationResult<bool> {
        Ok(self.settle(copy, user, now)?.is_available())
    }

    pub fn status(
        &self,
        copy: CopyId,
        user: &UserId,
        now: Timestamp,
    ) -> CirculationResult<CopyStatus> {
        let assessment = self.settle(copy, user, now)?;
        let status = self.copy_state().status(&assessment, user)?;
        tracing::debug!(%copy, %user, %status, "status resolved");
        Ok(status)
    }

    /// Every copy in the catalog with its status for `user`.
    pub fn catalog_status(
        &self,
        user: &UserId,
        now: Timestamp,
    ) -> CirculationResult<Vec<(BookCopy, CopyStatus)>> {
        let mut listing = Vec::new();
        for copy in self.ledger.copies()? {
            let status = self.status(copy.id, user, now)?;
            listing.push((copy, status));
        }
        Ok(listing)
    }

    /// Records of `user` that are current at `now`.
    pub fn current_records(
        &self,
        user: &UserId,
        now: Timestamp,
    ) -> CirculationResult<Vec<CheckoutRecord>> {
        let state = self.copy_state();
        Ok(self
            .ledger
            .records_for_user(user)?
            .into_iter()
            .filter(|record| state.is_current(record, now))
            .collect())
    }

    /// Every record ever made against `copy`, oldest first.
    pub fn history(&self, copy: CopyId) -> CirculationResult<Vec<CheckoutRecord>> {
        if self.ledger.copy(copy)?.is_none() {
            return Err(CirculationError::CopyNotFound(copy));
        }
        Ok(self.ledger.records_for_copy(copy)?)
    }

    /// Fine owed on `record` at `now`.
    pub fn fine(&self, record: RecordId, now: Timestamp) -> CirculationResult<Option<Money>> {
        let record = self
            .ledger
            .record(record)?
            .ok_or(CirculationError::RecordNotFound(record))?;
        Ok(record.fine(&self.config.loan, now)?)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Borrow `copy` for `user`, converting their own live reservation if
    /// they hold one.
    pub fn borrow(
        &self,
        copy: CopyId,
        user: &UserId,
        now: Timestamp,
    ) -> CirculationResult<CheckoutRecord> {
        self.hold(copy, user, CheckoutKind::Borrow, now)
    }

    /// Reserve `copy` for `user`, refreshing their own live reservation if
    /// they hold one.
    pub fn reserve(
        &self,
        copy: CopyId,
        user: &UserId,
        now: Timestamp,
    ) -> CirculationResult<CheckoutRecord> {
        self.hold(copy, user, CheckoutKind::Reserve, now)
    }

    fn hold(
        &self,
        copy: CopyId,
        user: &UserId,
        kind: CheckoutKind,
        now: Timestamp,
    ) -> CirculationResult<CheckoutRecord> {
        let _guard = self.locks.acquire(user, copy)?;

        let record = match self.settle(copy, user, now)? {
            Assessment::Held(blocking) => {
                tracing::warn!(%copy, %user, %kind, holder = %blocking.user, "copy not available");
                return Err(CirculationError::NotAvailable {
                    copy,
                    user: user.clone(),
                });
            }
            Assessment::OwnReservation(own) => self
                .ledger
                .stamp_record(copy, own.id, kind, now)
                .map_err(|e| lost_race(e, copy, user))?,
            Assessment::Vacant | Assessment::Lapsed(_) => {
                self.check_limit(user, now)?;
                self.ledger
                    .open_record(copy, None, user, kind, now)
                    .map_err(|e| lost_race(e, copy, user))?
            }
        };

        tracing::info!(%copy, %user, %kind, record = %record.id, "checkout committed");
        Ok(record)
    }

    fn check_limit(&self, user: &UserId, now: Timestamp) -> CirculationResult<()> {
        let held = self.current_records(user, now)?.len();
        let limit = self.config.max_current_checkouts;
        if held >= limit {
            tracing::warn!(%user, held, limit, "checkout limit reached");
            return Err(CirculationError::TooManyCheckouts {
                user: user.clone(),
                held,
                limit,
            });
        }
        Ok(())
    }

    /// Return a borrowed copy. The record is kept as history.
    ///
    /// Any reader may hand a borrowed copy back; a copy that is only
    /// reserved, or not held at all, fails with `NotBorrowed`.
    pub fn return_copy(
        &self,
        copy: CopyId,
        user: &UserId,
        now: Timestamp,
    ) -> CirculationResult<CheckoutRecord> {
        let _guard = self.locks.acquire(user, copy)?;

        let assessment = self.settle(copy, user, now)?;
        let loan = match assessment.governing() {
            Some(record) if record.borrowed_at.is_some() => record.id,
            _ => {
                tracing::warn!(%copy, %user, "return of a copy that is not on loan");
                return Err(CirculationError::NotBorrowed { copy });
            }
        };

        let record = self
            .ledger
            .close_record(copy, loan, now)
            .map_err(|e| match e {
                LedgerError::StaleCurrentRecord { .. } => CirculationError::NotBorrowed { copy },
                other => other.into(),
            })?;

        tracing::info!(%copy, %user, borrower = %record.user, record = %record.id, "copy returned");
        Ok(record)
    }
}

/// A pointer that moved under us means another desk took the copy first.
fn lost_race(error: LedgerError, copy: CopyId, user: &UserId) -> CirculationError {
    match error {
        LedgerError::StaleCurrentRecord { .. } => {
            tracing::warn!(%copy, %user, "copy taken by a concurrent transition");
            CirculationError::NotAvailable {
                copy,
                user: user.clone(),
            }
        }
        other => other.into(),
    }
}
