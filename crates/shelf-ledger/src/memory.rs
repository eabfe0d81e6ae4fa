use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use shelf_types::{BookId, BranchId, CopyId, RecordId, Timestamp, UserId};

use crate::error::LedgerError;
use crate::records::{BookCopy, CheckoutKind, CheckoutRecord, NewCopy, MAX_POSITION_LEN};
use crate::traits::{LedgerReader, LedgerWriter};

/// In-memory ledger for tests, local tools, and embedding.
///
/// One `RwLock` guards the whole catalog, so every writer call is applied
/// atomically with respect to every other call.
#[derive(Debug)]
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    copies: HashMap<CopyId, BookCopy>,
    copy_order: Vec<CopyId>,
    positions: HashMap<String, CopyId>,
    shelf_slots: HashSet<(BookId, BranchId, u32)>,
    records: HashMap<RecordId, CheckoutRecord>,
    record_order: Vec<RecordId>,
    by_user: HashMap<UserId, Vec<RecordId>>,
    by_copy: HashMap<CopyId, Vec<RecordId>>,
    /// Bumped by every write that changes the catalog or a record.
    revision: u64,
}

impl LedgerState {
    pub(crate) fn insert_copy(&mut self, copy: BookCopy) -> Result<(), LedgerError> {
        if copy.copy_number == 0 {
            return Err(LedgerError::InvalidCopy("copy number must be at least 1".into()));
        }
        if copy.position.is_empty() || copy.position.chars().count() > MAX_POSITION_LEN {
            return Err(LedgerError::InvalidCopy(format!(
                "shelf position {:?} must be 1 to {MAX_POSITION_LEN} characters",
                copy.position
            )));
        }
        if self.copies.contains_key(&copy.id) {
            return Err(LedgerError::DuplicateCopy(format!("copy id {}", copy.id)));
        }
        if self.positions.contains_key(&copy.position) {
            return Err(LedgerError::DuplicateCopy(format!(
                "shelf position {} is taken",
                copy.position
            )));
        }
        let slot = (copy.book.clone(), copy.branch.clone(), copy.copy_number);
        if self.shelf_slots.contains(&slot) {
            return Err(LedgerError::DuplicateCopy(format!(
                "copy #{} of {} already exists at branch {}",
                copy.copy_number, copy.book, copy.branch
            )));
        }

        self.shelf_slots.insert(slot);
        self.positions.insert(copy.position.clone(), copy.id);
        self.copy_order.push(copy.id);
        self.copies.insert(copy.id, copy);
        Ok(())
    }

    pub(crate) fn insert_record(&mut self, record: CheckoutRecord) {
        self.by_user
            .entry(record.user.clone())
            .or_default()
            .push(record.id);
        self.by_copy.entry(record.copy).or_default().push(record.id);
        self.record_order.push(record.id);
        self.records.insert(record.id, record);
    }

    pub(crate) fn copies_in_order(&self) -> Vec<BookCopy> {
        self.copy_order
            .iter()
            .filter_map(|id| self.copies.get(id))
            .cloned()
            .collect()
    }

    pub(crate) fn records_in_order(&self) -> Vec<CheckoutRecord> {
        self.record_order
            .iter()
            .filter_map(|id| self.records.get(id))
            .cloned()
            .collect()
    }

    /// The copy a stored record belongs to.
    pub(crate) fn record_copy(&self, record: RecordId) -> Option<CopyId> {
        self.records.get(&record).map(|r| r.copy)
    }

    pub(crate) fn set_current(&mut self, copy: CopyId, record: Option<RecordId>) {
        if let Some(c) = self.copies.get_mut(&copy) {
            c.current = record;
        }
    }

    /// Check the copy's pointer against what the caller observed.
    fn expect_current(
        &self,
        copy: CopyId,
        expected: Option<RecordId>,
    ) -> Result<&BookCopy, LedgerError> {
        let c = self.copies.get(&copy).ok_or(LedgerError::CopyNotFound(copy))?;
        if c.current != expected {
            return Err(LedgerError::StaleCurrentRecord {
                copy,
                expected,
                found: c.current,
            });
        }
        Ok(c)
    }

    fn collect_records(&self, ids: Option<&Vec<RecordId>>) -> Vec<CheckoutRecord> {
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| self.records.get(id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
        }
    }

    pub(crate) fn from_state(state: LedgerState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    /// Count of writes applied since this ledger was created or loaded.
    ///
    /// Callers that persist the ledger compare revisions to skip saving
    /// after a run that changed nothing.
    pub fn revision(&self) -> Result<u64, LedgerError> {
        Ok(self.read_state()?.revision)
    }

    pub(crate) fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::poisoned("read"))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::poisoned("write"))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerWriter for InMemoryLedger {
    fn register_copy(&self, copy: NewCopy) -> Result<BookCopy, LedgerError> {
        let mut state = self.write_state()?;
        let copy = BookCopy {
            id: CopyId::new(),
            book: copy.book,
            branch: copy.branch,
            copy_number: copy.copy_number,
            position: copy.position,
            current: None,
        };
        state.insert_copy(copy.clone())?;
        state.revision += 1;
        tracing::debug!(copy = %copy.id, position = %copy.position, "registered copy");
        Ok(copy)
    }

    fn open_record(
        &self,
        copy: CopyId,
        expected_current: Option<RecordId>,
        user: &UserId,
        kind: CheckoutKind,
        at: Timestamp,
    ) -> Result<CheckoutRecord, LedgerError> {
        let mut state = self.write_state()?;
        let target = state.expect_current(copy, expected_current)?;
        let record = CheckoutRecord::open(user.clone(), target, kind, at);

        state.insert_record(record.clone());
        state.set_current(copy, Some(record.id));
        state.revision += 1;
        tracing::debug!(%copy, record = %record.id, %user, %kind, "opened checkout record");
        Ok(record)
    }

    fn stamp_record(
        &self,
        copy: CopyId,
        record: RecordId,
        kind: CheckoutKind,
        at: Timestamp,
    ) -> Result<CheckoutRecord, LedgerError> {
        let mut state = self.write_state()?;
        state.expect_current(copy, Some(record))?;

        let mut updated = state
            .records
            .get(&record)
            .cloned()
            .ok_or(LedgerError::RecordNotFound(record))?;
        if updated.is_returned() {
            return Err(LedgerError::IntegrityViolation {
                reason: format!("current record {record} is already returned"),
            });
        }
        updated.stamp(kind, at);
        if !updated.timestamps_monotonic() {
            return Err(LedgerError::TimestampRegression {
                record,
                reason: format!("{kind} stamp {at} precedes an earlier stamp"),
            });
        }

        state.records.insert(record, updated.clone());
        state.revision += 1;
        tracing::debug!(%copy, %record, %kind, "stamped checkout record");
        Ok(updated)
    }

    fn close_record(
        &self,
        copy: CopyId,
        record: RecordId,
        at: Timestamp,
    ) -> Result<CheckoutRecord, LedgerError> {
        let mut state = self.write_state()?;
        state.expect_current(copy, Some(record))?;

        let mut updated = state
            .records
            .get(&record)
            .cloned()
            .ok_or(LedgerError::RecordNotFound(record))?;
        if updated.borrowed_at.is_none() {
            return Err(LedgerError::IntegrityViolation {
                reason: format!("record {record} was never borrowed"),
            });
        }
        updated.returned_at = Some(at);
        if !updated.timestamps_monotonic() {
            return Err(LedgerError::TimestampRegression {
                record,
                reason: format!("return stamp {at} precedes the borrow stamp"),
            });
        }

        state.records.insert(record, updated.clone());
        state.set_current(copy, None);
        state.revision += 1;
        tracing::debug!(%copy, %record, "closed checkout record");
        Ok(updated)
    }

    fn detach_current(&self, copy: CopyId, record: RecordId) -> Result<bool, LedgerError> {
        let mut state = self.write_state()?;
        let c = state.copies.get(&copy).ok_or(LedgerError::CopyNotFound(copy))?;
        if c.current != Some(record) {
            return Ok(false);
        }
        state.set_current(copy, None);
        state.revision += 1;
        tracing::debug!(%copy, %record, "detached lapsed checkout record");
        Ok(true)
    }
}

impl LedgerReader for InMemoryLedger {
    fn copy(&self, id: CopyId) -> Result<Option<BookCopy>, LedgerError> {
        Ok(self.read_state()?.copies.get(&id).cloned())
    }

    fn copies(&self) -> Result<Vec<BookCopy>, LedgerError> {
        Ok(self.read_state()?.copies_in_order())
    }

    fn record(&self, id: RecordId) -> Result<Option<CheckoutRecord>, LedgerError> {
        Ok(self.read_state()?.records.get(&id).cloned())
    }

    fn records(&self) -> Result<Vec<CheckoutRecord>, LedgerError> {
        Ok(self.read_state()?.records_in_order())
    }

    fn records_for_user(&self, user: &UserId) -> Result<Vec<CheckoutRecord>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.collect_records(state.by_user.get(user)))
    }

    fn records_for_copy(&self, copy: CopyId) -> Result<Vec<CheckoutRecord>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.collect_records(state.by_copy.get(&copy)))
    }

    fn record_count(&self) -> Result<u64, LedgerError> {
        Ok(self.read_state()?.records.len() as u64)
    }

    fn current_record(&self, copy: CopyId) -> Result<Option<CheckoutRecord>, LedgerError> {
        let state = self.read_state()?;
        let c = state.copies.get(&copy).ok_or(LedgerError::CopyNotFound(copy))?;
        match c.current {
            Some(id) => state
                .records
                .get(&id)
                .cloned()
                .ok_or(LedgerError::RecordNotFound(id))
                .map(Some),
            None => Ok(None),
        }
    }
}
