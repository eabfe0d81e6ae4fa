use std::collections::{HashMap, HashSet};

use serde::Serialize;
use shelf_types::{CopyId, RecordId};

use crate::error::LedgerError;
use crate::records::CheckoutRecord;
use crate::traits::LedgerReader;

/// Result of a full ledger validation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub copy_count: u64,
    pub record_count: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific inconsistency detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub copy: Option<CopyId>,
    pub record: Option<RecordId>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    /// Reserve, borrow, and return stamps are out of order.
    NonMonotonicTimestamps,
    /// A record carries no timestamp at all.
    EmptyRecord,
    /// A copy's pointer names a record the ledger does not hold.
    DanglingPointer,
    /// A copy's pointer names a record belonging to another copy.
    ForeignPointer,
    /// A copy's pointer names a returned record.
    ReturnedRecordIsCurrent,
    /// A record refers to a copy that is not in the catalog.
    UnknownCopy,
    /// A borrowed, unreturned record that no copy points at.
    OrphanedLoan,
}

/// Whole-ledger consistency checker.
pub struct LedgerValidator;

impl LedgerValidator {
    pub fn validate<R: LedgerReader>(reader: &R) -> Result<ValidationReport, LedgerError> {
        let copies = reader.copies()?;
        let records = reader.records()?;
        let mut violations = Vec::new();

        let by_id: HashMap<RecordId, &CheckoutRecord> =
            records.iter().map(|r| (r.id, r)).collect();
        let known_copies: HashSet<CopyId> = copies.iter().map(|c| c.id).collect();
        let mut pointed_at = HashSet::new();

        for copy in &copies {
            let Some(current) = copy.current else {
                continue;
            };
            pointed_at.insert(current);

            let Some(record) = by_id.get(&current) else {
                violations.push(Violation {
                    copy: Some(copy.id),
                    record: Some(current),
                    kind: ViolationKind::DanglingPointer,
                    description: format!("copy {} points at unknown record", copy.position),
                });
                continue;
            };

            if record.copy != copy.id {
                violations.push(Violation {
                    copy: Some(copy.id),
                    record: Some(current),
                    kind: ViolationKind::ForeignPointer,
                    description: format!(
                        "copy {} points at a record of copy {}",
                        copy.position,
                        record.copy.short_id()
                    ),
                });
            }

            if record.is_returned() {
                violations.push(Violation {
                    copy: Some(copy.id),
                    record: Some(current),
                    kind: ViolationKind::ReturnedRecordIsCurrent,
                    description: format!("copy {} still points at a returned record", copy.position),
                });
            }
        }

        for record in &records {
            if !known_copies.contains(&record.copy) {
                violations.push(Violation {
                    copy: Some(record.copy),
                    record: Some(record.id),
                    kind: ViolationKind::UnknownCopy,
                    description: "record refers to a copy missing from the catalog".into(),
                });
            }

            if record.reserved_at.is_none()
                && record.borrowed_at.is_none()
                && record.returned_at.is_none()
            {
                violations.push(Violation {
                    copy: Some(record.copy),
                    record: Some(record.id),
                    kind: ViolationKind::EmptyRecord,
                    description: "record has no timestamps".into(),
                });
            }

            if !record.timestamps_monotonic() {
                violations.push(Violation {
                    copy: Some(record.copy),
                    record: Some(record.id),
                    kind: ViolationKind::NonMonotonicTimestamps,
                    description: record.summary(),
                });
            }

            if record.borrowed_at.is_some()
                && !record.is_returned()
                && !pointed_at.contains(&record.id)
            {
                violations.push(Violation {
                    copy: Some(record.copy),
                    record: Some(record.id),
                    kind: ViolationKind::OrphanedLoan,
                    description: format!("loan to {} was detached without a return", record.user),
                });
            }
        }

        Ok(ValidationReport {
            copy_count: copies.len() as u64,
            record_count: records.len() as u64,
            violations,
        })
    }
}
