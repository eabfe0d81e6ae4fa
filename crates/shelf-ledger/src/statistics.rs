use std::collections::BTreeMap;

use serde::Serialize;
use shelf_types::{BookId, BranchId, Money, Timestamp, UserId};

use crate::error::LedgerError;
use crate::policy::LoanPolicy;
use crate::records::CheckoutRecord;
use crate::traits::LedgerReader;

/// Number of borrows of one key (reader or book) at one branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BorrowCount<K> {
    pub branch: BranchId,
    pub key: K,
    pub borrows: u64,
}

/// Lateness summary of one branch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BranchLateness {
    pub branch: BranchId,
    /// Loans that ran at least one whole day past their due date.
    pub late_loans: u64,
    /// Mean whole days late over `late_loans`; zero when there are none.
    pub average_late_days: f64,
    /// `fine_per_day × average_late_days`, rounded to the cent.
    pub average_fine: Money,
}

/// A fine owed on one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FineLine {
    pub record: CheckoutRecord,
    pub late_days: i64,
    pub fine: Money,
}

/// Aggregations over the retained checkout history.
pub struct Statistics;

impl Statistics {
    /// Borrow counts per reader per branch, busiest first within a branch.
    pub fn borrows_by_user<R: LedgerReader>(
        reader: &R,
    ) -> Result<Vec<BorrowCount<UserId>>, LedgerError> {
        Ok(count_borrows(&reader.records()?, |r| r.user.clone()))
    }

    /// Borrow counts per book per branch, most popular first within a branch.
    pub fn borrows_by_book<R: LedgerReader>(
        reader: &R,
    ) -> Result<Vec<BorrowCount<BookId>>, LedgerError> {
        Ok(count_borrows(&reader.records()?, |r| r.book.clone()))
    }

    /// The `limit` readers with the most borrows at `branch`.
    pub fn top_borrowers<R: LedgerReader>(
        reader: &R,
        branch: &BranchId,
        limit: usize,
    ) -> Result<Vec<BorrowCount<UserId>>, LedgerError> {
        let records = reader.records_for_branch(branch)?;
        Ok(count_borrows(&records, |r| r.user.clone())
            .into_iter()
            .take(limit)
            .collect())
    }

    /// Average lateness per branch at `now`, for every branch with copies.
    pub fn lateness_by_branch<R: LedgerReader>(
        reader: &R,
        policy: &LoanPolicy,
        now: Timestamp,
    ) -> Result<Vec<BranchLateness>, LedgerError> {
        let mut late: BTreeMap<BranchId, Vec<i64>> = reader
            .branches()?
            .into_iter()
            .map(|b| (b, Vec::new()))
            .collect();

        for record in reader.records()? {
            if let Some(days) = policy.late_days(&record, now)?.filter(|d| *d > 0) {
                late.entry(record.branch.clone()).or_default().push(days);
            }
        }

        Ok(late
            .into_iter()
            .map(|(branch, days)| {
                let average_late_days = if days.is_empty() {
                    0.0
                } else {
                    days.iter().sum::<i64>() as f64 / days.len() as f64
                };
                let average_fine = Money::from_cents(
                    (policy.fine_per_day.cents() as f64 * average_late_days).round() as i64,
                );
                BranchLateness {
                    branch,
                    late_loans: days.len() as u64,
                    average_late_days,
                    average_fine,
                }
            })
            .collect())
    }

    /// Every record of `user` that carries a fine at `now`, oldest first.
    pub fn fines_for_user<R: LedgerReader>(
        reader: &R,
        policy: &LoanPolicy,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Vec<FineLine>, LedgerError> {
        let mut lines = Vec::new();
        for record in reader.records_for_user(user)? {
            let (Some(late_days), Some(fine)) =
                (policy.late_days(&record, now)?, policy.fine(&record, now)?)
            else {
                continue;
            };
            lines.push(FineLine {
                record,
                late_days,
                fine,
            });
        }
        Ok(lines)
    }
}

fn count_borrows<K: Ord + Clone>(
    records: &[CheckoutRecord],
    key: impl Fn(&CheckoutRecord) -> K,
) -> Vec<BorrowCount<K>> {
    let mut counts: BTreeMap<(BranchId, K), u64> = BTreeMap::new();
    for record in records.iter().filter(|r| r.borrowed_at.is_some()) {
        *counts.entry((record.branch.clone(), key(record))).or_default() += 1;
    }

    let mut rows: Vec<BorrowCount<K>> = counts
        .into_iter()
        .map(|((branch, key), borrows)| BorrowCount {
            branch,
            key,
            borrows,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.branch
            .cmp(&b.branch)
            .then(b.borrows.cmp(&a.borrows))
            .then(a.key.cmp(&b.key))
    });
    rows
}
