//! Time rules that govern a checkout record: when a record stops governing
//! its copy, when a reservation lapses, and what a late loan costs.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use shelf_types::{Money, Timestamp};

use crate::error::LedgerError;
use crate::records::CheckoutRecord;

/// Longest loan period a policy may configure (ten years).
pub const MAX_LOAN_PERIOD_DAYS: i64 = 3650;

/// Highest daily fine a policy may configure.
pub const MAX_FINE_PER_DAY: Money = Money::from_cents(100_000);

/// Loan period, fine rate, and reservation cutoff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanPolicy {
    /// Days a loan may run before fines accrue.
    pub loan_period_days: i64,
    /// Fine charged per whole day past the due date.
    #[serde(rename = "fine_per_day_cents")]
    pub fine_per_day: Money,
    /// Local time of day at which an unconverted reservation lapses.
    pub reservation_cutoff: NaiveTime,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: 20,
            fine_per_day: Money::from_cents(20),
            reservation_cutoff: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }
}

impl LoanPolicy {
    /// The instant a reservation made at `reserved_at` lapses.
    ///
    /// The cutoff is taken on the reservation's own calendar day in its own
    /// offset. A reservation made at or after the cutoff lapses at the cutoff
    /// on the following day.
    pub fn reservation_expiry(&self, reserved_at: Timestamp) -> Timestamp {
        let offset = *reserved_at.offset();
        let mut local = reserved_at.date_naive().and_time(self.reservation_cutoff);
        if reserved_at.time() >= self.reservation_cutoff {
            local += Duration::days(1);
        }
        let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
        Timestamp::from_naive_utc_and_offset(utc, offset)
    }

    /// Whether `record` still governs its copy at `now`.
    ///
    /// Rules, first match wins: returned at or before `now` → closed;
    /// borrowed at or before `now` → active loan; reserved → live until the
    /// reservation expiry; no dates → not current.
    pub fn is_current(&self, record: &CheckoutRecord, now: Timestamp) -> bool {
        if record.returned_at.is_some_and(|returned| returned <= now) {
            return false;
        }
        if record.borrowed_at.is_some_and(|borrowed| borrowed <= now) {
            return true;
        }
        match record.reserved_at {
            Some(reserved) => now <= self.reservation_expiry(reserved),
            None => false,
        }
    }

    /// Whether `record` stopped governing its copy at or before `now`.
    ///
    /// Only a return stamped at or before `now`, or an unconverted
    /// reservation stamped at or before `now` whose expiry has passed,
    /// closes a record. A record stamped after `now` is not closed even
    /// though it is not yet current.
    pub fn has_lapsed(&self, record: &CheckoutRecord, now: Timestamp) -> bool {
        if let Some(returned) = record.returned_at {
            return returned <= now;
        }
        match record.reserved_at {
            Some(reserved) if record.is_reservation() => {
                reserved <= now && self.reservation_expiry(reserved) < now
            }
            _ => false,
        }
    }

    /// Check the policy against its bounds.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if !(0..=MAX_LOAN_PERIOD_DAYS).contains(&self.loan_period_days) {
            return Err(LedgerError::InvalidPolicy(format!(
                "loan_period_days must be between 0 and {MAX_LOAN_PERIOD_DAYS}, got {}",
                self.loan_period_days
            )));
        }
        if self.fine_per_day < Money::ZERO || self.fine_per_day > MAX_FINE_PER_DAY {
            return Err(LedgerError::InvalidPolicy(format!(
                "fine_per_day_cents must be between 0 and {}, got {}",
                MAX_FINE_PER_DAY.cents(),
                self.fine_per_day.cents()
            )));
        }
        Ok(())
    }

    /// Due date of a borrowed record; `None` when it was never borrowed.
    pub fn due_by(&self, record: &CheckoutRecord) -> Result<Option<Timestamp>, LedgerError> {
        let Some(borrowed) = record.borrowed_at else {
            return Ok(None);
        };
        Duration::try_days(self.loan_period_days)
            .and_then(|period| borrowed.checked_add_signed(period))
            .map(Some)
            .ok_or_else(|| {
                LedgerError::InvalidPolicy(format!(
                    "a loan of {} days from {borrowed} is out of range",
                    self.loan_period_days
                ))
            })
    }

    /// Whole days past the due date, measured to the return date if the
    /// record was returned by `now`, otherwise to `now`.
    ///
    /// `None` when the record was never borrowed or is not past due.
    pub fn late_days(
        &self,
        record: &CheckoutRecord,
        now: Timestamp,
    ) -> Result<Option<i64>, LedgerError> {
        let Some(due_by) = self.due_by(record)? else {
            return Ok(None);
        };
        let end = match record.returned_at {
            Some(returned) if returned <= now => returned,
            _ => now,
        };
        Ok((end > due_by).then(|| (end - due_by).num_days()))
    }

    /// Fine owed on `record` at `now`; `None` when no fine applies.
    ///
    /// A loan less than a full day overdue owes `0.00`, not `None`.
    pub fn fine(
        &self,
        record: &CheckoutRecord,
        now: Timestamp,
    ) -> Result<Option<Money>, LedgerError> {
        let Some(days) = self.late_days(record, now)? else {
            return Ok(None);
        };
        self.fine_per_day.checked_mul(days).map(Some).ok_or_else(|| {
            LedgerError::InvalidPolicy(format!(
                "fine of {} per day over {days} days overflows",
                self.fine_per_day
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BookCopy, CheckoutKind};
    use proptest::prelude::*;
    use shelf_types::{parse_timestamp, BookId, BranchId, CopyId, UserId};

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    fn record(kind: CheckoutKind, at: Timestamp) -> CheckoutRecord {
        let copy = BookCopy {
            id: CopyId::new(),
            book: BookId::isbn("9780134685991").unwrap(),
            branch: BranchId::new("central").unwrap(),
            copy_number: 1,
            position: "A1".into(),
            current: None,
        };
        CheckoutRecord::open(UserId::new("ana").unwrap(), &copy, kind, at)
    }

    #[test]
    fn reservation_in_the_morning_expires_same_evening() {
        let policy = LoanPolicy::default();
        let r = record(CheckoutKind::Reserve, ts("2024-03-01T10:00:00+01:00"));

        assert_eq!(
            policy.reservation_expiry(r.reserved_at.unwrap()),
            ts("2024-03-01T18:00:00+01:00")
        );
        assert!(policy.is_current(&r, ts("2024-03-01T18:00:00+01:00")));
        assert!(!policy.is_current(&r, ts("2024-03-01T18:00:01+01:00")));
    }

    #[test]
    fn reservation_after_cutoff_rolls_to_next_day() {
        let policy = LoanPolicy::default();
        let r = record(CheckoutKind::Reserve, ts("2024-03-01T19:00:00-05:00"));

        assert!(policy.is_current(&r, ts("2024-03-02T12:00:00-05:00")));
        assert!(policy.is_current(&r, ts("2024-03-02T18:00:00-05:00")));
        assert!(!policy.is_current(&r, ts("2024-03-02T18:00:01-05:00")));
    }

    #[test]
    fn reservation_exactly_at_cutoff_rolls_over() {
        let policy = LoanPolicy::default();
        let expiry = policy.reservation_expiry(ts("2024-03-01T18:00:00Z"));
        assert_eq!(expiry, ts("2024-03-02T18:00:00Z"));
    }

    #[test]
    fn expiry_uses_the_reservation_offset() {
        let policy = LoanPolicy::default();
        // 23:30 UTC is 08:30 the next day in +09:00.
        let r = record(CheckoutKind::Reserve, ts("2024-03-01T08:30:00+09:00"));
        assert!(policy.is_current(&r, ts("2024-03-01T08:59:59Z")));
        assert!(!policy.is_current(&r, ts("2024-03-01T09:00:01Z")));
    }

    #[test]
    fn active_loan_is_current() {
        let policy = LoanPolicy::default();
        let r = record(CheckoutKind::Borrow, ts("2024-03-01T10:00:00Z"));
        assert!(policy.is_current(&r, ts("2024-03-01T10:00:00Z")));
        assert!(policy.is_current(&r, ts("2024-06-01T10:00:00Z")));
    }

    #[test]
    fn borrow_in_the_future_falls_through_to_reservation() {
        let policy = LoanPolicy::default();
        let mut r = record(CheckoutKind::Borrow, ts("2024-03-05T10:00:00Z"));
        assert!(!policy.is_current(&r, ts("2024-03-01T10:00:00Z")));

        r.reserved_at = Some(ts("2024-03-01T09:00:00Z"));
        assert!(policy.is_current(&r, ts("2024-03-01T10:00:00Z")));
    }

    #[test]
    fn returned_record_is_not_current() {
        let policy = LoanPolicy::default();
        let mut r = record(CheckoutKind::Borrow, ts("2024-03-01T10:00:00Z"));
        r.returned_at = Some(ts("2024-03-02T10:00:00Z"));

        assert!(policy.is_current(&r, ts("2024-03-01T12:00:00Z")));
        assert!(!policy.is_current(&r, ts("2024-03-02T10:00:00Z")));
    }

    #[test]
    fn record_without_dates_is_not_current() {
        let policy = LoanPolicy::default();
        let mut r = record(CheckoutKind::Reserve, ts("2024-03-01T10:00:00Z"));
        r.reserved_at = None;
        assert!(!policy.is_current(&r, ts("2024-03-01T10:00:00Z")));
    }

    #[test]
    fn fine_after_twenty_five_days() {
        let policy = LoanPolicy::default();
        let day0 = ts("2024-01-01T12:00:00Z");
        let r = record(CheckoutKind::Borrow, day0);

        let fine = policy.fine(&r, day0 + Duration::days(25)).unwrap().unwrap();
        assert_eq!(fine, Money::from_cents(100));
        assert_eq!(fine.to_string(), "1.00");
    }

    #[test]
    fn fine_is_zero_within_the_first_late_day() {
        let policy = LoanPolicy::default();
        let day0 = ts("2024-01-01T12:00:00Z");
        let r = record(CheckoutKind::Borrow, day0);

        assert_eq!(policy.fine(&r, day0 + Duration::days(20)).unwrap(), None);
        assert_eq!(
            policy.fine(&r, day0 + Duration::days(20) + Duration::hours(5)).unwrap(),
            Some(Money::ZERO)
        );
    }

    #[test]
    fn returned_on_time_never_accrues() {
        let policy = LoanPolicy::default();
        let day0 = ts("2024-01-01T12:00:00Z");
        let mut r = record(CheckoutKind::Borrow, day0);
        r.returned_at = Some(day0 + Duration::days(15));

        for later in [16, 25, 100, 1000] {
            assert_eq!(policy.fine(&r, day0 + Duration::days(later)).unwrap(), None);
        }
    }

    #[test]
    fn late_return_freezes_the_fine() {
        let policy = LoanPolicy::default();
        let day0 = ts("2024-01-01T12:00:00Z");
        let mut r = record(CheckoutKind::Borrow, day0);
        r.returned_at = Some(day0 + Duration::days(23));

        assert_eq!(
            policy.fine(&r, day0 + Duration::days(90)).unwrap(),
            Some(Money::from_cents(60))
        );
    }

    #[test]
    fn reservation_never_fines() {
        let policy = LoanPolicy::default();
        let r = record(CheckoutKind::Reserve, ts("2024-01-01T12:00:00Z"));
        assert_eq!(policy.fine(&r, ts("2025-01-01T12:00:00Z")).unwrap(), None);
    }

    #[test]
    fn default_policy_is_within_bounds() {
        LoanPolicy::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_policy_is_rejected() {
        let long = LoanPolicy {
            loan_period_days: i64::MAX,
            ..LoanPolicy::default()
        };
        assert!(matches!(long.validate(), Err(LedgerError::InvalidPolicy(_))));

        let negative = LoanPolicy {
            loan_period_days: -1,
            ..LoanPolicy::default()
        };
        assert!(matches!(negative.validate(), Err(LedgerError::InvalidPolicy(_))));

        let steep = LoanPolicy {
            fine_per_day: Money::from_cents(MAX_FINE_PER_DAY.cents() + 1),
            ..LoanPolicy::default()
        };
        assert!(matches!(steep.validate(), Err(LedgerError::InvalidPolicy(_))));
    }

    #[test]
    fn unchecked_policy_reports_overflow_instead_of_panicking() {
        let day0 = ts("2024-01-01T12:00:00Z");
        let r = record(CheckoutKind::Borrow, day0);

        let long = LoanPolicy {
            loan_period_days: i64::MAX,
            ..LoanPolicy::default()
        };
        assert!(matches!(long.due_by(&r), Err(LedgerError::InvalidPolicy(_))));
        assert!(matches!(
            long.fine(&r, day0 + Duration::days(30)),
            Err(LedgerError::InvalidPolicy(_))
        ));

        let steep = LoanPolicy {
            fine_per_day: Money::from_cents(i64::MAX),
            ..LoanPolicy::default()
        };
        assert!(matches!(
            steep.fine(&r, day0 + Duration::days(30)),
            Err(LedgerError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn only_closed_records_lapse() {
        let policy = LoanPolicy::default();
        let borrowed = ts("2024-03-01T10:00:05Z");
        let mut loan = record(CheckoutKind::Borrow, borrowed);

        // Seen from before the borrow stamp: not current, yet not closed.
        let earlier = ts("2024-03-01T10:00:00Z");
        assert!(!policy.is_current(&loan, earlier));
        assert!(!policy.has_lapsed(&loan, earlier));
        assert!(!policy.has_lapsed(&loan, borrowed + Duration::days(400)));

        loan.returned_at = Some(borrowed + Duration::days(2));
        assert!(!policy.has_lapsed(&loan, borrowed + Duration::days(1)));
        assert!(policy.has_lapsed(&loan, borrowed + Duration::days(2)));

        let hold = record(CheckoutKind::Reserve, ts("2024-03-01T10:00:00Z"));
        assert!(!policy.has_lapsed(&hold, ts("2024-03-01T09:00:00Z")));
        assert!(!policy.has_lapsed(&hold, ts("2024-03-01T18:00:00Z")));
        assert!(policy.has_lapsed(&hold, ts("2024-03-01T18:00:01Z")));
    }

    #[test]
    fn stampless_record_never_lapses() {
        let policy = LoanPolicy::default();
        let mut r = record(CheckoutKind::Reserve, ts("2024-03-01T10:00:00Z"));
        r.reserved_at = None;
        assert!(!policy.has_lapsed(&r, ts("2024-03-09T10:00:00Z")));
    }

    proptest! {
        #[test]
        fn returned_records_stay_closed(
            borrow_offset in 0i64..10_000,
            return_after in 0i64..10_000,
            query_after in 0i64..100_000,
        ) {
            let policy = LoanPolicy::default();
            let base = ts("2024-01-01T00:00:00Z");
            let mut r = record(CheckoutKind::Borrow, base + Duration::minutes(borrow_offset));
            r.reserved_at = Some(base);
            let returned = base + Duration::minutes(borrow_offset + return_after);
            r.returned_at = Some(returned);

            prop_assert!(!policy.is_current(&r, returned + Duration::minutes(query_after)));
        }

        #[test]
        fn fine_grows_with_whole_days(late_minutes in 0i64..200_000) {
            let policy = LoanPolicy::default();
            let day0 = ts("2024-01-01T00:00:00Z");
            let r = record(CheckoutKind::Borrow, day0);
            let now = day0 + Duration::days(20) + Duration::minutes(late_minutes);

            let fine = policy.fine(&r, now).unwrap();
            if late_minutes == 0 {
                prop_assert_eq!(fine, None);
            } else {
                let whole_days = late_minutes / (24 * 60);
                prop_assert_eq!(fine, Some(Money::from_cents(20 * whole_days)));
            }
        }
    }
}
