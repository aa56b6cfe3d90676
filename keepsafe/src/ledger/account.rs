//! # Account Records
//!
//! An [`Account`] is the unit of custody and inactivity tracking: a
//! withdrawable balance, a yield-receipt sub-balance, the fallback
//! configuration, and the proof-of-life timestamp. The record is exclusively
//! owned by the [`Ledger`](super::Ledger) — nothing else ever holds a
//! mutable reference to it, so the invariants below are enforced in exactly
//! one place.
//!
//! ## Invariants
//!
//! - `balance` never goes negative (it's a `u64`) and every credit is
//!   overflow-checked.
//! - `balance` decreases only through [`debit`](Account::debit) (withdrawal,
//!   claim, or invest) and increases only through [`credit`](Account::credit)
//!   (deposit or yield redemption).
//! - `yield_receipt_balance` increases only via invest, decreases only via
//!   divest.
//! - `fallback_period`, once set, is always within the policy bounds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{max_fallback_period, min_fallback_period};
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A zero amount was supplied where a positive amount is required.
    #[error("zero-amount operations are not permitted")]
    InvalidAmount,

    /// A debit or claim exceeds the account's recorded balance.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The current withdrawable balance.
        available: u64,
        /// The amount that was requested.
        requested: u64,
    },

    /// Arithmetic overflow during a credit operation.
    ///
    /// If you're hitting this, someone is trying to custody more than
    /// 18.4 quintillion units in one account. That's either a bug or an
    /// attack.
    #[error("balance overflow: current {current}, credit {credit}")]
    BalanceOverflow {
        /// The balance before the failed credit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },

    /// A divest exceeds the account's yield-receipt balance.
    #[error("insufficient yield receipts: held {held}, requested {requested}")]
    InsufficientReceipts {
        /// Receipt units currently held.
        held: u64,
        /// The amount that was requested.
        requested: u64,
    },

    /// Arithmetic overflow on the yield-receipt sub-balance.
    #[error("yield receipt overflow: current {current}, credit {credit}")]
    ReceiptOverflow {
        /// The receipt balance before the failed credit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },

    /// A null or malformed fallback recipient, or an attempt to set one's
    /// own address as the fallback (clear the field instead — resolution to
    /// the owner lives in one place, at claim time).
    #[error("invalid fallback recipient: {reason}")]
    InvalidRecipient {
        /// Why the recipient was rejected.
        reason: String,
    },

    /// The requested fallback period is below the policy minimum.
    #[error("fallback period too short: {requested_secs}s < minimum {min_secs}s")]
    PeriodTooShort {
        /// The requested period in whole seconds.
        requested_secs: i64,
        /// The policy minimum in whole seconds.
        min_secs: i64,
    },

    /// The requested fallback period is above the policy maximum.
    #[error("fallback period too long: {requested_secs}s > maximum {max_secs}s")]
    PeriodTooLong {
        /// The requested period in whole seconds.
        requested_secs: i64,
        /// The policy maximum in whole seconds.
        max_secs: i64,
    },
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The per-account custody record.
///
/// Fields come into existence implicitly on the first deposit or
/// configuration call (lazy creation, handled by the ledger). There is no
/// deletion: a balance may return to zero but the record — and its fallback
/// configuration and activity timestamp — persists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    /// Withdrawable custodied value, in smallest units.
    balance: u64,

    /// Yield-venue receipt units currently held for this account. Receipt
    /// units are opaque — their exchange rate back into value is the venue's
    /// business, not ours.
    yield_receipt_balance: u64,

    /// The identity entitled to receive funds once the account is
    /// releasable. `None` means "resolve to the owner at claim time".
    fallback_recipient: Option<Address>,

    /// Required inactivity before release is authorized. `None` means the
    /// dead-man's-switch is not enabled for this account.
    #[serde(with = "period_secs")]
    fallback_period: Option<Duration>,

    /// Timestamp of the most recent qualifying activity. `None` until the
    /// first proof of life.
    last_activity_at: Option<DateTime<Utc>>,

    /// When this record was lazily created (from the operation clock).
    created_at: DateTime<Utc>,
}

impl Account {
    /// Creates an all-zero account record, stamped with the operation clock.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            balance: 0,
            yield_receipt_balance: 0,
            fallback_recipient: None,
            fallback_period: None,
            last_activity_at: None,
            created_at,
        }
    }

    /// The withdrawable balance.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// The yield-receipt sub-balance.
    pub fn yield_receipt_balance(&self) -> u64 {
        self.yield_receipt_balance
    }

    /// The configured fallback recipient, if any.
    pub fn fallback_recipient(&self) -> Option<&Address> {
        self.fallback_recipient.as_ref()
    }

    /// The configured fallback period, if the switch is enabled.
    pub fn fallback_period(&self) -> Option<Duration> {
        self.fallback_period
    }

    /// The most recent proof-of-life timestamp.
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_activity_at
    }

    /// When this record was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // -----------------------------------------------------------------------
    // Balance Mutation
    // -----------------------------------------------------------------------

    /// Verifies that a credit of `amount` would succeed, without applying it.
    ///
    /// The facade calls this *before* pulling value from the custodian so
    /// that a doomed credit never leaves pulled funds stranded.
    pub fn check_credit(&self, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                current: self.balance,
                credit: amount,
            })?;
        Ok(())
    }

    /// Credits the withdrawable balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] on zero, [`LedgerError::BalanceOverflow`]
    /// past `u64::MAX`.
    pub fn credit(&mut self, amount: u64) -> Result<u64, LedgerError> {
        self.check_credit(amount)?;
        self.balance += amount;
        Ok(self.balance)
    }

    /// Debits the withdrawable balance. Returns the remaining balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] on zero,
    /// [`LedgerError::InsufficientBalance`] if the account doesn't hold
    /// `amount`.
    pub fn debit(&mut self, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                available: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }

    /// Credits the yield-receipt sub-balance. Returns the new receipt balance.
    pub fn credit_receipts(&mut self, receipt_amount: u64) -> Result<u64, LedgerError> {
        if receipt_amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.yield_receipt_balance = self
            .yield_receipt_balance
            .checked_add(receipt_amount)
            .ok_or(LedgerError::ReceiptOverflow {
                current: self.yield_receipt_balance,
                credit: receipt_amount,
            })?;
        Ok(self.yield_receipt_balance)
    }

    /// Debits the yield-receipt sub-balance. Returns the remaining receipts.
    pub fn debit_receipts(&mut self, receipt_amount: u64) -> Result<u64, LedgerError> {
        if receipt_amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.yield_receipt_balance < receipt_amount {
            return Err(LedgerError::InsufficientReceipts {
                held: self.yield_receipt_balance,
                requested: receipt_amount,
            });
        }
        self.yield_receipt_balance -= receipt_amount;
        Ok(self.yield_receipt_balance)
    }

    // -----------------------------------------------------------------------
    // Fallback Configuration
    // -----------------------------------------------------------------------

    /// Sets the fallback recipient. Identity-relative validation (the
    /// recipient must not be the owner) happens in the ledger, which knows
    /// the account's key.
    pub(crate) fn set_fallback_recipient(&mut self, recipient: Address) {
        self.fallback_recipient = Some(recipient);
    }

    /// Clears the fallback recipient, reverting resolution to the owner.
    pub(crate) fn clear_fallback_recipient(&mut self) {
        self.fallback_recipient = None;
    }

    /// Sets the fallback period after checking the policy bounds
    /// (inclusive on both ends).
    ///
    /// # Errors
    ///
    /// [`LedgerError::PeriodTooShort`] / [`LedgerError::PeriodTooLong`]
    /// outside `[MIN_FALLBACK_PERIOD, MAX_FALLBACK_PERIOD]`.
    pub fn set_fallback_period(&mut self, period: Duration) -> Result<(), LedgerError> {
        let min = min_fallback_period();
        let max = max_fallback_period();

        if period < min {
            return Err(LedgerError::PeriodTooShort {
                requested_secs: period.num_seconds(),
                min_secs: min.num_seconds(),
            });
        }
        if period > max {
            return Err(LedgerError::PeriodTooLong {
                requested_secs: period.num_seconds(),
                max_secs: max.num_seconds(),
            });
        }

        self.fallback_period = Some(period);
        Ok(())
    }

    /// Stamps the proof-of-life timestamp, unconditionally.
    ///
    /// The clock contract guarantees `at` is non-decreasing across
    /// operations, so there is no monotonicity check here.
    pub fn record_activity(&mut self, at: DateTime<Utc>) {
        self.last_activity_at = Some(at);
    }
}

// ---------------------------------------------------------------------------
// Serde helper: Option<Duration> as whole seconds
// ---------------------------------------------------------------------------

/// Serializes the fallback period as `Option<i64>` whole seconds, so that
/// ledger snapshots stay readable and `chrono::Duration` never appears at
/// the serialization boundary.
mod period_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(period: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        period.map(|p| p.num_seconds()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<i64>::deserialize(deserializer)? {
            Some(secs) => Duration::try_seconds(secs)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom("fallback period out of range")),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn account() -> Account {
        Account::new(t0())
    }

    #[test]
    fn new_account_is_all_zero() {
        let a = account();
        assert_eq!(a.balance(), 0);
        assert_eq!(a.yield_receipt_balance(), 0);
        assert!(a.fallback_recipient().is_none());
        assert!(a.fallback_period().is_none());
        assert!(a.last_activity_at().is_none());
    }

    #[test]
    fn credit_accumulates() {
        let mut a = account();
        assert_eq!(a.credit(500).unwrap(), 500);
        assert_eq!(a.credit(300).unwrap(), 800);
    }

    #[test]
    fn credit_zero_rejected() {
        let mut a = account();
        assert!(matches!(a.credit(0), Err(LedgerError::InvalidAmount)));
    }

    #[test]
    fn credit_overflow_rejected() {
        let mut a = account();
        a.credit(u64::MAX).unwrap();
        let result = a.credit(1);
        assert!(matches!(result, Err(LedgerError::BalanceOverflow { .. })));
        assert_eq!(a.balance(), u64::MAX, "failed credit must not change state");
    }

    #[test]
    fn debit_reduces_balance() {
        let mut a = account();
        a.credit(1000).unwrap();
        assert_eq!(a.debit(400).unwrap(), 600);
    }

    #[test]
    fn debit_insufficient_rejected() {
        let mut a = account();
        a.credit(100).unwrap();
        let result = a.debit(200);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance {
                available: 100,
                requested: 200,
            })
        ));
        assert_eq!(a.balance(), 100);
    }

    #[test]
    fn debit_zero_rejected() {
        let mut a = account();
        a.credit(100).unwrap();
        assert!(matches!(a.debit(0), Err(LedgerError::InvalidAmount)));
    }

    #[test]
    fn receipt_accounting() {
        let mut a = account();
        assert_eq!(a.credit_receipts(250).unwrap(), 250);
        assert_eq!(a.debit_receipts(100).unwrap(), 150);

        let result = a.debit_receipts(151);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientReceipts {
                held: 150,
                requested: 151,
            })
        ));
    }

    #[test]
    fn period_bounds_inclusive() {
        let mut a = account();

        // Both boundary values succeed.
        a.set_fallback_period(min_fallback_period()).unwrap();
        a.set_fallback_period(max_fallback_period()).unwrap();

        // One second outside either bound fails.
        let result = a.set_fallback_period(min_fallback_period() - Duration::seconds(1));
        assert!(matches!(result, Err(LedgerError::PeriodTooShort { .. })));

        let result = a.set_fallback_period(max_fallback_period() + Duration::seconds(1));
        assert!(matches!(result, Err(LedgerError::PeriodTooLong { .. })));

        // Failed updates leave the stored period alone.
        assert_eq!(a.fallback_period(), Some(max_fallback_period()));
    }

    #[test]
    fn record_activity_overwrites() {
        let mut a = account();
        a.record_activity(t0());
        assert_eq!(a.last_activity_at(), Some(t0()));

        let later = t0() + Duration::days(5);
        a.record_activity(later);
        assert_eq!(a.last_activity_at(), Some(later));
    }

    #[test]
    fn account_serialization_roundtrip() {
        let mut a = account();
        a.credit(42_000).unwrap();
        a.credit_receipts(7).unwrap();
        a.set_fallback_period(Duration::days(120)).unwrap();
        a.record_activity(t0());

        let json = serde_json::to_string(&a).expect("serialize");
        let recovered: Account = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.balance(), 42_000);
        assert_eq!(recovered.yield_receipt_balance(), 7);
        assert_eq!(recovered.fallback_period(), Some(Duration::days(120)));
        assert_eq!(recovered.last_activity_at(), Some(t0()));
    }
}
