//! # Inactivity Release Engine
//!
//! Decides, for a given account and requested amount, whether a release to
//! the fallback recipient is currently authorized.
//!
//! ## State Machine
//!
//! ```text
//!    ┌──────────┐   time elapses past          ┌────────────┐
//!    │  Active   │  last_activity + period  ──► │ Releasable  │
//!    └──────────┘   (strict >)                 └────────────┘
//!         ▲                                          │
//!         └── owner records new activity ◄───────────┘
//! ```
//!
//! There is no stored "triggered" flag. Both states are derived from the
//! account's fields and the current time on every call, so the transition
//! is idempotent and repeatable: once releasable, partial claims can be
//! made any number of times, each independently re-checked, and a fresh
//! proof of life flips the account straight back to `Active`.
//!
//! The boundary is strict: at exactly `last_activity + period` the account
//! is still `Active`. One tick later it is `Releasable`. Conservative and
//! trivially testable.
//!
//! Authorization is purely a function of elapsed time and the target
//! account's own state — the caller's identity is never consulted. This
//! permissionless-rescue design trades the ability to restrict who may
//! trigger the release for the guarantee that the release can never be
//! blocked by a griefing recipient who refuses to act.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{AccountId, Address};
use crate::ledger::{Account, LedgerError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when authorizing an inactivity claim.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The elapsed-time predicate does not hold yet (or release was never
    /// enabled for this account).
    #[error("not yet releasable{}", fmt_deadline(.releasable_at))]
    NotYetReleasable {
        /// When the account becomes releasable, if a period is configured.
        releasable_at: Option<DateTime<Utc>>,
    },

    /// The amount checks failed (zero amount or insufficient balance).
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

fn fmt_deadline(at: &Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => format!(" (releasable after {at})"),
        None => " (inactivity release is not enabled)".to_string(),
    }
}

// ---------------------------------------------------------------------------
// ReleaseState
// ---------------------------------------------------------------------------

/// The derived inactivity state of an account at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseState {
    /// No release permitted: no period configured, or the owner has been
    /// active recently enough.
    Active,

    /// Release permitted, to the resolved fallback recipient only.
    Releasable,
}

/// Evaluates the release predicate for an account at `now`.
///
/// `Releasable` iff a fallback period is configured AND
/// `now > last_activity + period` (strict). An account that has never shown
/// activity is measured from the Unix epoch — the spec's "zero until first
/// activity" — which makes a configured-but-never-funded account trivially
/// releasable and trivially empty.
pub fn release_state(account: &Account, now: DateTime<Utc>) -> ReleaseState {
    match releasable_at(account) {
        Some(deadline) if now > deadline => ReleaseState::Releasable,
        _ => ReleaseState::Active,
    }
}

/// The instant after which the account becomes releasable, or `None` if no
/// fallback period is configured.
pub fn releasable_at(account: &Account) -> Option<DateTime<Utc>> {
    let period = account.fallback_period()?;
    let anchor = account
        .last_activity_at()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    Some(anchor + period)
}

/// Resolves the identity a claim would pay out to: the configured fallback
/// recipient if set, else the account's own owner.
///
/// Resolution happens at claim time, not at configuration time, so changing
/// (or never setting) the recipient always reflects the latest
/// configuration.
pub fn resolve_recipient(id: &AccountId, account: &Account) -> Address {
    account
        .fallback_recipient()
        .cloned()
        .unwrap_or_else(|| id.owner.clone())
}

/// Authorizes an inactivity claim and, on success, debits the account.
///
/// Check order matters and is part of the contract:
///
/// 1. [`ReleaseError::NotYetReleasable`] unless the account is
///    [`ReleaseState::Releasable`] at `now`.
/// 2. [`LedgerError::InvalidAmount`] on a zero amount.
/// 3. [`LedgerError::InsufficientBalance`] if `amount` exceeds the balance.
///
/// On success the account has been debited and the resolved recipient is
/// returned; the caller performs the actual value transfer. The account's
/// activity timestamp is deliberately left untouched (see
/// [`activity`](crate::activity)).
pub fn authorize_claim(
    id: &AccountId,
    account: &mut Account,
    amount: u64,
    now: DateTime<Utc>,
) -> Result<Address, ReleaseError> {
    if release_state(account, now) != ReleaseState::Releasable {
        return Err(ReleaseError::NotYetReleasable {
            releasable_at: releasable_at(account),
        });
    }

    account.debit(amount)?;
    Ok(resolve_recipient(id, account))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn alice() -> AccountId {
        AccountId::owned(addr("alice"))
    }

    /// Account with balance 1000, period 90 days, last activity at t0.
    fn armed_account() -> Account {
        let mut a = Account::new(t0());
        a.credit(1000).unwrap();
        a.set_fallback_period(Duration::days(90)).unwrap();
        a.record_activity(t0());
        a
    }

    #[test]
    fn no_period_means_active_forever() {
        let mut a = Account::new(t0());
        a.credit(1000).unwrap();
        a.record_activity(t0());

        let far_future = t0() + Duration::days(10_000);
        assert_eq!(release_state(&a, far_future), ReleaseState::Active);
        assert_eq!(releasable_at(&a), None);
    }

    #[test]
    fn boundary_is_strict() {
        let a = armed_account();
        let deadline = t0() + Duration::days(90);

        // Exactly at the deadline: still active.
        assert_eq!(release_state(&a, deadline), ReleaseState::Active);
        // One second past: releasable.
        assert_eq!(
            release_state(&a, deadline + Duration::seconds(1)),
            ReleaseState::Releasable
        );
    }

    #[test]
    fn never_active_account_measures_from_epoch() {
        let mut a = Account::new(t0());
        a.set_fallback_period(Duration::days(90)).unwrap();

        // No activity ever recorded: anchor is the epoch, so any modern
        // timestamp is far past the deadline.
        assert_eq!(release_state(&a, t0()), ReleaseState::Releasable);
        assert_eq!(
            releasable_at(&a),
            Some(DateTime::<Utc>::UNIX_EPOCH + Duration::days(90))
        );
    }

    #[test]
    fn resolution_prefers_configured_recipient() {
        let id = alice();
        let mut a = armed_account();

        // Unset: resolves to the owner.
        assert_eq!(resolve_recipient(&id, &a), addr("alice"));

        // Set: resolves to the configured recipient.
        a.set_fallback_recipient(addr("faye"));
        assert_eq!(resolve_recipient(&id, &a), addr("faye"));

        // Cleared: back to the owner.
        a.clear_fallback_recipient();
        assert_eq!(resolve_recipient(&id, &a), addr("alice"));
    }

    #[test]
    fn claim_before_deadline_rejected() {
        let id = alice();
        let mut a = armed_account();
        let deadline = t0() + Duration::days(90);

        let result = authorize_claim(&id, &mut a, 1000, deadline);
        assert!(matches!(
            result,
            Err(ReleaseError::NotYetReleasable {
                releasable_at: Some(at),
            }) if at == deadline
        ));
        assert_eq!(a.balance(), 1000, "failed claim must not debit");
    }

    #[test]
    fn claim_without_period_rejected() {
        let id = alice();
        let mut a = Account::new(t0());
        a.credit(1000).unwrap();

        let result = authorize_claim(&id, &mut a, 1000, t0() + Duration::days(10_000));
        assert!(matches!(
            result,
            Err(ReleaseError::NotYetReleasable {
                releasable_at: None,
            })
        ));
    }

    #[test]
    fn claim_after_deadline_debits_and_resolves() {
        let id = alice();
        let mut a = armed_account();
        a.set_fallback_recipient(addr("faye"));
        let now = t0() + Duration::days(90) + Duration::seconds(1);

        let recipient = authorize_claim(&id, &mut a, 600, now).unwrap();
        assert_eq!(recipient, addr("faye"));
        assert_eq!(a.balance(), 400);
    }

    #[test]
    fn partial_claims_repeat_without_rearming() {
        let id = alice();
        let mut a = armed_account();
        let now = t0() + Duration::days(90) + Duration::seconds(1);

        authorize_claim(&id, &mut a, 300, now).unwrap();
        // The claim did not refresh the activity timestamp, so a second
        // claim at the same instant still succeeds.
        assert_eq!(a.last_activity_at(), Some(t0()));
        authorize_claim(&id, &mut a, 700, now).unwrap();
        assert_eq!(a.balance(), 0);
    }

    #[test]
    fn claim_zero_amount_rejected() {
        let id = alice();
        let mut a = armed_account();
        let now = t0() + Duration::days(91);

        let result = authorize_claim(&id, &mut a, 0, now);
        assert!(matches!(
            result,
            Err(ReleaseError::Ledger(LedgerError::InvalidAmount))
        ));
    }

    #[test]
    fn claim_beyond_balance_rejected() {
        let id = alice();
        let mut a = armed_account();
        let now = t0() + Duration::days(91);

        let result = authorize_claim(&id, &mut a, 1001, now);
        assert!(matches!(
            result,
            Err(ReleaseError::Ledger(LedgerError::InsufficientBalance {
                available: 1000,
                requested: 1001,
            }))
        ));
    }

    #[test]
    fn fresh_activity_rearms_the_switch() {
        let id = alice();
        let mut a = armed_account();

        // Owner shows life 60 days in; the deadline moves to t0+60d+90d.
        let t1 = t0() + Duration::days(60);
        a.record_activity(t1);

        let old_deadline_plus = t0() + Duration::days(90) + Duration::seconds(1);
        let result = authorize_claim(&id, &mut a, 100, old_deadline_plus);
        assert!(matches!(result, Err(ReleaseError::NotYetReleasable { .. })));

        let new_deadline_plus = t1 + Duration::days(90) + Duration::seconds(1);
        assert!(authorize_claim(&id, &mut a, 100, new_deadline_plus).is_ok());
    }
}
