//! # In-Memory Port Implementations
//!
//! Reference implementations of the three ports, used by the test suites
//! and by embedders who want a self-contained vault (demos, simulations,
//! single-process deployments where the "custodian" is just another map).
//!
//! All three use interior mutability (`parking_lot::Mutex`) because ports
//! are shared behind `Arc<dyn ...>` and take `&self`. The failure flags on
//! the asset hub and yield venue are one-shot: they trip the next call and
//! clear themselves, which is exactly the shape needed to test the vault's
//! rollback-and-retry paths.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::{AssetTransferPort, Clock, PortError, YieldVenuePort};
use crate::identity::Address;

// ---------------------------------------------------------------------------
// InMemoryAssetHub
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct HubState {
    /// External balances per holder, outside the vault's custody.
    holdings: HashMap<Address, u64>,
    /// Total value currently inside the vault's custody.
    custody: u64,
}

/// An in-memory asset custodian: a map of external holder balances plus a
/// single custody pool.
///
/// Transfers are atomic by construction — holdings and custody live behind
/// one `Mutex`, so each operation validates and applies both sides of the
/// move under a single lock. Concurrent pulls and pushes serialize; they
/// cannot interleave or deadlock.
#[derive(Debug, Default)]
pub struct InMemoryAssetHub {
    state: Mutex<HubState>,
    /// One-shot failure switches for the next pull/push.
    fail_next_pull: Mutex<bool>,
    fail_next_push: Mutex<bool>,
}

impl InMemoryAssetHub {
    /// Creates an empty hub: no holders, nothing in custody.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an external holder with `amount` of value.
    pub fn fund(&self, holder: &Address, amount: u64) {
        *self
            .state
            .lock()
            .holdings
            .entry(holder.clone())
            .or_insert(0) += amount;
    }

    /// Total value currently held in the vault's custody.
    pub fn custody_total(&self) -> u64 {
        self.state.lock().custody
    }

    /// Makes the next [`pull_into`](AssetTransferPort::pull_into) fail,
    /// leaving external state unchanged. One-shot.
    pub fn fail_next_pull(&self) {
        *self.fail_next_pull.lock() = true;
    }

    /// Makes the next [`push_from`](AssetTransferPort::push_from) fail,
    /// leaving external state unchanged. One-shot.
    pub fn fail_next_push(&self) {
        *self.fail_next_push.lock() = true;
    }
}

impl AssetTransferPort for InMemoryAssetHub {
    fn pull_into(&self, from: &Address, amount: u64) -> Result<(), PortError> {
        if std::mem::take(&mut *self.fail_next_pull.lock()) {
            return Err(PortError::TransferFailed {
                reason: "scripted pull failure".to_string(),
            });
        }

        let mut state = self.state.lock();
        let held = state.holdings.entry(from.clone()).or_insert(0);
        if *held < amount {
            return Err(PortError::TransferFailed {
                reason: format!("holder {from} has {held}, needs {amount}"),
            });
        }

        *held -= amount;
        state.custody += amount;
        Ok(())
    }

    fn push_from(&self, to: &Address, amount: u64) -> Result<(), PortError> {
        if std::mem::take(&mut *self.fail_next_push.lock()) {
            return Err(PortError::TransferFailed {
                reason: "scripted push failure".to_string(),
            });
        }

        let mut state = self.state.lock();
        if state.custody < amount {
            let custody = state.custody;
            return Err(PortError::TransferFailed {
                reason: format!("custody holds {custody}, needs {amount}"),
            });
        }

        state.custody -= amount;
        *state.holdings.entry(to.clone()).or_insert(0) += amount;
        Ok(())
    }

    fn balance_of(&self, holder: &Address) -> Result<u64, PortError> {
        Ok(self.state.lock().holdings.get(holder).copied().unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// FixedRateYieldVenue
// ---------------------------------------------------------------------------

/// A yield venue with fixed exchange rates in basis points per direction.
///
/// `deposit_rate_bps` receipts are issued per 10 000 units of value
/// deposited; `redeem_rate_bps` value is returned per 10 000 receipt units
/// redeemed. `par()` gives 1:1 both ways; a redeem rate above par models
/// yield, below par models loss.
#[derive(Debug)]
pub struct FixedRateYieldVenue {
    deposit_rate_bps: u64,
    redeem_rate_bps: u64,
    fail_next: Mutex<bool>,
}

/// One whole unit in basis points.
const BPS_SCALE: u64 = 10_000;

impl FixedRateYieldVenue {
    /// A venue with explicit rates for each direction.
    pub fn new(deposit_rate_bps: u64, redeem_rate_bps: u64) -> Self {
        Self {
            deposit_rate_bps,
            redeem_rate_bps,
            fail_next: Mutex::new(false),
        }
    }

    /// A venue that exchanges 1:1 in both directions.
    pub fn par() -> Self {
        Self::new(BPS_SCALE, BPS_SCALE)
    }

    /// Makes the next venue call fail. One-shot.
    pub fn fail_next(&self) {
        *self.fail_next.lock() = true;
    }

    fn convert(amount: u64, rate_bps: u64) -> Result<u64, PortError> {
        let wide = u128::from(amount) * u128::from(rate_bps) / u128::from(BPS_SCALE);
        u64::try_from(wide).map_err(|_| PortError::VenueFailed {
            reason: format!("conversion of {amount} at {rate_bps} bps overflows"),
        })
    }

    fn take_failure(&self) -> Result<(), PortError> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            return Err(PortError::VenueFailed {
                reason: "scripted venue failure".to_string(),
            });
        }
        Ok(())
    }
}

impl YieldVenuePort for FixedRateYieldVenue {
    fn deposit_for_yield(&self, amount: u64) -> Result<u64, PortError> {
        self.take_failure()?;
        Self::convert(amount, self.deposit_rate_bps)
    }

    fn redeem_from_yield(&self, receipt_amount: u64) -> Result<u64, PortError> {
        self.take_failure()?;
        Self::convert(receipt_amount, self.redeem_rate_bps)
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A hand-cranked clock. Time moves only when the test says so.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// A clock frozen at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jumps the clock to `to`. Callers are responsible for honoring the
    /// no-regress contract.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }

    /// Advances the clock by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn pull_and_push_move_value_atomically() {
        let hub = InMemoryAssetHub::new();
        let alice = addr("alice");
        hub.fund(&alice, 1000);

        hub.pull_into(&alice, 400).unwrap();
        assert_eq!(hub.balance_of(&alice).unwrap(), 600);
        assert_eq!(hub.custody_total(), 400);

        hub.push_from(&alice, 150).unwrap();
        assert_eq!(hub.balance_of(&alice).unwrap(), 750);
        assert_eq!(hub.custody_total(), 250);
    }

    #[test]
    fn pull_beyond_holdings_fails_cleanly() {
        let hub = InMemoryAssetHub::new();
        let alice = addr("alice");
        hub.fund(&alice, 100);

        let result = hub.pull_into(&alice, 101);
        assert!(matches!(result, Err(PortError::TransferFailed { .. })));
        assert_eq!(hub.balance_of(&alice).unwrap(), 100);
        assert_eq!(hub.custody_total(), 0);
    }

    #[test]
    fn push_beyond_custody_fails_cleanly() {
        let hub = InMemoryAssetHub::new();
        let alice = addr("alice");

        let result = hub.push_from(&alice, 1);
        assert!(matches!(result, Err(PortError::TransferFailed { .. })));
        assert_eq!(hub.balance_of(&alice).unwrap(), 0);
    }

    #[test]
    fn scripted_failures_are_one_shot() {
        let hub = InMemoryAssetHub::new();
        let alice = addr("alice");
        hub.fund(&alice, 1000);

        hub.fail_next_pull();
        assert!(hub.pull_into(&alice, 100).is_err());
        // The retry goes through.
        assert!(hub.pull_into(&alice, 100).is_ok());
    }

    #[test]
    fn concurrent_pulls_and_pushes_complete_and_conserve_value() {
        use std::sync::Arc;
        use std::thread;

        let hub = Arc::new(InMemoryAssetHub::new());
        let alice = addr("alice");
        hub.fund(&alice, 100_000);
        hub.pull_into(&alice, 50_000).unwrap();

        // One thread pulls while the other pushes. Both directions touch
        // holdings and custody, so this would wedge on an AB-BA lock order.
        let puller = {
            let hub = hub.clone();
            let alice = alice.clone();
            thread::spawn(move || {
                for _ in 0..50_000 {
                    let _ = hub.pull_into(&alice, 1);
                }
            })
        };
        let pusher = {
            let hub = hub.clone();
            let alice = alice.clone();
            thread::spawn(move || {
                for _ in 0..50_000 {
                    let _ = hub.push_from(&alice, 1);
                }
            })
        };
        puller.join().unwrap();
        pusher.join().unwrap();

        // Nothing minted, nothing burned.
        assert_eq!(
            hub.balance_of(&alice).unwrap() + hub.custody_total(),
            100_000
        );
    }

    #[test]
    fn par_venue_exchanges_one_to_one() {
        let venue = FixedRateYieldVenue::par();
        assert_eq!(venue.deposit_for_yield(1000).unwrap(), 1000);
        assert_eq!(venue.redeem_from_yield(1000).unwrap(), 1000);
    }

    #[test]
    fn redeem_above_par_models_yield() {
        // 1:1 in, 1.05x out.
        let venue = FixedRateYieldVenue::new(10_000, 10_500);
        let receipts = venue.deposit_for_yield(1000).unwrap();
        assert_eq!(receipts, 1000);
        assert_eq!(venue.redeem_from_yield(receipts).unwrap(), 1050);
    }

    #[test]
    fn redeem_below_par_models_loss() {
        let venue = FixedRateYieldVenue::new(10_000, 9_000);
        assert_eq!(venue.redeem_from_yield(1000).unwrap(), 900);
    }

    #[test]
    fn venue_failure_is_one_shot() {
        let venue = FixedRateYieldVenue::par();
        venue.fail_next();
        assert!(venue.deposit_for_yield(100).is_err());
        assert!(venue.deposit_for_yield(100).is_ok());
    }

    #[test]
    fn manual_clock_moves_on_command() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::starting_at(t0);

        assert_eq!(clock.now(), t0);
        clock.advance(Duration::days(90));
        assert_eq!(clock.now(), t0 + Duration::days(90));

        let later = t0 + Duration::days(200);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
