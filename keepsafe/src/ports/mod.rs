//! # Ports — External Capability Contracts
//!
//! KEEPSAFE is the authoritative ledger; everything that touches the outside
//! world goes through a port. Three capabilities are consumed:
//!
//! - [`AssetTransferPort`] — moves value into/out of the vault's custody.
//! - [`YieldVenuePort`] — parks custodied value somewhere yield-bearing and
//!   redeems it later, possibly for a different amount.
//! - [`Clock`] — supplies the current time for every activity/inactivity
//!   decision.
//!
//! Production and test implementations are two variants behind the same
//! trait; the in-memory variants live in [`mem`]. Ports take `&self` and
//! never receive a reference to the vault, so a port implementation cannot
//! re-enter the facade and observe a half-updated account — the reentrancy
//! discipline is structural, not a guard flag.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::identity::Address;

pub mod mem;

pub use mem::{FixedRateYieldVenue, InMemoryAssetHub, ManualClock};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by external ports. Propagated to the caller verbatim;
/// the enclosing vault operation is fully rolled back first.
#[derive(Debug, Error)]
pub enum PortError {
    /// The asset custodian could not complete a transfer. By contract the
    /// external state is unchanged when this is returned.
    #[error("asset transfer failed: {reason}")]
    TransferFailed {
        /// The custodian's explanation.
        reason: String,
    },

    /// The yield venue rejected a deposit or redemption.
    #[error("yield venue operation failed: {reason}")]
    VenueFailed {
        /// The venue's explanation.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// AssetTransferPort
// ---------------------------------------------------------------------------

/// Moves value between external holders and the vault's custody.
///
/// # Contract
///
/// Every operation is atomic with respect to failure: it either completes
/// the transfer fully or leaves external state unchanged and returns
/// [`PortError::TransferFailed`]. The vault's debit-then-push and
/// pull-then-credit orderings depend on this — a port that can partially
/// transfer breaks the recovery story.
pub trait AssetTransferPort: Send + Sync {
    /// Pulls `amount` from `from` into the vault's custody.
    fn pull_into(&self, from: &Address, amount: u64) -> Result<(), PortError>;

    /// Pushes `amount` out of the vault's custody to `to`.
    fn push_from(&self, to: &Address, amount: u64) -> Result<(), PortError>;

    /// The external balance currently held by `holder`, outside custody.
    fn balance_of(&self, holder: &Address) -> Result<u64, PortError>;
}

// ---------------------------------------------------------------------------
// YieldVenuePort
// ---------------------------------------------------------------------------

/// An optional venue that accepts custodied value and returns receipt
/// units, redeemable later for a possibly different value amount.
///
/// The receipt-to-value exchange rate is opaque to the vault and may differ
/// between deposit and redemption — that difference is the yield (or the
/// loss). The vault tracks receipt units, never venue-side value.
pub trait YieldVenuePort: Send + Sync {
    /// Deposits `amount` of value; returns the receipt amount issued.
    fn deposit_for_yield(&self, amount: u64) -> Result<u64, PortError>;

    /// Redeems `receipt_amount` of receipts; returns the value returned.
    fn redeem_from_yield(&self, receipt_amount: u64) -> Result<u64, PortError>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Supplies the current time.
///
/// # Contract
///
/// Must not regress between consecutive calls. The vault additionally reads
/// the clock exactly once per operation, so within one operation there is
/// only ever one "now".
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock: wall time via [`Utc::now`]. This is the only place
/// in the crate that calls it.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_does_not_regress() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
