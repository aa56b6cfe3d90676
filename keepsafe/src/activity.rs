//! # Proof of Life
//!
//! The activity rule, in one place: every balance-affecting operation
//! initiated by the account owner refreshes the proof-of-life timestamp as
//! an inseparable side effect of that operation (both succeed or neither
//! does), and the explicit [`Ping`](OperationKind::Ping) refreshes it with
//! no balance effect at all.
//!
//! The one deliberate exception is [`Claim`](OperationKind::Claim): an
//! inactivity claim is triggered by a third party and must NOT refresh the
//! claimed-from account's clock. Otherwise an attacker could perpetually
//! reset someone's deadline by partially draining their account right at
//! the boundary. This is a protected invariant, not an oversight — it is
//! why the rule lives here as data instead of being sprinkled through the
//! facade as ad-hoc calls.

use serde::{Deserialize, Serialize};

/// The public operations that touch an account, as far as the activity
/// rule is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Owner moves value into custody.
    Deposit,
    /// Owner moves value out of custody.
    Withdraw,
    /// Owner parks a sub-balance at the yield venue.
    Invest,
    /// Owner redeems receipts from the yield venue.
    Divest,
    /// Explicit "I am still here" with no balance effect.
    Ping,
    /// Third-party inactivity claim against the account.
    Claim,
}

impl OperationKind {
    /// Whether a successful operation of this kind refreshes the
    /// proof-of-life timestamp of the account it targets.
    pub fn is_proof_of_life(self) -> bool {
        !matches!(self, OperationKind::Claim)
    }

    /// Stable name for log lines and event payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Invest => "invest",
            OperationKind::Divest => "divest",
            OperationKind::Ping => "ping",
            OperationKind::Claim => "claim",
        }
    }
}
