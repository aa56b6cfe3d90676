//! # Vault Facade
//!
//! The public operation surface. The vault validates inputs, enforces the
//! circuit-breaker, and sequences the ledger, the activity rule, the
//! release engine, and the external ports. Per operation it is thin; in
//! aggregate it carries all the orchestration weight.
//!
//! ## Atomicity
//!
//! Operations run on `&mut self`, which gives the single logical thread of
//! execution the specification assumes: one operation completes fully (or
//! fails completely) before the next begins. Embedders that want true
//! parallelism wrap the vault in their own mutual exclusion; nothing in
//! here takes overlapping locks.
//!
//! Each operation makes at most one external-port call, ordered so that the
//! safe recovery path is always "retry the whole operation":
//!
//! - **Deposits pull-then-credit.** A failed pull leaves no partial credit.
//! - **Withdrawals and claims debit-then-push.** If the push fails after
//!   the debit, the debit is re-credited before the error surfaces, so the
//!   ledger never reports value the custodian still holds in limbo.
//!   (Rollback, not "pending delivery" — the conservative choice.)
//!
//! Ports cannot re-enter the vault: they receive no vault reference and the
//! exclusive borrow makes overlapping operations unrepresentable.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::activity::OperationKind;
use crate::events::{EventKind, VaultEvent};
use crate::identity::{AccountId, Address};
use crate::ledger::{Ledger, LedgerError};
use crate::ports::{AssetTransferPort, Clock, PortError, YieldVenuePort};
use crate::release::{self, ReleaseError, ReleaseState};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by vault operations. Every failure is a distinct, named
/// condition, and a failing operation never leaves a visible effect — no
/// balance change, no event.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The circuit-breaker is engaged; balance-affecting operations are
    /// halted.
    #[error("vault is paused")]
    Paused,

    /// The caller is not entitled to perform this operation.
    #[error("unauthorized: {caller} is not the {role} for this operation")]
    Unauthorized {
        /// Who asked.
        caller: Address,
        /// The role the operation requires ("account owner" or
        /// "administrator").
        role: &'static str,
    },

    /// Invest/divest was called but no yield venue is configured.
    #[error("no yield venue is configured for this vault")]
    YieldVenueUnavailable,

    /// A ledger precondition failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Claim authorization failed.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// An external port reported failure. The operation was fully rolled
    /// back before this was returned.
    #[error(transparent)]
    Port(#[from] PortError),
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The custody vault: ledger, pause switch, admin identity, and ports.
///
/// The pause flag is an explicit field here — not a hidden static — so
/// tests and multi-instance deployments stay trivial.
pub struct Vault {
    ledger: Ledger,
    paused: bool,
    admin: Address,
    assets: Arc<dyn AssetTransferPort>,
    yield_venue: Option<Arc<dyn YieldVenuePort>>,
    clock: Arc<dyn Clock>,
    events: Vec<VaultEvent>,
}

impl Vault {
    /// Creates an unpaused vault with an empty ledger and no yield venue.
    pub fn new(admin: Address, assets: Arc<dyn AssetTransferPort>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Ledger::new(),
            paused: false,
            admin,
            assets,
            yield_venue: None,
            clock,
            events: Vec::new(),
        }
    }

    /// Attaches a yield venue, enabling [`invest`](Self::invest) and
    /// [`divest`](Self::divest).
    pub fn with_yield_venue(mut self, venue: Arc<dyn YieldVenuePort>) -> Self {
        self.yield_venue = Some(venue);
        self
    }

    // -----------------------------------------------------------------------
    // Read-Only Surface
    // -----------------------------------------------------------------------

    /// The withdrawable balance for an account (0 for unknown ids).
    pub fn balance_of(&self, id: &AccountId) -> u64 {
        self.ledger.balance_of(id)
    }

    /// The yield-receipt sub-balance for an account (0 for unknown ids).
    pub fn yield_receipts_of(&self, id: &AccountId) -> u64 {
        self.ledger.yield_receipts_of(id)
    }

    /// Whether the circuit-breaker is engaged.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The administrative identity.
    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Read access to the underlying ledger (snapshots, inspection).
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The derived release state of an account right now. Unknown accounts
    /// are `Active` (no period configured).
    pub fn release_state_of(&self, id: &AccountId) -> ReleaseState {
        match self.ledger.account(id) {
            Some(account) => release::release_state(account, self.clock.now()),
            None => ReleaseState::Active,
        }
    }

    /// The identity a claim against this account would currently pay.
    pub fn resolved_recipient_of(&self, id: &AccountId) -> Address {
        match self.ledger.account(id) {
            Some(account) => release::resolve_recipient(id, account),
            None => id.owner.clone(),
        }
    }

    /// Notifications emitted so far and not yet drained.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Hands the accumulated notifications to the delivery collaborator.
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Balance Operations
    // -----------------------------------------------------------------------

    /// Deposits `amount` into `id`'s custody, pulled from the caller via
    /// the asset port. Pull-then-credit: a failed pull leaves the ledger
    /// untouched. Records proof of life. Returns the new balance.
    pub fn deposit(
        &mut self,
        caller: &Address,
        id: &AccountId,
        amount: u64,
    ) -> Result<u64, VaultError> {
        self.ensure_not_paused()?;
        self.ensure_owner(caller, id)?;
        let now = self.clock.now();

        // Validate the credit up front so a doomed one never strands
        // already-pulled funds.
        self.ledger.check_credit(id, amount)?;
        self.assets.pull_into(caller, amount)?;
        let new_balance = self.ledger.credit(id, amount, now)?;

        self.touch(OperationKind::Deposit, id, now);
        info!(account = %id, amount, new_balance, "deposit completed");
        self.emit(
            now,
            EventKind::Deposited {
                account: id.clone(),
                amount,
                new_balance,
            },
        );
        Ok(new_balance)
    }

    /// Withdraws `amount` from `id` to the caller. Debit-then-push; the
    /// debit is re-credited if the push fails. Records proof of life.
    /// Returns the remaining balance.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        id: &AccountId,
        amount: u64,
    ) -> Result<u64, VaultError> {
        self.ensure_not_paused()?;
        self.ensure_owner(caller, id)?;
        let now = self.clock.now();

        let remaining = self.ledger.debit(id, amount)?;
        if let Err(err) = self.assets.push_from(caller, amount) {
            // Restore the debit before surfacing the failure; a retry then
            // starts from a clean slate. Cannot overflow — the balance held
            // this amount a moment ago.
            self.ledger.credit(id, amount, now)?;
            warn!(account = %id, amount, error = %err, "withdrawal push failed; debit restored");
            return Err(err.into());
        }

        self.touch(OperationKind::Withdraw, id, now);
        info!(account = %id, amount, remaining, "withdrawal completed");
        self.emit(
            now,
            EventKind::Withdrawn {
                account: id.clone(),
                amount,
                remaining,
            },
        );
        Ok(remaining)
    }

    /// Explicit proof of life with no balance effect. Not gated by the
    /// pause switch — an owner must always be able to keep their deadline
    /// at bay, circuit-breaker or not.
    pub fn ping(&mut self, caller: &Address, id: &AccountId) -> Result<(), VaultError> {
        self.ensure_owner(caller, id)?;
        let now = self.clock.now();

        self.touch(OperationKind::Ping, id, now);
        debug!(account = %id, "proof of life recorded");
        self.emit(now, EventKind::Pinged { account: id.clone() });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fallback Configuration
    // -----------------------------------------------------------------------

    /// Sets (`Some`) or clears (`None`) the fallback recipient.
    ///
    /// Configuration is deliberately not gated by the pause switch and does
    /// not require a balance. Setting one's own address is rejected — "pay
    /// me" is expressed by clearing. Does not count as proof of life.
    pub fn set_fallback_wallet(
        &mut self,
        caller: &Address,
        id: &AccountId,
        recipient: Option<Address>,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller, id)?;
        let now = self.clock.now();

        match recipient {
            Some(recipient) => {
                self.ledger
                    .set_fallback_recipient(id, recipient.clone(), now)?;
                info!(account = %id, recipient = %recipient, "fallback recipient set");
                self.emit(
                    now,
                    EventKind::FallbackRecipientSet {
                        account: id.clone(),
                        recipient,
                    },
                );
            }
            None => {
                self.ledger.clear_fallback_recipient(id, now);
                info!(account = %id, "fallback recipient cleared");
                self.emit(
                    now,
                    EventKind::FallbackRecipientCleared {
                        account: id.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Sets the fallback period (inclusive policy bounds apply). Enables
    /// the dead-man's-switch for the account. Not pause-gated; not proof of
    /// life.
    pub fn set_fallback_period(
        &mut self,
        caller: &Address,
        id: &AccountId,
        period: Duration,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller, id)?;
        let now = self.clock.now();

        self.ledger.set_fallback_period(id, period, now)?;
        info!(account = %id, period_secs = period.num_seconds(), "fallback period set");
        self.emit(
            now,
            EventKind::FallbackPeriodSet {
                account: id.clone(),
                period_secs: period.num_seconds(),
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inactivity Claim
    // -----------------------------------------------------------------------

    /// Claims `amount` from an inactive account and pays it to the resolved
    /// fallback recipient.
    ///
    /// Callable by **anyone** — authorization is purely a function of
    /// elapsed time and the target account's own state (permissionless
    /// rescue). The claimed-from account's activity timestamp is never
    /// refreshed, success or failure; see [`activity`](crate::activity) for
    /// why that is load-bearing.
    ///
    /// Returns the recipient that was paid.
    pub fn claim_on_inactivity(
        &mut self,
        id: &AccountId,
        amount: u64,
    ) -> Result<Address, VaultError> {
        self.ensure_not_paused()?;
        let now = self.clock.now();

        let recipient = match self.ledger.account_mut(id) {
            Some(account) => release::authorize_claim(id, account, amount, now)?,
            // An id never written has no period configured, so it is Active
            // by definition. Don't create a record for it either.
            None => {
                return Err(ReleaseError::NotYetReleasable {
                    releasable_at: None,
                }
                .into())
            }
        };

        if let Err(err) = self.assets.push_from(&recipient, amount) {
            self.ledger.credit(id, amount, now)?;
            warn!(account = %id, amount, error = %err, "claim push failed; debit restored");
            return Err(err.into());
        }

        self.touch(OperationKind::Claim, id, now);
        info!(account = %id, recipient = %recipient, amount, "inactivity claim paid out");
        self.emit(
            now,
            EventKind::Claimed {
                account: id.clone(),
                recipient: recipient.clone(),
                amount,
            },
        );
        Ok(recipient)
    }

    // -----------------------------------------------------------------------
    // Yield Venue
    // -----------------------------------------------------------------------

    /// Parks `amount` of the account's balance at the yield venue and
    /// credits the receipts issued. Records proof of life. Returns the
    /// receipt amount.
    pub fn invest(
        &mut self,
        caller: &Address,
        id: &AccountId,
        amount: u64,
    ) -> Result<u64, VaultError> {
        self.ensure_not_paused()?;
        self.ensure_owner(caller, id)?;
        let venue = self
            .yield_venue
            .clone()
            .ok_or(VaultError::YieldVenueUnavailable)?;
        let now = self.clock.now();

        self.ledger.debit(id, amount)?;
        let receipts = match venue.deposit_for_yield(amount) {
            Ok(receipts) => receipts,
            Err(err) => {
                self.ledger.credit(id, amount, now)?;
                warn!(account = %id, amount, error = %err, "venue deposit failed; debit restored");
                return Err(err.into());
            }
        };
        if receipts == 0 {
            // A venue issuing zero receipts for a positive deposit has
            // violated its contract. Restore the ledger and surface it;
            // chasing the value at the venue is an operator concern.
            self.ledger.credit(id, amount, now)?;
            return Err(PortError::VenueFailed {
                reason: "venue issued zero receipts for a positive deposit".to_string(),
            }
            .into());
        }
        let receipt_balance = match self
            .ledger
            .account_mut(id)
            .map(|account| account.credit_receipts(receipts))
        {
            Some(Ok(receipt_balance)) => receipt_balance,
            Some(Err(err)) => {
                // Receipt overflow after the venue accepted the deposit.
                // Restore the balance debit so the ledger shows no partial
                // effect; the position at the venue is an operator concern,
                // same as the zero-receipts case above.
                self.ledger.credit(id, amount, now)?;
                warn!(account = %id, amount, receipts, error = %err, "receipt credit failed; debit restored");
                return Err(err.into());
            }
            // Unreachable in practice: the debit above required the record.
            None => return Err(LedgerError::InvalidAmount.into()),
        };

        self.touch(OperationKind::Invest, id, now);
        info!(account = %id, amount, receipts, receipt_balance, "invest completed");
        self.emit(
            now,
            EventKind::Invested {
                account: id.clone(),
                amount,
                receipts,
            },
        );
        Ok(receipts)
    }

    /// Redeems `receipt_amount` of the account's receipts at the venue and
    /// credits whatever value comes back — more than went in (yield), less
    /// (loss), or nothing at all. Records proof of life. Returns the value
    /// credited.
    pub fn divest(
        &mut self,
        caller: &Address,
        id: &AccountId,
        receipt_amount: u64,
    ) -> Result<u64, VaultError> {
        self.ensure_not_paused()?;
        self.ensure_owner(caller, id)?;
        let venue = self
            .yield_venue
            .clone()
            .ok_or(VaultError::YieldVenueUnavailable)?;
        let now = self.clock.now();

        match self.ledger.account_mut(id) {
            Some(account) => account.debit_receipts(receipt_amount)?,
            None => {
                return Err(LedgerError::InsufficientReceipts {
                    held: 0,
                    requested: receipt_amount,
                }
                .into())
            }
        };
        let value = match venue.redeem_from_yield(receipt_amount) {
            Ok(value) => value,
            Err(err) => {
                // Restore the receipts; the venue still holds the position.
                if let Some(account) = self.ledger.account_mut(id) {
                    account.credit_receipts(receipt_amount)?;
                }
                warn!(account = %id, receipt_amount, error = %err, "venue redeem failed; receipts restored");
                return Err(err.into());
            }
        };
        if value > 0 {
            if let Err(err) = self.ledger.credit(id, value, now) {
                // Balance overflow after the venue paid out. Restore the
                // receipt debit so the ledger shows no partial effect;
                // recovering the redeemed value is an operator concern.
                if let Some(account) = self.ledger.account_mut(id) {
                    account.credit_receipts(receipt_amount)?;
                }
                warn!(account = %id, receipt_amount, value, error = %err, "value credit failed; receipts restored");
                return Err(err.into());
            }
        }

        self.touch(OperationKind::Divest, id, now);
        info!(account = %id, receipt_amount, value, "divest completed");
        self.emit(
            now,
            EventKind::Divested {
                account: id.clone(),
                receipts: receipt_amount,
                value,
            },
        );
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Circuit-Breaker
    // -----------------------------------------------------------------------

    /// Engages the circuit-breaker. Administrator only; idempotent (a
    /// second pause emits nothing). No financial side effects.
    pub fn pause(&mut self, caller: &Address) -> Result<(), VaultError> {
        self.ensure_admin(caller)?;
        if !self.paused {
            self.paused = true;
            let now = self.clock.now();
            warn!("vault paused by administrator");
            self.emit(now, EventKind::Paused);
        }
        Ok(())
    }

    /// Disengages the circuit-breaker. Administrator only; idempotent.
    pub fn unpause(&mut self, caller: &Address) -> Result<(), VaultError> {
        self.ensure_admin(caller)?;
        if self.paused {
            self.paused = false;
            let now = self.clock.now();
            info!("vault unpaused by administrator");
            self.emit(now, EventKind::Unpaused);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    fn ensure_not_paused(&self) -> Result<(), VaultError> {
        if self.paused {
            return Err(VaultError::Paused);
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Address, id: &AccountId) -> Result<(), VaultError> {
        if caller != &id.owner {
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
                role: "account owner",
            });
        }
        Ok(())
    }

    fn ensure_admin(&self, caller: &Address) -> Result<(), VaultError> {
        if caller != &self.admin {
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
                role: "administrator",
            });
        }
        Ok(())
    }

    /// Applies the activity rule for a completed operation: proof-of-life
    /// kinds refresh the account's timestamp, `Claim` never does.
    fn touch(&mut self, kind: OperationKind, id: &AccountId, now: DateTime<Utc>) {
        if kind.is_proof_of_life() {
            self.ledger.record_activity(id, now);
        }
    }

    fn emit(&mut self, at: DateTime<Utc>, kind: EventKind) {
        self.events.push(VaultEvent::new(at, kind));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
