//! # The Ledger Proper
//!
//! A [`Ledger`] maps [`AccountId`] to [`Account`]. Identifiers never seen
//! before behave as accounts with all-zero fields: reads return defaults,
//! and the first write lazily creates the record (stamped with the
//! operation clock). Identifiers are never reused with a different meaning
//! and records are never deleted.
//!
//! The ledger owns every account record exclusively. All mutation flows
//! through the [`Vault`](crate::vault::Vault) facade, which holds the
//! ledger by value — there is no lock here because there is nothing to
//! race against.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::account::{Account, LedgerError};
use crate::identity::{AccountId, Address};

/// The mapping from account identifier to account record.
///
/// Serializable as a whole, so an embedding application can snapshot and
/// restore ledger state (the map is serialized as an entry list because
/// JSON map keys must be strings and [`AccountId`] is a composite).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(with = "account_map")]
    accounts: HashMap<AccountId, Account>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Read access to an account record, if it has ever been written.
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// The withdrawable balance for an account. Unknown accounts hold zero;
    /// this never fails.
    pub fn balance_of(&self, id: &AccountId) -> u64 {
        self.accounts.get(id).map_or(0, Account::balance)
    }

    /// The yield-receipt sub-balance for an account. Unknown accounts hold
    /// zero.
    pub fn yield_receipts_of(&self, id: &AccountId) -> u64 {
        self.accounts
            .get(id)
            .map_or(0, Account::yield_receipt_balance)
    }

    /// The number of account records that have ever been written.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Mutable access to an account record, creating it lazily with
    /// all-zero fields if this is the first write.
    pub fn account_mut_or_create(&mut self, id: &AccountId, now: DateTime<Utc>) -> &mut Account {
        self.accounts
            .entry(id.clone())
            .or_insert_with(|| Account::new(now))
    }

    /// Mutable access without creation. Used by operations that must not
    /// bring an account into existence (a claim against an unknown id, for
    /// instance, fails on its own terms instead).
    pub fn account_mut(&mut self, id: &AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(id)
    }

    // -----------------------------------------------------------------------
    // Balance Operations
    // -----------------------------------------------------------------------

    /// Verifies that a credit would succeed, without applying it. Unknown
    /// accounts can always accept a positive credit.
    pub fn check_credit(&self, id: &AccountId, amount: u64) -> Result<(), LedgerError> {
        match self.accounts.get(id) {
            Some(account) => account.check_credit(amount),
            None if amount == 0 => Err(LedgerError::InvalidAmount),
            None => Ok(()),
        }
    }

    /// Credits an account, creating it lazily. Returns the new balance.
    pub fn credit(
        &mut self,
        id: &AccountId,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        self.account_mut_or_create(id, now).credit(amount)
    }

    /// Debits an account. Returns the remaining balance.
    ///
    /// Unknown accounts hold zero, so any positive debit against one fails
    /// with [`LedgerError::InsufficientBalance`].
    pub fn debit(&mut self, id: &AccountId, amount: u64) -> Result<u64, LedgerError> {
        match self.accounts.get_mut(id) {
            Some(account) => account.debit(amount),
            None if amount == 0 => Err(LedgerError::InvalidAmount),
            None => Err(LedgerError::InsufficientBalance {
                available: 0,
                requested: amount,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Fallback Configuration
    // -----------------------------------------------------------------------

    /// Sets the fallback recipient for an account, creating the record
    /// lazily (configuration does not require a balance).
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidRecipient`] if `recipient` is the account's own
    /// owner — "pay me" is expressed by clearing the field, keeping
    /// resolution logic in exactly one place.
    pub fn set_fallback_recipient(
        &mut self,
        id: &AccountId,
        recipient: Address,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if recipient == id.owner {
            return Err(LedgerError::InvalidRecipient {
                reason: "recipient is the account owner; clear the field instead".to_string(),
            });
        }
        self.account_mut_or_create(id, now)
            .set_fallback_recipient(recipient);
        Ok(())
    }

    /// Clears the fallback recipient, reverting resolution to the owner.
    pub fn clear_fallback_recipient(&mut self, id: &AccountId, now: DateTime<Utc>) {
        self.account_mut_or_create(id, now).clear_fallback_recipient();
    }

    /// Sets the fallback period for an account, creating the record lazily.
    /// Bounds checking lives on [`Account::set_fallback_period`].
    pub fn set_fallback_period(
        &mut self,
        id: &AccountId,
        period: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        // Validate before creating, so a rejected configuration call on an
        // unknown id leaves no record behind.
        Account::new(now).set_fallback_period(period)?;
        self.account_mut_or_create(id, now)
            .set_fallback_period(period)
    }

    /// Stamps the proof-of-life timestamp for an account, creating the
    /// record lazily.
    pub fn record_activity(&mut self, id: &AccountId, at: DateTime<Utc>) {
        self.account_mut_or_create(id, at).record_activity(at);
    }
}

// ---------------------------------------------------------------------------
// Serde helper: composite-keyed map as an entry list
// ---------------------------------------------------------------------------

mod account_map {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Account, AccountId};

    pub fn serialize<S>(
        map: &HashMap<AccountId, Account>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(&AccountId, &Account)> = map.iter().collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<AccountId, Account>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<(AccountId, Account)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
