//! # Identities & Account Keys
//!
//! An [`Address`] is an opaque, validated identity string. KEEPSAFE doesn't
//! care whether it's a public key, a bech32 string, or an email-shaped thing
//! from some enterprise directory — validation only enforces that it's
//! well-formed enough to key a map and print in a log line.
//!
//! An [`AccountId`] is the ledger key: an owner address optionally composed
//! with a sub-account address. The composite form exists for the managed
//! variant where one controlling identity (a custodial manager) runs many
//! independent sub-ledgers for its clients. One composite key type, not a
//! map of maps — iteration stays simple and there's no default-value
//! ambiguity at the outer layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MAX_ADDRESS_LENGTH;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing identities.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The address string failed validation.
    #[error("malformed address: {reason}")]
    Malformed {
        /// What exactly was wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A validated identity string.
///
/// Invariants (enforced at construction): non-empty, at most
/// [`MAX_ADDRESS_LENGTH`] characters, no whitespace or control characters.
/// A malformed identity is only representable as an error, which is what
/// lets the rest of the crate treat `Address` as trivially valid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parses and validates an address.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Malformed`] if the string is empty, too long,
    /// or contains whitespace/control characters.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentityError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(IdentityError::Malformed {
                reason: "address is empty".to_string(),
            });
        }
        if raw.chars().count() > MAX_ADDRESS_LENGTH {
            return Err(IdentityError::Malformed {
                reason: format!("address exceeds {MAX_ADDRESS_LENGTH} characters"),
            });
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(IdentityError::Malformed {
                reason: "address contains whitespace or control characters".to_string(),
            });
        }

        Ok(Self(raw))
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// The composite ledger key: an owner identity, optionally paired with a
/// sub-account identity.
///
/// Two forms:
///
/// - `owned(alice)` — a plain single-owner account.
/// - `managed(custodian, client)` — one of many independent sub-ledgers run
///   by `custodian` on behalf of `client`. The custodian is the "owner" for
///   authorization purposes; the client address only distinguishes the
///   sub-ledger.
///
/// Accounts with different ids are fully independent — there are no
/// cross-account invariants anywhere in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId {
    /// The controlling identity. Owner-only operations authorize against
    /// this address.
    pub owner: Address,

    /// Distinguishes independent sub-ledgers under one owner. `None` for
    /// plain single-owner accounts.
    pub sub_account: Option<Address>,
}

impl AccountId {
    /// A plain single-owner account id.
    pub fn owned(owner: Address) -> Self {
        Self {
            owner,
            sub_account: None,
        }
    }

    /// A managed sub-account id: `manager` controls the account, `client`
    /// names the sub-ledger.
    pub fn managed(manager: Address, client: Address) -> Self {
        Self {
            owner: manager,
            sub_account: Some(client),
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_account {
            Some(sub) => write!(f, "{}/{}", self.owner, sub),
            None => write!(f, "{}", self.owner),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_address_accepted() {
        let addr = Address::new("ks1q3f8a7c2").unwrap();
        assert_eq!(addr.as_str(), "ks1q3f8a7c2");
    }

    #[test]
    fn empty_address_rejected() {
        assert!(matches!(
            Address::new(""),
            Err(IdentityError::Malformed { .. })
        ));
    }

    #[test]
    fn whitespace_address_rejected() {
        assert!(Address::new("ks1 q3f8").is_err());
        assert!(Address::new("ks1\tq3f8").is_err());
        assert!(Address::new("ks1\nq3f8").is_err());
    }

    #[test]
    fn overlong_address_rejected() {
        let raw = "a".repeat(MAX_ADDRESS_LENGTH + 1);
        assert!(Address::new(raw).is_err());

        // Exactly at the limit is fine.
        let raw = "a".repeat(MAX_ADDRESS_LENGTH);
        assert!(Address::new(raw).is_ok());
    }

    #[test]
    fn owned_and_managed_ids_differ() {
        let alice = Address::new("alice").unwrap();
        let bob = Address::new("bob").unwrap();

        let plain = AccountId::owned(alice.clone());
        let managed = AccountId::managed(alice, bob);

        assert_ne!(plain, managed);
        assert_eq!(plain.owner, managed.owner);
    }

    #[test]
    fn sub_accounts_under_one_owner_are_distinct_keys() {
        let mgr = Address::new("custodian").unwrap();
        let a = AccountId::managed(mgr.clone(), Address::new("client-a").unwrap());
        let b = AccountId::managed(mgr, Address::new("client-b").unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn display_forms() {
        let alice = Address::new("alice").unwrap();
        let bob = Address::new("bob").unwrap();

        assert_eq!(AccountId::owned(alice.clone()).to_string(), "alice");
        assert_eq!(AccountId::managed(alice, bob).to_string(), "alice/bob");
    }

    #[test]
    fn address_serialization_is_transparent() {
        let addr = Address::new("alice").unwrap();
        let json = serde_json::to_string(&addr).expect("serialize");
        assert_eq!(json, "\"alice\"");

        let recovered: Address = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered, addr);
    }
}
