//! # Ledger Module — Balance Accounting & Fallback Configuration
//!
//! The ledger is where the books are kept. Every custodied unit, every
//! yield receipt, every fallback recipient and period, every proof-of-life
//! timestamp lives in an [`Account`] record owned by the [`Ledger`].
//!
//! ```text
//! account.rs — the per-account record and its invariants
//! book.rs    — the id → record mapping, lazy creation, validation
//! ```
//!
//! The ledger does accounting and nothing else: it never talks to the asset
//! custodian, never consults the clock on its own, and never decides who is
//! allowed to do what. Orchestration and authorization are the
//! [`Vault`](crate::vault::Vault) facade's job; the release predicate is the
//! [`release`](crate::release) engine's.

pub mod account;
pub mod book;

pub use account::{Account, LedgerError};
pub use book::Ledger;
