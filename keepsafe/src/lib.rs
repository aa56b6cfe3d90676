// Copyright (c) 2026 Keepsafe Labs. MIT License.
// See LICENSE for details.

//! # KEEPSAFE — Custody Ledger with Inactivity Release
//!
//! KEEPSAFE is a per-account value-custody ledger with a dead-man's-switch:
//! every account carries a "proof of life" timestamp, and once an account has
//! been quiet for longer than its configured fallback period, anyone may
//! trigger a release of its funds to the configured fallback recipient.
//! Think of it as estate planning for people who don't trust lawyers.
//!
//! The crate is the authoritative ledger only. Actually moving value in and
//! out of custody is the job of an external asset custodian, and parking a
//! sub-balance somewhere yield-bearing is the job of an external venue. Both
//! are modeled as capability traits (see [`ports`]) with production and
//! in-memory implementations behind the same interface.
//!
//! ## Architecture
//!
//! The modules mirror the actual concerns of the system:
//!
//! - **config** — Policy constants: fallback period bounds, address limits.
//! - **identity** — Validated addresses and composite account identifiers.
//! - **ledger** — Balance accounting and per-account fallback configuration.
//! - **activity** — Which operations count as proof of life (and which don't).
//! - **release** — The inactivity state machine and claim authorization.
//! - **ports** — Capability contracts for the asset custodian, yield venue,
//!   and clock, plus in-memory reference implementations.
//! - **events** — One notification per successful operation, nothing more.
//! - **vault** — The public operation surface tying it all together.
//!
//! ## Design Philosophy
//!
//! 1. Fund safety over convenience. Every authorization decision is a pure
//!    function of ledger state and time — never of who is asking, except
//!    where the spec of the operation says "owner only".
//! 2. Time enters through a port. The core never calls `Utc::now()` itself,
//!    which is the difference between testable and "works on my machine".
//! 3. If it touches money, it has tests. Plural.

pub mod activity;
pub mod config;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod ports;
pub mod release;
pub mod vault;

pub use identity::{AccountId, Address, IdentityError};
pub use ledger::{Account, Ledger, LedgerError};
pub use ports::{AssetTransferPort, Clock, PortError, YieldVenuePort};
pub use release::{ReleaseError, ReleaseState};
pub use vault::{Vault, VaultError};
