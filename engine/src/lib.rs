// Copyright (c) 2026 Hongbao Contributors. MIT License.
// See LICENSE for details.

//! # Hongbao Engine
//!
//! The accounting and lifecycle core for *envelopes*: non-fungible positions
//! that lock a base-asset deposit inside an external yield-bearing vault
//! until an unlock time, then redeem principal plus whatever yield the vault
//! reports. Mint it, wait, open it. Like a red envelope, but the money grew.
//!
//! ## Architecture
//!
//! The engine is split along the seams that actually matter:
//!
//! - **ledger** — the position store. Owns every financial fact about an
//!   envelope and the Active/Burned state machine.
//! - **ownership** — who may open which envelope. Deliberately separate from
//!   the ledger so a transfer never rewrites financial data.
//! - **gateway** — the capability trait for the external vault, plus a
//!   deterministic fixed-rate implementation for tests and the devnet node.
//! - **clock** — injected time source. Every operation reads the clock once.
//! - **controller** — the lifecycle orchestrator that sequences the above
//!   under the checks-effects-interactions discipline.
//! - **config** — protocol constants. Magic numbers live here and only here.
//!
//! ## Design Philosophy
//!
//! 1. All monetary arithmetic is integer and checked. Money and wrapping
//!    arithmetic do not mix.
//! 2. State transitions are explicit enum variants, not boolean flags.
//! 3. Internal state is committed before any external vault call, so a
//!    reentrant callback observes the already-advanced state.
//! 4. Every public state type is serializable for snapshots and transport.

pub mod clock;
pub mod config;
pub mod controller;
pub mod gateway;
pub mod ledger;
pub mod ownership;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{EngineSnapshot, EnvelopeEngine, EnvelopeError};
pub use gateway::{FixedRateVault, GatewayError, VaultGateway};
pub use ledger::{EnvelopeId, LedgerError, Position, PositionLedger, PositionStatus};
pub use ownership::{AccountId, OwnershipError, OwnershipRegistry};
