//! # Engine Configuration & Constants
//!
//! Every magic number in hongbao lives here. If you are hardcoding a
//! constant somewhere else, you are doing it wrong and you owe the team
//! coffee.

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Engine version string, assembled at compile time so we don't allocate
/// for something this trivial at runtime.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Vault Index Arithmetic
// ---------------------------------------------------------------------------

/// Fixed-point scale for the vault exchange index. An index of exactly
/// `INDEX_SCALE` means one share redeems for one base unit. 1e9 gives
/// nine decimal places of rate precision while keeping
/// `u64 amount * INDEX_SCALE` comfortably inside u128.
pub const INDEX_SCALE: u128 = 1_000_000_000;

/// Seconds in a (non-leap) year, used by the fixed-rate vault's linear
/// accrual. 365 days, same convention as the original deployment.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Default annual yield rate in basis points for the fixed-rate vault.
/// 200 bps = 2.00% APR, which reproduces the observed behavior of the
/// production vault during the reference period (1000 units deposited
/// for half a year came back as 1010).
pub const DEFAULT_APY_BPS: u32 = 200;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Number of decimal places in the base asset's display representation.
/// Display only: the engine itself never divides an amount.
pub const BASE_UNIT_DECIMALS: u8 = 8;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default REST API port for the node binary.
pub const DEFAULT_RPC_PORT: u16 = 8920;
