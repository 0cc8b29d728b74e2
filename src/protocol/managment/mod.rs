//! J1939 network-management layer: the 64-bit NAME field and the
//! address-claim state machine built on top of it.
//!
//! ## Claim timing constants
//!
//! The core itself never waits; these values are exported for the host
//! that drives the claim and collection timers.

pub mod address_claim;
pub mod node_name;

/// Time to listen for objections after broadcasting an address claim
/// before the address may be used (J1939-81).
pub const ADDRESS_CLAIM_WAIT_WINDOW_MS: u32 = 250;

/// Time to collect claimed-address responses after requesting them from
/// every node, before selecting an arbitrary address.
pub const ADDRESS_COLLECT_WINDOW_MS: u32 = 1250;

/// Upper bound of the pseudo-random delay applied to a cannot-claim
/// response (J1939-81 prescribes 0-153 ms).
pub const ADDRESS_MAX_CANNOT_CLAIM_DELAY_MS: u32 = 153;
