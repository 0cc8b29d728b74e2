//! Error definitions shared across library modules.
//! Decode entry points never surface errors to the caller (malformed
//! traffic degrades to "no effect"); these types cover outbound frame
//! construction.
use thiserror_no_std::Error;

#[derive(Error, Debug)]
/// Errors that can occur while building a 29-bit CAN identifier.
pub enum CanIdBuildError {
    /// Attempt to build a broadcast message (PDU2) with PF < 240.
    #[error("Invalid for broadcast message: PF is too low")]
    InvalidForBroadcast,
    /// Attempt to send an addressed message (PDU1) with PF >= 240.
    #[error("Invalid for addressed message: PF is too high: {pf}")]
    InvalidForAddressed { pf: u8 },
    /// In PDU1 the lower 8 bits of the PGN must remain zero.
    #[error("PDU1 PGNs require PS = 0")]
    PsMustBeNullForAddressed,
}

#[derive(Error, Debug)]
/// Errors encountered while building an outbound request frame.
pub enum RequestError {
    /// J1939 requests can only be sent once an address is held.
    #[error("No claimed address")]
    NoClaimedAddress,
    /// The identifier for the request could not be built.
    #[error(transparent)]
    Build(#[from] CanIdBuildError),
    /// The outgoing queue is full; the request was dropped.
    #[error("Outgoing queue full")]
    QueueFull,
}

#[derive(Error, Debug)]
/// Errors encountered while building a J1708 frame.
pub enum J1708BuildError {
    /// Payload exceeds the 21-byte J1708 message limit.
    #[error("Frame data too long: {len}")]
    DataTooLong { len: usize },
}
