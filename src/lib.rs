//! `hv-vbus` library: primitives and protocol logic required to decode
//! heavy-vehicle bus traffic (SAE J1939 over CAN, SAE J1587 over J1708)
//! in a `no_std` environment. The crate exposes the infrastructure
//! modules (codec, frame types), protocol logic (address management,
//! transport reassembly, per-bus decoders), and the cross-bus signal
//! and fault aggregation engine.
#![no_std]
//==================================================================================
/// Core data types shared by every decoder: bus identity, trouble codes,
/// vehicle signal snapshots, and event codes.
pub mod core;
/// Cross-bus signal state and fault aggregation.
pub mod engine;
/// Domain and low-level errors (CAN identifier construction, frame
/// building, and related issues).
pub mod error;
/// Byte-level helpers for bus payloads.
pub mod infra;
/// Bus protocol implementations: J1939 transport and address management,
/// the J1939 PGN decoder, and the J1587 PID decoder.
pub mod protocol;

#[cfg(test)]
pub(crate) mod testutil;
//==================================================================================
