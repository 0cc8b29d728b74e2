//! Codec helpers for bus payloads.
pub mod le;
