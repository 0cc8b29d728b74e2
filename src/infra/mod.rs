//! Infrastructure layer: byte-level codec helpers used by the protocol
//! modules.
pub mod codec;
