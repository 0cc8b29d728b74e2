//! J1939 transport layer: frame representations, 29-bit identifier
//! management, and the multi-packet Transport Protocol reassembler.

pub mod assembler;
pub mod can_frame;
pub mod can_id;
