//! In-memory representations of the raw frames exchanged with the bus
//! I/O layer: SAE J1939 CAN frames and SAE J1708 serial frames.
use crate::error::J1708BuildError;
use crate::protocol::transport::can_id::CanId;

/// J1708 messages are at most 21 bytes including the MID, excluding the
/// checksum (stripped by the driver).
pub const MAX_J1708_BYTES: usize = 21;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Raw J1939 frame as read from the CAN bus.
pub struct CanFrame {
    /// Full 29-bit CAN identifier stored inside a `u32`.
    pub id: CanId,
    /// Payload buffer. Classic CAN frames always provide eight bytes.
    pub data: [u8; 8],
    /// Number of valid payload bytes (Data Length Code, 0 to 8).
    pub len: usize,
}

impl CanFrame {
    /// Convert from any HAL frame type. Returns `None` for frames with
    /// a standard (11-bit) identifier; J1939 only uses extended ids.
    pub fn from_embedded<F: embedded_can::Frame>(frame: &F) -> Option<Self> {
        let id = match frame.id() {
            embedded_can::Id::Extended(id) => CanId(id.as_raw()),
            embedded_can::Id::Standard(_) => return None,
        };
        let mut data = [0xFFu8; 8];
        let len = frame.dlc().min(8);
        data[..len].copy_from_slice(&frame.data()[..len]);
        Some(Self { id, data, len })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Raw J1708 frame: the identifier byte is the MID, the payload carries
/// PID-keyed data.
pub struct J1708Frame {
    /// Bus access priority (1 highest, 8 lowest).
    pub priority: u8,
    /// Message identifier (source of the frame).
    pub mid: u8,
    /// Payload buffer, checksum excluded.
    pub data: [u8; MAX_J1708_BYTES],
    /// Number of valid payload bytes.
    pub len: usize,
}

impl J1708Frame {
    /// Build a frame from a payload slice.
    pub fn new(priority: u8, mid: u8, payload: &[u8]) -> Result<Self, J1708BuildError> {
        if payload.len() > MAX_J1708_BYTES {
            return Err(J1708BuildError::DataTooLong { len: payload.len() });
        }
        let mut data = [0u8; MAX_J1708_BYTES];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            priority,
            mid,
            data,
            len: payload.len(),
        })
    }

    /// Immutable view over the populated bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[derive(Clone, Debug)]
/// A frame queued for transmission, with the send delay the writer
/// thread must honor before putting it on the wire.
pub struct OutgoingFrame {
    pub frame: CanFrame,
    /// Milliseconds to hold the frame back. Zero for immediate sends;
    /// non-zero only for the pseudo-randomly delayed cannot-claim reply.
    pub delay_ms: u32,
}

impl OutgoingFrame {
    /// Queue a frame for immediate transmission.
    pub const fn immediate(frame: CanFrame) -> Self {
        Self { frame, delay_ms: 0 }
    }
}
