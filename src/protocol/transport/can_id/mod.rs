//! Creation and extraction of the 29-bit CAN identifiers defined by
//! SAE J1939-21, and the packet view layered on top of them.
use crate::error::CanIdBuildError;
use crate::protocol::transport::can_frame::CanFrame;

//==================================================================================CAN_ID
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Encapsulates an extended CAN identifier (29 bits) and exposes accessors
/// for priority, PGN, destination, and source.
pub struct CanId(pub u32);

impl CanId {
    // Builder entry point
    /// Creates a pre-configured `CanIdBuilder` for a PGN and source address.
    pub fn builder(pgn: u32, source_address: u8) -> CanIdBuilder {
        CanIdBuilder::new(pgn, source_address)
    }

    // Getters used to deconstruct the identifier
    /// Returns the priority (3 bits, value 0-7) encoded in the CAN ID.
    pub fn priority(&self) -> u8 {
        ((self.0 >> 26) & 0x07) as u8
    }

    /// PDU-format byte.
    pub fn pf(&self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// PDU-specific byte: destination address in PDU1, low PGN byte in PDU2.
    pub fn ps(&self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Extracts the PGN, handling the PDU1/PDU2 distinction.
    pub fn pgn(&self) -> u32 {
        let pf = self.pf();
        if pf >= 0xF0 {
            // PDU2: PF >= 240, implicit destination, PS becomes part of the PGN.
            ((pf as u32) << 8) | (self.ps() as u32)
        } else {
            // PDU1: PF < 240, PS stores the explicit destination.
            (pf as u32) << 8
        }
    }

    /// Returns the destination address (PDU1) when the PGN requires one.
    pub fn destination(&self) -> Option<u8> {
        if self.pf() >= 0xF0 {
            None
        } else {
            Some(self.ps())
        }
    }

    /// Eight-bit source address of the transmitting node.
    pub fn source_address(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}
//==================================================================================CAN_ID_BUILDER
#[derive(Debug)]
/// Fluent builder that enforces the PDU1/PDU2 rules.
pub struct CanIdBuilder {
    pub priority: u8,
    pub pgn: u32,
    pub source_address: u8,
    pub destination: Option<u8>,
}

impl CanIdBuilder {
    /// Initializes the builder for a given PGN and source address.
    pub fn new(pgn: u32, source_address: u8) -> Self {
        Self {
            priority: 6, // Default priority
            pgn,
            source_address,
            destination: None,
        }
    }

    /// Sets the priority (3 bits) to use during construction.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority & 0x07;
        self
    }

    /// Assigns a destination address (PDU1). Implies a directed message.
    pub fn to_destination(mut self, destination_address: u8) -> Self {
        self.destination = Some(destination_address);
        self
    }

    /// Builds the CAN identifier while applying J1939 rules:
    /// - PF < 240 → addressed message (PDU1): `destination` mandatory and PGN PS byte must be `0`
    /// - PF ≥ 240 → broadcast (PDU2): `destination` must not be provided
    ///
    /// Returns a dedicated error when the configuration violates these rules.
    pub fn build(self) -> Result<CanId, CanIdBuildError> {
        let pf_from_pgn = ((self.pgn >> 8) & 0xFF) as u8;
        let ps_from_pgn = (self.pgn & 0xFF) as u8;

        match self.destination {
            None => {
                if pf_from_pgn < 0xF0 {
                    return Err(CanIdBuildError::InvalidForBroadcast);
                }
                let id = ((self.priority as u32) << 26)
                    | ((pf_from_pgn as u32) << 16)
                    | ((ps_from_pgn as u32) << 8)
                    | (self.source_address as u32);
                Ok(CanId(id))
            }

            Some(da) => {
                if pf_from_pgn >= 0xF0 {
                    return Err(CanIdBuildError::InvalidForAddressed { pf: pf_from_pgn });
                }
                if ps_from_pgn != 0 {
                    return Err(CanIdBuildError::PsMustBeNullForAddressed);
                }
                let id = ((self.priority as u32) << 26)
                    | ((pf_from_pgn as u32) << 16)
                    | ((da as u32) << 8)
                    | (self.source_address as u32);
                Ok(CanId(id))
            }
        }
    }
}
//==================================================================================J1939_PACKET
/// Structured view of a J1939 frame, with the identifier fields split
/// out and the PGN derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct J1939Packet {
    pub priority: u8,
    /// PDU-format byte, kept for control-frame dispatch.
    pub pf: u8,
    /// Parameter Group Number derived from PF/PS.
    pub pgn: u32,
    /// Destination address; `None` for broadcast (PDU2) packets.
    pub destination: Option<u8>,
    pub source_address: u8,
    pub data: [u8; 8],
    pub len: usize,
}

impl J1939Packet {
    /// Decompose a raw CAN frame into its J1939 fields. The payload is
    /// copied unchanged.
    pub fn from_frame(frame: &CanFrame) -> Self {
        Self {
            priority: frame.id.priority(),
            pf: frame.id.pf(),
            pgn: frame.id.pgn(),
            destination: frame.id.destination(),
            source_address: frame.id.source_address(),
            data: frame.data,
            len: frame.len,
        }
    }

    /// Recompose a CAN frame, truncating the payload to `data_len`.
    pub fn to_frame(&self, data_len: usize) -> Result<CanFrame, CanIdBuildError> {
        let mut builder =
            CanId::builder(self.pgn, self.source_address).with_priority(self.priority);
        if let Some(da) = self.destination {
            builder = builder.to_destination(da);
        }
        Ok(CanFrame {
            id: builder.build()?,
            data: self.data,
            len: data_len.min(8),
        })
    }

    /// Whether the packet is addressed to `address` or to everyone.
    /// Broadcast (PDU2) packets and packets to the global address reach
    /// every node.
    #[inline]
    pub fn is_for(&self, address: Option<u8>) -> bool {
        match self.destination {
            None | Some(0xFF) => true,
            Some(da) => Some(da) == address,
        }
    }
}
//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
