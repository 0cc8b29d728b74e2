//! J1939 Transport Protocol reassembler: rebuilds multi-packet
//! parameter groups from TP.CM control frames and TP.DT data frames,
//! for both broadcast (BAM) and addressed (RTS/CTS) transfers.
//!
//! The assembler is a pure state machine. It never touches the bus:
//! replies it owes (CTS, EOM, abort) are returned as [`ControlFrame`]
//! payloads for the caller to wrap and enqueue.
use crate::infra::codec::le;
use crate::protocol::transport::can_id::J1939Packet;

//==================================================================================Constants

/// Maximum reassembled payload we will accept. 32 data packets of
/// 7 bytes; comfortably above the largest parameter group we decode.
pub const MAX_TP_PAYLOAD: usize = 224;

/// Maximum number of transfers tracked in parallel (distinct sources).
/// A couple of nodes may stream fault lists while others answer a VIN
/// request at the same time.
const MAX_TP_SESSIONS: usize = 5;

/// Number of data packets granted per Clear-To-Send.
pub const MAX_TP_FRAMES_PER_BURST: u8 = 1;

// TP.CM control bytes (J1939-21).
pub const TP_CM_RTS: u8 = 16;
pub const TP_CM_CTS: u8 = 17;
pub const TP_CM_EOM_ACK: u8 = 19;
pub const TP_CM_BAM: u8 = 32;
pub const TP_CM_ABORT: u8 = 255;

// Connection abort reasons (J1939-21).
pub const TP_ABORT_MAX_CONNECTIONS: u8 = 1;
pub const TP_ABORT_NO_RESOURCES: u8 = 2;

//==================================================================================Enums and Structs

/// An 8-byte TP.CM payload owed to a peer, ready to be wrapped into a
/// connection-management frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    /// Peer to address the frame to.
    pub destination: u8,
    pub data: [u8; 8],
}

/// Outcome of a TP.CM control frame.
#[derive(Debug)]
pub enum CmResult {
    /// Not an RTS/BAM, or discarded without owing a reply.
    Ignored,
    /// Session opened for a broadcast or unacknowledged transfer.
    Opened,
    /// Session opened; the peer must be granted the first packet.
    OpenedSendCts(ControlFrame),
    /// Connection refused; the peer must be sent an abort.
    Refused(ControlFrame),
}

/// Outcome of a TP.DT data frame.
#[derive(Debug)]
pub enum DataResult {
    /// No session for this source, or invalid sequence number.
    Ignored,
    /// Fragment stored; more packets expected, no reply owed.
    FragmentConsumed,
    /// Fragment stored; the peer must be granted the next packet.
    SendCts(ControlFrame),
    /// All expected packets received; the message is available and the
    /// session has been released.
    MessageComplete {
        message: CompletedTransfer,
        /// End-Of-Message acknowledgment owed for addressed transfers.
        reply: Option<ControlFrame>,
    },
}

/// Safe container returning a reassembled parameter group without
/// exposing the assembler's internal buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub pgn: u32,
    pub source_address: u8,
    pub payload: [u8; MAX_TP_PAYLOAD],
    /// Effective message length (number of valid bytes).
    pub len: usize,
}

impl CompletedTransfer {
    /// Immutable view over the reassembled bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.payload[..self.len]
    }
}

/// Possible states for a reassembly session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SessionState {
    Inactive,
    InProgress,
}

/// Internal structure tracking the state of one transfer.
#[derive(Debug, Clone, Copy)]
struct TpSession {
    state: SessionState,
    source_address: u8,
    pgn: u32,
    expected_bytes: usize,
    expected_packets: u8,
    max_packets_per_burst: u8,
    /// Whether we owe flow control (RTS addressed to us). Broadcast
    /// transfers are never acknowledged.
    acknowledged: bool,
    buffer: [u8; MAX_TP_PAYLOAD],
}

impl TpSession {
    const fn new() -> Self {
        Self {
            state: SessionState::Inactive,
            source_address: 0,
            pgn: 0,
            expected_bytes: 0,
            expected_packets: 0,
            max_packets_per_burst: 0,
            acknowledged: false,
            buffer: [0xFF; MAX_TP_PAYLOAD],
        }
    }

    /// Reset the session and make it available again.
    fn reset(&mut self) {
        self.state = SessionState::Inactive;
        self.expected_bytes = 0;
        self.expected_packets = 0;
        // No need to wipe the buffer; a new session re-fills it.
    }
}

/// Main assembler: owns a fixed pool of reusable sessions, one per
/// source address.
#[derive(Debug, Clone, Copy)]
pub struct TransportAssembler {
    sessions: [TpSession; MAX_TP_SESSIONS],
}

impl Default for TransportAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportAssembler {
    /// Instantiate the assembler with an inactive session pool.
    pub const fn new() -> Self {
        Self {
            sessions: [TpSession::new(); MAX_TP_SESSIONS],
        }
    }

    //==================================================================================Process Functions

    /// Process a TP.CM connection-management frame.
    ///
    /// * `my_address` – our claimed address, to decide whether flow
    ///   control is owed
    /// * `accepted_pgns` – parameter groups we are willing to open a
    ///   transfer for
    ///
    /// Only RTS and BAM are meaningful here: we never send large
    /// messages, so CTS/EOM/abort from peers have no session to act on.
    pub fn handle_cm(
        &mut self,
        packet: &J1939Packet,
        my_address: Option<u8>,
        accepted_pgns: &[u32],
    ) -> CmResult {
        if packet.len < 8 {
            return CmResult::Ignored;
        }
        let control = packet.data[0];
        if control != TP_CM_RTS && control != TP_CM_BAM {
            return CmResult::Ignored;
        }

        let Some(pgn) = le::pgn_at(&packet.data, 5) else {
            return CmResult::Ignored;
        };

        // A reply is only owed for an RTS directed at our address.
        let send_response = control == TP_CM_RTS
            && my_address.is_some()
            && packet.destination == my_address;

        if !accepted_pgns.contains(&pgn) {
            #[cfg(feature = "defmt")]
            defmt::debug!("TP: unlisted PGN {=u32:#x}, transfer discarded", pgn);
            if send_response {
                return CmResult::Refused(abort_frame(
                    packet.source_address,
                    pgn,
                    TP_ABORT_NO_RESOURCES,
                ));
            }
            return CmResult::Ignored;
        }

        let expected_bytes = le::u16_at(&packet.data, 1).unwrap_or(0) as usize;
        let expected_packets = packet.data[3];
        if expected_bytes == 0
            || expected_bytes > MAX_TP_PAYLOAD
            || expected_packets == 0
            || (expected_packets as usize) * 7 < expected_bytes
        {
            // Announced sizes we cannot honor; let the peer time out.
            if send_response {
                return CmResult::Refused(abort_frame(
                    packet.source_address,
                    pgn,
                    TP_ABORT_NO_RESOURCES,
                ));
            }
            return CmResult::Ignored;
        }

        // A new announcement from a source supersedes any transfer in
        // progress from that source.
        let existing = self.sessions.iter().position(|s| {
            s.state == SessionState::InProgress && s.source_address == packet.source_address
        });
        let slot = existing.or_else(|| {
            self.sessions
                .iter()
                .position(|s| s.state == SessionState::Inactive)
        });

        let Some(index) = slot else {
            #[cfg(feature = "defmt")]
            defmt::warn!("TP: session pool exhausted, transfer discarded");
            if send_response {
                return CmResult::Refused(abort_frame(
                    packet.source_address,
                    pgn,
                    TP_ABORT_MAX_CONNECTIONS,
                ));
            }
            return CmResult::Ignored;
        };

        #[cfg(feature = "defmt")]
        if existing.is_some() {
            defmt::debug!(
                "TP: superseding transfer from {=u8:#x}",
                packet.source_address
            );
        }

        let session = &mut self.sessions[index];
        session.state = SessionState::InProgress;
        session.source_address = packet.source_address;
        session.pgn = pgn;
        session.expected_bytes = expected_bytes;
        session.expected_packets = expected_packets;
        session.max_packets_per_burst = packet.data[4].min(MAX_TP_FRAMES_PER_BURST);
        session.acknowledged = send_response;
        session.buffer = [0xFF; MAX_TP_PAYLOAD];

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "TP: accept {=u8:#x} PGN {=u32:#x}, {=u8} packets, {=usize} bytes",
            packet.source_address,
            pgn,
            expected_packets,
            expected_bytes
        );

        if send_response {
            let cts = cts_frame(
                packet.source_address,
                pgn,
                session.max_packets_per_burst,
                1,
            );
            CmResult::OpenedSendCts(cts)
        } else {
            CmResult::Opened
        }
    }

    /// Process a TP.DT data frame: `data[0]` is the 1-based sequence
    /// number, the remaining seven bytes are payload.
    ///
    /// Out-of-order and duplicate packets are written at the position
    /// their sequence number dictates; the transfer completes when the
    /// final expected sequence number arrives.
    pub fn handle_data(&mut self, packet: &J1939Packet) -> DataResult {
        if packet.len < 8 {
            return DataResult::Ignored;
        }

        let Some(session) = self.sessions.iter_mut().find(|s| {
            s.state == SessionState::InProgress && s.source_address == packet.source_address
        }) else {
            // No transfer open for this source; let the peer time out.
            return DataResult::Ignored;
        };

        let sequence = packet.data[0];
        if sequence == 0 {
            return DataResult::Ignored;
        }

        let starting_byte = (sequence as usize - 1) * 7;
        for i in 0..7 {
            if starting_byte + i < session.expected_bytes {
                session.buffer[starting_byte + i] = packet.data[1 + i];
            }
        }

        if sequence >= session.expected_packets {
            // Last packet: hand the message out and release the slot.
            let message = CompletedTransfer {
                pgn: session.pgn,
                source_address: session.source_address,
                payload: session.buffer,
                len: session.expected_bytes,
            };
            let reply = session.acknowledged.then(|| {
                eom_frame(
                    session.source_address,
                    session.pgn,
                    session.expected_bytes as u16,
                    session.expected_packets,
                )
            });
            session.reset();
            DataResult::MessageComplete { message, reply }
        } else if session.acknowledged {
            let cts = cts_frame(
                session.source_address,
                session.pgn,
                session.max_packets_per_burst,
                sequence + 1,
            );
            DataResult::SendCts(cts)
        } else {
            DataResult::FragmentConsumed
        }
    }

    /// Drop every transfer in progress. Called when our address is
    /// surrendered; peers time out on their own.
    pub fn abandon_all(&mut self) {
        for session in self.sessions.iter_mut() {
            session.reset();
        }
    }
}

//==================================================================================Control Frame Builders

fn cts_frame(destination: u8, pgn: u32, max_packets: u8, next_packet: u8) -> ControlFrame {
    let mut data = [0xFFu8; 8];
    data[0] = TP_CM_CTS;
    data[1] = max_packets;
    data[2] = next_packet;
    le::put_pgn(&mut data, 5, pgn);
    ControlFrame { destination, data }
}

fn eom_frame(destination: u8, pgn: u32, total_bytes: u16, total_packets: u8) -> ControlFrame {
    let mut data = [0xFFu8; 8];
    data[0] = TP_CM_EOM_ACK;
    data[1] = (total_bytes & 0xFF) as u8;
    data[2] = (total_bytes >> 8) as u8;
    data[3] = total_packets;
    le::put_pgn(&mut data, 5, pgn);
    ControlFrame { destination, data }
}

fn abort_frame(destination: u8, pgn: u32, reason: u8) -> ControlFrame {
    let mut data = [0xFFu8; 8];
    data[0] = TP_CM_ABORT;
    data[1] = reason;
    le::put_pgn(&mut data, 5, pgn);
    ControlFrame { destination, data }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
