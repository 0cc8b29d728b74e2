//! SAE J1939 receive path: classifies every CAN frame, decodes the
//! vehicle-signal parameter groups into the engine state, and drives
//! the network-management and transport-protocol machinery. Frames the
//! node owes in response are placed on an internal queue for the host
//! writer task.
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::core::{event, BusType, VinString};
use crate::engine::{Engine, EventSink};
use crate::error::RequestError;
use crate::infra::codec::le;
use crate::protocol::dtc::{lamp_bits_from_flash_status, lamp_bits_from_status, DtcCollector};
use crate::protocol::managment::{
    address_claim::{AddressClaim, ClaimOutcome, CollectOutcome, GLOBAL_ADDRESS, PF_CLAIMED_ADDRESS, PF_REQUEST},
    node_name::NodeName,
};
use crate::protocol::transport::{
    assembler::{CmResult, CompletedTransfer, ControlFrame, DataResult, TransportAssembler},
    can_frame::{CanFrame, OutgoingFrame},
    can_id::{CanId, J1939Packet},
};

//==================================================================================Constants

// Signal-bearing parameter groups.
pub const PGN_FAULT_DM1: u32 = 0xFECA;
pub const PGN_ODOMETER_HI_RES: u32 = 0xFEC1;
pub const PGN_ODOMETER_LO_RES: u32 = 0xFEE0;
pub const PGN_FUEL_CONSUMPTION: u32 = 0xFEE9;
pub const PGN_FUEL_ECONOMY: u32 = 0xFEF2;
pub const PGN_PARKING_BRAKE: u32 = 0xFEF1;
pub const PGN_TRANSMISSION_GEAR: u32 = 0xF005;
pub const PGN_VIN: u32 = 0xFEEC;

/// PDU Formats of the Transport Protocol frames.
pub const PF_TP_CM: u8 = 0xEC;
pub const PF_TP_DT: u8 = 0xEB;

/// Parameter groups for which a multi-packet transfer is worth opening.
const TP_ACCEPTED_PGNS: &[u32] = &[PGN_VIN, PGN_FAULT_DM1];

/// Transport Protocol frames travel at the lowest priority.
const TP_PRIORITY: u8 = 7;

/// Consecutive samples that must agree before the parking-brake switch
/// is trusted.
const PARKING_BRAKE_WINDOW: usize = 5;

const OUTGOING_DEPTH: usize = 8;

//==================================================================================Enums and Structs

/// Classification of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveOutcome {
    /// Addressed to another node, or sent from our own address by an
    /// imposter.
    Rejected,
    /// Signal-bearing (or benignly unknown) parameter group.
    ParsedAsPgn,
    /// Network-management or transport-protocol frame.
    ParsedAsControl,
}

/// Debounce window for the parking-brake switch: the raw samples flap
/// on some transmissions, so a value is only reported once five
/// consecutive samples have been seen.
#[derive(Debug, Clone, Copy)]
struct ParkingBrakeWindow {
    samples: [bool; PARKING_BRAKE_WINDOW],
    len: usize,
}

impl ParkingBrakeWindow {
    const fn new() -> Self {
        Self {
            samples: [false; PARKING_BRAKE_WINDOW],
            len: 0,
        }
    }

    /// Shift in the newest sample. Returns the debounced value once the
    /// window is full: the unanimous value, or `conflict_default` when
    /// the samples disagree.
    fn push(&mut self, sample: bool, conflict_default: bool) -> Option<bool> {
        for i in (1..PARKING_BRAKE_WINDOW).rev() {
            self.samples[i] = self.samples[i - 1];
        }
        self.samples[0] = sample;
        if self.len < PARKING_BRAKE_WINDOW {
            self.len += 1;
        }
        if self.len < PARKING_BRAKE_WINDOW {
            return None;
        }
        if self.samples.iter().all(|s| *s == sample) {
            Some(sample)
        } else {
            Some(conflict_default)
        }
    }
}

/// J1939 side of the decoder. Owns the claim machine, the transport
/// reassembler, and the queue of frames owed to the bus.
pub struct J1939Bus<'e, E: EventSink> {
    engine: &'e Engine<E>,
    claim: AddressClaim,
    assembler: TransportAssembler,
    outgoing: Channel<CriticalSectionRawMutex, OutgoingFrame, OUTGOING_DEPTH>,
    parking_brake: ParkingBrakeWindow,
    /// Latched once a valid high-resolution odometer reading arrives;
    /// the low-resolution parameter group is ignored from then on.
    hi_res_odometer_seen: bool,
    /// Fault codes reported since the last flush, across every node on
    /// the bus.
    dtcs: DtcCollector,
    /// Indicator-lamp bits from the latest fault report.
    lamps: u8,
}

impl<'e, E: EventSink> J1939Bus<'e, E> {
    pub fn new(engine: &'e Engine<E>, name: NodeName, preferred_address: u8) -> Self {
        Self {
            engine,
            claim: AddressClaim::new(name, preferred_address),
            assembler: TransportAssembler::new(),
            outgoing: Channel::new(),
            parking_brake: ParkingBrakeWindow::new(),
            hi_res_odometer_seen: false,
            dtcs: DtcCollector::new(),
            lamps: 0,
        }
    }

    /// Source address held on the bus, once claimed.
    #[inline]
    pub fn address(&self) -> Option<u8> {
        self.claim.address()
    }

    #[inline]
    pub fn lamp_status(&self) -> u8 {
        self.lamps
    }

    /// Next frame owed to the bus, if any. The host writer drains this
    /// after every received frame and on the claim timers.
    pub fn try_next_outgoing(&self) -> Option<OutgoingFrame> {
        self.outgoing.try_receive().ok()
    }

    //==================================================================================Address Claim Driving

    /// Announce our preferred address. The host must wait
    /// [`crate::protocol::managment::ADDRESS_CLAIM_WAIT_WINDOW_MS`] and
    /// then call [`Self::confirm_address_claim`].
    pub fn start_address_claim(&mut self) {
        let frame = self.claim.begin_claim();
        self.enqueue(frame);
    }

    /// Close the objection window; returns the address now held, or
    /// `None` when the claim was defeated while waiting.
    pub fn confirm_address_claim(&mut self) -> Option<u8> {
        self.claim.confirm_claim()
    }

    /// Close the collection window opened by a surrendered address and
    /// either claim a free one or report exhaustion.
    pub fn finish_address_collect(&mut self) {
        match self.claim.finish_collect() {
            CollectOutcome::Claiming(frame) => self.enqueue(frame),
            CollectOutcome::AddressExhausted(frame) => {
                self.enqueue(frame);
                self.engine
                    .events()
                    .add_event_with_extra(event::ERROR, &[event::ERROR_J1939_NO_ADDRESS_AVAILABLE]);
            }
        }
    }

    //==================================================================================Receive Path

    /// Classify and process one received frame.
    pub fn receive_can_frame(&mut self, frame: &CanFrame) -> ReceiveOutcome {
        let packet = J1939Packet::from_frame(frame);
        self.claim.mark_address_in_use(packet.source_address);

        // A node transmitting with our address without claiming it
        // first is an imposter: re-assert the claim and drop the frame.
        if self.claim.address() == Some(packet.source_address) && packet.pf != PF_CLAIMED_ADDRESS {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "j1939: frame from our own address {=u8:#x}, re-claiming",
                packet.source_address
            );
            if let Some(claim) = self.claim.reassert() {
                self.enqueue(claim);
            }
            return ReceiveOutcome::Rejected;
        }

        if !packet.is_for(self.claim.address()) {
            return ReceiveOutcome::Rejected;
        }

        match packet.pf {
            PF_REQUEST => {
                if let Some(reply) = self.claim.handle_address_request(&packet) {
                    self.enqueue(reply);
                }
                ReceiveOutcome::ParsedAsControl
            }
            PF_CLAIMED_ADDRESS => {
                match self.claim.handle_claimed_address(&packet) {
                    ClaimOutcome::Unaffected => {}
                    ClaimOutcome::Defended(claim) => self.enqueue(claim),
                    ClaimOutcome::Surrendered(request) => {
                        // Transfers in progress were tied to the lost
                        // address; peers will time them out.
                        self.assembler.abandon_all();
                        self.enqueue(request);
                    }
                }
                ReceiveOutcome::ParsedAsControl
            }
            PF_TP_CM => {
                match self
                    .assembler
                    .handle_cm(&packet, self.claim.address(), TP_ACCEPTED_PGNS)
                {
                    CmResult::Ignored | CmResult::Opened => {}
                    CmResult::OpenedSendCts(reply) | CmResult::Refused(reply) => {
                        self.enqueue_control(reply);
                    }
                }
                ReceiveOutcome::ParsedAsControl
            }
            PF_TP_DT => {
                match self.assembler.handle_data(&packet) {
                    DataResult::Ignored | DataResult::FragmentConsumed => {}
                    DataResult::SendCts(reply) => self.enqueue_control(reply),
                    DataResult::MessageComplete { message, reply } => {
                        // Process before acknowledging, so the sender
                        // only sees the EOM once the data is in.
                        self.process_completed(&message);
                        if let Some(reply) = reply {
                            self.enqueue_control(reply);
                        }
                    }
                }
                ReceiveOutcome::ParsedAsControl
            }
            _ => {
                self.handle_pgn(&packet);
                ReceiveOutcome::ParsedAsPgn
            }
        }
    }

    //==================================================================================Parameter Group Decoding

    /// Decode a single-frame parameter group. Unknown PGNs and frames
    /// too short for their signal are left without effect.
    fn handle_pgn(&mut self, packet: &J1939Packet) {
        let data = &packet.data[..packet.len];
        match packet.pgn {
            PGN_FAULT_DM1 => self.handle_dm1(data, packet.source_address),
            PGN_ODOMETER_HI_RES => {
                if let Some(raw) = le::available_u32(data, 0) {
                    self.hi_res_odometer_seen = true;
                    self.engine
                        .check_odometer(BusType::J1939, u64::from(raw) * 5);
                }
            }
            PGN_ODOMETER_LO_RES => {
                if self.hi_res_odometer_seen {
                    return;
                }
                if let Some(raw) = le::available_u32(data, 4) {
                    self.engine
                        .check_odometer(BusType::J1939, u64::from(raw) * 125);
                }
            }
            PGN_FUEL_CONSUMPTION => {
                if let Some(raw) = le::available_u32(data, 4) {
                    self.engine
                        .check_fuel_consumption(BusType::J1939, u64::from(raw) * 500);
                }
            }
            PGN_FUEL_ECONOMY => {
                if let Some(raw) = le::available_u16(data, 4) {
                    self.engine
                        .check_fuel_economy(BusType::J1939, u32::from(raw) * 1000 / 512);
                }
            }
            PGN_PARKING_BRAKE => {
                let Some(&status) = data.first() else { return };
                let sample = match status & 0x0C {
                    0x04 => true,
                    0x00 => false,
                    // Error / not-available patterns carry no sample.
                    _ => return,
                };
                let conflict_default = self.engine.config().parking_brake_conflict_default;
                if let Some(engaged) = self.parking_brake.push(sample, conflict_default) {
                    self.engine.check_parking_brake(BusType::J1939, engaged);
                }
            }
            PGN_VIN => {
                // Short identification numbers fit a single frame.
                let vin = VinString::from_bytes(data);
                self.engine.check_vin(BusType::J1939, &vin);
            }
            PGN_TRANSMISSION_GEAR => {
                let Some(&gear) = data.get(3) else { return };
                if gear == 0xFF {
                    return;
                }
                let reverse = gear > 0 && gear < 125;
                self.engine.check_reverse_gear(BusType::J1939, reverse);
            }
            _ => {}
        }
    }

    /// Active-fault report (DM1): two lamp-status bytes followed by
    /// four-byte trouble-code groups. An all-zero or all-ones group
    /// terminates the list. Codes accumulate in the per-bus collector
    /// until [`Self::flush_dtcs`], so reports from every node on the
    /// bus are reconciled against the engine state together.
    fn handle_dm1(&mut self, data: &[u8], source_address: u8) {
        if data.len() < 2 {
            return;
        }
        self.dtcs.merge_lamps(lamp_bits_from_status(data[0]));
        self.dtcs.merge_lamps(lamp_bits_from_flash_status(data[1]));

        let mut cursor = 2;
        while cursor + 4 <= data.len() {
            let group = [
                data[cursor],
                data[cursor + 1],
                data[cursor + 2],
                data[cursor + 3],
            ];
            if group == [0; 4] || group == [0xFF; 4] {
                break;
            }
            let value = (u32::from(group[3] & 0x80) << 24)
                | u32::from(group[2]) << 16
                | u32::from(group[1]) << 8
                | u32::from(group[0]);
            let occurrence_count = group[3] & 0x7F;
            self.dtcs.add(value, occurrence_count, source_address);
            cursor += 4;
        }

        self.lamps = self.dtcs.lamps();
    }

    /// Reconcile the fault codes collected since the previous flush
    /// against the engine state and start a fresh collection period.
    /// The host calls this on its collection timer. Returns the change
    /// counters packed as `added << 8 | removed`.
    pub fn flush_dtcs(&mut self) -> u16 {
        let changes = self.engine.check_dtcs(BusType::J1939, self.dtcs.dtcs());
        self.dtcs.clear();
        changes
    }

    /// Dispatch a reassembled multi-packet parameter group.
    fn process_completed(&mut self, transfer: &CompletedTransfer) {
        match transfer.pgn {
            PGN_VIN => {
                let vin = VinString::from_bytes(transfer.as_slice());
                self.engine.check_vin(BusType::J1939, &vin);
            }
            PGN_FAULT_DM1 => self.handle_dm1(transfer.as_slice(), transfer.source_address),
            _ => {}
        }
    }

    //==================================================================================Outbound

    /// Ask a node (or everyone) to transmit a parameter group. Requires
    /// a claimed address.
    pub fn request_pgn(&self, pgn: u32, destination: u8) -> Result<(), RequestError> {
        let source = self.claim.address().ok_or(RequestError::NoClaimedAddress)?;
        let id = CanId::builder(0xEA00, source)
            .to_destination(destination)
            .build()?;
        let mut data = [0xFFu8; 8];
        le::put_pgn(&mut data, 0, pgn);
        let frame = CanFrame { id, data, len: 3 };
        self.outgoing
            .try_send(OutgoingFrame::immediate(frame))
            .map_err(|_| RequestError::QueueFull)
    }

    /// Ask every node for the vehicle identification number.
    pub fn request_vin(&self) -> Result<(), RequestError> {
        self.request_pgn(PGN_VIN, GLOBAL_ADDRESS)
    }

    fn enqueue(&self, frame: OutgoingFrame) {
        if self.outgoing.try_send(frame).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("j1939: outgoing queue full, frame dropped");
        }
    }

    /// Wrap a transport-protocol reply into a TP.CM frame from our
    /// address.
    fn enqueue_control(&self, reply: ControlFrame) {
        let Some(source) = self.claim.address() else {
            return;
        };
        let Ok(id) = CanId::builder(u32::from(PF_TP_CM) << 8, source)
            .with_priority(TP_PRIORITY)
            .to_destination(reply.destination)
            .build()
        else {
            return;
        };
        self.enqueue(OutgoingFrame::immediate(CanFrame {
            id,
            data: reply.data,
            len: 8,
        }));
    }
}
