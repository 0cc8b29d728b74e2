//! SAE J1587 receive path: walks the parameter stream of a J1708 frame
//! and decodes the vehicle-signal parameters into the engine state.
//! J1587 carries the same signals as J1939 at a lower fidelity, so
//! everything it reports goes through the engine's source arbitration.
use crate::core::{BusType, VinString};
use crate::engine::{Engine, EventSink};
use crate::error::J1708BuildError;
use crate::infra::codec::le;
use crate::protocol::dtc::{lamp_bits_from_status, DtcCollector};
use crate::protocol::transport::can_frame::J1708Frame;

//==================================================================================Constants

// Decoded parameter identifiers (page 1).
pub const PID_LAMP_STATUS: u16 = 44;
pub const PID_DIAGNOSTICS: u16 = 194;
pub const PID_VIN: u16 = 237;
pub const PID_ODOMETER: u16 = 245;
pub const PID_FUEL_CONSUMPTION: u16 = 250;

/// First data byte announcing that every parameter in the frame lives
/// on page 2.
const PAGE_2_MARKER: u8 = 255;
const PAGE_2_OFFSET: u16 = 256;
/// In-page escape to the extension pages, which are not decoded.
const PID_ESCAPE: u8 = 254;

/// Lowest MID a compliant node transmits with.
const MIN_MID: u8 = 128;

/// Identity used when requesting parameters.
pub const REQUEST_MID: u8 = 180;
const REQUEST_PRIORITY: u8 = 8;
/// Parameter that carries a request for another parameter.
const PID_REQUEST: u8 = 0;

// Signal scaling.
const ODOMETER_METERS_PER_BIT: u64 = 161;
const FUEL_MILLILITERS_PER_BIT: u64 = 473;

/// Trouble codes on this bus are not tied to a source address.
const DTC_NO_SOURCE: u8 = 0xFF;

pub const MAX_PARSED_PIDS: usize = 8;

//==================================================================================Structs

/// Parameters a frame walk decoded, in stream order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsedPids {
    pids: [u16; MAX_PARSED_PIDS],
    len: usize,
}

impl ParsedPids {
    const fn new() -> Self {
        Self {
            pids: [0; MAX_PARSED_PIDS],
            len: 0,
        }
    }

    fn push(&mut self, pid: u16) {
        if self.len < MAX_PARSED_PIDS {
            self.pids[self.len] = pid;
            self.len += 1;
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.pids[..self.len]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// J1587 side of the decoder.
pub struct J1587Bus<'e, E: EventSink> {
    engine: &'e Engine<E>,
    /// Fault codes reported since the last flush, across every node on
    /// the bus.
    dtcs: DtcCollector,
    /// Indicator-lamp bits from the latest lamp-status parameter.
    lamps: u8,
}

impl<'e, E: EventSink> J1587Bus<'e, E> {
    pub fn new(engine: &'e Engine<E>) -> Self {
        Self {
            engine,
            dtcs: DtcCollector::new(),
            lamps: 0,
        }
    }

    #[inline]
    pub fn lamp_status(&self) -> u8 {
        self.lamps
    }

    //==================================================================================Receive Path

    /// Walk the parameter stream of one frame. Returns every parameter
    /// that was walked, tracked or not, or `None` when the frame is not
    /// decodable: a MID below the transmit range, an empty payload, an
    /// escape to an extension page, or a parameter truncated by the end
    /// of the frame.
    pub fn receive_frame(&mut self, frame: &J1708Frame) -> Option<ParsedPids> {
        if frame.mid < MIN_MID {
            return None;
        }
        let data = frame.payload();
        if data.is_empty() {
            return None;
        }

        // A leading 255 moves every parameter of the frame to page 2.
        let (mut index, page) = if data[0] == PAGE_2_MARKER {
            (1, PAGE_2_OFFSET)
        } else {
            (0, 0)
        };

        let mut parsed = ParsedPids::new();
        while index < data.len() {
            let in_page = data[index];
            index += 1;
            if in_page == PID_ESCAPE {
                #[cfg(feature = "defmt")]
                defmt::debug!("j1587: extension-page escape, frame dropped");
                return None;
            }
            let pid = u16::from(in_page) + page;

            // Field width is dictated by the in-page identifier: one
            // byte up to 127, two bytes up to 191, length-prefixed
            // beyond.
            let field_len = match in_page {
                0..=127 => 1,
                128..=191 => 2,
                _ => {
                    let prefix = *data.get(index)? as usize;
                    index += 1;
                    prefix
                }
            };
            if index + field_len > data.len() {
                #[cfg(feature = "defmt")]
                defmt::debug!("j1587: truncated parameter {=u16}, frame dropped", pid);
                return None;
            }
            let field = &data[index..index + field_len];
            index += field_len;

            self.handle_pid(pid, field, frame.mid);
            parsed.push(pid);
        }
        if parsed.is_empty() {
            return None;
        }
        Some(parsed)
    }

    /// Decode one parameter. Untracked parameters are walked past
    /// without effect.
    fn handle_pid(&mut self, pid: u16, field: &[u8], mid: u8) {
        match pid {
            PID_LAMP_STATUS => {
                let Some(&status) = field.first() else {
                    return;
                };
                self.lamps = lamp_bits_from_status(status);
            }
            PID_DIAGNOSTICS => self.handle_diagnostics(field, mid),
            PID_VIN => {
                let vin = VinString::from_bytes(field);
                self.engine.check_vin(BusType::J1587, &vin);
            }
            PID_ODOMETER => {
                let Some(raw) = exactly_u32(field) else {
                    return;
                };
                self.engine
                    .check_odometer(BusType::J1587, u64::from(raw) * ODOMETER_METERS_PER_BIT);
            }
            PID_FUEL_CONSUMPTION => {
                let Some(raw) = exactly_u32(field) else {
                    return;
                };
                self.engine.check_fuel_consumption(
                    BusType::J1587,
                    u64::from(raw) * FUEL_MILLILITERS_PER_BIT,
                );
            }
            _ => {}
        }
    }

    /// Diagnostic-code parameter: a stream of (subsystem PID, code
    /// character) pairs, with an occurrence count appended when the
    /// code character announces one. A zero or all-ones subsystem byte
    /// ends the stream. Codes accumulate in the per-bus collector until
    /// [`Self::flush_dtcs`].
    fn handle_diagnostics(&mut self, field: &[u8], mid: u8) {
        let mut cursor = 0;
        while cursor + 1 < field.len() {
            let subsystem = field[cursor];
            if subsystem == 0 || subsystem == 0xFF {
                break;
            }
            let code = field[cursor + 1];
            let mut occurrence_count = 0;
            let mut step = 2;
            if code & 0x80 != 0 {
                let Some(&count) = field.get(cursor + 2) else {
                    break;
                };
                occurrence_count = count;
                step = 3;
            }
            let value =
                u32::from(subsystem) | u32::from(mid) << 8 | u32::from(code & 0x7F) << 16;
            self.dtcs.add(value, occurrence_count, DTC_NO_SOURCE);
            cursor += step;
        }
    }

    /// Reconcile the fault codes collected since the previous flush
    /// against the engine state and start a fresh collection period.
    /// The host calls this on its collection timer. Returns the change
    /// counters packed as `added << 8 | removed`.
    pub fn flush_dtcs(&mut self) -> u16 {
        let changes = self.engine.check_dtcs(BusType::J1587, self.dtcs.dtcs());
        self.dtcs.clear();
        changes
    }

    //==================================================================================Outbound

    /// Build the frame requesting a parameter from every node.
    pub fn request_pid(&self, pid: u8) -> Result<J1708Frame, J1708BuildError> {
        J1708Frame::new(REQUEST_PRIORITY, REQUEST_MID, &[PID_REQUEST, pid])
    }
}

/// Fixed-width field holding a Little Endian `u32`, rejected when the
/// transmitter sent a different width.
fn exactly_u32(field: &[u8]) -> Option<u32> {
    if field.len() != 4 {
        return None;
    }
    le::u32_at(field, 0)
}
