//! Accumulation of diagnostic trouble codes and indicator-lamp state
//! across a collection period. One collector instance lives per bus;
//! fault reports from every node on the bus add into it until the host
//! flushes it into the engine state, which diffs the collected list
//! against what it last saw.
use crate::core::Dtc;

//==================================================================================Constants

/// Upper bound on distinct codes kept from a single fault report.
pub const MAX_DTCS: usize = 20;

// Lamp status bits, one per indicator. The `FLASH` variants mirror the
// second DM1 status byte.
pub const LAMP_PROTECT: u8 = 0x01;
pub const LAMP_AMBER_WARNING: u8 = 0x02;
pub const LAMP_RED_STOP: u8 = 0x04;
pub const LAMP_MALFUNCTION_INDICATOR: u8 = 0x08;
pub const LAMP_FLASH_PROTECT: u8 = 0x10;
pub const LAMP_FLASH_AMBER_WARNING: u8 = 0x20;
pub const LAMP_FLASH_RED_STOP: u8 = 0x40;
pub const LAMP_FLASH_MALFUNCTION_INDICATOR: u8 = 0x80;

//==================================================================================Structs

/// Fixed-capacity set of trouble codes keyed by their 32-bit value,
/// plus the ORed lamp bits reported alongside them.
#[derive(Debug, Clone, Copy)]
pub struct DtcCollector {
    dtcs: [Dtc; MAX_DTCS],
    count: usize,
    lamps: u8,
}

impl Default for DtcCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl DtcCollector {
    pub const fn new() -> Self {
        Self {
            dtcs: [Dtc {
                value: 0,
                occurrence_count: 0,
                source_address: 0,
            }; MAX_DTCS],
            count: 0,
            lamps: 0,
        }
    }

    /// Record a code. A value already present is refreshed in place;
    /// a new value is appended while capacity lasts.
    pub fn add(&mut self, value: u32, occurrence_count: u8, source_address: u8) {
        for dtc in self.dtcs[..self.count].iter_mut() {
            if dtc.value == value {
                dtc.occurrence_count = occurrence_count;
                dtc.source_address = source_address;
                return;
            }
        }
        if self.count == MAX_DTCS {
            #[cfg(feature = "defmt")]
            defmt::warn!("dtc: collector full, code {=u32:#x} dropped", value);
            return;
        }
        self.dtcs[self.count] = Dtc {
            value,
            occurrence_count,
            source_address,
        };
        self.count += 1;
    }

    /// Drop the collected codes and lamps at the end of a collection
    /// period.
    pub fn clear(&mut self) {
        self.count = 0;
        self.lamps = 0;
    }

    /// OR in lamp bits reported with the codes.
    #[inline]
    pub fn merge_lamps(&mut self, bits: u8) {
        self.lamps |= bits;
    }

    #[inline]
    pub fn dtcs(&self) -> &[Dtc] {
        &self.dtcs[..self.count]
    }

    #[inline]
    pub fn lamps(&self) -> u8 {
        self.lamps
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

//==================================================================================Lamp Decoding

/// Decode a 2-bit-per-lamp status byte (protect in bits 0-1, amber in
/// 2-3, red stop in 4-5, malfunction indicator in 6-7). Only the `01`
/// pattern means on; `00`, `10` and `11` (off, error, unavailable) all
/// leave the lamp dark.
pub fn lamp_bits_from_status(status: u8) -> u8 {
    let mut bits = 0;
    if status & 0x03 == 0x01 {
        bits |= LAMP_PROTECT;
    }
    if status & 0x0C == 0x04 {
        bits |= LAMP_AMBER_WARNING;
    }
    if status & 0x30 == 0x10 {
        bits |= LAMP_RED_STOP;
    }
    if status & 0xC0 == 0x40 {
        bits |= LAMP_MALFUNCTION_INDICATOR;
    }
    bits
}

/// Decode the flash-status byte that accompanies the lamp byte in DM1.
#[inline]
pub fn lamp_bits_from_flash_status(flash: u8) -> u8 {
    lamp_bits_from_status(flash) << 4
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
