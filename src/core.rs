//! Data contract shared by the per-bus decoders and the aggregation
//! engine: which bus a value came from, trouble-code records, the
//! published signal snapshot, and the event codes raised on transitions.

/// Longest VIN payload we will store. VINs are 17 characters but some
/// ECUs pad or append a terminator, so leave headroom.
pub const MAX_VIN_BYTES: usize = 24;

//==================================================================================BUS_TYPE

/// Identifies which physical bus produced a piece of information.
///
/// The discriminants are wire values carried in event payloads and must
/// not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BusType {
    /// No bus has reported this value yet.
    None = 0,
    /// SAE J1939 over CAN.
    J1939 = 1,
    /// SAE J1587 over the J1708 serial bus.
    J1587 = 4,
}

impl BusType {
    /// Wire value used in event payloads.
    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Relative trust rank. J1939 data wins over J1587, which wins over
    /// an unpopulated slot.
    const fn rank(self) -> u8 {
        match self {
            BusType::None => 0,
            BusType::J1587 => 1,
            BusType::J1939 => 2,
        }
    }

    /// Whether a value arriving from `self` may overwrite a value that
    /// was last written by `previous`. Reflexive: a bus always has
    /// priority over itself.
    #[inline]
    pub const fn has_priority_over(self, previous: BusType) -> bool {
        self.rank() >= previous.rank()
    }
}

//==================================================================================DTC

/// One diagnostic trouble code as reported on a bus.
///
/// Identity is `value` alone; `occurrence_count` and `source_address`
/// are mutable attributes of an existing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dtc {
    /// Normalized 32-bit code. The layout differs per bus but the value
    /// is opaque at this level.
    pub value: u32,
    /// Number of times the fault occurred (0-127), when reported.
    pub occurrence_count: u8,
    /// Address of the node that reported the fault. `0xFF` when the bus
    /// does not carry one.
    pub source_address: u8,
}

//==================================================================================VIN

/// Fixed-capacity VIN buffer. ASCII as received from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VinString {
    len: usize,
    data: [u8; MAX_VIN_BYTES],
}

impl Default for VinString {
    fn default() -> Self {
        Self::new()
    }
}

impl VinString {
    /// Create an empty VIN.
    pub const fn new() -> Self {
        Self {
            len: 0,
            data: [0; MAX_VIN_BYTES],
        }
    }

    /// Copy raw bytes, clamping to capacity.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut vin = Self::new();
        let clamped = bytes.len().min(MAX_VIN_BYTES);
        vin.data[..clamped].copy_from_slice(&bytes[..clamped]);
        vin.len = clamped;
        vin
    }

    /// Number of valid bytes stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether no VIN has been stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Immutable view over the populated bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The VIN as a string slice, when it is valid ASCII/UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }
}

//==================================================================================SIGNALS

/// Consistent copy of the published vehicle signals, as returned by
/// [`Engine::snapshot`](crate::engine::Engine::snapshot). `None` means
/// no bus has reported the value yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleSignals {
    /// Total vehicle distance in meters.
    pub odometer_m: Option<u64>,
    /// Total fuel used in milliliters.
    pub fuel_ml: Option<u64>,
    /// Average fuel economy in meters per liter.
    pub fuel_mpl: Option<u32>,
    /// Parking brake engaged.
    pub parking_brake: Option<bool>,
    /// A reverse gear is selected.
    pub reverse_gear: Option<bool>,
    /// Vehicle identification number, empty until decoded.
    pub vin: VinString,
}

//==================================================================================EVENT_CODES

/// Event codes raised through the [`EventSink`](crate::engine::EventSink)
/// on signal and fault transitions. Values are part of the device's
/// outbound record format.
pub mod event {
    /// Generic error record; payload byte 0 carries an error code.
    pub const ERROR: u8 = 12;
    /// Error code: no free J1939 address could be claimed.
    pub const ERROR_J1939_NO_ADDRESS_AVAILABLE: u8 = 21;

    pub const REVERSE_ON: u8 = 70;
    pub const PARKBRAKE_ON: u8 = 71;
    /// Payload: `[bus_type, dtc_value as 4 LE bytes]`.
    pub const FAULTCODE_ON: u8 = 72;
    pub const REVERSE_OFF: u8 = 80;
    pub const PARKBRAKE_OFF: u8 = 81;
    /// Payload: `[bus_type, dtc_value as 4 LE bytes]`.
    pub const FAULTCODE_OFF: u8 = 82;
}
