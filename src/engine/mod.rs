//! Shared vehicle state fed by both bus decoders. The engine arbitrates
//! between sources reporting the same signal, raises events on the
//! transitions the host cares about, and hands out consistent
//! snapshots.
//!
//! Interior mutability follows the usual pattern for state shared
//! between interrupt-driven readers: a blocking mutex over a `RefCell`,
//! locked only for short critical sections.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::core::{event, BusType, Dtc, VehicleSignals, VinString};

//==================================================================================Constants

/// Distinct fault codes tracked per bus.
pub const MAX_TRACKED_DTCS: usize = 20;

//==================================================================================Traits

/// Host-provided outlet for vehicle events. Implementations must be
/// callable from the receive path, so both methods take `&self`.
pub trait EventSink {
    /// Record an event identified by its code.
    fn add_event(&self, code: u8);

    /// Record an event carrying extra payload bytes, such as the fault
    /// code a FAULTCODE event refers to.
    fn add_event_with_extra(&self, code: u8, extra: &[u8]);
}

//==================================================================================Structs

/// Tuning knobs for signal interpretation.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Parking-brake value adopted when the debounce window closes on
    /// disagreeing samples.
    pub parking_brake_conflict_default: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parking_brake_conflict_default: true,
        }
    }
}

/// One signal slot: the value last accepted and the bus it came from.
#[derive(Debug, Clone, Copy)]
struct Sourced<T> {
    value: Option<T>,
    bus: BusType,
}

impl<T> Sourced<T> {
    const fn empty() -> Self {
        Self {
            value: None,
            bus: BusType::None,
        }
    }
}

/// Fault-code values currently believed active on one bus.
#[derive(Debug, Clone, Copy)]
struct DtcSet {
    values: [u32; MAX_TRACKED_DTCS],
    len: usize,
}

impl DtcSet {
    const fn new() -> Self {
        Self {
            values: [0; MAX_TRACKED_DTCS],
            len: 0,
        }
    }

    fn as_slice(&self) -> &[u32] {
        &self.values[..self.len]
    }

    fn contains(&self, value: u32) -> bool {
        self.as_slice().contains(&value)
    }

    fn replace_with(&mut self, reported: &[Dtc]) {
        self.len = 0;
        for dtc in reported.iter().take(MAX_TRACKED_DTCS) {
            if !self.contains(dtc.value) {
                self.values[self.len] = dtc.value;
                self.len += 1;
            }
        }
    }
}

#[derive(Debug)]
struct EngineState {
    odometer: Sourced<u64>,
    fuel: Sourced<u64>,
    economy: Sourced<u32>,
    parking_brake: Sourced<bool>,
    reverse_gear: Sourced<bool>,
    vin: Sourced<VinString>,
    dtcs_j1939: DtcSet,
    dtcs_j1587: DtcSet,
}

/// Central vehicle state. One instance is shared by reference between
/// the J1939 and J1587 decoders.
pub struct Engine<E: EventSink> {
    state: Mutex<CriticalSectionRawMutex, RefCell<EngineState>>,
    events: E,
    config: EngineConfig,
}

impl<E: EventSink> Engine<E> {
    pub fn new(config: EngineConfig, events: E) -> Self {
        Self {
            state: Mutex::new(RefCell::new(EngineState {
                odometer: Sourced::empty(),
                fuel: Sourced::empty(),
                economy: Sourced::empty(),
                parking_brake: Sourced::empty(),
                reverse_gear: Sourced::empty(),
                vin: Sourced::empty(),
                dtcs_j1939: DtcSet::new(),
                dtcs_j1587: DtcSet::new(),
            })),
            events,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// The host event outlet, also used by the decoders for protocol
    /// errors that are not tied to a signal.
    #[inline]
    pub fn events(&self) -> &E {
        &self.events
    }

    /// Consistent copy of every tracked signal.
    pub fn snapshot(&self) -> VehicleSignals {
        self.state.lock(|state| {
            let state = state.borrow();
            VehicleSignals {
                odometer_m: state.odometer.value,
                fuel_ml: state.fuel.value,
                fuel_mpl: state.economy.value,
                parking_brake: state.parking_brake.value,
                reverse_gear: state.reverse_gear.value,
                vin: state.vin.value.unwrap_or_default(),
            }
        })
    }

    //==================================================================================Signal Updates

    /// Total distance travelled, in meters.
    pub fn check_odometer(&self, bus: BusType, meters: u64) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let slot = &mut state.odometer;
            if !bus.has_priority_over(slot.bus) {
                return;
            }
            slot.bus = bus;
            slot.value = Some(meters);
        });
    }

    /// Total fuel used, in milliliters.
    pub fn check_fuel_consumption(&self, bus: BusType, milliliters: u64) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let slot = &mut state.fuel;
            if !bus.has_priority_over(slot.bus) {
                return;
            }
            slot.bus = bus;
            slot.value = Some(milliliters);
        });
    }

    /// Instantaneous fuel economy, in meters per liter.
    pub fn check_fuel_economy(&self, bus: BusType, meters_per_liter: u32) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let slot = &mut state.economy;
            if !bus.has_priority_over(slot.bus) {
                return;
            }
            slot.bus = bus;
            slot.value = Some(meters_per_liter);
        });
    }

    /// Parking-brake switch, after the decoder's debouncing. Raises an
    /// event on every transition.
    pub fn check_parking_brake(&self, bus: BusType, engaged: bool) {
        let changed = self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let slot = &mut state.parking_brake;
            if !bus.has_priority_over(slot.bus) {
                return false;
            }
            slot.bus = bus;
            if slot.value == Some(engaged) {
                return false;
            }
            slot.value = Some(engaged);
            true
        });
        if changed {
            self.events.add_event(if engaged {
                event::PARKBRAKE_ON
            } else {
                event::PARKBRAKE_OFF
            });
        }
    }

    /// Reverse-gear indication. Raises an event on every transition.
    pub fn check_reverse_gear(&self, bus: BusType, engaged: bool) {
        let changed = self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let slot = &mut state.reverse_gear;
            if !bus.has_priority_over(slot.bus) {
                return false;
            }
            slot.bus = bus;
            if slot.value == Some(engaged) {
                return false;
            }
            slot.value = Some(engaged);
            true
        });
        if changed {
            self.events.add_event(if engaged {
                event::REVERSE_ON
            } else {
                event::REVERSE_OFF
            });
        }
    }

    /// Vehicle identification number, replaced wholesale.
    pub fn check_vin(&self, bus: BusType, vin: &VinString) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let slot = &mut state.vin;
            if !bus.has_priority_over(slot.bus) {
                return;
            }
            slot.bus = bus;
            slot.value = Some(*vin);
        });
    }

    //==================================================================================Fault Codes

    /// Reconcile a freshly reported fault list against what this bus
    /// last reported. Codes are compared by value only: a change in
    /// occurrence count is not a transition.
    ///
    /// Raises one FAULTCODE event per appearing and per disappearing
    /// code, with the bus and the 32-bit value as payload. Returns the
    /// two change counters packed as `added << 8 | removed`.
    pub fn check_dtcs(&self, bus: BusType, reported: &[Dtc]) -> u16 {
        let mut appeared = [0u32; MAX_TRACKED_DTCS];
        let mut appeared_len = 0usize;
        let mut disappeared = [0u32; MAX_TRACKED_DTCS];
        let mut disappeared_len = 0usize;

        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let known = match bus {
                BusType::J1587 => &mut state.dtcs_j1587,
                _ => &mut state.dtcs_j1939,
            };

            for dtc in reported.iter().take(MAX_TRACKED_DTCS) {
                if !known.contains(dtc.value) && !appeared[..appeared_len].contains(&dtc.value) {
                    appeared[appeared_len] = dtc.value;
                    appeared_len += 1;
                }
            }
            for value in known.as_slice() {
                if !reported.iter().any(|dtc| dtc.value == *value) {
                    disappeared[disappeared_len] = *value;
                    disappeared_len += 1;
                }
            }
            known.replace_with(reported);
        });

        for value in &disappeared[..disappeared_len] {
            self.fault_event(event::FAULTCODE_OFF, bus, *value);
        }
        for value in &appeared[..appeared_len] {
            self.fault_event(event::FAULTCODE_ON, bus, *value);
        }

        ((appeared_len as u16) & 0xFF) << 8 | (disappeared_len as u16) & 0xFF
    }

    fn fault_event(&self, code: u8, bus: BusType, value: u32) {
        let mut extra = [0u8; 5];
        extra[0] = bus.as_byte();
        extra[1..5].copy_from_slice(&value.to_le_bytes());
        self.events.add_event_with_extra(code, &extra);
    }
}
