//! Test doubles shared by the integration scenarios.
use std::sync::Mutex;

use hv_vbus::engine::EventSink;
use hv_vbus::protocol::transport::can_frame::CanFrame;
use hv_vbus::protocol::transport::can_id::CanId;

/// One captured event with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub code: u8,
    pub extra: Vec<u8>,
}

/// Event sink that records everything it is handed.
#[derive(Default)]
pub struct HostEventLog {
    events: Mutex<Vec<CapturedEvent>>,
}

#[allow(dead_code)]
impl HostEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_of(&self, code: u8) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.code == code)
            .count()
    }
}

impl EventSink for HostEventLog {
    fn add_event(&self, code: u8) {
        self.events.lock().unwrap().push(CapturedEvent {
            code,
            extra: Vec::new(),
        });
    }

    fn add_event_with_extra(&self, code: u8, extra: &[u8]) {
        self.events.lock().unwrap().push(CapturedEvent {
            code,
            extra: extra.to_vec(),
        });
    }
}

/// Build a received CAN frame from a raw identifier and payload,
/// padding the data bytes with 0xFF like an idle bus line.
#[allow(dead_code)]
pub fn can_frame(id: u32, data: &[u8]) -> CanFrame {
    let mut buffer = [0xFFu8; 8];
    buffer[..data.len()].copy_from_slice(data);
    CanFrame {
        id: CanId(id),
        data: buffer,
        len: 8,
    }
}
