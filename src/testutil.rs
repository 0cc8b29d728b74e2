//! Test doubles shared by the unit tests.
use core::cell::RefCell;

use crate::engine::EventSink;

const MAX_RECORDED: usize = 32;

/// One captured event with its optional payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub code: u8,
    pub extra: [u8; 8],
    pub extra_len: usize,
}

impl Recorded {
    pub fn extra(&self) -> &[u8] {
        &self.extra[..self.extra_len]
    }
}

/// Event sink that records everything it is handed.
pub struct RecordingSink {
    log: RefCell<[Option<Recorded>; MAX_RECORDED]>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    pub const fn new() -> Self {
        Self {
            log: RefCell::new([None; MAX_RECORDED]),
        }
    }

    pub fn len(&self) -> usize {
        self.log.borrow().iter().filter(|slot| slot.is_some()).count()
    }

    pub fn get(&self, index: usize) -> Recorded {
        self.log.borrow()[index].unwrap()
    }

    pub fn count_of(&self, code: u8) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|slot| slot.map(|event| event.code) == Some(code))
            .count()
    }

    fn push(&self, code: u8, payload: &[u8]) {
        let mut log = self.log.borrow_mut();
        let slot = log
            .iter_mut()
            .find(|slot| slot.is_none())
            .expect("event log full");
        let mut extra = [0u8; 8];
        extra[..payload.len()].copy_from_slice(payload);
        *slot = Some(Recorded {
            code,
            extra,
            extra_len: payload.len(),
        });
    }
}

impl EventSink for RecordingSink {
    fn add_event(&self, code: u8) {
        self.push(code, &[]);
    }

    fn add_event_with_extra(&self, code: u8, extra: &[u8]) {
        self.push(code, extra);
    }
}
