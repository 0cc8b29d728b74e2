//! J1939-81 address-claim state machine. The node announces the source
//! address it intends to use, defends it against weaker claimants, and
//! falls back to the self-configurable range (128-247) when a stronger
//! NAME takes the address away.
//!
//! The machine is purely synchronous: every transition that puts a
//! frame on the wire returns it (with its send delay) for the caller to
//! enqueue, and the listening windows are driven by the host through
//! [`super::ADDRESS_CLAIM_WAIT_WINDOW_MS`] and
//! [`super::ADDRESS_COLLECT_WINDOW_MS`].
use crate::protocol::managment::{node_name::NodeName, ADDRESS_MAX_CANNOT_CLAIM_DELAY_MS};
use crate::protocol::transport::{
    can_frame::{CanFrame, OutgoingFrame},
    can_id::{CanId, J1939Packet},
};

//==================================================================================Constants

/// Source address of a node that holds no address (cannot-claim sender).
pub const NULL_ADDRESS: u8 = 254;
/// Broadcast destination.
pub const GLOBAL_ADDRESS: u8 = 255;

/// Bounds of the self-configurable address range.
pub const ARBITRARY_ADDRESS_MIN: u8 = 128;
pub const ARBITRARY_ADDRESS_MAX: u8 = 247;
const ARBITRARY_ADDRESS_COUNT: usize =
    (ARBITRARY_ADDRESS_MAX - ARBITRARY_ADDRESS_MIN) as usize + 1;

/// PDU Format of an address-claimed (or cannot-claim) frame.
pub const PF_CLAIMED_ADDRESS: u8 = 0xEE;
/// PDU Format of a PGN request.
pub const PF_REQUEST: u8 = 0xEA;

/// Parameter group carried by claim frames, as encoded in a request.
pub const PGN_ADDRESS_CLAIMED: u32 = 0xEE00;

const CLAIM_PRIORITY: u32 = 6;

//==================================================================================Enums and Structs

/// Outcome of a claimed-address frame received from the network.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// The claim does not touch the address we hold or want.
    Unaffected,
    /// A weaker claimant contested our address; re-assert it.
    Defended(OutgoingFrame),
    /// A stronger claimant took our address. The caller must drop any
    /// transfer in progress; the returned frame asks every node for its
    /// claimed address so a free one can be picked once the collection
    /// window closes.
    Surrendered(OutgoingFrame),
}

/// Outcome of closing the collection window.
#[derive(Debug)]
pub enum CollectOutcome {
    /// A free self-configurable address was found and a fresh claim for
    /// it is ready to send.
    Claiming(OutgoingFrame),
    /// Every self-configurable address is taken; the frame is the
    /// delayed cannot-claim announcement.
    AddressExhausted(OutgoingFrame),
}

/// Claim progress, mirrored by [`AddressClaim::address`] returning
/// `Some` only in the `Claimed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimState {
    /// No claim sent yet.
    Idle,
    /// Claim announced, waiting out the objection window.
    Attempting,
    /// Address held.
    Claimed,
    /// Collecting claimed addresses before retrying.
    Collecting,
    /// No address available.
    CannotClaim,
}

/// Address-claim state machine for a single node.
#[derive(Debug)]
pub struct AddressClaim {
    name: NodeName,
    state: ClaimState,
    /// Address being announced or held, depending on the state.
    candidate: u8,
    /// Whether a claim attempt ever resolved (confirmed or defeated).
    /// Decides between silence and a cannot-claim reply when addresses
    /// are requested.
    claim_attempted: bool,
    /// Addresses observed on the bus, indexed from
    /// [`ARBITRARY_ADDRESS_MIN`].
    in_use: [bool; ARBITRARY_ADDRESS_COUNT],
}

impl AddressClaim {
    /// Create the machine; `preferred_address` is announced by the
    /// first [`Self::begin_claim`].
    pub const fn new(name: NodeName, preferred_address: u8) -> Self {
        Self {
            name,
            state: ClaimState::Idle,
            candidate: preferred_address,
            claim_attempted: false,
            in_use: [false; ARBITRARY_ADDRESS_COUNT],
        }
    }

    /// Address currently held, once the objection window has been
    /// confirmed by the host.
    #[inline]
    pub fn address(&self) -> Option<u8> {
        (self.state == ClaimState::Claimed).then_some(self.candidate)
    }

    /// Whether a claim is announced and its objection window open.
    #[inline]
    pub fn is_attempting(&self) -> bool {
        self.state == ClaimState::Attempting
    }

    #[inline]
    pub fn node_name(&self) -> NodeName {
        self.name
    }

    //==================================================================================Claim Transitions

    /// Announce the candidate address. The host must wait
    /// [`super::ADDRESS_CLAIM_WAIT_WINDOW_MS`] and then call
    /// [`Self::confirm_claim`].
    pub fn begin_claim(&mut self) -> OutgoingFrame {
        self.state = ClaimState::Attempting;
        #[cfg(feature = "defmt")]
        defmt::info!("claim: announcing address {=u8:#x}", self.candidate);
        OutgoingFrame::immediate(self.claim_frame(self.candidate))
    }

    /// Close the objection window. Returns the address now held, or
    /// `None` when the claim was defeated while waiting.
    pub fn confirm_claim(&mut self) -> Option<u8> {
        if self.state != ClaimState::Attempting {
            return None;
        }
        self.state = ClaimState::Claimed;
        self.claim_attempted = true;
        #[cfg(feature = "defmt")]
        defmt::info!("claim: address {=u8:#x} confirmed", self.candidate);
        Some(self.candidate)
    }

    /// Close the collection window opened by a surrender: pick the
    /// lowest unobserved self-configurable address, or give up.
    pub fn finish_collect(&mut self) -> CollectOutcome {
        let free = self
            .in_use
            .iter()
            .position(|taken| !taken)
            .map(|index| ARBITRARY_ADDRESS_MIN + index as u8);

        match free {
            Some(address) => {
                self.candidate = address;
                CollectOutcome::Claiming(self.begin_claim())
            }
            None => {
                self.state = ClaimState::CannotClaim;
                #[cfg(feature = "defmt")]
                defmt::warn!("claim: no self-configurable address available");
                CollectOutcome::AddressExhausted(self.cannot_claim_frame())
            }
        }
    }

    /// Re-announce the held address. Used when another node transmits
    /// with our source address without having claimed it.
    pub fn reassert(&self) -> Option<OutgoingFrame> {
        self.address()
            .map(|address| OutgoingFrame::immediate(self.claim_frame(address)))
    }

    //==================================================================================Network Inputs

    /// Record the source address of any received frame. Keeps the
    /// in-use table current for the next collection window.
    pub fn mark_address_in_use(&mut self, source: u8) {
        if (ARBITRARY_ADDRESS_MIN..=ARBITRARY_ADDRESS_MAX).contains(&source) {
            self.in_use[(source - ARBITRARY_ADDRESS_MIN) as usize] = true;
        }
    }

    /// Answer a request for the address-claimed parameter group.
    ///
    /// A node holding an address replies with its claim; a node that
    /// tried and failed replies cannot-claim after a NAME-derived
    /// delay; a node that never claimed stays silent.
    pub fn handle_address_request(&mut self, packet: &J1939Packet) -> Option<OutgoingFrame> {
        if packet.len < 3 {
            return None;
        }
        let requested =
            u32::from(packet.data[0]) | u32::from(packet.data[1]) << 8 | u32::from(packet.data[2]) << 16;
        if requested != PGN_ADDRESS_CLAIMED {
            return None;
        }

        match self.state {
            ClaimState::Claimed => {
                Some(OutgoingFrame::immediate(self.claim_frame(self.candidate)))
            }
            // An unresolved attempt stays silent; the objection window
            // has not closed yet.
            ClaimState::Attempting => None,
            _ if self.claim_attempted => Some(self.cannot_claim_frame()),
            _ => None,
        }
    }

    /// Arbitrate a claimed-address frame against our own claim.
    pub fn handle_claimed_address(&mut self, packet: &J1939Packet) -> ClaimOutcome {
        // Cannot-claim announcements never contest anything.
        if packet.source_address == NULL_ADDRESS {
            return ClaimOutcome::Unaffected;
        }
        let contested = match self.state {
            ClaimState::Claimed | ClaimState::Attempting => {
                packet.source_address == self.candidate
            }
            _ => false,
        };
        if !contested || packet.len < 8 {
            return ClaimOutcome::Unaffected;
        }

        let claimant = NodeName::from_le_bytes(packet.data);
        if self.name.outranks(&claimant) {
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "claim: defending address {=u8:#x} against weaker NAME",
                self.candidate
            );
            return ClaimOutcome::Defended(OutgoingFrame::immediate(
                self.claim_frame(self.candidate),
            ));
        }

        // Lost the arbitration: surrender the address and ask the
        // network who holds what before picking a new one.
        #[cfg(feature = "defmt")]
        defmt::warn!("claim: address {=u8:#x} lost to stronger NAME", self.candidate);
        self.state = ClaimState::Collecting;
        self.claim_attempted = true;
        self.in_use = [false; ARBITRARY_ADDRESS_COUNT];
        self.mark_address_in_use(packet.source_address);
        ClaimOutcome::Surrendered(OutgoingFrame::immediate(self.request_addresses_frame()))
    }

    //==================================================================================Frame Builders

    /// Claim (or cannot-claim, from the null address) frame: NAME in
    /// Little Endian, broadcast to every node.
    fn claim_frame(&self, source: u8) -> CanFrame {
        let id = CanId(
            CLAIM_PRIORITY << 26
                | u32::from(PF_CLAIMED_ADDRESS) << 16
                | u32::from(GLOBAL_ADDRESS) << 8
                | u32::from(source),
        );
        CanFrame {
            id,
            data: self.name.to_le_bytes(),
            len: 8,
        }
    }

    /// Cannot-claim announcement, held back by a NAME-derived
    /// pseudo-random delay so colliding nodes do not answer in step.
    fn cannot_claim_frame(&self) -> OutgoingFrame {
        OutgoingFrame {
            frame: self.claim_frame(NULL_ADDRESS),
            delay_ms: (self.name.raw() % u64::from(ADDRESS_MAX_CANNOT_CLAIM_DELAY_MS + 1)) as u32,
        }
    }

    /// Global request for the address-claimed parameter group, sent
    /// from the null address while we hold none.
    fn request_addresses_frame(&self) -> CanFrame {
        let id = CanId(
            CLAIM_PRIORITY << 26
                | u32::from(PF_REQUEST) << 16
                | u32::from(GLOBAL_ADDRESS) << 8
                | u32::from(NULL_ADDRESS),
        );
        let mut data = [0xFFu8; 8];
        data[0] = (PGN_ADDRESS_CLAIMED & 0xFF) as u8;
        data[1] = ((PGN_ADDRESS_CLAIMED >> 8) & 0xFF) as u8;
        data[2] = ((PGN_ADDRESS_CLAIMED >> 16) & 0xFF) as u8;
        CanFrame { id, data, len: 3 }
    }
}
