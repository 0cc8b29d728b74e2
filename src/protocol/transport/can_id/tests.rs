//! Unit tests for the `CanId` accessors, builder, and packet codec.
use super::*;
use crate::protocol::transport::can_frame::CanFrame;

//==================================================================================CAN_ID
#[test]
/// Extracts the identifier fields from a known raw ID.
fn test_identifier_split() {
    // Priority 5, PF 0xAA, PS (destination) 0xBB, source 0xF0.
    let can_id = CanId(0x14AABBF0);
    assert_eq!(can_id.priority(), 5);
    assert_eq!(can_id.pf(), 0xAA);
    assert_eq!(can_id.destination(), Some(0xBB));
    assert_eq!(can_id.source_address(), 0xF0);
}

#[test]
/// PDU1: PS encodes the destination and stays out of the PGN.
fn test_pgn_pdu1() {
    let can_id = CanId(0x14AABBF0);
    assert_eq!(can_id.pgn(), 0xAA00);
}

#[test]
/// PDU2: PS is the low PGN byte and there is no destination.
fn test_pgn_pdu2() {
    let can_id = CanId(0x14F2BBF0);
    assert_eq!(can_id.pgn(), 0xF2BB);
    assert_eq!(can_id.destination(), None);
}

//==================================================================================CAN_ID_BUILDER
#[test]
/// Validates builder scenarios: broadcast, addressed, and error handling.
fn test_builder() {
    // Broadcast (destination = None), PGN 0xFEEC (VIN).
    let broadcast_id = CanId::builder(0xFEEC, 0x80).with_priority(6).build();
    assert!(broadcast_id.is_ok());

    // Addressed message, PGN 0xEA00 (Request).
    let request_id = CanId::builder(0xEA00, 0x80)
        .with_priority(6)
        .to_destination(0xFF)
        .build();
    assert!(request_id.is_ok());

    // A PDU2 PGN cannot carry a destination.
    let invalid_id = CanId::builder(0xFEEC, 0x80).to_destination(0x21).build();
    assert!(invalid_id.is_err());

    // A PDU1 PGN requires a destination.
    let invalid_id = CanId::builder(0xEA00, 0x80).build();
    assert!(invalid_id.is_err());
}

#[test]
/// The priority must be capped to 3 bits to avoid touching the reserved field.
fn test_priority_masks_extra_bits() {
    let can_id = CanId::builder(0xFEEC, 0x80)
        .with_priority(0b1111_0000)
        .build()
        .expect("CanId must build");

    assert_eq!(can_id.0 & (1 << 29), 0, "Reserved bit 29 must remain clear");
    assert_eq!(can_id.priority(), 0);
}

//==================================================================================J1939_PACKET
#[test]
/// Frame → packet → frame preserves the payload up to truncation.
fn test_packet_round_trip() {
    let frame = CanFrame {
        id: CanId(0x18FECA21),
        data: [0x55, 0xFF, 0x20, 0x21, 0x22, 0x23, 0xFF, 0xFF],
        len: 8,
    };
    let packet = J1939Packet::from_frame(&frame);
    assert_eq!(packet.pgn, 0xFECA);
    assert_eq!(packet.source_address, 0x21);
    assert_eq!(packet.destination, None);

    let rebuilt = packet.to_frame(6).expect("frame must rebuild");
    assert_eq!(rebuilt.id, frame.id);
    assert_eq!(rebuilt.data, frame.data);
    assert_eq!(rebuilt.len, 6);
}

#[test]
fn test_is_for_matches_destination() {
    let frame = CanFrame {
        id: CanId(0x18EC2180), // PF 0xEC to 0x21 from 0x80
        data: [0xFF; 8],
        len: 8,
    };
    let packet = J1939Packet::from_frame(&frame);
    assert!(packet.is_for(Some(0x21)));
    assert!(!packet.is_for(Some(0x22)));
    assert!(!packet.is_for(None));
}
