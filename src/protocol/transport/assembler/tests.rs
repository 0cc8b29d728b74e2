use super::*;

const PGN_VIN: u32 = 0xFEEC;
const PGN_DM1: u32 = 0xFECA;
const ACCEPTED: &[u32] = &[PGN_VIN, PGN_DM1];
const MY_ADDRESS: u8 = 0x80;

fn cm_packet(source: u8, destination: Option<u8>, data: [u8; 8]) -> J1939Packet {
    J1939Packet {
        priority: 7,
        pf: 0xEC,
        pgn: 0xEC00,
        destination,
        source_address: source,
        data,
        len: 8,
    }
}

fn dt_packet(source: u8, destination: Option<u8>, sequence: u8, payload: &[u8]) -> J1939Packet {
    let mut data = [0xFFu8; 8];
    data[0] = sequence;
    data[1..1 + payload.len()].copy_from_slice(payload);
    J1939Packet {
        priority: 7,
        pf: 0xEB,
        pgn: 0xEB00,
        destination,
        source_address: source,
        data,
        len: 8,
    }
}

fn rts(source: u8, pgn: u32, total_bytes: u16, total_packets: u8) -> J1939Packet {
    let mut data = [0xFFu8; 8];
    data[0] = TP_CM_RTS;
    data[1] = (total_bytes & 0xFF) as u8;
    data[2] = (total_bytes >> 8) as u8;
    data[3] = total_packets;
    data[4] = 0xFF;
    le::put_pgn(&mut data, 5, pgn);
    cm_packet(source, Some(MY_ADDRESS), data)
}

fn bam(source: u8, pgn: u32, total_bytes: u16, total_packets: u8) -> J1939Packet {
    let mut data = [0xFFu8; 8];
    data[0] = TP_CM_BAM;
    data[1] = (total_bytes & 0xFF) as u8;
    data[2] = (total_bytes >> 8) as u8;
    data[3] = total_packets;
    le::put_pgn(&mut data, 5, pgn);
    let mut packet = cm_packet(source, None, data);
    packet.pgn = 0xECFF;
    packet
}

#[test]
fn test_addressed_transfer_complete() {
    let mut assembler = TransportAssembler::new();
    let vin = b"1FUJA6CK57DX12345";

    match assembler.handle_cm(&rts(0x21, PGN_VIN, 17, 3), Some(MY_ADDRESS), ACCEPTED) {
        CmResult::OpenedSendCts(cts) => {
            assert_eq!(cts.destination, 0x21);
            assert_eq!(cts.data[0], TP_CM_CTS);
            assert_eq!(cts.data[1], MAX_TP_FRAMES_PER_BURST);
            assert_eq!(cts.data[2], 1);
            assert_eq!(&cts.data[5..8], &[0xEC, 0xFE, 0x00]);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    match assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 1, &vin[0..7])) {
        DataResult::SendCts(cts) => assert_eq!(cts.data[2], 2),
        other => panic!("unexpected result: {other:?}"),
    }
    match assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 2, &vin[7..14])) {
        DataResult::SendCts(cts) => assert_eq!(cts.data[2], 3),
        other => panic!("unexpected result: {other:?}"),
    }
    match assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 3, &vin[14..17])) {
        DataResult::MessageComplete { message, reply } => {
            assert_eq!(message.pgn, PGN_VIN);
            assert_eq!(message.source_address, 0x21);
            assert_eq!(message.as_slice(), vin);
            let eom = reply.expect("addressed transfer must be acknowledged");
            assert_eq!(eom.destination, 0x21);
            assert_eq!(eom.data[0], TP_CM_EOM_ACK);
            assert_eq!(eom.data[1], 17);
            assert_eq!(eom.data[2], 0);
            assert_eq!(eom.data[3], 3);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // Session released: further data frames from that source are dropped.
    assert!(matches!(
        assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 4, &[0; 7])),
        DataResult::Ignored
    ));
}

#[test]
fn test_broadcast_transfer_is_silent() {
    let mut assembler = TransportAssembler::new();

    assert!(matches!(
        assembler.handle_cm(&bam(0x33, PGN_DM1, 10, 2), Some(MY_ADDRESS), ACCEPTED),
        CmResult::Opened
    ));
    assert!(matches!(
        assembler.handle_data(&dt_packet(0x33, None, 1, &[1, 2, 3, 4, 5, 6, 7])),
        DataResult::FragmentConsumed
    ));
    match assembler.handle_data(&dt_packet(0x33, None, 2, &[8, 9, 10])) {
        DataResult::MessageComplete { message, reply } => {
            assert_eq!(message.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
            assert!(reply.is_none());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_unlisted_pgn_is_refused() {
    let mut assembler = TransportAssembler::new();

    match assembler.handle_cm(&rts(0x21, 0xFEF5, 14, 2), Some(MY_ADDRESS), ACCEPTED) {
        CmResult::Refused(abort) => {
            assert_eq!(abort.destination, 0x21);
            assert_eq!(abort.data[0], TP_CM_ABORT);
            assert_eq!(abort.data[1], TP_ABORT_NO_RESOURCES);
            assert_eq!(&abort.data[5..8], &[0xF5, 0xFE, 0x00]);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // The refused transfer left no session behind.
    assert!(matches!(
        assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 1, &[0; 7])),
        DataResult::Ignored
    ));

    // An unlisted broadcast announcement is dropped without a reply.
    assert!(matches!(
        assembler.handle_cm(&bam(0x33, 0xFEF5, 14, 2), Some(MY_ADDRESS), ACCEPTED),
        CmResult::Ignored
    ));
}

#[test]
fn test_pool_exhaustion_aborts_with_max_connections() {
    let mut assembler = TransportAssembler::new();

    for source in 0..5u8 {
        assert!(matches!(
            assembler.handle_cm(&rts(source, PGN_VIN, 17, 3), Some(MY_ADDRESS), ACCEPTED),
            CmResult::OpenedSendCts(_)
        ));
    }
    match assembler.handle_cm(&rts(0x50, PGN_VIN, 17, 3), Some(MY_ADDRESS), ACCEPTED) {
        CmResult::Refused(abort) => assert_eq!(abort.data[1], TP_ABORT_MAX_CONNECTIONS),
        other => panic!("unexpected result: {other:?}"),
    }

    // Releasing one slot makes room again.
    assembler.abandon_all();
    assert!(matches!(
        assembler.handle_cm(&rts(0x50, PGN_VIN, 17, 3), Some(MY_ADDRESS), ACCEPTED),
        CmResult::OpenedSendCts(_)
    ));
}

#[test]
fn test_new_announcement_supersedes_transfer_in_progress() {
    let mut assembler = TransportAssembler::new();

    assembler.handle_cm(&rts(0x21, PGN_VIN, 17, 3), Some(MY_ADDRESS), ACCEPTED);
    assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 1, b"ABCDEFG"));

    // The same source announces a fresh transfer; earlier fragments
    // must not leak into it.
    assembler.handle_cm(&rts(0x21, PGN_DM1, 8, 2), Some(MY_ADDRESS), ACCEPTED);
    assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 1, &[1, 2, 3, 4, 5, 6, 7]));
    match assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 2, &[8])) {
        DataResult::MessageComplete { message, .. } => {
            assert_eq!(message.pgn, PGN_DM1);
            assert_eq!(message.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_malformed_announcements_are_rejected() {
    let mut assembler = TransportAssembler::new();

    // Zero-length transfer.
    assert!(matches!(
        assembler.handle_cm(&rts(0x21, PGN_VIN, 0, 1), Some(MY_ADDRESS), ACCEPTED),
        CmResult::Refused(_)
    ));
    // Announced size exceeding the buffer.
    assert!(matches!(
        assembler.handle_cm(&rts(0x21, PGN_VIN, 1785, 255), Some(MY_ADDRESS), ACCEPTED),
        CmResult::Refused(_)
    ));
    // Too few packets for the announced byte count.
    assert!(matches!(
        assembler.handle_cm(&rts(0x21, PGN_VIN, 17, 2), Some(MY_ADDRESS), ACCEPTED),
        CmResult::Refused(_)
    ));
}

#[test]
fn test_sequence_zero_is_ignored() {
    let mut assembler = TransportAssembler::new();

    assembler.handle_cm(&rts(0x21, PGN_VIN, 17, 3), Some(MY_ADDRESS), ACCEPTED);
    assert!(matches!(
        assembler.handle_data(&dt_packet(0x21, Some(MY_ADDRESS), 0, &[0; 7])),
        DataResult::Ignored
    ));
}
