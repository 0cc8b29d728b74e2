use super::*;

#[test]
fn test_new_codes_are_appended() {
    let mut collector = DtcCollector::new();
    collector.add(0x0001_0203, 1, 0x21);
    collector.add(0x0004_0506, 3, 0x21);

    let dtcs = collector.dtcs();
    assert_eq!(dtcs.len(), 2);
    assert_eq!(dtcs[0].value, 0x0001_0203);
    assert_eq!(dtcs[0].occurrence_count, 1);
    assert_eq!(dtcs[1].value, 0x0004_0506);
}

#[test]
fn test_known_code_is_refreshed_in_place() {
    let mut collector = DtcCollector::new();
    collector.add(0x0001_0203, 1, 0x21);
    collector.add(0x0004_0506, 1, 0x21);
    collector.add(0x0001_0203, 7, 0x33);

    let dtcs = collector.dtcs();
    assert_eq!(dtcs.len(), 2);
    assert_eq!(dtcs[0].value, 0x0001_0203);
    assert_eq!(dtcs[0].occurrence_count, 7);
    assert_eq!(dtcs[0].source_address, 0x33);
}

#[test]
fn test_full_collector_drops_new_codes() {
    let mut collector = DtcCollector::new();
    for value in 0..MAX_DTCS as u32 {
        collector.add(value, 1, 0);
    }
    collector.add(0xDEAD, 1, 0);
    assert_eq!(collector.dtcs().len(), MAX_DTCS);

    // Known values still update when full.
    collector.add(3, 9, 0);
    assert_eq!(collector.dtcs()[3].occurrence_count, 9);
}

#[test]
fn test_clear_starts_a_fresh_period() {
    let mut collector = DtcCollector::new();
    collector.add(0x0001_0203, 1, 0x21);
    collector.merge_lamps(LAMP_PROTECT);

    collector.clear();
    assert!(collector.is_empty());
    assert_eq!(collector.lamps(), 0);
}

#[test]
fn test_lamps_accumulate() {
    let mut collector = DtcCollector::new();
    assert_eq!(collector.lamps(), 0);
    collector.merge_lamps(LAMP_AMBER_WARNING);
    collector.merge_lamps(LAMP_RED_STOP | LAMP_AMBER_WARNING);
    assert_eq!(collector.lamps(), LAMP_AMBER_WARNING | LAMP_RED_STOP);
}

#[test]
fn test_lamp_status_decoding() {
    // Every field set to the `on` pattern.
    assert_eq!(
        lamp_bits_from_status(0b0101_0101),
        LAMP_PROTECT | LAMP_AMBER_WARNING | LAMP_RED_STOP | LAMP_MALFUNCTION_INDICATOR
    );
    // `10` and `11` patterns stay dark.
    assert_eq!(lamp_bits_from_status(0b1110_1011), 0);
    assert_eq!(lamp_bits_from_status(0), 0);
    // Single lamp.
    assert_eq!(lamp_bits_from_status(0b0000_0100), LAMP_AMBER_WARNING);
}

#[test]
fn test_flash_status_maps_to_high_bits() {
    assert_eq!(
        lamp_bits_from_flash_status(0b0001_0001),
        LAMP_FLASH_PROTECT | LAMP_FLASH_RED_STOP
    );
}
