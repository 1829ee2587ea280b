use spendgraph_index::codec::{
    bytes_to_long, bytes_to_long_list, concat, long_list_to_bytes, long_to_bytes, trim, CodecError,
};

const SAMPLE_LONGS: [i64; 10] = [4, 5, 6, 7, 1, 0, -4, -100, i64::MAX, i64::MIN];

#[test]
fn long_roundtrip() {
    for value in SAMPLE_LONGS {
        assert_eq!(bytes_to_long(&long_to_bytes(value)), value, "{value}");
    }
}

#[test]
fn trimmed_long_roundtrip() {
    for value in SAMPLE_LONGS {
        let encoded = long_to_bytes(value);
        assert_eq!(bytes_to_long(trim(&encoded)), value, "{value}");
    }
}

#[test]
fn trim_is_idempotent() {
    for value in SAMPLE_LONGS {
        let encoded = long_to_bytes(value);
        let trimmed = trim(&encoded);
        assert_eq!(trim(trimmed), trimmed, "{value}");
    }
}

#[test]
fn trim_against_known_forms() {
    assert_eq!(trim(&long_to_bytes(0)), &[0x00]);
    assert_eq!(trim(&long_to_bytes(1)), &[0x01]);
    assert_eq!(trim(&long_to_bytes(0x7f80)), &[0x7f, 0x80]);
    // Negative values have no leading zeros; full width survives.
    assert_eq!(trim(&long_to_bytes(-4)).len(), 8);
}

#[test]
fn bytes_roundtrip_through_long() {
    let samples: [&[u8]; 4] = [
        &[0x00],
        &[0x04, 0x05, 0x06, 0x01],
        &[0x7f, 0x80],
        &[0xff, 0xfb, 0x1a, 0x81],
    ];
    for bytes in samples {
        let value = bytes_to_long(bytes);
        let encoded = long_to_bytes(value);
        assert_eq!(trim(&encoded), bytes, "{bytes:?}");
    }
}

#[test]
fn long_list_roundtrip() {
    let samples: [&[i64]; 6] = [
        &[1, 2, 3, 4, 5],
        &[],
        &[10],
        &[0, 5],
        &[i64::MAX, 1000, 2],
        &[1, 4, 3, 4, 4],
    ];
    for values in samples {
        let encoded = long_list_to_bytes(values);
        assert_eq!(encoded.len(), values.len() * 8);
        let decoded = bytes_to_long_list(&encoded).expect("decode list");
        assert_eq!(decoded, values, "{values:?}");
    }
}

#[test]
fn long_list_elements_are_untrimmed() {
    let encoded = long_list_to_bytes(&[1, -1]);
    assert_eq!(encoded.len(), 16);
    assert_eq!(&encoded[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(&encoded[8..], &[0xff; 8]);
}

#[test]
fn long_list_rejects_ragged_input() {
    assert_eq!(
        bytes_to_long_list(&[0x01, 0x02, 0x03]),
        Err(CodecError::InvalidLength(3))
    );
}

#[test]
fn concat_is_byte_exact() {
    let whole: Vec<u8> = (0u8..17).collect();
    for split in 0..=whole.len() {
        let (a, b) = whole.split_at(split);
        assert_eq!(concat(a, b), whole);
    }
    assert_eq!(concat(&[], &[]), Vec::<u8>::new());
}
