use spendgraph_primitives::block::{Block, BlockHeader};
use spendgraph_primitives::encoding::{DecodeError, Decoder, Encoder};
use spendgraph_primitives::hash::Hash256;
use spendgraph_primitives::outpoint::OutPoint;
use spendgraph_primitives::transaction::{Transaction, TxIn, TxOut};

fn seq_hash(start: u8) -> Hash256 {
    std::array::from_fn(|i| start.wrapping_add(i as u8))
}

fn p2pkh_script(fill: u8) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[0x76, 0xa9, 0x14]);
    script.extend_from_slice(&[fill; 20]);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

fn sample_transaction() -> Transaction {
    Transaction {
        version: 2,
        inputs: vec![TxIn {
            prevout: OutPoint {
                hash: seq_hash(0x10),
                index: 3,
            },
            script_sig: vec![0x51],
            sequence: 0xffff_fffe,
        }],
        outputs: vec![
            TxOut {
                value: 50_000,
                script_pubkey: p2pkh_script(0xaa),
            },
            TxOut {
                value: 1_250,
                script_pubkey: p2pkh_script(0xbb),
            },
        ],
        lock_time: 0,
    }
}

#[test]
fn serialize_block_header() {
    let header = BlockHeader {
        version: 4,
        prev_block: seq_hash(0x00),
        merkle_root: seq_hash(0x20),
        time: 0x0102_0304,
        bits: 0x0a0b_0c0d,
        nonce: 0x1122_3344,
    };

    let encoded = header.consensus_encode();
    assert_eq!(encoded.len(), 80);

    let mut expected = Vec::new();
    expected.extend_from_slice(&4i32.to_le_bytes());
    expected.extend_from_slice(&seq_hash(0x00));
    expected.extend_from_slice(&seq_hash(0x20));
    expected.extend_from_slice(&0x0102_0304u32.to_le_bytes());
    expected.extend_from_slice(&0x0a0b_0c0du32.to_le_bytes());
    expected.extend_from_slice(&0x1122_3344u32.to_le_bytes());
    assert_eq!(encoded, expected);

    let mut decoder = Decoder::new(&encoded);
    let decoded = BlockHeader::consensus_decode_from(&mut decoder).expect("decode header");
    assert!(decoder.is_empty());
    assert_eq!(decoded, header);
}

#[test]
fn transaction_roundtrip_legacy() {
    let tx = sample_transaction();
    let encoded = tx.consensus_encode();

    let mut decoder = Decoder::new(&encoded);
    let decoded = Transaction::consensus_decode_from(&mut decoder).expect("decode tx");
    assert!(decoder.is_empty());
    assert_eq!(decoded, tx);
    assert_eq!(decoded.txid(), tx.txid());
}

#[test]
fn transaction_decode_segwit_matches_legacy() {
    let tx = sample_transaction();

    // Same transaction hand-serialized with the segwit marker/flag and one
    // witness item per input.
    let mut encoder = Encoder::new();
    encoder.write_i32_le(tx.version);
    encoder.write_u8(0x00);
    encoder.write_u8(0x01);
    encoder.write_varint(tx.inputs.len() as u64);
    for input in &tx.inputs {
        encoder.write_hash_le(&input.prevout.hash);
        encoder.write_u32_le(input.prevout.index);
        encoder.write_var_bytes(&input.script_sig);
        encoder.write_u32_le(input.sequence);
    }
    encoder.write_varint(tx.outputs.len() as u64);
    for output in &tx.outputs {
        encoder.write_i64_le(output.value);
        encoder.write_var_bytes(&output.script_pubkey);
    }
    for _ in &tx.inputs {
        encoder.write_varint(1);
        encoder.write_var_bytes(&[0xde, 0xad, 0xbe, 0xef]);
    }
    encoder.write_u32_le(tx.lock_time);
    let encoded = encoder.into_inner();

    let mut decoder = Decoder::new(&encoded);
    let decoded = Transaction::consensus_decode_from(&mut decoder).expect("decode segwit tx");
    assert!(decoder.is_empty());

    // Witness data is discarded; the decoded transaction and its txid match
    // the legacy form.
    assert_eq!(decoded, tx);
    assert_eq!(decoded.txid(), tx.txid());
}

#[test]
fn transaction_rejects_unknown_segwit_flag() {
    let mut encoder = Encoder::new();
    encoder.write_i32_le(1);
    encoder.write_u8(0x00);
    encoder.write_u8(0x02);
    let encoded = encoder.into_inner();

    let mut decoder = Decoder::new(&encoded);
    let err = Transaction::consensus_decode_from(&mut decoder).expect_err("bad flag");
    assert_eq!(err, DecodeError::InvalidData("unknown segwit flag"));
}

#[test]
fn coinbase_detection() {
    let coinbase = Transaction {
        version: 1,
        inputs: vec![TxIn {
            prevout: OutPoint::null(),
            script_sig: vec![0x03, 0x01, 0x02, 0x03],
            sequence: u32::MAX,
        }],
        outputs: vec![TxOut {
            value: 5_000_000_000,
            script_pubkey: p2pkh_script(0xcc),
        }],
        lock_time: 0,
    };
    assert!(coinbase.is_coinbase());
    assert!(!sample_transaction().is_coinbase());
}

#[test]
fn block_roundtrip() {
    let block = Block {
        header: BlockHeader {
            version: 4,
            prev_block: seq_hash(0x40),
            merkle_root: seq_hash(0x60),
            time: 1_231_006_505,
            bits: 0x1d00_ffff,
            nonce: 2_083_236_893,
        },
        transactions: vec![sample_transaction()],
    };

    let encoded = block.consensus_encode();
    let decoded = Block::consensus_decode(&encoded).expect("decode block");
    assert_eq!(decoded.header, block.header);
    assert_eq!(decoded.transactions, block.transactions);
}

#[test]
fn varint_rejects_non_canonical() {
    let mut encoder = Encoder::new();
    encoder.write_u8(0xfd);
    encoder.write_u16_le(0x10);
    let encoded = encoder.into_inner();

    let mut decoder = Decoder::new(&encoded);
    assert_eq!(decoder.read_varint(), Err(DecodeError::NonCanonicalVarInt));
}
