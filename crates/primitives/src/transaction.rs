//! Transaction types and serialization.

use crate::encoding::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use crate::hash::{sha256d, Hash256};
use crate::outpoint::OutPoint;

/// Segwit serialization marker and flag bytes.
const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

#[derive(Clone, Debug, PartialEq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl Encodable for TxIn {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        self.prevout.consensus_encode(encoder);
        encoder.write_var_bytes(&self.script_sig);
        encoder.write_u32_le(self.sequence);
    }
}

impl Decodable for TxIn {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let prevout = OutPoint::consensus_decode(decoder)?;
        let script_sig = decoder.read_var_bytes()?;
        let sequence = decoder.read_u32_le()?;
        Ok(Self {
            prevout,
            script_sig,
            sequence,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TxOut {
    pub value: i64,
    pub script_pubkey: Vec<u8>,
}

impl Encodable for TxOut {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_i64_le(self.value);
        encoder.write_var_bytes(&self.script_pubkey);
    }
}

impl Decodable for TxOut {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let value = decoder.read_i64_le()?;
        let script_pubkey = decoder.read_var_bytes()?;
        Ok(Self {
            value,
            script_pubkey,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// True for the block-reward transaction: a single input spending the
    /// null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Double-SHA256 of the legacy serialization (witness data excluded),
    /// byte order as it appears inside outpoints.
    pub fn txid(&self) -> Hash256 {
        sha256d(&self.consensus_encode())
    }

    /// Legacy serialization without witness data.
    pub fn consensus_encode(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.write_i32_le(self.version);
        encoder.write_varint(self.inputs.len() as u64);
        for input in &self.inputs {
            input.consensus_encode(&mut encoder);
        }
        encoder.write_varint(self.outputs.len() as u64);
        for output in &self.outputs {
            output.consensus_encode(&mut encoder);
        }
        encoder.write_u32_le(self.lock_time);
        encoder.into_inner()
    }

    /// Decode a transaction, accepting both legacy and segwit serialization.
    /// Witness items are read to keep the cursor aligned and then discarded;
    /// spend-graph extraction never inspects them.
    pub fn consensus_decode_from(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let version = decoder.read_i32_le()?;

        let first = decoder.read_varint()?;
        let (segwit, input_count) = if first == u64::from(SEGWIT_MARKER) {
            let flag = decoder.read_u8()?;
            if flag != SEGWIT_FLAG {
                return Err(DecodeError::InvalidData("unknown segwit flag"));
            }
            (true, decoder.read_varint()?)
        } else {
            (false, first)
        };

        let input_count = usize::try_from(input_count).map_err(|_| DecodeError::SizeTooLarge)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxIn::consensus_decode(decoder)?);
        }

        let output_count = decoder.read_varint()?;
        let output_count = usize::try_from(output_count).map_err(|_| DecodeError::SizeTooLarge)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOut::consensus_decode(decoder)?);
        }

        if segwit {
            for _ in 0..input_count {
                let items = decoder.read_varint()?;
                for _ in 0..items {
                    let _ = decoder.read_var_bytes()?;
                }
            }
        }

        let lock_time = decoder.read_u32_le()?;
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }
}

impl Decodable for Transaction {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        Self::consensus_decode_from(decoder)
    }
}
