//! Standard script classification and address identity derivation.

use spendgraph_primitives::hash::hash160;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptClass {
    P2Pk,
    P2Pkh,
    P2Sh,
    P2Wpkh,
    P2Wsh,
    P2Tr,
    NonStandard,
}

const OP_0: u8 = 0x00;
const OP_1: u8 = 0x51;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

pub fn classify_script_pubkey(script: &[u8]) -> ScriptClass {
    if is_p2pkh(script) {
        ScriptClass::P2Pkh
    } else if is_p2sh(script) {
        ScriptClass::P2Sh
    } else if is_p2wpkh(script) {
        ScriptClass::P2Wpkh
    } else if is_p2wsh(script) {
        ScriptClass::P2Wsh
    } else if is_p2tr(script) {
        ScriptClass::P2Tr
    } else if is_p2pk(script) {
        ScriptClass::P2Pk
    } else {
        ScriptClass::NonStandard
    }
}

const TAG_PUBKEY_HASH: u8 = 0;
const TAG_SCRIPT_HASH: u8 = 1;
const TAG_WITNESS_V0_KEY: u8 = 2;
const TAG_WITNESS_V0_SCRIPT: u8 = 3;
const TAG_WITNESS_V1_TAPROOT: u8 = 4;

/// Canonical owner identity derived from an output script: one template tag
/// byte followed by the template payload. Pay-to-pubkey collapses to the
/// pubkey-hash identity, so P2PK and P2PKH outputs of the same key share one
/// identity.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AddressIdentity {
    bytes: Vec<u8>,
}

impl AddressIdentity {
    fn new(tag: u8, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(tag);
        bytes.extend_from_slice(payload);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Resolve an output script to its single-owner identity, or `None` when the
/// spending condition does not reduce to one owner (data carriers, bare
/// multisig, malformed scripts).
pub fn resolve_address(script: &[u8]) -> Option<AddressIdentity> {
    match classify_script_pubkey(script) {
        ScriptClass::P2Pkh => Some(AddressIdentity::new(TAG_PUBKEY_HASH, &script[3..23])),
        ScriptClass::P2Sh => Some(AddressIdentity::new(TAG_SCRIPT_HASH, &script[2..22])),
        ScriptClass::P2Wpkh => Some(AddressIdentity::new(TAG_WITNESS_V0_KEY, &script[2..22])),
        ScriptClass::P2Wsh => Some(AddressIdentity::new(TAG_WITNESS_V0_SCRIPT, &script[2..34])),
        ScriptClass::P2Tr => Some(AddressIdentity::new(TAG_WITNESS_V1_TAPROOT, &script[2..34])),
        ScriptClass::P2Pk => {
            let key_len = script[0] as usize;
            Some(AddressIdentity::new(
                TAG_PUBKEY_HASH,
                &hash160(&script[1..1 + key_len]),
            ))
        }
        ScriptClass::NonStandard => None,
    }
}

fn is_p2pkh(script: &[u8]) -> bool {
    script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == 0x14
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
}

fn is_p2sh(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == OP_HASH160 && script[1] == 0x14 && script[22] == OP_EQUAL
}

fn is_p2wpkh(script: &[u8]) -> bool {
    script.len() == 22 && script[0] == OP_0 && script[1] == 0x14
}

fn is_p2wsh(script: &[u8]) -> bool {
    script.len() == 34 && script[0] == OP_0 && script[1] == 0x20
}

fn is_p2tr(script: &[u8]) -> bool {
    script.len() == 34 && script[0] == OP_1 && script[1] == 0x20
}

fn is_p2pk(script: &[u8]) -> bool {
    let key_len = match script.first().copied() {
        Some(len @ 33) => len,
        Some(len @ 65) => len,
        _ => return false,
    };

    let expected_len = key_len as usize + 2;
    script.len() == expected_len && script[script.len() - 1] == OP_CHECKSIG
}
