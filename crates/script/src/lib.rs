pub mod standard;

pub use standard::{classify_script_pubkey, resolve_address, AddressIdentity, ScriptClass};
