pub mod address_table;
pub mod codec;
pub mod pending;

pub use address_table::AddressTable;
pub use pending::{SpendIndex, OUTPOINT_KEY_LEN};
