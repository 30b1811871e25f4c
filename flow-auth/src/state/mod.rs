//! CSRF state protection: sealed state strings and the single-use ledger that tracks them.

mod codec;
mod ledger;

pub use codec::{decode, encode, StateCodec, VALID_KEY_LENGTHS};
pub use ledger::{Ledger, MemoryLedger};
