//! Shared constructors for test fixtures.

use spyglass_core::types::{BlockHash, ChainTip, OutPoint, TxId};

/// A chain tip at `height` whose hash is `hash_byte` repeated.
#[must_use]
pub fn tip(height: u64, hash_byte: u8) -> ChainTip {
    ChainTip::new(BlockHash::new([hash_byte; 32]), height)
}

/// A transaction id made of `byte` repeated.
#[must_use]
pub fn txid(byte: u8) -> TxId {
    TxId::new([byte; 32])
}

/// An outpoint spending output `vout` of the transaction `byte` repeated.
#[must_use]
pub fn outpoint(byte: u8, vout: u32) -> OutPoint {
    OutPoint { txid: txid(byte), vout }
}
