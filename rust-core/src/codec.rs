// Canonical encoding: exact, versionless byte layout used as hash input.
// All fixed-width fields are little-endian. Strings end at their first NUL.
//
// transaction := from\0 to\0 amount:f64 token_index:i32 kind:i32 memo\0
// header      := index:u32 timestamp:u64 prev_hash[32] tx_count:u64 transaction*
//
// The header covers every transaction body, not only the count.

use crate::digest::{Hash, sha256};
use crate::tx::{MAX_MEMO_BYTES, Transaction};

fn push_cstr(out: &mut Vec<u8>, s: &str, limit: Option<usize>) {
    let bytes = s.as_bytes();
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let end = limit.map_or(end, |l| end.min(l));
    out.extend_from_slice(&bytes[..end]);
    out.push(0);
}

pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let mut out = Vec::with_capacity(tx.from.len() + tx.to.len() + tx.memo.len() + 19);
    encode_transaction_into(tx, &mut out);
    out
}

fn encode_transaction_into(tx: &Transaction, out: &mut Vec<u8>) {
    push_cstr(out, &tx.from, None);
    push_cstr(out, &tx.to, None);
    out.extend_from_slice(&tx.amount.to_le_bytes());
    out.extend_from_slice(&tx.token_index.to_le_bytes());
    out.extend_from_slice(&tx.kind.code().to_le_bytes());
    push_cstr(out, &tx.memo, Some(MAX_MEMO_BYTES));
}

pub fn encode_block_header(
    index: u32,
    timestamp: u64,
    prev_hash: &Hash,
    transactions: &[Transaction],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(52 + transactions.len() * 64);
    out.extend_from_slice(&index.to_le_bytes());
    out.extend_from_slice(&timestamp.to_le_bytes());
    out.extend_from_slice(prev_hash);
    out.extend_from_slice(&(transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        encode_transaction_into(tx, &mut out);
    }
    out
}

pub fn header_hash(index: u32, timestamp: u64, prev_hash: &Hash, transactions: &[Transaction]) -> Hash {
    sha256(&encode_block_header(index, timestamp, prev_hash, transactions))
}

/// Replay fingerprint: digest over (from, to, amount, token, kind, memo).
/// Energy is not part of the encoding, so scoring never changes it.
pub fn transaction_fingerprint(tx: &Transaction) -> Hash {
    sha256(&encode_transaction(tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::ZERO_HASH;
    use crate::tx::{TxKind, build_governance_proposal, build_transfer};

    #[test]
    fn transaction_layout_is_exact() {
        let tx = build_transfer("A", "B", 1.0, 2, "m");
        let bytes = encode_transaction(&tx);
        let mut expected = vec![b'A', 0, b'B', 0];
        expected.extend_from_slice(&1.0f64.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&TxKind::Transfer.code().to_le_bytes());
        expected.extend_from_slice(&[b'm', 0]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn empty_fields_still_terminate() {
        let tx = build_governance_proposal("", "");
        let bytes = encode_transaction(&tx);
        assert_eq!(bytes.len(), 1 + 1 + 8 + 4 + 4 + 1);
        assert_eq!(&bytes[10..14], &(-1i32).to_le_bytes());
    }

    #[test]
    fn header_prefix_layout() {
        let txs = vec![build_transfer("A", "B", 1.0, 0, "")];
        let bytes = encode_block_header(7, 9, &ZERO_HASH, &txs);
        assert_eq!(&bytes[0..4], &7u32.to_le_bytes());
        assert_eq!(&bytes[4..12], &9u64.to_le_bytes());
        assert_eq!(&bytes[12..44], &ZERO_HASH);
        assert_eq!(&bytes[44..52], &1u64.to_le_bytes());
        assert_eq!(&bytes[52..], encode_transaction(&txs[0]).as_slice());
    }

    #[test]
    fn header_hash_covers_transaction_bodies() {
        let a = vec![build_transfer("A", "B", 1.0, 0, "")];
        let b = vec![build_transfer("A", "B", 2.0, 0, "")];
        assert_ne!(header_hash(1, 1, &ZERO_HASH, &a), header_hash(1, 1, &ZERO_HASH, &b));
    }

    #[test]
    fn fingerprint_ignores_energy() {
        let mut tx = build_transfer("A", "B", 1.0, 0, "");
        let before = transaction_fingerprint(&tx);
        tx.energy = 42.5;
        assert_eq!(transaction_fingerprint(&tx), before);
    }
}
