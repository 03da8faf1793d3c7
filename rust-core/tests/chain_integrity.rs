use eltt_core::digest::ZERO_HASH;
use eltt_core::tx::{build_mint, build_transfer};
use eltt_core::{
    ChainIntegrityError, Ledger, LedgerError, StructuralError, seal_hash, validate_ledger, verify_replay,
};

fn chain_of(n: u32) -> Ledger {
    let mut ledger = Ledger::new();
    ledger.create_genesis().expect("genesis");
    for i in 1..n {
        ledger
            .append_block(vec![build_mint("W1", f64::from(i), 0, &format!("m{i}"))], u64::from(i) * 10)
            .expect("append");
    }
    ledger
}

#[test]
fn appended_blocks_are_sequenced_and_linked() {
    let ledger = chain_of(6);
    assert_eq!(ledger.blocks.len(), 6);
    assert_eq!(ledger.blocks[0].prev_hash, ZERO_HASH);
    for (i, pair) in ledger.blocks.windows(2).enumerate() {
        assert_eq!(pair[1].index as usize, i + 1);
        assert_eq!(pair[1].prev_hash, pair[0].hash);
    }
    for block in &ledger.blocks {
        assert_eq!(seal_hash(block), block.hash);
    }
    assert_eq!(validate_ledger(&ledger), Ok(()));
}

#[test]
fn genesis_is_idempotent() {
    let mut ledger = chain_of(1);
    let hash = ledger.blocks[0].hash;
    ledger.create_genesis().expect("genesis again");
    assert_eq!(ledger.blocks.len(), 1);
    assert_eq!(ledger.token_count(), 3);
    assert_eq!(ledger.blocks[0].hash, hash);
}

#[test]
fn earlier_timestamp_is_non_monotonic() {
    let mut ledger = chain_of(4);
    ledger.blocks[2].timestamp = ledger.blocks[1].timestamp - 1;
    assert_eq!(
        validate_ledger(&ledger),
        Err(LedgerError::Chain(ChainIntegrityError::NonMonotonicTimestamp {
            index: 2,
            previous: 10,
            found: 9,
        }))
    );
}

#[test]
fn equal_timestamps_are_accepted() {
    let mut ledger = chain_of(1);
    ledger.append_block(vec![], 5).expect("first");
    ledger.append_block(vec![], 5).expect("same timestamp");
    assert_eq!(validate_ledger(&ledger), Ok(()));
}

#[test]
fn mutated_fields_change_the_hash() {
    let ledger = chain_of(3);
    let original = ledger.blocks[1].clone();

    let mut b = original.clone();
    b.timestamp += 1;
    assert_ne!(seal_hash(&b), original.hash);

    let mut b = original.clone();
    b.index += 1;
    assert_ne!(seal_hash(&b), original.hash);

    let mut b = original.clone();
    b.prev_hash[0] ^= 1;
    assert_ne!(seal_hash(&b), original.hash);

    let mut b = original.clone();
    b.transactions[0].amount += 1.0;
    assert_ne!(seal_hash(&b), original.hash);

    let mut b = original.clone();
    b.transactions[0].memo.push('x');
    assert_ne!(seal_hash(&b), original.hash);

    let mut b = original;
    b.transactions.push(build_transfer("W1", "W2", 1.0, 0, ""));
    assert_ne!(seal_hash(&b), ledger.blocks[1].hash);
}

#[test]
fn tampered_amount_is_a_hash_mismatch() {
    let mut ledger = chain_of(3);
    ledger.blocks[2].transactions[0].amount = 1_000.0;
    assert_eq!(
        validate_ledger(&ledger),
        Err(LedgerError::Chain(ChainIntegrityError::HashMismatch { index: 2 }))
    );
}

#[test]
fn resealed_block_breaks_the_next_link() {
    let mut ledger = chain_of(4);
    ledger.blocks[1].transactions[0].memo = "rewritten".into();
    let resealed = seal_hash(&ledger.blocks[1]);
    ledger.blocks[1].hash = resealed;
    assert_eq!(
        validate_ledger(&ledger),
        Err(LedgerError::Chain(ChainIntegrityError::PrevHashMismatch { index: 2 }))
    );
}

#[test]
fn index_gap_detected() {
    let mut ledger = chain_of(3);
    ledger.blocks.remove(1);
    assert_eq!(
        validate_ledger(&ledger),
        Err(LedgerError::Chain(ChainIntegrityError::IndexSequence {
            expected: 1,
            found: 2,
        }))
    );
}

#[test]
fn genesis_with_parent_rejected() {
    let mut ledger = chain_of(1);
    ledger.blocks[0].prev_hash = [7u8; 32];
    assert_eq!(
        validate_ledger(&ledger),
        Err(LedgerError::Chain(ChainIntegrityError::GenesisPrevHash))
    );
}

#[test]
fn memo_suffix_after_nul_is_rejected() {
    let mut ledger = chain_of(3);
    ledger.blocks[1].transactions[0].memo = "m1\0forged payee=MALLORY".into();
    let expected = Err(LedgerError::Structural(StructuralError::EmbeddedNul(
        "m1\0forged payee=MALLORY".into(),
    )));
    assert_eq!(validate_ledger(&ledger), expected);
    assert_eq!(verify_replay(&ledger), expected);
}
