use eltt_core::chain::score_transactions;
use eltt_core::tx::{build_mint, build_transfer};
use eltt_core::{Ledger, LedgerError, ReplayError, seal_hash, validate_ledger};

fn funded() -> Ledger {
    let mut ledger = Ledger::new();
    ledger.create_genesis().expect("genesis");
    ledger.append_block(vec![build_mint("A", 100.0, 0, "")], 1).expect("mint");
    ledger
}

#[test]
fn identical_transactions_in_one_block_are_a_replay() {
    let mut ledger = funded();
    let tx = build_transfer("A", "B", 5.0, 0, "rent");

    // the engine refuses to seal the duplicate itself
    assert_eq!(
        ledger.append_block(vec![tx.clone(), tx.clone()], 2).unwrap_err(),
        LedgerError::Replay(ReplayError::DuplicateFingerprint {
            index: 2,
            first: 0,
            second: 1,
        })
    );

    // a forged block carrying the duplicate, with a consistent hash
    ledger.append_block(vec![tx.clone()], 2).expect("single");
    let mut dup = tx;
    score_transactions(std::slice::from_mut(&mut dup));
    let block = ledger.blocks.last_mut().expect("tip");
    block.transactions.push(dup);
    block.hash = seal_hash(block);

    assert_eq!(
        validate_ledger(&ledger),
        Err(LedgerError::Replay(ReplayError::DuplicateFingerprint {
            index: 2,
            first: 0,
            second: 1,
        }))
    );
}

#[test]
fn same_transactions_across_blocks_are_not_a_replay() {
    let mut ledger = funded();
    let tx = build_transfer("A", "B", 5.0, 0, "rent");
    ledger.append_block(vec![tx.clone()], 2).expect("first");
    ledger.append_block(vec![tx], 3).expect("second");
    assert_eq!(ledger.balance("B", 0), 10.0);
    assert_eq!(validate_ledger(&ledger), Ok(()));
}

#[test]
fn any_differing_field_breaks_the_fingerprint_match() {
    let mut ledger = funded();
    let base = build_transfer("A", "B", 5.0, 0, "rent");
    let variants = vec![
        base.clone(),
        build_transfer("A", "C", 5.0, 0, "rent"),
        build_transfer("A", "B", 6.0, 0, "rent"),
        build_transfer("A", "B", 5.0, 0, "rent2"),
        build_mint("B", 5.0, 0, "rent"),
    ];
    ledger.append_block(variants, 2).expect("distinct fingerprints");
    assert_eq!(validate_ledger(&ledger), Ok(()));
}
