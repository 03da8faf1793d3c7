#![allow(clippy::not_unsafe_ptr_arg_deref)]

// C ABI for hosts that render or persist the ledger. Every call is
// synchronous; the host owns serialisation of calls on one ledger pointer.

use crate::digest::Hash;
use crate::energy::compute_energy;
use crate::error::LedgerError;
use crate::state::Ledger;
use crate::storage::SnapshotStore;
use crate::tx::{Transaction, TxKind};
use crate::validator::validate_ledger;
use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::c_char;
use tracing::warn;

#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy)]
pub struct eltt_hash_t {
    pub bytes: [u8; 32],
}

/// Borrowed view of a transaction; strings are NUL-terminated UTF-8, null reads as empty.
#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy)]
pub struct eltt_tx_t {
    pub from: *const c_char,
    pub to: *const c_char,
    pub amount: f64,
    pub token_index: i32,
    pub kind: i32,
    pub memo: *const c_char,
}

#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum eltt_result_t {
    ELTT_OK = 0,
    ELTT_ERR_NULL = 1,
    ELTT_ERR_STRUCTURAL = 2,
    ELTT_ERR_STATE = 3,
    ELTT_ERR_CHAIN = 4,
    ELTT_ERR_REPLAY = 5,
    ELTT_ERR_STORAGE = 6,
}

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

fn set_last_error(msg: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = msg.into();
    });
}

/// Copies the last error of this thread into `buf`; returns its full length.
#[unsafe(no_mangle)]
pub extern "C" fn eltt_last_error(buf: *mut u8, buf_len: usize) -> usize {
    let msg = LAST_ERROR.with(|e| e.borrow().clone());
    let bytes = msg.as_bytes();
    let copy_len = bytes.len().min(buf_len.saturating_sub(1));
    if !buf.is_null() && buf_len > 0 {
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, copy_len);
            *buf.add(copy_len) = 0;
        }
    }
    bytes.len()
}

fn from_hash(h: &Hash) -> eltt_hash_t {
    eltt_hash_t { bytes: *h }
}

fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Ok("");
    }
    unsafe { CStr::from_ptr(ptr).to_str().map_err(|_| "invalid utf-8") }
}

fn to_transaction(tx: &eltt_tx_t) -> Result<Transaction, String> {
    let kind = TxKind::from_code(tx.kind).map_err(|e| e.to_string())?;
    let from = cstr_to_str(tx.from).map_err(|e| format!("from: {}", e))?;
    let to = cstr_to_str(tx.to).map_err(|e| format!("to: {}", e))?;
    let memo = cstr_to_str(tx.memo).map_err(|e| format!("memo: {}", e))?;
    Ok(Transaction::new(kind, from, to, tx.amount, tx.token_index, memo))
}

fn map_ledger_error(err: &LedgerError) -> eltt_result_t {
    match err {
        LedgerError::Structural(_) => eltt_result_t::ELTT_ERR_STRUCTURAL,
        LedgerError::State(_) => eltt_result_t::ELTT_ERR_STATE,
        LedgerError::Chain(_) => eltt_result_t::ELTT_ERR_CHAIN,
        LedgerError::Replay(_) => eltt_result_t::ELTT_ERR_REPLAY,
    }
}

fn fail(err: LedgerError) -> eltt_result_t {
    warn!(error = %err, "ffi call failed");
    set_last_error(err.to_string());
    map_ledger_error(&err)
}

#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_new() -> *mut Ledger {
    Box::into_raw(Box::new(Ledger::new()))
}

#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_free(ledger: *mut Ledger) {
    if !ledger.is_null() {
        unsafe {
            drop(Box::from_raw(ledger));
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_create_genesis(
    ledger: *mut Ledger,
    out_hash: *mut eltt_hash_t,
) -> eltt_result_t {
    set_last_error("");
    if ledger.is_null() {
        set_last_error("ledger: null pointer");
        return eltt_result_t::ELTT_ERR_NULL;
    }
    let l = unsafe { &mut *ledger };
    match l.create_genesis() {
        Ok(block) => {
            if !out_hash.is_null() {
                unsafe { *out_hash = from_hash(&block.hash) };
            }
            eltt_result_t::ELTT_OK
        }
        Err(err) => fail(err),
    }
}

/// Appends `len` transactions as one block. Nothing is committed on failure.
#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_submit(
    ledger: *mut Ledger,
    txs: *const eltt_tx_t,
    len: usize,
    timestamp: u64,
    out_hash: *mut eltt_hash_t,
) -> eltt_result_t {
    set_last_error("");
    if ledger.is_null() || (txs.is_null() && len > 0) {
        set_last_error("ledger/txs: null pointer");
        return eltt_result_t::ELTT_ERR_NULL;
    }
    let raw = if len == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(txs, len) }
    };
    let mut transactions = Vec::with_capacity(len);
    for (i, tx) in raw.iter().enumerate() {
        match to_transaction(tx) {
            Ok(t) => transactions.push(t),
            Err(e) => {
                set_last_error(format!("tx {}: {}", i, e));
                return eltt_result_t::ELTT_ERR_STRUCTURAL;
            }
        }
    }
    let l = unsafe { &mut *ledger };
    match l.append_block(transactions, timestamp) {
        Ok(block) => {
            if !out_hash.is_null() {
                unsafe { *out_hash = from_hash(&block.hash) };
            }
            eltt_result_t::ELTT_OK
        }
        Err(err) => fail(err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_block_count(ledger: *const Ledger) -> usize {
    if ledger.is_null() {
        return 0;
    }
    unsafe { (*ledger).blocks.len() }
}

/// Writes the balance to `out`; false if the wallet is unknown.
#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_balance(
    ledger: *const Ledger,
    address: *const c_char,
    token_index: usize,
    out: *mut f64,
) -> bool {
    if ledger.is_null() || out.is_null() {
        return false;
    }
    let address = match cstr_to_str(address) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(format!("address: {}", e));
            return false;
        }
    };
    let l = unsafe { &*ledger };
    match l.get_wallet(address) {
        Some(w) => {
            unsafe { *out = w.balance(token_index) };
            true
        }
        None => false,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_validate(ledger: *const Ledger) -> eltt_result_t {
    set_last_error("");
    if ledger.is_null() {
        set_last_error("ledger: null pointer");
        return eltt_result_t::ELTT_ERR_NULL;
    }
    match validate_ledger(unsafe { &*ledger }) {
        Ok(()) => eltt_result_t::ELTT_OK,
        Err(err) => fail(err),
    }
}

/// Energy of an unsubmitted transaction; negative if it cannot be decoded.
#[unsafe(no_mangle)]
pub extern "C" fn eltt_tx_energy(tx: *const eltt_tx_t) -> f64 {
    if tx.is_null() {
        return -1.0;
    }
    match to_transaction(unsafe { &*tx }) {
        Ok(t) => compute_energy(&t),
        Err(e) => {
            set_last_error(e);
            -1.0
        }
    }
}

/// Loads `<data_dir>/ledger.json`; null on error or if absent.
#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_load(data_dir: *const c_char) -> *mut Ledger {
    set_last_error("");
    let dir = match cstr_to_str(data_dir) {
        Ok(s) if !s.is_empty() => s,
        Ok(_) => {
            set_last_error("data_dir: empty");
            return std::ptr::null_mut();
        }
        Err(e) => {
            set_last_error(format!("data_dir: {}", e));
            return std::ptr::null_mut();
        }
    };
    match SnapshotStore::new(dir).and_then(|s| s.load()) {
        Ok(Some(ledger)) => Box::into_raw(Box::new(ledger)),
        Ok(None) => {
            set_last_error("no snapshot");
            std::ptr::null_mut()
        }
        Err(e) => {
            set_last_error(e.to_string());
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn eltt_ledger_save(ledger: *const Ledger, data_dir: *const c_char) -> eltt_result_t {
    set_last_error("");
    if ledger.is_null() {
        set_last_error("ledger: null pointer");
        return eltt_result_t::ELTT_ERR_NULL;
    }
    let dir = match cstr_to_str(data_dir) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(format!("data_dir: {}", e));
            return eltt_result_t::ELTT_ERR_STORAGE;
        }
    };
    match SnapshotStore::new(dir).and_then(|s| s.save(unsafe { &*ledger })) {
        Ok(()) => eltt_result_t::ELTT_OK,
        Err(e) => {
            set_last_error(e.to_string());
            eltt_result_t::ELTT_ERR_STORAGE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    fn last_error() -> String {
        let mut buf = vec![0u8; 256];
        let n = eltt_last_error(buf.as_mut_ptr(), buf.len());
        String::from_utf8_lossy(&buf[..n.min(255)]).into_owned()
    }

    #[test]
    fn genesis_mint_and_balance_over_ffi() {
        let l = eltt_ledger_new();
        let mut genesis = eltt_hash_t { bytes: [0u8; 32] };
        assert_eq!(eltt_ledger_create_genesis(l, &mut genesis), eltt_result_t::ELTT_OK);
        assert_ne!(genesis.bytes, [0u8; 32]);

        let to = CString::new("W1").unwrap();
        let tx = eltt_tx_t {
            from: ptr::null(),
            to: to.as_ptr(),
            amount: 100.0,
            token_index: 0,
            kind: TxKind::Mint.code(),
            memo: ptr::null(),
        };
        assert!(eltt_tx_energy(&tx) > 0.0);
        assert_eq!(eltt_ledger_submit(l, &tx, 1, 5, ptr::null_mut()), eltt_result_t::ELTT_OK);
        assert_eq!(eltt_ledger_block_count(l), 2);

        let mut bal = 0.0;
        assert!(eltt_ledger_balance(l, to.as_ptr(), 0, &mut bal));
        assert_eq!(bal, 100.0);
        assert_eq!(eltt_ledger_validate(l), eltt_result_t::ELTT_OK);
        eltt_ledger_free(l);
    }

    #[test]
    fn errors_map_to_codes() {
        assert_eq!(eltt_ledger_validate(ptr::null()), eltt_result_t::ELTT_ERR_NULL);

        let l = eltt_ledger_new();
        assert_eq!(eltt_ledger_validate(l), eltt_result_t::ELTT_ERR_CHAIN);
        assert!(last_error().contains("no blocks"));

        eltt_ledger_create_genesis(l, ptr::null_mut());
        let from = CString::new("nobody").unwrap();
        let to = CString::new("W2").unwrap();
        let tx = eltt_tx_t {
            from: from.as_ptr(),
            to: to.as_ptr(),
            amount: 1.0,
            token_index: 0,
            kind: TxKind::Transfer.code(),
            memo: ptr::null(),
        };
        assert_eq!(eltt_ledger_submit(l, &tx, 1, 1, ptr::null_mut()), eltt_result_t::ELTT_ERR_STATE);

        let bad_kind = eltt_tx_t { kind: 99, ..tx };
        assert_eq!(
            eltt_ledger_submit(l, &bad_kind, 1, 1, ptr::null_mut()),
            eltt_result_t::ELTT_ERR_STRUCTURAL
        );
        assert!(last_error().contains("99"));
        assert_eq!(eltt_ledger_block_count(l), 1);
        eltt_ledger_free(l);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = CString::new(dir.path().to_str().unwrap()).unwrap();
        let l = eltt_ledger_new();
        eltt_ledger_create_genesis(l, ptr::null_mut());
        assert_eq!(eltt_ledger_save(l, path.as_ptr()), eltt_result_t::ELTT_OK);
        let loaded = eltt_ledger_load(path.as_ptr());
        assert!(!loaded.is_null());
        assert_eq!(eltt_ledger_block_count(loaded), 1);
        eltt_ledger_free(loaded);
        eltt_ledger_free(l);
    }
}
