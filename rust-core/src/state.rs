// Ledger state: token types, wallets, pools, stakes.
// Balances are positional: every wallet holds exactly one entry per token type.

use crate::chain::Block;
use crate::config::LedgerParams;
use crate::error::{StateError, StructuralError};
use crate::pool::{LiquidityPool, LpPosition};
use crate::staking::StakingPosition;
use crate::tx::is_well_formed_address;
use serde::{Deserialize, Serialize};

pub const MAX_SYMBOL_BYTES: usize = 16;
pub const MAX_NAME_BYTES: usize = 64;
pub const NATIVE_DECIMALS: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Tttc,
    Eltt,
    Eltc,
    Generic,
    LiquidityProvider,
}

impl TokenKind {
    pub const NATIVE: [TokenKind; 3] = [TokenKind::Tttc, TokenKind::Eltt, TokenKind::Eltc];

    /// Genesis symbol of a native kind.
    pub fn native_symbol(self) -> Option<&'static str> {
        match self {
            TokenKind::Tttc => Some("TTTC"),
            TokenKind::Eltt => Some("ELTT"),
            TokenKind::Eltc => Some("ELTC"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenType {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub kind: TokenKind,
    pub energy_binding_factor: f64,
}

impl TokenType {
    pub fn new(symbol: &str, name: &str, kind: TokenKind, energy_binding_factor: f64) -> Self {
        TokenType {
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals: NATIVE_DECIMALS,
            kind,
            energy_binding_factor,
        }
    }
}

/// 1..=16 bytes, no control characters, no `:` (the memo separator).
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_BYTES
        && !symbol.chars().any(|c| c.is_control() || c == ':')
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub balances: Vec<f64>,
}

impl Wallet {
    pub fn balance(&self, token_index: usize) -> f64 {
        self.balances.get(token_index).copied().unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub token_types: Vec<TokenType>,
    pub wallets: Vec<Wallet>,
    pub pools: Vec<LiquidityPool>,
    pub stakes: Vec<StakingPosition>,
}

impl LedgerState {
    pub fn token_count(&self) -> usize {
        self.token_types.len()
    }

    pub fn token(&self, index: usize) -> Option<&TokenType> {
        self.token_types.get(index)
    }

    pub fn find_symbol(&self, symbol: &str) -> Option<usize> {
        self.token_types.iter().position(|t| t.symbol == symbol)
    }

    /// Append a token type and extend every wallet with a zero balance.
    pub fn register_token(&mut self, token: TokenType) -> usize {
        self.token_types.push(token);
        for wallet in &mut self.wallets {
            wallet.balances.push(0.0);
        }
        self.token_types.len() - 1
    }

    pub fn wallet_index(&self, address: &str) -> Option<usize> {
        self.wallets.iter().position(|w| w.address == address)
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.iter().find(|w| w.address == address)
    }

    /// Returns the existing wallet or creates a zeroed one.
    pub fn create_wallet(&mut self, address: &str) -> Result<&Wallet, StructuralError> {
        let index = self.ensure_wallet(address)?;
        Ok(&self.wallets[index])
    }

    pub(crate) fn ensure_wallet(&mut self, address: &str) -> Result<usize, StructuralError> {
        if let Some(index) = self.wallet_index(address) {
            return Ok(index);
        }
        if !is_well_formed_address(address) {
            return Err(StructuralError::MalformedAddress(address.to_string()));
        }
        self.wallets.push(Wallet {
            address: address.to_string(),
            balances: vec![0.0; self.token_types.len()],
        });
        Ok(self.wallets.len() - 1)
    }

    pub fn list_wallet_tokens<'a>(
        &'a self,
        wallet: &'a Wallet,
    ) -> impl Iterator<Item = (&'a TokenType, f64)> + 'a {
        self.token_types
            .iter()
            .enumerate()
            .map(move |(i, t)| (t, wallet.balance(i)))
    }

    /// Balance of `address` on `token_index`; zero for unknown wallets.
    pub fn balance(&self, address: &str, token_index: usize) -> f64 {
        self.get_wallet(address)
            .map(|w| w.balance(token_index))
            .unwrap_or(0.0)
    }

    pub(crate) fn require_balance(
        &self,
        address: &str,
        token_index: usize,
        required: f64,
    ) -> Result<(), StateError> {
        let wallet = self
            .get_wallet(address)
            .ok_or_else(|| StateError::UnknownWallet(address.to_string()))?;
        let available = wallet.balance(token_index);
        if available < required {
            return Err(StateError::InsufficientBalance {
                address: address.to_string(),
                token_index,
                available,
                required,
            });
        }
        Ok(())
    }

    pub(crate) fn credit(
        &mut self,
        address: &str,
        token_index: usize,
        amount: f64,
    ) -> Result<(), StructuralError> {
        let index = self.ensure_wallet(address)?;
        let count = self.token_types.len();
        let slot = self.wallets[index].balances.get_mut(token_index).ok_or(
            StructuralError::TokenIndexOutOfRange {
                index: token_index as i32,
                count,
            },
        )?;
        *slot += amount;
        Ok(())
    }

    pub(crate) fn debit(
        &mut self,
        address: &str,
        token_index: usize,
        amount: f64,
    ) -> Result<(), StateError> {
        self.require_balance(address, token_index, amount)?;
        if let Some(index) = self.wallet_index(address)
            && let Some(slot) = self.wallets[index].balances.get_mut(token_index)
        {
            *slot -= amount;
        }
        Ok(())
    }

    /// Outstanding supply of an LP token across all wallets.
    pub fn lp_supply(&self, lp_token: usize) -> f64 {
        self.wallets.iter().map(|w| w.balance(lp_token)).sum()
    }
}

/// The whole aggregate: append-only blocks plus the state they produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub blocks: Vec<Block>,
    pub state: LedgerState,
    #[serde(default)]
    pub params: LedgerParams,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_params(LedgerParams::default())
    }

    pub fn with_params(params: LedgerParams) -> Self {
        Ledger {
            blocks: Vec::new(),
            state: LedgerState::default(),
            params,
        }
    }

    pub fn create_wallet(&mut self, address: &str) -> Result<&Wallet, StructuralError> {
        self.state.create_wallet(address)
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.state.get_wallet(address)
    }

    pub fn balance(&self, address: &str, token_index: usize) -> f64 {
        self.state.balance(address, token_index)
    }

    pub fn token_count(&self) -> usize {
        self.state.token_count()
    }

    /// `None` when the wallet does not exist.
    pub fn list_wallet_tokens(&self, address: &str) -> Option<Vec<(&TokenType, f64)>> {
        let wallet = self.state.get_wallet(address)?;
        Some(self.state.list_wallet_tokens(wallet).collect())
    }

    pub fn lp_positions(&self, address: &str) -> Vec<LpPosition> {
        self.state.lp_positions(address)
    }

    pub fn stakes_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a StakingPosition> + 'a {
        self.state.stakes_of(owner)
    }
}
