//! Collaborator interfaces
//!
//! The keeper reads margin, prices, and order book state from other modules
//! and asks them to move funds or place orders. Each concern is one trait.

use num_bigint::BigInt;

use megavault_common::{
    ClobPair, MarketParam, MarketPrice, Order, OrderId, Perpetual, Risk, SubaccountId, VaultResult,
};

/// Margin and balance bookkeeping of settlement accounts
pub trait AccountService {
    /// Folded risk of every balance and position the account holds
    fn risk_of(&self, subaccount: &SubaccountId) -> Risk;

    /// Signed base quantums held in `perpetual_id`
    fn perpetual_position(&self, subaccount: &SubaccountId, perpetual_id: u32) -> BigInt;

    /// Whether the account holds a nonzero position in any perpetual
    fn has_perpetual_positions(&self, subaccount: &SubaccountId) -> bool;

    /// Quote asset balance in quantums
    fn quote_balance(&self, subaccount: &SubaccountId) -> BigInt;

    /// Move quote quantums between accounts
    fn transfer(&mut self, from: &SubaccountId, to: &SubaccountId, quote_quantums: u64)
        -> VaultResult<()>;
}

/// Central limit order book
pub trait OrderBookService {
    fn clob_pair(&self, clob_pair_id: u32) -> Option<ClobPair>;

    fn place_order(&mut self, order: &Order) -> VaultResult<()>;

    /// Cancel a resting order, effective until `good_til_block_time`
    fn cancel_order(&mut self, order_id: &OrderId, good_til_block_time: u32) -> VaultResult<()>;

    /// The order resting under `order_id`, if it has not filled or expired
    fn resting_order(&self, order_id: &OrderId) -> Option<Order>;
}

/// Oracle prices and market configuration
pub trait OracleService {
    fn market_price(&self, market_id: u32) -> VaultResult<MarketPrice>;

    fn market_param(&self, market_id: u32) -> VaultResult<MarketParam>;
}

/// Perpetual definitions including the initial margin fraction
pub trait MarginTierService {
    fn perpetual(&self, perpetual_id: u32) -> VaultResult<Perpetual>;
}

/// Everything the keeper talks to
///
/// `Clone` lets the keeper snapshot collaborator state and restore it when
/// an operation fails midway.
pub trait Collaborators:
    AccountService + OrderBookService + OracleService + MarginTierService + Clone
{
}

impl<T> Collaborators for T where
    T: AccountService + OrderBookService + OracleService + MarginTierService + Clone
{
}
