//! In-memory collaborators and fixtures for keeper tests

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use megavault_common::{
    math, Address, ClobPair, ClobPairStatus, MarketKind, MarketParam, MarketPrice, Order, OrderId,
    Perpetual, Risk, SubaccountId, VaultError, VaultId, VaultParams, VaultResult, VaultStatus,
};

use crate::genesis::ModuleParams;
use crate::interfaces::{AccountService, MarginTierService, OracleService, OrderBookService};
use crate::keeper::VaultKeeper;

/// A chain with one account ledger, one order book, and one oracle
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    quote_balances: BTreeMap<SubaccountId, BigInt>,
    positions: BTreeMap<(SubaccountId, u32), BigInt>,
    clob_pairs: BTreeMap<u32, ClobPair>,
    perpetuals: BTreeMap<u32, Perpetual>,
    prices: BTreeMap<u32, MarketPrice>,
    market_params: BTreeMap<u32, MarketParam>,
    resting: BTreeMap<OrderId, Order>,
    pub reject_orders: bool,
    pub cancelled: Vec<OrderId>,
}

impl MockChain {
    pub fn set_quote_balance(&mut self, subaccount: &SubaccountId, quote_quantums: i64) {
        self.set_quote_balance_big(subaccount, BigInt::from(quote_quantums));
    }

    pub fn set_quote_balance_big(&mut self, subaccount: &SubaccountId, quote_quantums: BigInt) {
        self.quote_balances.insert(*subaccount, quote_quantums);
    }

    pub fn quote_balance_of(&self, subaccount: &SubaccountId) -> i64 {
        self.quote_balance(subaccount).to_i64().expect("balance fits in i64")
    }

    pub fn set_position(&mut self, subaccount: &SubaccountId, perpetual_id: u32, base_quantums: i64) {
        self.positions.insert((*subaccount, perpetual_id), BigInt::from(base_quantums));
    }

    pub fn add_clob_pair(&mut self, clob_pair: ClobPair) {
        self.clob_pairs.insert(clob_pair.id, clob_pair);
    }

    pub fn add_perpetual(&mut self, perpetual: Perpetual) {
        self.perpetuals.insert(perpetual.id, perpetual);
    }

    pub fn set_market(&mut self, market_param: MarketParam, price: MarketPrice) {
        self.prices.insert(market_param.id, price);
        self.market_params.insert(market_param.id, market_param);
    }

    pub fn set_price(&mut self, market_id: u32, price: u64) {
        if let Some(current) = self.prices.get_mut(&market_id) {
            current.price = price;
        }
    }

    pub fn set_clob_pair_status(&mut self, clob_pair_id: u32, status: ClobPairStatus) {
        if let Some(clob_pair) = self.clob_pairs.get_mut(&clob_pair_id) {
            clob_pair.status = status;
        }
    }

    /// Simulate a fill by removing the order from the book
    pub fn fill_order(&mut self, order_id: &OrderId) -> Option<Order> {
        self.resting.remove(order_id)
    }

    pub fn resting_orders_of(&self, subaccount: &SubaccountId) -> Vec<Order> {
        self.resting
            .values()
            .filter(|order| order.order_id.subaccount_id == *subaccount)
            .cloned()
            .collect()
    }
}

impl AccountService for MockChain {
    fn risk_of(&self, subaccount: &SubaccountId) -> Risk {
        let mut nc = self.quote_balance(subaccount);
        let mut imr = BigInt::zero();
        for ((owner, perpetual_id), base) in &self.positions {
            if owner != subaccount {
                continue;
            }
            let Some(perpetual) = self.perpetuals.get(perpetual_id) else { continue };
            let Some(price) = self.prices.get(&perpetual.market_id) else { continue };
            let notional = math::base_to_quote_quantums(base, perpetual.atomic_resolution, price);
            nc += math::floor(&notional);
            imr += math::mul_ppm(
                &math::floor(&notional.abs()),
                &BigInt::from(perpetual.initial_margin_ppm),
                true,
            );
        }
        let mmr = &imr / BigInt::from(2);
        Risk::new(mmr, imr, nc)
    }

    fn perpetual_position(&self, subaccount: &SubaccountId, perpetual_id: u32) -> BigInt {
        self.positions.get(&(*subaccount, perpetual_id)).cloned().unwrap_or_default()
    }

    fn has_perpetual_positions(&self, subaccount: &SubaccountId) -> bool {
        self.positions
            .iter()
            .any(|((owner, _), base)| owner == subaccount && !base.is_zero())
    }

    fn quote_balance(&self, subaccount: &SubaccountId) -> BigInt {
        self.quote_balances.get(subaccount).cloned().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        from: &SubaccountId,
        to: &SubaccountId,
        quote_quantums: u64,
    ) -> VaultResult<()> {
        let available = self.risk_of(from).equity().clone();
        let amount = BigInt::from(quote_quantums);
        if available < amount {
            return Err(VaultError::InsufficientFunds { available, requested: quote_quantums });
        }
        *self.quote_balances.entry(*from).or_default() -= &amount;
        *self.quote_balances.entry(*to).or_default() += &amount;
        Ok(())
    }
}

impl OrderBookService for MockChain {
    fn clob_pair(&self, clob_pair_id: u32) -> Option<ClobPair> {
        self.clob_pairs.get(&clob_pair_id).cloned()
    }

    fn place_order(&mut self, order: &Order) -> VaultResult<()> {
        if self.reject_orders {
            return Err(VaultError::OrderRejected { reason: "book closed".into() });
        }
        if order.quantums == 0 || order.subticks == 0 {
            return Err(VaultError::OrderRejected { reason: "empty order".into() });
        }
        // Long-term orders under an existing id replace it
        self.resting.insert(order.order_id, order.clone());
        Ok(())
    }

    fn cancel_order(&mut self, order_id: &OrderId, _good_til_block_time: u32) -> VaultResult<()> {
        self.resting
            .remove(order_id)
            .ok_or_else(|| VaultError::OrderRejected { reason: "unknown order".into() })?;
        self.cancelled.push(*order_id);
        Ok(())
    }

    fn resting_order(&self, order_id: &OrderId) -> Option<Order> {
        self.resting.get(order_id).cloned()
    }
}

impl OracleService for MockChain {
    fn market_price(&self, market_id: u32) -> VaultResult<MarketPrice> {
        self.prices.get(&market_id).copied().ok_or(VaultError::MarketNotFound { market_id })
    }

    fn market_param(&self, market_id: u32) -> VaultResult<MarketParam> {
        self.market_params.get(&market_id).copied().ok_or(VaultError::MarketNotFound { market_id })
    }
}

impl MarginTierService for MockChain {
    fn perpetual(&self, perpetual_id: u32) -> VaultResult<Perpetual> {
        self.perpetuals
            .get(&perpetual_id)
            .cloned()
            .ok_or(VaultError::PerpetualNotFound { perpetual_id })
    }
}

pub fn governance() -> Address {
    [1u8; 32]
}

pub fn operator() -> Address {
    [2u8; 32]
}

pub fn module_params() -> ModuleParams {
    ModuleParams::new(governance(), operator())
}

pub fn alice() -> SubaccountId {
    SubaccountId::new([0xA1; 32], 0)
}

pub fn bob() -> SubaccountId {
    SubaccountId::new([0xB0; 32], 0)
}

pub fn keeper_on(chain: MockChain) -> VaultKeeper<MockChain> {
    VaultKeeper::new(chain, module_params()).expect("valid module params")
}

/// Keeper with the given vaults already created, without any markets
pub fn keeper_with_vaults(vaults: &[(VaultId, VaultStatus)]) -> VaultKeeper<MockChain> {
    let mut keeper = keeper_on(MockChain::default());
    for (vault_id, status) in vaults {
        keeper.store.set_vault_params(vault_id, &VaultParams::new(*status)).expect("store");
        keeper.store.register_vault_address(vault_id).expect("store");
    }
    keeper
}

/// BTC perpetual at 50_000 with oracle subticks of 500_000_000
pub fn btc_market(chain: &mut MockChain, clob_pair_id: u32) {
    chain.add_clob_pair(ClobPair {
        id: clob_pair_id,
        market: MarketKind::Perpetual { perpetual_id: clob_pair_id },
        step_base_quantums: 5,
        subticks_per_tick: 5,
        quantum_conversion_exponent: -8,
        status: ClobPairStatus::Active,
    });
    chain.add_perpetual(Perpetual {
        id: clob_pair_id,
        market_id: clob_pair_id,
        atomic_resolution: -10,
        initial_margin_ppm: 200_000,
    });
    chain.set_market(
        MarketParam { id: clob_pair_id, min_price_change_ppm: 50 },
        MarketPrice { price: 5_000_000_000, exponent: -5 },
    );
}

/// ETH perpetual at 3_000 where 1_000_000_000 base quantums are one ETH
pub fn eth_market(chain: &mut MockChain, clob_pair_id: u32) {
    chain.add_clob_pair(ClobPair {
        id: clob_pair_id,
        market: MarketKind::Perpetual { perpetual_id: clob_pair_id },
        step_base_quantums: 1_000,
        subticks_per_tick: 1_000,
        quantum_conversion_exponent: -9,
        status: ClobPairStatus::Active,
    });
    chain.add_perpetual(Perpetual {
        id: clob_pair_id,
        market_id: clob_pair_id,
        atomic_resolution: -9,
        initial_margin_ppm: 200_000,
    });
    chain.set_market(
        MarketParam { id: clob_pair_id, min_price_change_ppm: 50 },
        MarketPrice { price: 3_000, exponent: 0 },
    );
}
