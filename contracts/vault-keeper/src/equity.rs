//! Equity, inventory, and leverage of vaults
//!
//! Equity is the net collateral of an account after folding the risk of
//! every position it holds.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use megavault_common::{
    math, Address, ClobPair, MarketParam, MarketPrice, Perpetual, ShareScope, SubaccountId,
    VaultError, VaultId, VaultResult,
};

use crate::interfaces::Collaborators;
use crate::keeper::VaultKeeper;

/// Market data a clob vault quotes against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultMarket {
    pub clob_pair: ClobPair,
    pub perpetual: Perpetual,
    pub market_param: MarketParam,
    pub market_price: MarketPrice,
}

/// Owner under which the megavault holds its stake in vault-scoped shares
pub fn megavault_stake_owner() -> Address {
    SubaccountId::megavault_main().owner
}

impl<E: Collaborators> VaultKeeper<E> {
    pub fn subaccount_equity(&self, subaccount: &SubaccountId) -> BigInt {
        self.env.risk_of(subaccount).equity().clone()
    }

    pub fn vault_equity(&self, vault_id: &VaultId) -> BigInt {
        self.subaccount_equity(&vault_id.to_subaccount_id())
    }

    /// Part of a vault's equity owned by the megavault
    ///
    /// The megavault owns the whole vault until an outside deposit gives the
    /// vault shares of its own. From then on it owns the fraction held by
    /// [`megavault_stake_owner`], rounded down.
    pub fn megavault_stake_equity(&self, vault_id: &VaultId) -> VaultResult<BigInt> {
        let equity = self.vault_equity(vault_id);
        let scope = ShareScope::Vault(*vault_id);
        let total = self.store.total_shares(&scope)?;
        if total.is_zero() {
            return Ok(equity);
        }
        let stake = self
            .store
            .owner_shares(&scope, &megavault_stake_owner())?
            .unwrap_or_default();
        if stake.is_zero() {
            return Ok(BigInt::zero());
        }
        let fraction = stake.fraction_of(&total)?;
        Ok(math::floor(&(fraction * BigRational::from_integer(equity))))
    }

    /// Main pool equity plus the megavault's positive stake in every registered vault
    pub fn megavault_equity(&self) -> VaultResult<BigInt> {
        let mut equity = self.subaccount_equity(&SubaccountId::megavault_main());
        for (vault_id, _) in self.store.all_vault_params()? {
            let stake_equity = self.megavault_stake_equity(&vault_id)?;
            if stake_equity.is_positive() {
                equity += stake_equity;
            }
        }
        Ok(equity)
    }

    /// Equity backing the shares of `scope`
    pub fn scope_equity(&self, scope: &ShareScope) -> VaultResult<BigInt> {
        match scope {
            ShareScope::Megavault => self.megavault_equity(),
            ShareScope::Vault(vault_id) => Ok(self.vault_equity(vault_id)),
        }
    }

    /// Clob pair, perpetual, and oracle data of a vault's market
    pub fn vault_market(&self, vault_id: &VaultId) -> VaultResult<VaultMarket> {
        let clob_pair_id = vault_id.clob_pair_id();
        let clob_pair = self
            .env
            .clob_pair(clob_pair_id)
            .ok_or(VaultError::ClobPairNotFound { clob_pair_id })?;
        let perpetual = self.env.perpetual(clob_pair.perpetual_id()?)?;
        let market_param = self.env.market_param(perpetual.market_id)?;
        let market_price = self.env.market_price(perpetual.market_id)?;
        Ok(VaultMarket { clob_pair, perpetual, market_param, market_price })
    }

    /// Signed base quantums the vault holds in its own perpetual
    pub fn vault_inventory(&self, vault_id: &VaultId) -> VaultResult<BigInt> {
        let clob_pair_id = vault_id.clob_pair_id();
        let clob_pair = self
            .env
            .clob_pair(clob_pair_id)
            .ok_or(VaultError::ClobPairNotFound { clob_pair_id })?;
        Ok(self
            .env
            .perpetual_position(&vault_id.to_subaccount_id(), clob_pair.perpetual_id()?))
    }

    /// `open notional / equity` (signed) and equity
    ///
    /// # Errors
    /// `NonPositiveEquity` when the vault has no equity to lever.
    pub fn vault_leverage_and_equity(
        &self,
        vault_id: &VaultId,
        market: &VaultMarket,
    ) -> VaultResult<(BigRational, BigInt)> {
        let equity = self.vault_equity(vault_id);
        if !equity.is_positive() {
            return Err(VaultError::NonPositiveEquity { equity });
        }
        let inventory = self
            .env
            .perpetual_position(&vault_id.to_subaccount_id(), market.perpetual.id);
        if inventory.is_zero() {
            return Ok((BigRational::zero(), equity));
        }
        let open_notional = math::base_to_quote_quantums(
            &inventory,
            market.perpetual.atomic_resolution,
            &market.market_price,
        );
        let leverage = open_notional / BigRational::from_integer(equity.clone());
        Ok((leverage, equity))
    }
}
