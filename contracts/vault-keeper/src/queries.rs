//! Read-only queries

use num_bigint::BigInt;
use num_rational::BigRational;
use serde::{Deserialize, Serialize};

use megavault_common::{
    math, Address, NumShares, OwnerShareUnlocks, QuotingParams, SerializableInt, ShareScope,
    SubaccountId, VaultId, VaultParams, VaultResult,
};

use crate::genesis::ModuleParams;
use crate::interfaces::Collaborators;
use crate::keeper::VaultKeeper;

/// Everything known about one vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultDetail {
    pub vault_id: VaultId,
    pub params: VaultParams,
    pub subaccount_id: SubaccountId,
    pub equity: SerializableInt,
    /// Signed base quantums, zero when the market is gone
    pub inventory: SerializableInt,
    pub most_recent_client_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsResponse {
    pub default_quoting_params: QuotingParams,
    pub module_params: ModuleParams,
}

/// An owner's position in one share scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSharesResponse {
    pub owner: Address,
    pub shares: NumShares,
    pub unlocked_shares: NumShares,
    pub share_unlocks: OwnerShareUnlocks,
    /// Pro-rata equity, rounded down and before slippage
    pub equity: SerializableInt,
}

impl<E: Collaborators> VaultKeeper<E> {
    pub fn query_vault(&self, vault_id: &VaultId) -> VaultResult<VaultDetail> {
        let params = self.vault_params(vault_id)?;
        let inventory = self.vault_inventory(vault_id).unwrap_or_default();
        Ok(VaultDetail {
            vault_id: *vault_id,
            params,
            subaccount_id: vault_id.to_subaccount_id(),
            equity: SerializableInt::new(self.vault_equity(vault_id)),
            inventory: SerializableInt::new(inventory),
            most_recent_client_ids: self.store.most_recent_client_ids(vault_id)?,
        })
    }

    /// Every vault in key order
    pub fn query_all_vaults(&self) -> VaultResult<Vec<VaultDetail>> {
        self.store
            .all_vault_params()?
            .iter()
            .map(|(vault_id, _)| self.query_vault(vault_id))
            .collect()
    }

    pub fn query_params(&self) -> VaultResult<ParamsResponse> {
        Ok(ParamsResponse {
            default_quoting_params: self.store.default_quoting_params()?,
            module_params: self.store.module_params()?,
        })
    }

    pub fn query_owner_shares(
        &self,
        scope: &ShareScope,
        owner: &Address,
    ) -> VaultResult<OwnerSharesResponse> {
        let shares = self.owner_shares(scope, owner)?;
        let total = self.total_shares(scope)?;
        let equity = if shares.is_zero() || total.is_zero() {
            BigInt::default()
        } else {
            let fraction = shares.fraction_of(&total)?;
            math::floor(&(fraction * BigRational::from_integer(self.scope_equity(scope)?)))
        };

        Ok(OwnerSharesResponse {
            owner: *owner,
            unlocked_shares: self.unlocked_shares(scope, owner)?,
            share_unlocks: self.owner_share_unlocks(scope, owner)?,
            shares,
            equity: SerializableInt::new(equity),
        })
    }
}
