//! Module configuration and genesis state
//!
//! `GenesisState` is the full persisted state in a JSON-friendly form. Chains
//! start from one and can export one at any height.

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use megavault_common::constants::shares::DEFAULT_SHARE_LOCK_BLOCKS;
use megavault_common::validation::require_valid_address;
use megavault_common::{
    Address, Authorities, EventLog, NumShares, OwnerShare, OwnerShareUnlocks, QuotingParams,
    ShareScope, VaultError, VaultId, VaultParams, VaultResult,
};

use crate::interfaces::Collaborators;
use crate::keeper::{BlockContext, VaultKeeper};
use crate::store::KvStore;

/// Module-wide parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ModuleParams {
    pub authorities: Authorities,
    /// Blocks a megavault deposit stays locked
    pub share_lock_blocks: u32,
}

impl ModuleParams {
    pub fn new(governance: Address, operator: Address) -> Self {
        Self {
            authorities: Authorities::new(governance, operator),
            share_lock_blocks: DEFAULT_SHARE_LOCK_BLOCKS,
        }
    }

    pub fn validate(&self) -> VaultResult<()> {
        require_valid_address(self.authorities.governance, "governance cannot be zero address")?;
        require_valid_address(self.authorities.operator, "operator cannot be zero address")?;
        Ok(())
    }
}

/// One vault's persisted records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultGenesis {
    pub vault_id: VaultId,
    pub params: VaultParams,
    #[serde(default)]
    pub most_recent_client_ids: Vec<u32>,
}

/// Share records of one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSharesGenesis {
    pub scope: ShareScope,
    pub total_shares: NumShares,
    pub owner_shares: Vec<OwnerShare>,
    #[serde(default)]
    pub owner_share_unlocks: Vec<OwnerShareUnlocks>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub module_params: ModuleParams,
    #[serde(default)]
    pub default_quoting_params: QuotingParams,
    #[serde(default)]
    pub vaults: Vec<VaultGenesis>,
    #[serde(default)]
    pub shares: Vec<ScopeSharesGenesis>,
}

fn invalid(reason: impl Into<String>) -> VaultError {
    VaultError::InvalidGenesis { reason: reason.into() }
}

impl GenesisState {
    pub fn new(module_params: ModuleParams) -> Self {
        Self {
            module_params,
            default_quoting_params: QuotingParams::default(),
            vaults: Vec::new(),
            shares: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> VaultResult<Self> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }

    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    /// Check the state is internally consistent
    ///
    /// Every share scope must balance, reference an existing vault, and lock
    /// no more than each owner holds.
    pub fn validate(&self) -> VaultResult<()> {
        self.module_params.validate()?;
        self.default_quoting_params.validate()?;

        let mut vault_ids = BTreeSet::new();
        for vault in &self.vaults {
            vault.vault_id.validate()?;
            vault.params.validate()?;
            if !vault_ids.insert(vault.vault_id) {
                return Err(invalid(format!("duplicate vault {}", vault.vault_id)));
            }
        }

        let mut scopes = BTreeSet::new();
        for entry in &self.shares {
            if !scopes.insert(entry.scope) {
                return Err(invalid(format!("duplicate share scope {:?}", entry.scope)));
            }
            if let ShareScope::Vault(vault_id) = &entry.scope {
                if !vault_ids.contains(vault_id) {
                    return Err(invalid(format!("shares of unknown vault {}", vault_id)));
                }
            }

            let mut owners = BTreeSet::new();
            let mut sum = NumShares::zero();
            for owner_share in &entry.owner_shares {
                if !owners.insert(owner_share.owner) {
                    return Err(invalid("duplicate owner"));
                }
                if owner_share.shares.is_zero() {
                    return Err(invalid("owner with zero shares"));
                }
                sum = sum.add(&owner_share.shares);
            }
            if sum != entry.total_shares {
                return Err(invalid(format!(
                    "total shares {} do not match owner sum {}",
                    entry.total_shares, sum
                )));
            }

            let mut locked_owners = BTreeSet::new();
            for unlocks in &entry.owner_share_unlocks {
                if !locked_owners.insert(unlocks.owner_address) {
                    return Err(invalid("duplicate lock owner"));
                }
                let owned = entry
                    .owner_shares
                    .iter()
                    .find(|share| share.owner == unlocks.owner_address)
                    .map(|share| share.shares.clone())
                    .unwrap_or_default();
                if unlocks.total_locked() > owned {
                    return Err(invalid("locked shares exceed owner shares"));
                }
            }
        }
        Ok(())
    }
}

impl<E: Collaborators> VaultKeeper<E> {
    /// Keeper initialized from a validated genesis state
    pub fn init_genesis(env: E, genesis: &GenesisState) -> VaultResult<Self> {
        genesis.validate()?;

        let mut store = KvStore::new();
        store.set_module_params(&genesis.module_params)?;
        store.set_default_quoting_params(&genesis.default_quoting_params)?;
        for vault in &genesis.vaults {
            store.set_vault_params(&vault.vault_id, &vault.params)?;
            store.register_vault_address(&vault.vault_id)?;
            if !vault.most_recent_client_ids.is_empty() {
                store.set_most_recent_client_ids(&vault.vault_id, &vault.most_recent_client_ids)?;
            }
        }
        for entry in &genesis.shares {
            store.set_total_shares(&entry.scope, &entry.total_shares)?;
            for owner_share in &entry.owner_shares {
                store.set_owner_shares(&entry.scope, &owner_share.owner, &owner_share.shares)?;
            }
            for unlocks in &entry.owner_share_unlocks {
                store.set_owner_share_unlocks(&entry.scope, unlocks)?;
            }
        }

        log::info!(
            "initialized megavault genesis with {} vaults and {} share scopes",
            genesis.vaults.len(),
            genesis.shares.len()
        );
        Ok(Self { store, env, events: EventLog::new(), block: BlockContext::default() })
    }

    /// Current persisted state in canonical order
    pub fn export_genesis(&self) -> VaultResult<GenesisState> {
        let vaults = self
            .store
            .all_vault_params()?
            .into_iter()
            .map(|(vault_id, params)| {
                Ok(VaultGenesis {
                    vault_id,
                    params,
                    most_recent_client_ids: self.store.most_recent_client_ids(&vault_id)?,
                })
            })
            .collect::<VaultResult<Vec<_>>>()?;

        let all_unlocks = self.store.all_owner_share_unlocks()?;
        let shares = self
            .store
            .share_scopes()?
            .into_iter()
            .map(|scope| {
                Ok(ScopeSharesGenesis {
                    scope,
                    total_shares: self.store.total_shares(&scope)?,
                    owner_shares: self.store.all_owner_shares(&scope)?,
                    owner_share_unlocks: all_unlocks
                        .iter()
                        .filter(|(s, _)| *s == scope)
                        .map(|(_, unlocks)| unlocks.clone())
                        .collect(),
                })
            })
            .collect::<VaultResult<Vec<_>>>()?;

        Ok(GenesisState {
            module_params: self.store.module_params()?,
            default_quoting_params: self.store.default_quoting_params()?,
            vaults,
            shares,
        })
    }
}
