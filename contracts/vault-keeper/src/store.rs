//! Persisted state layout
//!
//! An ordered key-value map. Keys are a prefix followed by a canonical key,
//! values are borsh encoded. Iteration is lexicographic over keys so every
//! node walks vaults and owners in the same order.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};

use megavault_common::{
    Address, NumShares, OwnerShare, OwnerShareUnlocks, QuotingParams, ShareScope, VaultError,
    VaultId, VaultParams, VaultResult,
};

use crate::genesis::ModuleParams;

/// Key prefixes
pub mod keys {
    pub const VAULT_PARAMS: &[u8] = b"VaultParams:";
    pub const TOTAL_SHARES: &[u8] = b"TotalShares:";
    pub const OWNER_SHARES: &[u8] = b"OwnerShares:";
    pub const OWNER_SHARE_UNLOCKS: &[u8] = b"OwnerShareUnlocks:";
    pub const MOST_RECENT_CLIENT_IDS: &[u8] = b"MostRecentClientIds:";
    pub const VAULT_ADDRESS: &[u8] = b"VaultAddress:";
    pub const DEFAULT_QUOTING_PARAMS: &[u8] = b"DefaultQuotingParams";
    pub const MODULE_PARAMS: &[u8] = b"ModuleParams";
}

fn key(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut out = prefix.to_vec();
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

fn owner_from_key(bytes: &[u8], label: &'static str) -> VaultResult<Address> {
    bytes.try_into().map_err(|_| VaultError::StateCorrupted { key: label })
}

/// Splits `scope key ++ rest` into the scope and the rest
fn split_scope_key<'a>(
    bytes: &'a [u8],
    label: &'static str,
) -> VaultResult<(ShareScope, &'a [u8])> {
    let len = match bytes.first() {
        Some(0) => ShareScope::Megavault.state_key_len(),
        Some(1) => ShareScope::Vault(VaultId::clob(0)).state_key_len(),
        _ => return Err(VaultError::StateCorrupted { key: label }),
    };
    if bytes.len() < len {
        return Err(VaultError::StateCorrupted { key: label });
    }
    let (scope, rest) = bytes.split_at(len);
    let scope =
        ShareScope::from_state_key(scope).map_err(|_| VaultError::StateCorrupted { key: label })?;
    Ok((scope, rest))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries under `prefix` in key order, with the prefix stripped
    pub fn iter_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(move |(k, v)| (&k[prefix.len()..], v.as_slice()))
    }

    fn get<T: BorshDeserialize>(&self, key: &[u8], label: &'static str) -> VaultResult<Option<T>> {
        match self.entries.get(key) {
            Some(bytes) => borsh::from_slice(bytes)
                .map(Some)
                .map_err(|_| VaultError::StateCorrupted { key: label }),
            None => Ok(None),
        }
    }

    fn set<T: BorshSerialize>(&mut self, key: Vec<u8>, value: &T, label: &'static str) -> VaultResult<()> {
        let bytes = borsh::to_vec(value).map_err(|_| VaultError::StateCorrupted { key: label })?;
        self.entries.insert(key, bytes);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        self.entries.remove(key).is_some()
    }

    fn decode<T: BorshDeserialize>(bytes: &[u8], label: &'static str) -> VaultResult<T> {
        borsh::from_slice(bytes).map_err(|_| VaultError::StateCorrupted { key: label })
    }

    // ============ Vault Params ============

    pub fn vault_params(&self, vault_id: &VaultId) -> VaultResult<Option<VaultParams>> {
        self.get(&key(keys::VAULT_PARAMS, &[&vault_id.state_key()]), "vault_params")
    }

    pub fn set_vault_params(&mut self, vault_id: &VaultId, params: &VaultParams) -> VaultResult<()> {
        self.set(key(keys::VAULT_PARAMS, &[&vault_id.state_key()]), params, "vault_params")
    }

    pub fn delete_vault_params(&mut self, vault_id: &VaultId) -> bool {
        self.delete(&key(keys::VAULT_PARAMS, &[&vault_id.state_key()]))
    }

    /// Every vault in canonical key order
    pub fn all_vault_params(&self) -> VaultResult<Vec<(VaultId, VaultParams)>> {
        self.iter_prefix(keys::VAULT_PARAMS)
            .map(|(k, v)| {
                let vault_id = VaultId::from_state_key(k)
                    .map_err(|_| VaultError::StateCorrupted { key: "vault_params" })?;
                Ok((vault_id, Self::decode(v, "vault_params")?))
            })
            .collect()
    }

    // ============ Module Params ============

    /// Module-wide quoting defaults, falling back to the built-in values
    pub fn default_quoting_params(&self) -> VaultResult<QuotingParams> {
        Ok(self
            .get(keys::DEFAULT_QUOTING_PARAMS, "default_quoting_params")?
            .unwrap_or_default())
    }

    pub fn set_default_quoting_params(&mut self, params: &QuotingParams) -> VaultResult<()> {
        self.set(keys::DEFAULT_QUOTING_PARAMS.to_vec(), params, "default_quoting_params")
    }

    pub fn module_params(&self) -> VaultResult<ModuleParams> {
        self.get(keys::MODULE_PARAMS, "module_params")?
            .ok_or(VaultError::StateCorrupted { key: "module_params" })
    }

    pub fn set_module_params(&mut self, params: &ModuleParams) -> VaultResult<()> {
        self.set(keys::MODULE_PARAMS.to_vec(), params, "module_params")
    }

    // ============ Shares ============

    pub fn total_shares(&self, scope: &ShareScope) -> VaultResult<NumShares> {
        Ok(self
            .get(&key(keys::TOTAL_SHARES, &[&scope.state_key()]), "total_shares")?
            .unwrap_or_default())
    }

    /// Zero total shares are removed rather than stored
    pub fn set_total_shares(&mut self, scope: &ShareScope, shares: &NumShares) -> VaultResult<()> {
        let k = key(keys::TOTAL_SHARES, &[&scope.state_key()]);
        if shares.is_zero() {
            self.delete(&k);
            return Ok(());
        }
        self.set(k, shares, "total_shares")
    }

    /// Scopes with outstanding shares, megavault first
    pub fn share_scopes(&self) -> VaultResult<Vec<ShareScope>> {
        self.iter_prefix(keys::TOTAL_SHARES)
            .map(|(k, _)| {
                ShareScope::from_state_key(k)
                    .map_err(|_| VaultError::StateCorrupted { key: "total_shares" })
            })
            .collect()
    }

    pub fn owner_shares(&self, scope: &ShareScope, owner: &Address) -> VaultResult<Option<NumShares>> {
        self.get(&key(keys::OWNER_SHARES, &[&scope.state_key(), owner]), "owner_shares")
    }

    /// Zero balances delete the owner record
    pub fn set_owner_shares(
        &mut self,
        scope: &ShareScope,
        owner: &Address,
        shares: &NumShares,
    ) -> VaultResult<()> {
        let k = key(keys::OWNER_SHARES, &[&scope.state_key(), owner]);
        if shares.is_zero() {
            self.delete(&k);
            return Ok(());
        }
        self.set(k, shares, "owner_shares")
    }

    /// Owner balances of one scope, ordered by owner address
    pub fn all_owner_shares(&self, scope: &ShareScope) -> VaultResult<Vec<OwnerShare>> {
        let prefix = key(keys::OWNER_SHARES, &[&scope.state_key()]);
        self.iter_prefix(&prefix)
            .map(|(k, v)| {
                Ok(OwnerShare {
                    owner: owner_from_key(k, "owner_shares")?,
                    shares: Self::decode(v, "owner_shares")?,
                })
            })
            .collect()
    }

    pub fn owner_share_unlocks(
        &self,
        scope: &ShareScope,
        owner: &Address,
    ) -> VaultResult<Option<OwnerShareUnlocks>> {
        self.get(
            &key(keys::OWNER_SHARE_UNLOCKS, &[&scope.state_key(), owner]),
            "owner_share_unlocks",
        )
    }

    /// An owner without tranches has no record
    pub fn set_owner_share_unlocks(
        &mut self,
        scope: &ShareScope,
        unlocks: &OwnerShareUnlocks,
    ) -> VaultResult<()> {
        let k = key(keys::OWNER_SHARE_UNLOCKS, &[&scope.state_key(), &unlocks.owner_address]);
        if unlocks.share_unlocks.is_empty() {
            self.delete(&k);
            return Ok(());
        }
        self.set(k, unlocks, "owner_share_unlocks")
    }

    /// Lock records of every scope, in key order
    pub fn all_owner_share_unlocks(&self) -> VaultResult<Vec<(ShareScope, OwnerShareUnlocks)>> {
        self.iter_prefix(keys::OWNER_SHARE_UNLOCKS)
            .map(|(k, v)| {
                let (scope, _owner) = split_scope_key(k, "owner_share_unlocks")?;
                Ok((scope, Self::decode(v, "owner_share_unlocks")?))
            })
            .collect()
    }

    /// Erase total, owner balances and locks of a scope
    pub fn delete_scope(&mut self, scope: &ShareScope) {
        let scope_key = scope.state_key();
        self.delete(&key(keys::TOTAL_SHARES, &[&scope_key]));
        for prefix in [keys::OWNER_SHARES, keys::OWNER_SHARE_UNLOCKS] {
            let full = key(prefix, &[&scope_key]);
            let doomed: Vec<Vec<u8>> = self
                .entries
                .range(full.clone()..)
                .take_while(|(k, _)| k.starts_with(&full))
                .map(|(k, _)| k.clone())
                .collect();
            for k in doomed {
                self.entries.remove(&k);
            }
        }
    }

    // ============ Client Ids ============

    pub fn most_recent_client_ids(&self, vault_id: &VaultId) -> VaultResult<Vec<u32>> {
        Ok(self
            .get(&key(keys::MOST_RECENT_CLIENT_IDS, &[&vault_id.state_key()]), "client_ids")?
            .unwrap_or_default())
    }

    pub fn set_most_recent_client_ids(&mut self, vault_id: &VaultId, client_ids: &[u32]) -> VaultResult<()> {
        self.set(
            key(keys::MOST_RECENT_CLIENT_IDS, &[&vault_id.state_key()]),
            &client_ids.to_vec(),
            "client_ids",
        )
    }

    pub fn delete_most_recent_client_ids(&mut self, vault_id: &VaultId) -> bool {
        self.delete(&key(keys::MOST_RECENT_CLIENT_IDS, &[&vault_id.state_key()]))
    }

    // ============ Vault Addresses ============

    pub fn register_vault_address(&mut self, vault_id: &VaultId) -> VaultResult<()> {
        self.set(
            key(keys::VAULT_ADDRESS, &[&vault_id.module_address()]),
            vault_id,
            "vault_address",
        )
    }

    pub fn is_vault_address(&self, address: &Address) -> bool {
        self.has(&key(keys::VAULT_ADDRESS, &[address]))
    }

    pub fn delete_vault_address(&mut self, vault_id: &VaultId) -> bool {
        self.delete(&key(keys::VAULT_ADDRESS, &[&vault_id.module_address()]))
    }
}
